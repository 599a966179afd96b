use crate::config::ReconConfig;
use crate::models::{split_item_code, LegacyCodeMap};
use std::borrow::Cow;

/// 旧编码解析器
///
/// 前台仍在使用旧版编码时, 对照表给出当前基础编码, 再补上标准规格与单位标记
/// (`base` -> `base-01G`)。映射链一次解析到底, 结果不会再被改写。没有映射是常态, 原样返回。
pub struct LegacyCodeResolver<'a> {
    map: &'a LegacyCodeMap,
    standard_size: &'a str,
    unit_marker: &'a str,
}

impl<'a> LegacyCodeResolver<'a> {
    pub fn new(map: &'a LegacyCodeMap, config: &'a ReconConfig) -> Self {
        Self {
            map,
            standard_size: &config.standard_size,
            unit_marker: &config.unit_marker,
        }
    }

    pub fn resolve<'c>(&self, raw_code: &'c str) -> Cow<'c, str> {
        if self.map.is_empty() {
            return Cow::Borrowed(raw_code);
        }

        // 1. 整个编码是旧编码
        if let Some(current) = self.map.current_for(raw_code) {
            return Cow::Owned(format!(
                "{}-{}{}",
                current, self.standard_size, self.unit_marker
            ));
        }

        // 2. 植物前缀是旧编码, 保留原规格
        let (prefix, size) = split_item_code(raw_code);
        if !prefix.is_empty() && !size.is_empty() {
            if let Some(current) = self.map.current_for(prefix) {
                let marker = if has_marker(size, self.unit_marker) {
                    ""
                } else {
                    self.unit_marker
                };
                return Cow::Owned(format!("{}-{}{}", current, size, marker));
            }
        }

        Cow::Borrowed(raw_code)
    }

    /// 可选编码的解析 (空编码保持为空)
    pub fn resolve_opt<'c>(&self, raw_code: Option<&'c str>) -> Option<Cow<'c, str>> {
        raw_code.map(|c| self.resolve(c))
    }
}

fn has_marker(size: &str, marker: &str) -> bool {
    !marker.is_empty() && size.to_lowercase().ends_with(&marker.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> LegacyCodeMap {
        [("OLD", "NEW"), ("FERN-OLD", "FERN")].into_iter().collect()
    }

    #[test]
    fn exact_legacy_code_gets_standard_unit() {
        let config = ReconConfig::default();
        let map = map();
        let r = LegacyCodeResolver::new(&map, &config);
        assert_eq!(r.resolve("FERN-OLD"), "FERN-01G");
        assert_eq!(r.resolve("old"), "NEW-01G");
    }

    #[test]
    fn legacy_prefix_keeps_size() {
        let config = ReconConfig::default();
        let map = map();
        let r = LegacyCodeResolver::new(&map, &config);
        assert_eq!(r.resolve("OLD-01"), "NEW-01G");
        assert_eq!(r.resolve("OLD-03G"), "NEW-03G");
    }

    #[test]
    fn unmapped_and_current_codes_pass_through() {
        let config = ReconConfig::default();
        let map = map();
        let r = LegacyCodeResolver::new(&map, &config);
        assert_eq!(r.resolve("MAPLE-03G"), "MAPLE-03G");
        let once = r.resolve("OLD-01").into_owned();
        assert_eq!(r.resolve(&once), once);
        assert_eq!(r.resolve("OLD-01"), r.resolve("OLD-01"));
        assert_eq!(r.resolve_opt(None), None);
    }

    #[test]
    fn chained_entries_resolve_in_one_step() {
        let config = ReconConfig::default();
        let map: LegacyCodeMap = [("A", "B"), ("B", "C")].into_iter().collect();
        let r = LegacyCodeResolver::new(&map, &config);
        assert_eq!(r.resolve("A-01"), "C-01G");
        assert_eq!(r.resolve("B-01G"), "C-01G");
        assert_eq!(r.resolve("C-01G"), "C-01G");
    }

    #[test]
    fn cyclic_entries_pass_through() {
        let config = ReconConfig::default();
        let map: LegacyCodeMap = [("A", "B"), ("B", "A")].into_iter().collect();
        let r = LegacyCodeResolver::new(&map, &config);
        assert_eq!(r.resolve("A-01"), "A-01");
    }
}
