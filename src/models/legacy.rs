use indexmap::IndexMap;
use std::collections::HashMap;

/// 旧编码 -> 当前基础编码 对照表 (一次对账内只读)
///
/// 查找不区分大小写; 同一旧编码出现多次时以第一条为准。
#[derive(Debug, Clone, Default)]
pub struct LegacyCodeMap {
    entries: IndexMap<String, String>,
}

impl LegacyCodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, legacy_code: &str, current_code: &str) {
        let key = legacy_code.trim().to_lowercase();
        let current = current_code.trim();
        if key.is_empty() || current.is_empty() {
            return;
        }
        if self.entries.contains_key(&key) {
            tracing::debug!("duplicate legacy code {} ignored", legacy_code);
            return;
        }
        self.entries.insert(key, current.to_string());
    }

    pub fn get(&self, legacy_code: &str) -> Option<&str> {
        self.entries
            .get(&legacy_code.trim().to_lowercase())
            .map(String::as_str)
    }

    /// 沿映射链取最终的当前编码 (A -> B -> C 返回 C); 成环的编码视为没有映射
    pub fn current_for(&self, legacy_code: &str) -> Option<&str> {
        let mut current = self.get(legacy_code)?;
        for _ in 0..self.entries.len() {
            match self.get(current) {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
        tracing::debug!("legacy code {} maps into a cycle, ignored", legacy_code);
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: AsRef<str>, C: AsRef<str>> FromIterator<(L, C)> for LegacyCodeMap {
    fn from_iter<T: IntoIterator<Item = (L, C)>>(iter: T) -> Self {
        let mut map = LegacyCodeMap::new();
        for (legacy, current) in iter {
            map.insert(legacy.as_ref(), current.as_ref());
        }
        map
    }
}

impl From<HashMap<String, String>> for LegacyCodeMap {
    fn from(map: HashMap<String, String>) -> Self {
        // HashMap 无序, 排序后插入保证结果可复现
        let mut pairs: Vec<_> = map.into_iter().collect();
        pairs.sort();
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_first_entry_wins() {
        let map: LegacyCodeMap = [("OLD-7", "FERN"), ("old-7", "MOSS")].into_iter().collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(" Old-7 "), Some("FERN"));
        assert_eq!(map.get("NEW"), None);
    }

    #[test]
    fn chains_resolve_to_the_last_code() {
        let map: LegacyCodeMap = [("A", "B"), ("B", "C"), ("X", "Y"), ("Y", "X")]
            .into_iter()
            .collect();
        assert_eq!(map.get("A"), Some("B"));
        assert_eq!(map.current_for("a"), Some("C"));
        assert_eq!(map.current_for("B"), Some("C"));
        assert_eq!(map.current_for("C"), None);
        assert_eq!(map.current_for("X"), None);
    }
}
