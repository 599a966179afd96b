use super::legacy::LegacyCodeResolver;
use super::normalizer::canonical_key;
use crate::models::{AmbiguousKey, CanonicalKey, OrderLine, Side};
use indexmap::IndexMap;

/// 外连接产出的一对记录 (至少一侧存在)
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedPair {
    pub key: CanonicalKey,
    pub storefront: Option<OrderLine>,
    pub erp: Option<OrderLine>,
}

impl JoinedPair {
    pub fn present_on_storefront(&self) -> bool {
        self.storefront.is_some()
    }

    pub fn present_on_erp(&self) -> bool {
        self.erp.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub pairs: Vec<JoinedPair>,
    pub ambiguous_keys: Vec<AmbiguousKey>,
}

/// 某个连接键下两侧的记录下标
#[derive(Default)]
struct KeyBucket {
    storefront: Vec<usize>,
    erp: Vec<usize>,
}

/// 计算某一行的连接键 (先解析旧编码, 再规范化)
pub fn key_for(line: &OrderLine, resolver: &LegacyCodeResolver) -> CanonicalKey {
    let code = resolver.resolve_opt(line.item_code.as_deref());
    canonical_key(Some(line.order_number.as_str()), code.as_deref())
}

/// 全外连接: 任一侧出现的每个键至少产出一行, 同键多条记录做笛卡尔展开
pub fn match_lines(
    storefront: &[OrderLine],
    erp: &[OrderLine],
    resolver: &LegacyCodeResolver,
) -> MatchOutcome {
    // 保序: 键按首次出现顺序输出 (先前台后ERP)
    let mut buckets: IndexMap<CanonicalKey, KeyBucket> = IndexMap::new();

    for (idx, line) in storefront.iter().enumerate() {
        buckets
            .entry(key_for(line, resolver))
            .or_default()
            .storefront
            .push(idx);
    }
    for (idx, line) in erp.iter().enumerate() {
        buckets
            .entry(key_for(line, resolver))
            .or_default()
            .erp
            .push(idx);
    }

    let mut outcome = MatchOutcome::default();

    for (key, bucket) in buckets {
        for (side, count) in [
            (Side::Storefront, bucket.storefront.len()),
            (Side::Erp, bucket.erp.len()),
        ] {
            if count > 1 {
                tracing::warn!("键 {} 在 {} 侧有 {} 条记录, 按外连接展开", key, side.as_str(), count);
                outcome.ambiguous_keys.push(AmbiguousKey {
                    key: key.clone(),
                    side,
                    count,
                });
            }
        }

        // 缺失的一侧用单个 None 占位, 桶至少有一侧非空
        let sf_slots = slots(&bucket.storefront, storefront);
        let erp_slots = slots(&bucket.erp, erp);
        for s in &sf_slots {
            for e in &erp_slots {
                outcome.pairs.push(JoinedPair {
                    key: key.clone(),
                    storefront: s.cloned(),
                    erp: e.cloned(),
                });
            }
        }
    }

    outcome
}

fn slots<'a>(indices: &[usize], lines: &'a [OrderLine]) -> Vec<Option<&'a OrderLine>> {
    if indices.is_empty() {
        vec![None]
    } else {
        indices.iter().map(|&i| Some(&lines[i])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconConfig;
    use crate::models::LegacyCodeMap;

    fn line(order: &str, code: Option<&str>) -> OrderLine {
        OrderLine::new(order, code)
    }

    fn run(storefront: &[OrderLine], erp: &[OrderLine]) -> MatchOutcome {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let resolver = LegacyCodeResolver::new(&map, &config);
        match_lines(storefront, erp, &resolver)
    }

    #[test]
    fn one_sided_keys_are_kept() {
        let out = run(
            &[line("#1", Some("A")), line("#2", Some("B"))],
            &[line("2", Some("b")), line("3", Some("C"))],
        );
        assert_eq!(out.pairs.len(), 3);
        assert!(out.pairs[0].present_on_storefront() && !out.pairs[0].present_on_erp());
        assert!(out.pairs[1].present_on_storefront() && out.pairs[1].present_on_erp());
        assert!(!out.pairs[2].present_on_storefront() && out.pairs[2].present_on_erp());
        assert!(out.ambiguous_keys.is_empty());
    }

    #[test]
    fn duplicate_keys_expand_to_cross_product() {
        let out = run(
            &[line("#1", Some("A")), line("#1", Some("a"))],
            &[line("1", Some("A")), line("1", Some("A ")), line("1", Some("A"))],
        );
        assert_eq!(out.pairs.len(), 6);
        assert_eq!(out.ambiguous_keys.len(), 2);
        assert_eq!(out.ambiguous_keys[1].side, Side::Erp);
        assert_eq!(out.ambiguous_keys[1].count, 3);
    }

    #[test]
    fn null_item_codes_join_on_order_number() {
        let out = run(&[line("#9", None)], &[line("9", Some("  "))]);
        assert_eq!(out.pairs.len(), 1);
        assert_eq!(out.pairs[0].key.item_code, None);
    }

    #[test]
    fn empty_inputs_produce_nothing() {
        assert!(run(&[], &[]).pairs.is_empty());
    }
}
