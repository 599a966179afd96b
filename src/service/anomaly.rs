use crate::config::ReconConfig;
use crate::models::{split_item_code, MismatchCandidate, MismatchKind, QuantityBasis, StockRecord};
use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// 某一侧某个编码的汇总库存 (跨库位求和)
#[derive(Debug, Clone)]
struct VariantLevel {
    code: String,
    prefix: String,
    size: String,
    quantity: Option<BigDecimal>,
}

/// 规格错配检测
///
/// 两条启发式:
/// 1. 规格互换: 同一植物的两个规格 A、B, ERP 在 A 上为零而前台非零, B 上恰好相反;
/// 2. 数量接近: ERP 某编码有库存, 前台同编码为零, 但前台同植物的另一规格数量与之相差不超过阈值。
///    这只是提示人工复核的弱信号, 不做自动修正。
pub struct AnomalyDetector<'a> {
    zero_tolerance: &'a BigDecimal,
    proximity_tolerance: &'a BigDecimal,
    basis: QuantityBasis,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self {
            zero_tolerance: &config.zero_tolerance,
            proximity_tolerance: &config.proximity_tolerance,
            basis: config.quantity_basis,
        }
    }

    pub fn detect(
        &self,
        erp: &[StockRecord],
        storefront: &[StockRecord],
    ) -> Vec<MismatchCandidate> {
        let erp_levels = self.aggregate(erp);
        let sf_levels = self.aggregate(storefront);

        // 植物前缀 -> 两侧出现过的全部规格编码
        let mut families: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (code, level) in erp_levels.iter().chain(sf_levels.iter()) {
            if !level.prefix.is_empty() {
                families
                    .entry(level.prefix.as_str())
                    .or_default()
                    .insert(code.as_str());
            }
        }

        let mut candidates = Vec::new();
        let mut explained: HashSet<&str> = HashSet::new();

        // 1. 规格互换
        for (prefix, codes) in &families {
            let codes: Vec<&str> = codes.iter().copied().collect();
            for (i, a) in codes.iter().enumerate() {
                for b in &codes[i + 1..] {
                    let pair = if self.swapped(a, b, &erp_levels, &sf_levels) {
                        Some((*b, *a))
                    } else if self.swapped(b, a, &erp_levels, &sf_levels) {
                        Some((*a, *b))
                    } else {
                        None
                    };
                    // (ERP 有库存的编码, 前台有库存的编码)
                    let Some((erp_code, sf_code)) = pair else {
                        continue;
                    };
                    let (Some(e), Some(s)) = (erp_levels.get(erp_code), sf_levels.get(sf_code))
                    else {
                        continue;
                    };
                    tracing::debug!("规格互换: {} {} <-> {}", prefix, e.code, s.code);
                    candidates.push(MismatchCandidate {
                        kind: MismatchKind::VariantSwap,
                        plant_prefix: e.prefix.clone(),
                        erp_item_code: e.code.clone(),
                        erp_size: e.size.clone(),
                        erp_quantity: e.quantity.clone(),
                        storefront_item_code: s.code.clone(),
                        storefront_size: s.size.clone(),
                        storefront_quantity: s.quantity.clone(),
                        note: format!(
                            "Variant swap: ERP holds stock on {} while storefront holds it on {}",
                            e.size, s.size
                        ),
                    });
                    explained.insert(erp_code);
                    explained.insert(sf_code);
                }
            }
        }

        // 2. 数量接近 (无法确定规格对应关系时的弱信号)
        let mut sf_by_prefix: BTreeMap<&str, Vec<(&str, &VariantLevel)>> = BTreeMap::new();
        for (code, level) in &sf_levels {
            if !level.prefix.is_empty() && !explained.contains(code.as_str()) {
                sf_by_prefix
                    .entry(level.prefix.as_str())
                    .or_default()
                    .push((code.as_str(), level));
            }
        }

        let mut erp_codes: Vec<&String> = erp_levels.keys().collect();
        erp_codes.sort();
        for code in erp_codes {
            let o = &erp_levels[code];
            if o.prefix.is_empty() || explained.contains(code.as_str()) {
                continue;
            }
            let Some(o_qty) = o.quantity.as_ref().filter(|q| self.is_nonzero(q)) else {
                continue;
            };
            if !self.is_zero(sf_levels.get(code).and_then(|l| l.quantity.as_ref())) {
                continue;
            }
            let Some(siblings) = sf_by_prefix.get(o.prefix.as_str()) else {
                continue;
            };
            for (sibling_code, s) in siblings {
                if *sibling_code == code.as_str() {
                    continue;
                }
                let Some(s_qty) = s.quantity.as_ref().filter(|q| self.is_nonzero(q)) else {
                    continue;
                };
                if (o_qty - s_qty).abs() > *self.proximity_tolerance {
                    continue;
                }
                candidates.push(MismatchCandidate {
                    kind: MismatchKind::PossibleSizeMismatch,
                    plant_prefix: o.prefix.clone(),
                    erp_item_code: o.code.clone(),
                    erp_size: o.size.clone(),
                    erp_quantity: Some(o_qty.clone()),
                    storefront_item_code: s.code.clone(),
                    storefront_size: s.size.clone(),
                    storefront_quantity: Some(s_qty.clone()),
                    note: format!(
                        "Size mismatch: ERP has {} but storefront has {} with matching quantity",
                        o.size, s.size
                    ),
                });
            }
        }

        candidates.sort_by(|a, b| {
            a.plant_prefix
                .to_lowercase()
                .cmp(&b.plant_prefix.to_lowercase())
                .then_with(|| a.erp_item_code.to_lowercase().cmp(&b.erp_item_code.to_lowercase()))
                .then_with(|| {
                    a.storefront_item_code
                        .to_lowercase()
                        .cmp(&b.storefront_item_code.to_lowercase())
                })
        });

        let advisory = candidates.iter().filter(|c| c.is_advisory()).count();
        tracing::info!(
            "规格错配检测完成: ERP {} 个编码, 前台 {} 个编码, 互换 {} 条, 待复核 {} 条",
            erp_levels.len(),
            sf_levels.len(),
            candidates.len() - advisory,
            advisory
        );

        candidates
    }

    /// 按规范化编码汇总; 全部记录都没有有效数值时数量为空
    fn aggregate(&self, records: &[StockRecord]) -> IndexMap<String, VariantLevel> {
        let mut levels: IndexMap<String, VariantLevel> = IndexMap::new();
        for record in records {
            let code = record.item_code.trim();
            if code.is_empty() {
                continue;
            }
            let measure = record.quantity(self.basis);
            if measure.is_malformed() {
                tracing::warn!("编码 {} 的库存数量无法解析: {:?}", code, measure);
            }
            let (prefix, size) = split_item_code(code);
            let level = levels
                .entry(code.to_lowercase())
                .or_insert_with(|| VariantLevel {
                    code: code.to_string(),
                    prefix: prefix.to_lowercase(),
                    size: size.to_string(),
                    quantity: None,
                });
            if let Some(v) = measure.value() {
                level.quantity = Some(match level.quantity.take() {
                    Some(sum) => sum + v,
                    None => v.clone(),
                });
            }
        }
        levels
    }

    /// ERP 在 x 上为零、前台非零, 且 ERP 在 y 上非零、前台为零
    fn swapped(
        &self,
        x: &str,
        y: &str,
        erp: &IndexMap<String, VariantLevel>,
        storefront: &IndexMap<String, VariantLevel>,
    ) -> bool {
        let qty = |levels: &IndexMap<String, VariantLevel>, code: &str| {
            levels.get(code).and_then(|l| l.quantity.clone())
        };
        // 四条记录都必须存在: 未上架的规格不能作为互换的证据
        self.is_listed_zero(qty(erp, x).as_ref())
            && qty(storefront, x).is_some_and(|q| self.is_nonzero(&q))
            && qty(erp, y).is_some_and(|q| self.is_nonzero(&q))
            && self.is_listed_zero(qty(storefront, y).as_ref())
    }

    /// 缺失按零处理 (仅用于数量接近的提示)
    fn is_zero(&self, quantity: Option<&BigDecimal>) -> bool {
        quantity.map_or(true, |q| q.abs() <= *self.zero_tolerance)
    }

    fn is_listed_zero(&self, quantity: Option<&BigDecimal>) -> bool {
        quantity.is_some_and(|q| q.abs() <= *self.zero_tolerance)
    }

    fn is_nonzero(&self, quantity: &BigDecimal) -> bool {
        quantity > self.zero_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measure;

    fn rec(code: &str, qty: i64) -> StockRecord {
        StockRecord::new(code, qty)
    }

    fn detect(erp: &[StockRecord], sf: &[StockRecord]) -> Vec<MismatchCandidate> {
        let config = ReconConfig::default();
        AnomalyDetector::new(&config).detect(erp, sf)
    }

    #[test]
    fn swapped_variants_are_affirmative() {
        let erp = [rec("FERN-01G", 0), rec("FERN-03G", 12)];
        let sf = [rec("FERN-01G", 12), rec("FERN-03G", 0)];
        let found = detect(&erp, &sf);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.kind, MismatchKind::VariantSwap);
        assert_eq!(c.erp_item_code, "FERN-03G");
        assert_eq!(c.storefront_item_code, "FERN-01G");
        assert!(!c.is_advisory());
    }

    #[test]
    fn unlisted_variants_are_not_evidence_of_a_swap() {
        assert!(detect(&[rec("FERN-03G", 12)], &[rec("FERN-01G", 40)]).is_empty());

        let erp = [rec("FERN-01G", 0), rec("FERN-03G", 7)];
        assert!(detect(&erp, &[rec("FERN-01G", 40)]).is_empty());

        // 前台把 FERN-03G 列为 0 之后才构成互换
        let found = detect(&erp, &[rec("FERN-01G", 40), rec("FERN-03G", 0)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, MismatchKind::VariantSwap);
    }

    #[test]
    fn proximity_treats_unlisted_storefront_variant_as_zero() {
        let found = detect(&[rec("FERN-03G", 12)], &[rec("FERN-01G", 15)]);
        assert_eq!(found.len(), 1);
        assert!(found[0].is_advisory());
    }

    #[test]
    fn proximity_is_advisory_and_bounded() {
        // ERP 有 MAPLE-03G 10 株, 前台没有; 前台 MAPLE-05G 有 14 株, ERP 也有 MAPLE-05G
        let erp = [rec("MAPLE-03G", 10), rec("MAPLE-05G", 14), rec("MAPLE-07G", 30)];
        let sf = [rec("MAPLE-05G", 14), rec("MAPLE-07G", 30)];
        let found = detect(&erp, &sf);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.kind, MismatchKind::PossibleSizeMismatch);
        assert_eq!(c.erp_item_code, "MAPLE-03G");
        assert_eq!(c.storefront_item_code, "MAPLE-05G");
        assert_eq!(
            c.note,
            "Size mismatch: ERP has 03G but storefront has 05G with matching quantity"
        );
    }

    #[test]
    fn proximity_outside_tolerance_is_ignored() {
        let erp = [rec("MAPLE-03G", 10), rec("MAPLE-05G", 16)];
        let sf = [rec("MAPLE-05G", 16)];
        assert!(detect(&erp, &sf).is_empty());
    }

    #[test]
    fn quantities_are_summed_across_locations() {
        let erp = [
            rec("OAK-01G", 3).at("F/Stock/A1"),
            rec("OAK-01G", 4).at("F/Stock/B2"),
            rec("OAK-03G", 7),
        ];
        let sf = [rec("OAK-03G", 7)];
        let found = detect(&erp, &sf);
        // ERP OAK-01G 合计 7, 前台缺失; 前台 OAK-03G 为 7 但 ERP OAK-03G 也有 7, 非互换
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].erp_quantity, Some(BigDecimal::from(7)));
        assert!(found[0].is_advisory());
    }

    #[test]
    fn codes_without_prefix_and_malformed_quantities_are_skipped() {
        let erp = [rec("GIFTCARD", 5), StockRecord::new("IVY-01", Measure::parse(Some("n/a")))];
        let sf = [rec("IVY-02", 5)];
        assert!(detect(&erp, &sf).is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let erp = [rec("fern-01g", 0), rec("FERN-03G", 12)];
        let sf = [rec("FERN-01G", 12), rec("Fern-03g", 0)];
        assert_eq!(detect(&erp, &sf).len(), 1);
    }
}
