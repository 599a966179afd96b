use super::classifier::classify;
use super::comparator::compare;
use super::legacy::LegacyCodeResolver;
use super::matcher::match_lines;
use crate::config::ReconConfig;
use crate::models::{
    AmbiguousKey, ComparisonRow, LegacyCodeMap, OrderLine, ReconciliationSummary, SyncStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次对账的完整产出 (整体替换上一次的结果)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRun {
    pub rows: Vec<ComparisonRow>,
    pub ambiguous_keys: Vec<AmbiguousKey>,
    pub summary: ReconciliationSummary,
}

/// 订单对账: 旧编码解析 -> 外连接 -> 字段比较 -> 状态分类
///
/// 纯内存批处理, 不做任何 I/O; 配置和对照表都由调用方传入。
pub struct OrderReconciler<'a> {
    config: &'a ReconConfig,
    legacy_map: &'a LegacyCodeMap,
}

impl<'a> OrderReconciler<'a> {
    pub fn new(config: &'a ReconConfig, legacy_map: &'a LegacyCodeMap) -> Self {
        Self { config, legacy_map }
    }

    pub fn reconcile(&self, storefront: &[OrderLine], erp: &[OrderLine]) -> ReconciliationRun {
        self.reconcile_at(storefront, erp, Utc::now())
    }

    /// 指定对比时间 (整批共用一个时间戳)
    pub fn reconcile_at(
        &self,
        storefront: &[OrderLine],
        erp: &[OrderLine],
        compared_at: DateTime<Utc>,
    ) -> ReconciliationRun {
        tracing::info!(
            "开始订单对账: 前台 {} 行, ERP {} 行, 旧编码映射 {} 条",
            storefront.len(),
            erp.len(),
            self.legacy_map.len()
        );

        let resolver = LegacyCodeResolver::new(self.legacy_map, self.config);
        let outcome = match_lines(storefront, erp, &resolver);

        let mut summary = ReconciliationSummary {
            ambiguous_keys: outcome.ambiguous_keys.len(),
            malformed_fields: storefront
                .iter()
                .chain(erp.iter())
                .map(OrderLine::malformed_field_count)
                .sum(),
            ..Default::default()
        };
        if summary.malformed_fields > 0 {
            tracing::warn!("{} 个数值字段无法解析, 按空值比较", summary.malformed_fields);
        }

        let rows: Vec<ComparisonRow> = outcome
            .pairs
            .into_iter()
            .map(|pair| {
                let fields = compare(&pair, &self.config.price_tolerance);
                let present_on_storefront = pair.present_on_storefront();
                let present_on_erp = pair.present_on_erp();
                let sync_status = classify(present_on_storefront, present_on_erp, &fields);
                summary.record(sync_status);
                ComparisonRow {
                    key: pair.key,
                    storefront: pair.storefront,
                    erp: pair.erp,
                    present_on_storefront,
                    present_on_erp,
                    quantity_match: fields.quantity_match,
                    price_match: fields.price_match,
                    sync_status,
                    compared_at,
                }
            })
            .collect();

        log_summary(&summary);

        ReconciliationRun {
            rows,
            ambiguous_keys: outcome.ambiguous_keys,
            summary,
        }
    }
}

fn log_summary(summary: &ReconciliationSummary) {
    tracing::info!("对账完成: 共 {} 行", summary.total_rows);
    for status in SyncStatus::ALL {
        tracing::info!("  {}: {}", status, summary.count(status));
    }
    tracing::info!(
        "待导入ERP: {}, 待更新ERP: {}",
        summary.to_import,
        summary.to_update
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measure;

    #[test]
    fn summary_counts_every_row_once() {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let storefront = vec![
            OrderLine::new("#1", Some("A")).with_quantity(1),
            OrderLine::new("#2", Some("B")).with_quantity(2),
            OrderLine::new("#3", Some("C")).with_quantity(Measure::parse(Some("two"))),
        ];
        let erp = vec![
            OrderLine::new("1", Some("A")).with_quantity(1),
            OrderLine::new("2", Some("B")).with_quantity(5),
            OrderLine::new("4", Some("D")),
        ];
        let run = OrderReconciler::new(&config, &map).reconcile(&storefront, &erp);

        assert_eq!(run.rows.len(), 4);
        assert_eq!(run.summary.total_rows, 4);
        assert_eq!(run.summary.synced, 1);
        assert_eq!(run.summary.quantity_mismatch, 1);
        assert_eq!(run.summary.missing_on_erp, 1);
        assert_eq!(run.summary.missing_on_storefront, 1);
        assert_eq!(run.summary.to_import, 1);
        assert_eq!(run.summary.to_update, 1);
        assert_eq!(run.summary.malformed_fields, 1);
    }

    #[test]
    fn rows_share_the_run_timestamp() {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let at = Utc::now();
        let run = OrderReconciler::new(&config, &map).reconcile_at(
            &[OrderLine::new("#1", Some("A"))],
            &[OrderLine::new("#2", Some("A"))],
            at,
        );
        assert!(run.rows.iter().all(|r| r.compared_at == at));
    }
}
