use super::anomaly::AnomalyDetector;
use super::cross_reference::{build_cross_reference, significant_mismatches};
use super::reconciler::{OrderReconciler, ReconciliationRun};
use crate::config::ReconConfig;
use crate::db::queries;
use crate::error::Result;
use crate::models::{
    CrossReferenceRow, LegacyCodeMap, MismatchCandidate, OrderLine, ReconciliationSummary,
    StockRecord,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::path::Path;

/// 库存核对结果: 规格错配候选 + 交叉对照行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    pub candidates: Vec<MismatchCandidate>,
    pub rows: Vec<CrossReferenceRow>,
    /// 从 `rows` 中挑出的差异显著行
    pub significant_mismatches: Vec<CrossReferenceRow>,
}

/// 库存核对 (纯内存)
pub fn inspect_stock(
    config: &ReconConfig,
    erp: &[StockRecord],
    storefront: &[StockRecord],
) -> StockReport {
    let candidates = AnomalyDetector::new(config).detect(erp, storefront);
    let rows = build_cross_reference(erp, storefront, &candidates);
    let significant_mismatches = significant_mismatches(&rows, &config.significant_difference);
    if !significant_mismatches.is_empty() {
        tracing::info!("发现 {} 条显著库存差异", significant_mismatches.len());
    }
    StockReport {
        candidates,
        rows,
        significant_mismatches,
    }
}

/// 对账服务: 读取暂存表 -> 调用引擎 -> 整体替换结果表
pub struct ReconService {
    pool: PgPool,
    config: ReconConfig,
}

impl ReconService {
    pub fn new(pool: PgPool, config: ReconConfig) -> Self {
        Self { pool, config }
    }

    /// 对调用方直接提交的数据做订单对账 (不落库)
    pub fn reconcile_orders(
        &self,
        storefront: &[OrderLine],
        erp: &[OrderLine],
        legacy_map: &LegacyCodeMap,
    ) -> ReconciliationRun {
        OrderReconciler::new(&self.config, legacy_map).reconcile(storefront, erp)
    }

    pub fn inspect_stock(&self, erp: &[StockRecord], storefront: &[StockRecord]) -> StockReport {
        inspect_stock(&self.config, erp, storefront)
    }

    /// 基于暂存表的完整订单对账
    pub async fn run_order_reconciliation(&self) -> Result<ReconciliationSummary> {
        // 1. 读取两侧数据与旧编码对照表 (本次对账内只读)
        let storefront = queries::list_storefront_lines(&self.pool).await?;
        let erp = queries::list_erp_lines(&self.pool).await?;
        let legacy_map = queries::load_legacy_map(&self.pool).await?;
        tracing::info!(
            "已加载: 前台 {} 行, ERP {} 行, 旧编码 {} 条",
            storefront.len(),
            erp.len(),
            legacy_map.len()
        );

        // 2. 对账
        let run = self.reconcile_orders(&storefront, &erp, &legacy_map);

        // 3. 整体替换上一次结果
        queries::replace_comparison(&self.pool, &run.rows).await?;

        if let Some(path) = &self.config.export_csv {
            queries::export_to_csv(&run.rows, Path::new(path))?;
        }

        Ok(run.summary)
    }

    /// 基于暂存表的库存交叉对照
    pub async fn run_stock_cross_reference(&self) -> Result<StockReport> {
        let erp = queries::list_erp_stock(&self.pool).await?;
        let storefront = queries::list_storefront_stock(&self.pool).await?;
        tracing::info!(
            "已加载库存: ERP {} 条, 前台 {} 条",
            erp.len(),
            storefront.len()
        );

        let report = self.inspect_stock(&erp, &storefront);
        queries::replace_cross_reference(&self.pool, &report.rows).await?;

        Ok(report)
    }
}
