use crate::models::{
    ComparisonRow, CrossReferenceRow, LegacyCodeMap, MismatchCandidate, OrderLine,
    ReconciliationSummary, StockRecord,
};
use crate::service::ReconService;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// 请求体: 两侧订单明细 + 可选旧编码对照
#[derive(Debug, Deserialize)]
pub struct ReconcileOrdersRequest {
    pub storefront: Vec<OrderLine>,
    pub erp: Vec<OrderLine>,
    #[serde(default)]
    pub legacy_map: Option<HashMap<String, String>>,
}

/// 请求体: 两侧库存
#[derive(Debug, Deserialize)]
pub struct InspectStockRequest {
    pub erp: Vec<StockRecord>,
    pub storefront: Vec<StockRecord>,
}

/// 订单对账响应
#[derive(Debug, Serialize)]
pub struct ReconcileOrdersResponse {
    pub success: bool,
    pub message: String,
    pub summary: Option<ReconciliationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<ComparisonRow>>,
}

/// 库存核对响应
#[derive(Debug, Serialize)]
pub struct InspectStockResponse {
    pub success: bool,
    pub message: String,
    pub candidates: Option<Vec<MismatchCandidate>>,
    pub rows: Option<Vec<CrossReferenceRow>>,
    pub significant_mismatches: Option<Vec<CrossReferenceRow>>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 订单对账 (调用方提交数据, 不落库)
pub async fn reconcile_orders(
    State(service): State<Arc<ReconService>>,
    Json(req): Json<ReconcileOrdersRequest>,
) -> Response {
    let legacy_map = req.legacy_map.map(LegacyCodeMap::from).unwrap_or_default();
    let run = service.reconcile_orders(&req.storefront, &req.erp, &legacy_map);

    let response = ReconcileOrdersResponse {
        success: true,
        message: format!(
            "Compared {} storefront lines with {} ERP lines: {} rows, {} synced",
            req.storefront.len(),
            req.erp.len(),
            run.summary.total_rows,
            run.summary.synced
        ),
        summary: Some(run.summary),
        rows: Some(run.rows),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 库存核对 (调用方提交数据, 不落库)
pub async fn inspect_stock(
    State(service): State<Arc<ReconService>>,
    Json(req): Json<InspectStockRequest>,
) -> Response {
    let report = service.inspect_stock(&req.erp, &req.storefront);

    let response = InspectStockResponse {
        success: true,
        message: format!(
            "{} mismatch candidates, {} cross-reference rows, {} significant differences",
            report.candidates.len(),
            report.rows.len(),
            report.significant_mismatches.len()
        ),
        candidates: Some(report.candidates),
        rows: Some(report.rows),
        significant_mismatches: Some(report.significant_mismatches),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 基于暂存表的订单对账, 结果写回 order_comparison
pub async fn run_order_reconciliation(State(service): State<Arc<ReconService>>) -> Response {
    match service.run_order_reconciliation().await {
        Ok(summary) => {
            let response = ReconcileOrdersResponse {
                success: true,
                message: format!(
                    "Reconciled {} rows: {} to import into ERP, {} to update",
                    summary.total_rows, summary.to_import, summary.to_update
                ),
                summary: Some(summary),
                rows: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("订单对账失败: {}", e);
            let response = ReconcileOrdersResponse {
                success: false,
                message: format!("Error: {}", e),
                summary: None,
                rows: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}

/// 基于暂存表的库存交叉对照, 结果写回 stock_cross_reference
pub async fn run_stock_cross_reference(State(service): State<Arc<ReconService>>) -> Response {
    match service.run_stock_cross_reference().await {
        Ok(report) => {
            let response = InspectStockResponse {
                success: true,
                message: format!(
                    "Wrote {} cross-reference rows, {} mismatch candidates",
                    report.rows.len(),
                    report.candidates.len()
                ),
                candidates: Some(report.candidates),
                rows: Some(report.rows),
                significant_mismatches: Some(report.significant_mismatches),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("库存交叉对照失败: {}", e);
            let response = InspectStockResponse {
                success: false,
                message: format!("Error: {}", e),
                candidates: None,
                rows: None,
                significant_mismatches: None,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response()
        }
    }
}
