use super::{OrderLine, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 空编码在连接键中的显式占位符
pub const NULL_TOKEN: &str = "<null>";

/// 连接键: 规范化后的 (订单号, 商品编码)
///
/// 两部分都可能为空; 空值之间相等, 这样没有明细的订单也有确定的连接锚点。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub order_number: Option<String>,
    pub item_code: Option<String>,
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.order_number.as_deref().unwrap_or(NULL_TOKEN),
            self.item_code.as_deref().unwrap_or(NULL_TOKEN)
        )
    }
}

/// 同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    MissingOnStorefront,
    MissingOnErp,
    QuantityMismatch,
    PriceMismatch,
    Synced,
}

impl SyncStatus {
    pub const ALL: [SyncStatus; 5] = [
        SyncStatus::MissingOnStorefront,
        SyncStatus::MissingOnErp,
        SyncStatus::QuantityMismatch,
        SyncStatus::PriceMismatch,
        SyncStatus::Synced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::MissingOnStorefront => "Missing on storefront",
            SyncStatus::MissingOnErp => "Missing on ERP",
            SyncStatus::QuantityMismatch => "Quantity mismatch",
            SyncStatus::PriceMismatch => "Price mismatch",
            SyncStatus::Synced => "Synced",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对比结果行; 分类完成后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub key: CanonicalKey,
    pub storefront: Option<OrderLine>,
    pub erp: Option<OrderLine>,
    pub present_on_storefront: bool,
    pub present_on_erp: bool,
    pub quantity_match: bool,
    pub price_match: bool,
    pub sync_status: SyncStatus,
    pub compared_at: DateTime<Utc>,
}

/// 一侧出现多条同键记录 (按外连接笛卡尔展开, 这里只做观测)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousKey {
    pub key: CanonicalKey,
    pub side: Side,
    pub count: usize,
}

/// 对账统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_rows: usize,
    pub synced: usize,
    pub missing_on_storefront: usize,
    pub missing_on_erp: usize,
    pub quantity_mismatch: usize,
    pub price_mismatch: usize,
    /// 需要导入ERP的行 (ERP缺失)
    pub to_import: usize,
    /// 需要在ERP更新的行 (数量或价格不一致)
    pub to_update: usize,
    pub ambiguous_keys: usize,
    pub malformed_fields: usize,
}

impl ReconciliationSummary {
    pub fn record(&mut self, status: SyncStatus) {
        self.total_rows += 1;
        match status {
            SyncStatus::MissingOnStorefront => self.missing_on_storefront += 1,
            SyncStatus::MissingOnErp => {
                self.missing_on_erp += 1;
                self.to_import += 1;
            }
            SyncStatus::QuantityMismatch => {
                self.quantity_mismatch += 1;
                self.to_update += 1;
            }
            SyncStatus::PriceMismatch => {
                self.price_mismatch += 1;
                self.to_update += 1;
            }
            SyncStatus::Synced => self.synced += 1,
        }
    }

    pub fn count(&self, status: SyncStatus) -> usize {
        match status {
            SyncStatus::MissingOnStorefront => self.missing_on_storefront,
            SyncStatus::MissingOnErp => self.missing_on_erp,
            SyncStatus::QuantityMismatch => self.quantity_mismatch,
            SyncStatus::PriceMismatch => self.price_mismatch,
            SyncStatus::Synced => self.synced,
        }
    }
}
