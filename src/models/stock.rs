use super::measure::{lenient_opt_string, lenient_string};
use super::Measure;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 规格编码分隔符: 植物编码-规格, 例如 MAPLE-03G
pub const SIZE_DELIMITER: char = '-';

/// 库存记录 (某一侧, 某一库位/渠道)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_code: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub location_or_channel: Option<String>,
    #[serde(default)]
    pub quantity_on_hand: Measure,
    #[serde(default)]
    pub quantity_available: Measure,
    #[serde(default)]
    pub quantity_committed: Measure,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub title: Option<String>,
    /// 前台商品状态 (active/draft/archived), ERP 侧为空
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub listing_status: Option<String>,
}

impl StockRecord {
    pub fn new(item_code: impl Into<String>, on_hand: impl Into<Measure>) -> Self {
        Self {
            item_code: item_code.into(),
            location_or_channel: None,
            quantity_on_hand: on_hand.into(),
            quantity_available: Measure::Absent,
            quantity_committed: Measure::Absent,
            title: None,
            listing_status: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location_or_channel = Some(location.into());
        self
    }

    pub fn with_available(mut self, available: impl Into<Measure>) -> Self {
        self.quantity_available = available.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.listing_status = Some(status.into());
        self
    }

    /// 同一植物不同规格共享的前缀 (最后一个分隔符之前)
    pub fn plant_prefix(&self) -> &str {
        split_item_code(&self.item_code).0
    }

    /// 规格后缀 (最后一个分隔符之后)
    pub fn size_suffix(&self) -> &str {
        split_item_code(&self.item_code).1
    }

    pub fn quantity(&self, basis: QuantityBasis) -> &Measure {
        match basis {
            QuantityBasis::OnHand => &self.quantity_on_hand,
            QuantityBasis::Available => &self.quantity_available,
        }
    }
}

/// 按最后一个分隔符拆分编码; 没有分隔符时前缀与后缀都为空
pub fn split_item_code(code: &str) -> (&str, &str) {
    let code = code.trim();
    match code.rfind(SIZE_DELIMITER) {
        Some(idx) => (&code[..idx], &code[idx + 1..]),
        None => ("", ""),
    }
}

/// 异常检测使用的数量口径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityBasis {
    #[default]
    OnHand,
    Available,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// 两个规格的库存在两侧互换, 判定为记错规格
    VariantSwap,
    /// 仅凭数量接近推测, 需要人工复核
    PossibleSizeMismatch,
}

/// 规格错配候选 (只读标注, 不做自动修正)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchCandidate {
    pub kind: MismatchKind,
    pub plant_prefix: String,
    pub erp_item_code: String,
    pub erp_size: String,
    pub erp_quantity: Option<BigDecimal>,
    pub storefront_item_code: String,
    pub storefront_size: String,
    pub storefront_quantity: Option<BigDecimal>,
    pub note: String,
}

impl MismatchCandidate {
    pub fn is_advisory(&self) -> bool {
        self.kind == MismatchKind::PossibleSizeMismatch
    }
}

/// 库存交叉对照行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceRow {
    pub item_code: String,
    pub location: Option<String>,
    pub location_count: usize,
    pub erp_on_hand: BigDecimal,
    pub erp_available: BigDecimal,
    pub storefront_on_hand: Option<BigDecimal>,
    pub storefront_available: Option<BigDecimal>,
    pub storefront_committed: Option<BigDecimal>,
    pub diff_on_hand: Option<BigDecimal>,
    pub diff_available: Option<BigDecimal>,
    pub title: Option<String>,
    pub listing_status: Option<String>,
    pub potential_correct_code: Option<String>,
    pub potential_correct_size: Option<String>,
    pub size_mismatch_note: Option<String>,
}
