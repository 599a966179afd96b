use super::measure::{lenient_opt_string, lenient_string};
use super::Measure;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 记录来源 (两套系统之一)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Storefront,
    Erp,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Storefront => "storefront",
            Side::Erp => "erp",
        }
    }
}

/// 订单明细行 (电商前台或ERP任一侧)
///
/// 任何字段都可能缺失或为空值 (ERP 用 `false` 表示空), 反序列化不会因单个字段失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_number: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub item_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub item_name: String,
    #[serde(default)]
    pub quantity: Measure,
    #[serde(default)]
    pub unit_price: Measure,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payment_status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub fulfillment_status: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ordered_at: Option<DateTime<Utc>>,
}

impl OrderLine {
    pub fn new(order_number: impl Into<String>, item_code: Option<&str>) -> Self {
        Self {
            order_number: order_number.into(),
            item_code: item_code.map(str::to_string),
            item_name: String::new(),
            quantity: Measure::Absent,
            unit_price: Measure::Absent,
            payment_status: String::new(),
            fulfillment_status: String::new(),
            ordered_at: None,
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<Measure>) -> Self {
        self.quantity = quantity.into();
        self
    }

    pub fn with_unit_price(mut self, unit_price: impl Into<Measure>) -> Self {
        self.unit_price = unit_price.into();
        self
    }

    /// 不可解析的数值字段个数 (用于统计)
    pub fn malformed_field_count(&self) -> usize {
        [&self.quantity, &self.unit_price]
            .iter()
            .filter(|m| m.is_malformed())
            .count()
    }
}

/// ERP 关联字段 `[id, "显示名"]` 的强类型形式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErpRef {
    pub id: i64,
    pub display_name: String,
}

impl ErpRef {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// 从显示名提取内部编码: "[MAPLE-03G] Acer rubrum" -> "MAPLE-03G"
    pub fn default_code(&self) -> Option<String> {
        extract_default_code(&self.display_name)
    }
}

/// 提取方括号中的产品编码, 没有方括号时返回 None
pub fn extract_default_code(display_name: &str) -> Option<String> {
    let start = display_name.find('[')?;
    let rest = &display_name[start + 1..];
    let end = rest.find(']')?;
    let code = rest[..end].trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_string())
    }
}

/// 宽松解析下单时间; 无法识别的格式视为缺失
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // 前台导出格式: 2024-03-01 10:22:31 -0500
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(ts.with_timezone(&Utc));
    }
    // ERP 格式: 2024-03-01 15:22:31 (UTC)
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(parse_timestamp(lenient_opt_string(d)?.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_code_is_taken_from_brackets() {
        let r = ErpRef::new(42, "[MAPLE-03G] Acer rubrum");
        assert_eq!(r.default_code().as_deref(), Some("MAPLE-03G"));
        assert_eq!(extract_default_code("Acer rubrum"), None);
        assert_eq!(extract_default_code("[ ] empty"), None);
    }

    #[test]
    fn timestamps_from_both_sides() {
        let a = parse_timestamp(Some("2024-03-01 10:22:31 -0500")).unwrap();
        let b = parse_timestamp(Some("2024-03-01 15:22:31")).unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp(Some("yesterday")).is_none());
        assert!(parse_timestamp(None).is_none());
    }

    #[test]
    fn order_line_deserializes_with_missing_fields() {
        let line: OrderLine =
            serde_json::from_str(r##"{"order_number": "#1001", "quantity": "x"}"##).unwrap();
        assert_eq!(line.item_code, None);
        assert_eq!(line.malformed_field_count(), 1);
    }

    #[test]
    fn order_line_tolerates_null_and_false_fields() {
        let line: OrderLine = serde_json::from_str(
            r##"{"order_number": "#1", "item_code": false, "item_name": null,
                 "payment_status": null, "fulfillment_status": false,
                 "ordered_at": "2024-03-01 15:22:31"}"##,
        )
        .unwrap();
        assert_eq!(line.order_number, "#1");
        assert_eq!(line.item_code, None);
        assert_eq!(line.item_name, "");
        assert_eq!(line.payment_status, "");
        assert_eq!(line.fulfillment_status, "");
        assert!(line.ordered_at.is_some());

        let bare: OrderLine = serde_json::from_str(r#"{"ordered_at": false}"#).unwrap();
        assert_eq!(bare.order_number, "");
        assert_eq!(bare.ordered_at, None);
    }
}
