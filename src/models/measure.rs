use bigdecimal::BigDecimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 数值字段 (数量/单价) 的原始取值
///
/// 两端系统导出的数据经常是脏的: 空串、"not stocked"、带千分位的文本等。
/// 无法解析的值保留为 `Malformed`, 比较时与缺失值等价 ("不可比较"), 从不报错。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Measure {
    #[default]
    Absent,
    Value(BigDecimal),
    Malformed(String),
}

impl Measure {
    /// 从文本解析 (暂存表中的列都是 TEXT)
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Measure::Absent;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Measure::Absent;
        }
        match BigDecimal::from_str(trimmed) {
            Ok(v) => Measure::Value(v),
            Err(_) => Measure::Malformed(trimmed.to_string()),
        }
    }

    /// 可参与比较的数值; `Absent` 与 `Malformed` 均为 None
    pub fn value(&self) -> Option<&BigDecimal> {
        match self {
            Measure::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Measure::Malformed(_))
    }
}

impl From<BigDecimal> for Measure {
    fn from(v: BigDecimal) -> Self {
        Measure::Value(v)
    }
}

impl From<i64> for Measure {
    fn from(v: i64) -> Self {
        Measure::Value(BigDecimal::from(v))
    }
}

impl From<Option<BigDecimal>> for Measure {
    fn from(v: Option<BigDecimal>) -> Self {
        v.map(Measure::Value).unwrap_or(Measure::Absent)
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measure::Absent => serializer.serialize_none(),
            Measure::Value(v) => serializer.serialize_str(&v.to_string()),
            Measure::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

struct MeasureVisitor;

impl<'de> Visitor<'de> for MeasureVisitor {
    type Value = Measure;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number, a numeric string or null")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Measure, E> {
        Ok(Measure::Value(BigDecimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Measure, E> {
        Ok(Measure::Value(BigDecimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Measure, E> {
        // 走字符串路径, 避免二进制浮点的尾数噪声 (10.1 -> 10.0999...)
        if v.is_finite() {
            Ok(Measure::parse(Some(&v.to_string())))
        } else {
            Ok(Measure::Malformed(v.to_string()))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Measure, E> {
        Ok(Measure::parse(Some(v)))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Measure, E> {
        // ERP 的 XML-RPC 接口用 false 表示空值
        if v {
            Ok(Measure::Malformed(v.to_string()))
        } else {
            Ok(Measure::Absent)
        }
    }

    fn visit_none<E: de::Error>(self) -> Result<Measure, E> {
        Ok(Measure::Absent)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Measure, E> {
        Ok(Measure::Absent)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Measure, D::Error> {
        d.deserialize_any(MeasureVisitor)
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(MeasureVisitor)
    }
}

/// 文本字段: null、false、空白都视为缺失, 数字按文本保留
struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, a number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Option<String>, E> {
        if v.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(v.to_string()))
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Option<String>, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Option<String>, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Option<String>, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Option<String>, E> {
        Ok(v.then(|| v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Option<String>, D::Error> {
        d.deserialize_any(TextVisitor)
    }
}

/// 用于 `#[serde(deserialize_with)]` 的可选文本字段
pub fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    d.deserialize_any(TextVisitor)
}

/// 同上, 缺失时为空串
pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    lenient_opt_string(d).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_padded_numbers() {
        assert_eq!(Measure::parse(Some(" 2 ")), Measure::from(2));
        assert_eq!(
            Measure::parse(Some("10.00")).value(),
            Some(&BigDecimal::from_str("10").unwrap())
        );
    }

    #[test]
    fn blank_is_absent_and_junk_is_malformed() {
        assert_eq!(Measure::parse(None), Measure::Absent);
        assert_eq!(Measure::parse(Some("   ")), Measure::Absent);
        let m = Measure::parse(Some("not stocked"));
        assert!(m.is_malformed());
        assert!(m.value().is_none());
    }

    #[test]
    fn deserializes_leniently_from_json() {
        let values: Vec<Measure> =
            serde_json::from_str(r#"[3, 2.5, "4", "", null, "abc", false]"#).unwrap();
        assert_eq!(values[0], Measure::from(3));
        assert_eq!(values[1].value(), Some(&BigDecimal::from_str("2.5").unwrap()));
        assert_eq!(values[2], Measure::from(4));
        assert_eq!(values[3], Measure::Absent);
        assert_eq!(values[4], Measure::Absent);
        assert!(values[5].is_malformed());
        assert_eq!(values[6], Measure::Absent);
    }

    #[test]
    fn text_fields_accept_erp_nulls() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "lenient_opt_string")]
            a: Option<String>,
            #[serde(deserialize_with = "lenient_opt_string")]
            b: Option<String>,
            #[serde(deserialize_with = "lenient_opt_string")]
            c: Option<String>,
            #[serde(deserialize_with = "lenient_string")]
            d: String,
        }
        let row: Row =
            serde_json::from_str(r#"{"a": false, "b": "  ", "c": 12345, "d": null}"#).unwrap();
        assert_eq!(row.a, None);
        assert_eq!(row.b, None);
        assert_eq!(row.c.as_deref(), Some("12345"));
        assert_eq!(row.d, "");
    }
}
