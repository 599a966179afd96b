use super::matcher::JoinedPair;
use crate::models::Measure;
use bigdecimal::BigDecimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldComparison {
    pub quantity_match: bool,
    pub price_match: bool,
}

/// 比较一对记录的数量与单价
///
/// 两侧都为空视为一致 (没有可比较的数据); 只有一侧为空视为不一致。
/// 缺失的一侧按空值处理。
pub fn compare(pair: &JoinedPair, price_tolerance: &BigDecimal) -> FieldComparison {
    let absent = Measure::Absent;
    let (sf_qty, sf_price) = pair
        .storefront
        .as_ref()
        .map(|l| (&l.quantity, &l.unit_price))
        .unwrap_or((&absent, &absent));
    let (erp_qty, erp_price) = pair
        .erp
        .as_ref()
        .map(|l| (&l.quantity, &l.unit_price))
        .unwrap_or((&absent, &absent));

    FieldComparison {
        quantity_match: quantity_matches(sf_qty, erp_qty),
        price_match: price_matches(sf_price, erp_price, price_tolerance),
    }
}

pub fn quantity_matches(a: &Measure, b: &Measure) -> bool {
    match (a.value(), b.value()) {
        (Some(a), Some(b)) => a == b,
        (None, None) => true,
        _ => false,
    }
}

pub fn price_matches(a: &Measure, b: &Measure, tolerance: &BigDecimal) -> bool {
    match (a.value(), b.value()) {
        (Some(a), Some(b)) => (a - b).abs() < *tolerance,
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn m(s: &str) -> Measure {
        Measure::parse(Some(s))
    }

    fn tol() -> BigDecimal {
        BigDecimal::from_str("0.01").unwrap()
    }

    #[test]
    fn quantity_is_scale_insensitive() {
        assert!(quantity_matches(&m("2"), &m("2.000")));
        assert!(!quantity_matches(&m("3"), &m("5")));
    }

    #[test]
    fn null_rules() {
        assert!(quantity_matches(&Measure::Absent, &Measure::Absent));
        assert!(quantity_matches(&m("n/a"), &Measure::Absent));
        assert!(!quantity_matches(&m("4"), &Measure::Absent));
        assert!(!price_matches(&Measure::Absent, &m("0"), &tol()));
        assert!(price_matches(&Measure::Absent, &Measure::Absent, &tol()));
    }

    #[test]
    fn price_tolerance_is_strict() {
        assert!(price_matches(&m("10.00"), &m("10.005"), &tol()));
        assert!(!price_matches(&m("10.00"), &m("10.01"), &tol()));
        assert!(!price_matches(&m("10.00"), &m("9.98"), &tol()));
    }
}
