use super::comparator::FieldComparison;
use crate::models::SyncStatus;

/// 按优先级给出同步状态, 第一个命中的规则生效: 缺失优先于数值不一致
pub fn classify(
    present_on_storefront: bool,
    present_on_erp: bool,
    fields: &FieldComparison,
) -> SyncStatus {
    if !present_on_storefront {
        SyncStatus::MissingOnStorefront
    } else if !present_on_erp {
        SyncStatus::MissingOnErp
    } else if !fields.quantity_match {
        SyncStatus::QuantityMismatch
    } else if !fields.price_match {
        SyncStatus::PriceMismatch
    } else {
        SyncStatus::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(quantity_match: bool, price_match: bool) -> FieldComparison {
        FieldComparison {
            quantity_match,
            price_match,
        }
    }

    #[test]
    fn absence_outranks_value_mismatch() {
        assert_eq!(
            classify(true, false, &fields(false, false)),
            SyncStatus::MissingOnErp
        );
        assert_eq!(
            classify(false, true, &fields(false, true)),
            SyncStatus::MissingOnStorefront
        );
    }

    #[test]
    fn quantity_outranks_price() {
        assert_eq!(
            classify(true, true, &fields(false, false)),
            SyncStatus::QuantityMismatch
        );
        assert_eq!(
            classify(true, true, &fields(true, false)),
            SyncStatus::PriceMismatch
        );
        assert_eq!(classify(true, true, &fields(true, true)), SyncStatus::Synced);
    }
}
