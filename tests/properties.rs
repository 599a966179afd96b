use order_recon_rust::models::{LegacyCodeMap, Measure, OrderLine, SyncStatus};
use order_recon_rust::service::{classify, FieldComparison, LegacyCodeResolver};
use order_recon_rust::{OrderReconciler, ReconConfig};
use proptest::prelude::*;

fn order_lines() -> impl Strategy<Value = Vec<OrderLine>> {
    prop::collection::vec(
        (
            "#?[0-9]{1,2}",
            prop::option::of("[A-Ca-c]-0[13]G"),
            prop::option::of(0i64..4),
            prop::option::of("(1[0-9]\\.[0-9]{2}|n/a)"),
        ),
        0..8,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .map(|(order, sku, qty, price)| {
                OrderLine::new(order, sku.as_deref())
                    .with_quantity(qty.map_or(Measure::Absent, Measure::from))
                    .with_unit_price(Measure::parse(price.as_deref()))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn every_input_line_lands_in_some_row(storefront in order_lines(), erp in order_lines()) {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let run = OrderReconciler::new(&config, &map).reconcile(&storefront, &erp);

        for line in &storefront {
            prop_assert!(run.rows.iter().any(|r| r.storefront.as_ref() == Some(line)));
        }
        for line in &erp {
            prop_assert!(run.rows.iter().any(|r| r.erp.as_ref() == Some(line)));
        }
        prop_assert!(run.rows.iter().all(|r| r.present_on_storefront || r.present_on_erp));
        prop_assert_eq!(run.summary.total_rows, run.rows.len());
    }

    #[test]
    fn one_sided_rows_are_always_missing(storefront in order_lines(), erp in order_lines()) {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let run = OrderReconciler::new(&config, &map).reconcile(&storefront, &erp);

        for row in &run.rows {
            if !row.present_on_storefront {
                prop_assert_eq!(row.sync_status, SyncStatus::MissingOnStorefront);
            } else if !row.present_on_erp {
                prop_assert_eq!(row.sync_status, SyncStatus::MissingOnErp);
            }
        }
    }

    #[test]
    fn absent_values_on_both_sides_match(order in "[0-9]{1,4}", sku in "[A-Z]{2}-01G") {
        let config = ReconConfig::default();
        let map = LegacyCodeMap::new();
        let run = OrderReconciler::new(&config, &map).reconcile(
            &[OrderLine::new(format!("#{order}"), Some(sku.as_str()))],
            &[OrderLine::new(order.clone(), Some(sku.as_str()))],
        );
        prop_assert_eq!(run.rows.len(), 1);
        prop_assert!(run.rows[0].quantity_match);
        prop_assert!(run.rows[0].price_match);
        prop_assert_eq!(run.rows[0].sync_status, SyncStatus::Synced);
    }

    #[test]
    fn classification_priority(
        on_storefront in any::<bool>(),
        on_erp in any::<bool>(),
        quantity_match in any::<bool>(),
        price_match in any::<bool>(),
    ) {
        let fields = FieldComparison { quantity_match, price_match };
        let status = classify(on_storefront, on_erp, &fields);
        let expected = if !on_storefront {
            SyncStatus::MissingOnStorefront
        } else if !on_erp {
            SyncStatus::MissingOnErp
        } else if !quantity_match {
            SyncStatus::QuantityMismatch
        } else if !price_match {
            SyncStatus::PriceMismatch
        } else {
            SyncStatus::Synced
        };
        prop_assert_eq!(status, expected);
    }

    #[test]
    fn resolving_twice_changes_nothing(
        pairs in prop::collection::vec(("[A-Da-d]", "[A-D]"), 0..6),
        code in "[A-Da-d](-0[1-9][Gg]?)?",
    ) {
        // 映射可能成链或成环 (A -> B -> C, A -> B -> A)
        let map: LegacyCodeMap = pairs.into_iter().collect();
        let config = ReconConfig::default();
        let resolver = LegacyCodeResolver::new(&map, &config);

        let once = resolver.resolve(&code).into_owned();
        let twice = resolver.resolve(&once).into_owned();
        prop_assert_eq!(once, twice);
    }
}
