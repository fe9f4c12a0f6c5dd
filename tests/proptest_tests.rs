//! Property-based tests for mapping and reconciliation.
//!
//! Run with: `cargo test --test proptest_tests`

use order_ingest::core::mapping::{compose_name, compose_phone};
use order_ingest::core::*;
use order_ingest::ingest::Ingestor;
use order_ingest::store::{MemoryStore, RecordStore};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .insert(WarehouseDeposit {
            code: "MAIN".into(),
            company_code: "1".into(),
            warehouse: None,
        })
        .unwrap();
    store
        .insert(DocumentType {
            code: "OC".into(),
            ..DocumentType::default()
        })
        .unwrap();
    for code in ["A", "ROUND"] {
        store
            .insert(Product {
                code: code.into(),
                ..Product::default()
            })
            .unwrap();
    }
    store
}

fn config() -> IngestConfig {
    IngestConfig::new("1", "MAIN", "OC")
        .rounding_product("ROUND")
        .payment("PayPal", "PP")
}

// ── Strategies ─────────────────────────────────────────────────────────────

/// Amount in cents, 0.01 to 9999.99.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..50).prop_map(Decimal::from)
}

fn arb_discount() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(Decimal::ZERO), (1i64..=50).prop_map(Decimal::from)]
}

fn arb_word() -> impl Strategy<Value = String> {
    "[A-Za-z]{0,8}"
}

prop_compose! {
    fn arb_row()(
        quantity in arb_quantity(),
        price in arb_price(),
        discount in arb_discount(),
    ) -> FeedRowBuilder {
        FeedRowBuilder::new(quantity, price).code("A").discount(discount)
    }
}

proptest! {
    #[test]
    fn company_name_always_wins(
        name in arb_word(),
        surname in arb_word(),
        company in "[A-Za-z]{1,12}",
    ) {
        prop_assert_eq!(compose_name(&name, &surname, &company), company);
    }

    #[test]
    fn composed_name_is_trimmed(name in arb_word(), surname in arb_word()) {
        let composed = compose_name(&name, &surname, "");
        prop_assert_eq!(composed.trim(), composed.as_str());
        prop_assert!(!composed.contains("  "));
    }

    #[test]
    fn phone_joins_only_present_numbers(phone in "[0-9]{0,6}", mobile in "[0-9]{0,6}") {
        let joined = compose_phone(&phone, &mobile);
        let parts: Vec<&str> = if joined.is_empty() {
            vec![]
        } else {
            joined.split(" - ").collect()
        };
        let expected: Vec<&str> = [phone.as_str(), mobile.as_str()]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();
        prop_assert_eq!(parts, expected);
    }

    #[test]
    fn stored_total_matches_declared_total(
        rows in prop::collection::vec(arb_row(), 1..6),
        declared in arb_price(),
    ) {
        let mut store = store();
        let config = config();
        let mut document = FeedDocumentBuilder::new("BC-1", "2024-01-01")
            .payment("PayPal")
            .total(declared);
        for row in rows {
            document = document.add_row(row);
        }
        let report = Ingestor::new(&mut store, &config).run(&[document.build()]).unwrap();
        prop_assert_eq!(report.created, 1);

        let orders = store.all::<Order>();
        let order = &orders[0].record;
        prop_assert_eq!(order.total, declared);
        prop_assert!(order.lines.iter().filter(|l| l.origin == LineOrigin::Rounding).count() <= 1);
        prop_assert_eq!(
            report.rounding_corrections().count(),
            usize::from(order.rounding_line().is_some())
        );
    }

    #[test]
    fn ingestion_is_idempotent(
        rows in prop::collection::vec(arb_row(), 1..4),
        repeats in 2usize..4,
    ) {
        let mut store = store();
        let config = config();
        let mut document = FeedDocumentBuilder::new("BC-1", "2024-01-01")
            .payment("PayPal")
            .customer(FeedPartyBuilder::new("Anna", "Verdi").code("WEB-1"));
        for row in rows {
            document = document.add_row(row);
        }
        let document = document.build();

        Ingestor::new(&mut store, &config)
            .run(std::slice::from_ref(&document))
            .unwrap();
        let first = store.all::<Order>();
        for _ in 1..repeats {
            let report = Ingestor::new(&mut store, &config)
                .run(std::slice::from_ref(&document))
                .unwrap();
            prop_assert_eq!(report.unchanged, 1);
        }
        prop_assert_eq!(store.all::<Order>(), first);
        prop_assert_eq!(store.all::<Customer>().len(), 1);
        prop_assert_eq!(store.all::<DeliveryAddress>().len(), 1);
    }
}

#[test]
fn zero_difference_adds_no_line() {
    let mut store = store();
    let config = config();
    let document = FeedDocumentBuilder::new("BC-1", "2024-01-01")
        .payment("PayPal")
        .add_row(FeedRowBuilder::new(dec!(3), dec!(3.33)).code("A"))
        .total(dec!(9.99))
        .build();
    Ingestor::new(&mut store, &config).run(&[document]).unwrap();
    assert!(store.all::<Order>()[0].record.rounding_line().is_none());
}
