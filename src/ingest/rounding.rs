use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::{IngestError, LineOrigin, Order, OrderLine};
use crate::store::{RecordId, RecordStore};

use super::lines::ProductInfo;
use super::report::{DocumentTrace, IngestEvent};

/// Synthetic line carrying `amount` on the rounding product.
pub fn rounding_line(product: &ProductInfo, amount: Decimal) -> OrderLine {
    OrderLine {
        product_code: product.code.clone(),
        description: "Rounding".into(),
        quantity: dec!(1),
        unit_price: amount,
        unit_price_incl_vat: amount,
        discount: Decimal::ZERO,
        vat_code: product.vat_code.clone(),
        unit: product.unit.clone(),
        origin: LineOrigin::Rounding,
    }
}

/// Align a freshly created order with the total declared upstream.
///
/// Re-reads the order so the store-computed total is current, and when it
/// differs appends a single rounding line. Returns the correction applied.
pub fn reconcile_total<S: RecordStore>(
    store: &mut S,
    order_id: RecordId,
    declared_total: Decimal,
    rounding_product: Option<&ProductInfo>,
    trace: &mut DocumentTrace,
) -> Result<Option<Decimal>, IngestError> {
    let mut order: Order = store.get(order_id)?;
    let diff = declared_total.checked_sub(order.total).ok_or_else(|| {
        IngestError::Conversion(format!(
            "declared total {declared_total} out of range against stored {}",
            order.total
        ))
    })?;
    if diff.is_zero() || order.rounding_line().is_some() {
        return Ok(None);
    }

    let Some(product) = rounding_product else {
        trace.push(IngestEvent::RoundingUnavailable {
            number: order.number.clone(),
            amount: diff,
        });
        return Ok(None);
    };

    order.lines.push(rounding_line(product, diff));
    let number = order.number.clone();
    store.update(order_id, order)?;
    trace.push(IngestEvent::RoundingApplied {
        number,
        amount: diff,
    });
    Ok(Some(diff))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn rounding_product() -> ProductInfo {
        ProductInfo {
            code: "ROUND".into(),
            unit: Some("pz".into()),
            vat_code: Some("ES".into()),
        }
    }

    fn stored_order(store: &mut MemoryStore, price: Decimal) -> RecordId {
        store
            .insert(Order {
                lines: vec![OrderLine {
                    product_code: "A".into(),
                    quantity: dec!(1),
                    unit_price_incl_vat: price,
                    ..OrderLine::default()
                }],
                ..Order::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn adds_single_correction_line() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(99.98));
        let mut trace = DocumentTrace::new("test");

        let applied =
            reconcile_total(&mut store, id, dec!(100.00), Some(&rounding_product()), &mut trace)
                .unwrap();
        assert_eq!(applied, Some(dec!(0.02)));

        let order: Order = store.get(id).unwrap();
        assert_eq!(order.total, dec!(100.00));
        let line = order.rounding_line().unwrap();
        assert_eq!(line.unit_price, dec!(0.02));
        assert_eq!(line.unit_price_incl_vat, dec!(0.02));
        assert_eq!(line.vat_code.as_deref(), Some("ES"));
        assert_eq!(line.unit.as_deref(), Some("pz"));

        // A second pass finds the totals aligned and the line already present.
        let again =
            reconcile_total(&mut store, id, dec!(100.00), Some(&rounding_product()), &mut trace)
                .unwrap();
        assert_eq!(again, None);
        assert_eq!(store.get::<Order>(id).unwrap().lines.len(), 2);
    }

    #[test]
    fn negative_difference() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(50.03));
        let mut trace = DocumentTrace::new("test");
        let applied =
            reconcile_total(&mut store, id, dec!(50), Some(&rounding_product()), &mut trace)
                .unwrap();
        assert_eq!(applied, Some(dec!(-0.03)));
        assert_eq!(store.get::<Order>(id).unwrap().total, dec!(50));
    }

    #[test]
    fn correction_keeps_sub_cent_precision() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(100.00));
        let mut trace = DocumentTrace::new("test");
        let applied =
            reconcile_total(&mut store, id, dec!(100.005), Some(&rounding_product()), &mut trace)
                .unwrap();
        assert_eq!(applied, Some(dec!(0.005)));
        assert_eq!(store.get::<Order>(id).unwrap().total, dec!(100.005));
    }

    #[test]
    fn unrepresentable_difference_is_a_conversion_error() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(-10));
        let mut trace = DocumentTrace::new("test");
        let err = reconcile_total(
            &mut store,
            id,
            Decimal::MAX,
            Some(&rounding_product()),
            &mut trace,
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Conversion(_)));
        assert_eq!(store.get::<Order>(id).unwrap().lines.len(), 1);
    }

    #[test]
    fn matching_totals_need_no_line() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(10));
        let mut trace = DocumentTrace::new("test");
        let applied =
            reconcile_total(&mut store, id, dec!(10.00), Some(&rounding_product()), &mut trace)
                .unwrap();
        assert_eq!(applied, None);
        assert!(trace.events().is_empty());
    }

    #[test]
    fn without_rounding_product_the_difference_is_reported() {
        let mut store = MemoryStore::new();
        let id = stored_order(&mut store, dec!(10));
        let mut trace = DocumentTrace::new("test");
        let applied = reconcile_total(&mut store, id, dec!(10.01), None, &mut trace).unwrap();
        assert_eq!(applied, None);
        assert!(matches!(
            trace.events(),
            [IngestEvent::RoundingUnavailable { .. }]
        ));
        assert_eq!(store.get::<Order>(id).unwrap().lines.len(), 1);
    }
}
