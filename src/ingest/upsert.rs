//! Idempotent create-or-update of orders keyed by the external reference.

use crate::core::{ExternalOrderDocument, IngestError, Order, OrderField, OrderLine};
use crate::store::{Predicate, RecordId, RecordStore, Row};

use super::batch::ReferenceData;
use super::customer::ResolvedCustomer;
use super::report::{DocumentTrace, IngestEvent};

/// What a re-delivery did to the stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    StatusChanged { number: String },
    Unchanged { number: String },
}

pub fn find_order<S: RecordStore>(
    store: &S,
    external_reference: &str,
) -> Result<Option<Row<Order>>, IngestError> {
    Ok(store.find_one::<Order>(&Predicate::eq(
        OrderField::ExternalReference,
        external_reference,
    ))?)
}

/// Handle a re-delivery: only the external status may change.
pub fn refresh_status<S: RecordStore>(
    store: &mut S,
    existing: Row<Order>,
    status: &str,
    trace: &mut DocumentTrace,
) -> Result<UpsertOutcome, IngestError> {
    let Row { id, record: mut order } = existing;
    trace.push(IngestEvent::AlreadyImported {
        number: order.number.clone(),
    });
    if order.external_status == status {
        return Ok(UpsertOutcome::Unchanged {
            number: order.number,
        });
    }

    let from = std::mem::replace(&mut order.external_status, status.to_string());
    let number = order.number.clone();
    store.update(id, order)?;
    trace.push(IngestEvent::StatusChanged {
        number: number.clone(),
        from,
        to: status.to_string(),
    });
    Ok(UpsertOutcome::StatusChanged { number })
}

/// Assemble a new order aggregate from a mapped document and its
/// resolved customer, address and lines.
pub fn build_order(
    document: &ExternalOrderDocument,
    customer: &ResolvedCustomer,
    address_code: &str,
    lines: Vec<OrderLine>,
    refs: &ReferenceData,
) -> Order {
    Order {
        number: String::new(),
        company_code: refs.company_code.clone(),
        external_reference: document.external_reference.clone(),
        channel_reference: document.channel_reference.clone(),
        order_date: Some(document.order_date),
        external_status: document.status.clone(),
        customer_code: customer.code.clone(),
        address_code: address_code.to_string(),
        billing: document.customer.details.clone(),
        delivery: document.delivery.clone(),
        vat_code: document.customer.vat_code.clone(),
        fiscal_code: document.customer.fiscal_code.clone(),
        e_invoice_code: document.customer.e_invoice_code.clone(),
        payment_code: document.payment_code.clone(),
        currency: document.currency.clone(),
        note: document.internal_comment.clone(),
        seller_note: document.seller_note.clone(),
        shipping_cost: document.shipping_cost,
        shipping_vat_rate: refs.shipping_vat_rate,
        document_type: refs.document_type.clone(),
        movement_cause: refs.movement_cause,
        deposit: Some(refs.deposit),
        lines,
        total: Default::default(),
    }
}

/// Insert a new order; lines are attached here and nowhere else.
/// Returns the row id and the store-assigned number.
pub fn create_order<S: RecordStore>(
    store: &mut S,
    order: Order,
    customer: &ResolvedCustomer,
    trace: &mut DocumentTrace,
) -> Result<(RecordId, String), IngestError> {
    tracing::debug!(record = %serde_json::to_string(&order).unwrap_or_default(), "inserting order");
    let row = store.insert(order)?;
    trace.push(IngestEvent::OrderCreated {
        number: row.record.number.clone(),
        customer: customer.code.clone(),
        provenance: customer.provenance.clone(),
    });
    Ok((row.id, row.record.number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Table};

    fn stored(store: &mut MemoryStore, status: &str) -> Row<Order> {
        store
            .insert(Order {
                external_reference: "BC-1".into(),
                external_status: status.into(),
                lines: vec![OrderLine::default()],
                ..Order::default()
            })
            .unwrap()
    }

    #[test]
    fn status_change_touches_only_the_status() {
        let mut store = MemoryStore::new();
        let row = stored(&mut store, "Pending");
        let before = row.record.clone();
        let mut trace = DocumentTrace::new("BC-1");

        let outcome = refresh_status(&mut store, row.clone(), "Shipped", &mut trace).unwrap();
        assert_eq!(
            outcome,
            UpsertOutcome::StatusChanged {
                number: before.number.clone()
            }
        );

        let after: Order = store.get(row.id).unwrap();
        assert_eq!(after.external_status, "Shipped");
        assert_eq!(
            Order {
                external_status: "Pending".into(),
                ..after
            },
            before
        );
        assert!(matches!(
            trace.events().last(),
            Some(IngestEvent::StatusChanged { from, to, .. })
                if from == "Pending" && to == "Shipped"
        ));
    }

    #[test]
    fn same_status_writes_nothing() {
        let mut store = MemoryStore::new();
        let row = stored(&mut store, "Pending");
        store.reject_writes(Order::NAME);
        let mut trace = DocumentTrace::new("BC-1");
        let outcome = refresh_status(&mut store, row, "Pending", &mut trace).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Unchanged { .. }));
    }

    #[test]
    fn find_by_external_reference() {
        let mut store = MemoryStore::new();
        stored(&mut store, "Pending");
        assert!(find_order(&store, "BC-1").unwrap().is_some());
        assert!(find_order(&store, "BC-2").unwrap().is_none());
    }
}
