//! Find-or-create resolution of customers and delivery addresses.

use crate::core::{
    AddressField, AddressType, Customer, CustomerField, DeliveryAddress, ExternalCustomer,
    IngestError, PartyDetails, Provenance,
};
use crate::store::{Predicate, RecordStore};

use super::report::{DocumentTrace, IngestEvent};

/// Customer bound to an incoming order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCustomer {
    pub code: String,
    pub provenance: Provenance,
}

/// Resolve the customer of an order: VAT code first, then alternate code,
/// otherwise create one. Existing customers are never modified.
pub fn resolve_customer<S: RecordStore>(
    store: &mut S,
    source: &ExternalCustomer,
    currency: &str,
    company_code: &str,
    trace: &mut DocumentTrace,
) -> Result<ResolvedCustomer, IngestError> {
    let mut found = None;

    if source.vat_code.is_empty() {
        trace.push(IngestEvent::MissingVatCode);
    } else {
        found = store
            .find_one::<Customer>(&Predicate::eq(CustomerField::VatCode, source.vat_code.as_str()))?
            .map(|row| ResolvedCustomer {
                code: row.record.code,
                provenance: Provenance::ByVatCode(source.vat_code.clone()),
            });
    }

    // An empty alternate code would match every customer created without one.
    if found.is_none() && !source.alternate_code.is_empty() {
        found = store
            .find_one::<Customer>(&Predicate::eq(
                CustomerField::AlternateCode,
                source.alternate_code.as_str(),
            ))?
            .map(|row| ResolvedCustomer {
                code: row.record.code,
                provenance: Provenance::ByAlternateCode(source.alternate_code.clone()),
            });
    }

    let resolved = match found {
        Some(resolved) => resolved,
        None => {
            let customer = Customer {
                code: source.alternate_code.clone(),
                alternate_code: source.alternate_code.clone(),
                vat_code: source.vat_code.clone(),
                fiscal_code: source.fiscal_code.clone(),
                pec: source.pec.clone(),
                e_invoice_code: source.e_invoice_code.clone(),
                currency: currency.to_string(),
                company_code: company_code.to_string(),
                details: source.details.clone(),
            };
            tracing::debug!(
                record = %serde_json::to_string(&customer).unwrap_or_default(),
                "inserting customer"
            );
            let row = store.insert(customer)?;
            ResolvedCustomer {
                code: row.record.code,
                provenance: Provenance::Created,
            }
        }
    };

    trace.push(IngestEvent::CustomerResolved {
        code: resolved.code.clone(),
        provenance: resolved.provenance.clone(),
    });
    Ok(resolved)
}

/// Reuse the delivery address with the same recipient name and street, or
/// create one for `customer_code`. The first address seen for a pair wins.
pub fn resolve_address<S: RecordStore>(
    store: &mut S,
    delivery: &PartyDetails,
    customer_code: &str,
    company_code: &str,
    trace: &mut DocumentTrace,
) -> Result<String, IngestError> {
    let existing = store.find_one::<DeliveryAddress>(
        &Predicate::eq(AddressField::Name, delivery.name.as_str())
            .and(Predicate::eq(AddressField::Street, delivery.street.as_str())),
    )?;

    if let Some(row) = existing {
        trace.push(IngestEvent::AddressReused {
            code: row.record.code.clone(),
        });
        return Ok(row.record.code);
    }

    let address = DeliveryAddress {
        code: String::new(),
        customer_code: customer_code.to_string(),
        company_code: company_code.to_string(),
        address_type: AddressType::GoodsDelivery,
        details: delivery.clone(),
    };
    tracing::debug!(
        record = %serde_json::to_string(&address).unwrap_or_default(),
        "inserting delivery address"
    );
    let row = store.insert(address)?;
    trace.push(IngestEvent::AddressCreated {
        code: row.record.code.clone(),
    });
    Ok(row.record.code)
}
