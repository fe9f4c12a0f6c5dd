//! Product resolution for feed rows.

use crate::core::{
    ExternalOrderLine, IngestError, LineOrigin, OrderLine, Product, ProductField, ProductKind,
    UnitField, UnitOfMeasure,
};
use crate::store::{Predicate, RecordStore, StoreError};

use super::report::{DocumentTrace, IngestEvent, LineMatch};

/// Catalog data attached to an order line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub code: String,
    pub unit: Option<String>,
    pub vat_code: Option<String>,
}

/// Code of the only non-descriptive product matching `field == value`.
fn unique_sellable<S: RecordStore>(
    store: &S,
    field: ProductField,
    value: &str,
) -> Result<Option<String>, StoreError> {
    let mut hits = store.select::<Product>(
        &Predicate::eq(field, value)
            .and(Predicate::ne(ProductField::Kind, ProductKind::Descriptive.code())),
    )?;
    Ok(match hits.len() {
        1 => hits.pop().map(|row| row.record.code),
        _ => None,
    })
}

/// Product code for a feed row: explicit code, else a unique barcode
/// match, else a unique exact description match.
pub fn resolve_product_code<S: RecordStore>(
    store: &S,
    line: &ExternalOrderLine,
) -> Result<Option<(String, LineMatch)>, StoreError> {
    if let Some(code) = &line.code {
        return Ok(Some((code.clone(), LineMatch::Code)));
    }
    if let Some(barcode) = &line.barcode {
        if let Some(code) = unique_sellable(store, ProductField::Barcode, barcode)? {
            return Ok(Some((code, LineMatch::Barcode)));
        }
    }
    if !line.description.is_empty() {
        if let Some(code) = unique_sellable(store, ProductField::Description, &line.description)? {
            return Ok(Some((code, LineMatch::Description)));
        }
    }
    Ok(None)
}

/// Unit of measure and VAT code of a product. The fiscal unit wins over
/// the one preferred for sales.
pub fn product_info<S: RecordStore>(
    store: &S,
    code: &str,
) -> Result<Option<ProductInfo>, StoreError> {
    let Some(product) = store.find_one::<Product>(&Predicate::eq(ProductField::Code, code))? else {
        return Ok(None);
    };
    let product = product.record;

    let mut unit = None;
    if let Some(unit_set) = product.unit_set {
        for row in store.select::<UnitOfMeasure>(&Predicate::eq(UnitField::UnitSet, unit_set))? {
            if row.record.fiscal {
                unit = Some(row.record.abbreviation);
                break;
            }
            if row.record.preferred_for_sales {
                unit = Some(row.record.abbreviation);
            }
        }
    }

    Ok(Some(ProductInfo {
        code: product.code,
        unit,
        vat_code: product.vat_code,
    }))
}

/// Turn feed row number `index` (1-based) into an order line.
///
/// A row that matches no product, or more than one, fails the document.
pub fn resolve_line<S: RecordStore>(
    store: &S,
    index: usize,
    line: &ExternalOrderLine,
    trace: &mut DocumentTrace,
) -> Result<OrderLine, IngestError> {
    let Some((code, via)) = resolve_product_code(store, line)? else {
        return Err(IngestError::Lookup(format!(
            "row {index}: no unique product for barcode \"{}\" / description \"{}\"",
            line.barcode.as_deref().unwrap_or(""),
            line.description
        )));
    };
    let info = product_info(store, &code)?
        .ok_or_else(|| IngestError::Lookup(format!("row {index}: product {code} not found")))?;

    trace.push(IngestEvent::LineResolved {
        line: index,
        product: info.code.clone(),
        via,
    });

    Ok(OrderLine {
        product_code: info.code,
        description: line.description.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        unit_price_incl_vat: line.unit_price_incl_vat,
        discount: line.discount,
        vat_code: line.vat_code.clone().or(info.vat_code),
        unit: info.unit,
        origin: LineOrigin::Feed,
    })
}
