//! Declarative field mapping from feed documents to typed values.
//!
//! Each [`FieldRule`] names a target attribute, the conversion to apply and
//! the source paths whose (trimmed, possibly empty) text feeds it. A rule
//! set is applied with [`map_fields`]; [`map_document`] runs the built-in
//! rule sets and assembles an [`ExternalOrderDocument`].

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::config::IngestConfig;
use super::countries::resolve_country;
use super::error::IngestError;
use super::node::FeedNode;
use super::types::*;

/// Conversion applied to the raw source strings of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Text as-is.
    Text,
    /// Decimal number; empty means absent.
    Amount,
    /// `YYYY-MM-DD`, optionally followed by a time part.
    Date,
    /// Sources: name, surname, company. Company wins when present.
    Name,
    /// Sources: phone, mobile. Non-empty ones joined with `" - "`.
    Phone,
    /// ISO country code; empty defaults to `IT`.
    Country,
    /// Payment-method name looked up in the configured table.
    Payment,
    /// VAT percentage looked up in the configured table; empty means absent.
    VatRate,
}

/// Converted value of one target attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum MappedValue {
    Empty,
    Text(String),
    Amount(Decimal),
    Date(NaiveDate),
    /// VAT percentage with its configured code.
    Vat(Decimal, String),
}

impl Conversion {
    pub fn apply(self, raw: &[&str], config: &IngestConfig) -> Result<MappedValue, IngestError> {
        let arg = |i: usize| raw.get(i).copied().unwrap_or("");
        match self {
            Self::Text => Ok(MappedValue::Text(arg(0).to_string())),
            Self::Amount => {
                parse_amount(arg(0)).map(|v| v.map_or(MappedValue::Empty, MappedValue::Amount))
            }
            Self::Date => parse_date(arg(0)).map(MappedValue::Date),
            Self::Name => Ok(MappedValue::Text(compose_name(arg(0), arg(1), arg(2)))),
            Self::Phone => Ok(MappedValue::Text(compose_phone(arg(0), arg(1)))),
            Self::Country => resolve_country(arg(0)).map(|c| MappedValue::Text(c.to_string())),
            Self::Payment => config
                .payment_code(arg(0))
                .map(|code| MappedValue::Text(code.to_string()))
                .ok_or_else(|| {
                    IngestError::Lookup(format!(
                        "payment method \"{}\" not configured",
                        arg(0).to_lowercase()
                    ))
                }),
            Self::VatRate => {
                let Some(rate) = parse_amount(arg(0))? else {
                    return Ok(MappedValue::Empty);
                };
                config
                    .vat_code(rate)
                    .map(|code| MappedValue::Vat(rate, code.to_string()))
                    .ok_or_else(|| IngestError::Lookup(format!("VAT rate {rate}% not configured")))
            }
        }
    }
}

/// One mapping rule: `target ← conversion(sources…)`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub target: &'static str,
    pub conversion: Conversion,
    pub sources: &'static [&'static str],
}

impl FieldRule {
    pub const fn new(
        target: &'static str,
        conversion: Conversion,
        sources: &'static [&'static str],
    ) -> Self {
        Self {
            target,
            conversion,
            sources,
        }
    }
}

/// Flat record produced by [`map_fields`], keyed by target attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    values: BTreeMap<&'static str, MappedValue>,
}

impl MappedRecord {
    pub fn get(&self, target: &str) -> Option<&MappedValue> {
        self.values.get(target)
    }

    /// Text value, empty when absent or not textual.
    pub fn text(&self, target: &str) -> String {
        match self.get(target) {
            Some(MappedValue::Text(s)) => s.clone(),
            _ => String::new(),
        }
    }

    pub fn optional_text(&self, target: &str) -> Option<String> {
        Some(self.text(target)).filter(|s| !s.is_empty())
    }

    pub fn amount(&self, target: &str) -> Option<Decimal> {
        match self.get(target) {
            Some(MappedValue::Amount(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn date(&self, target: &str) -> Option<NaiveDate> {
        match self.get(target) {
            Some(MappedValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn vat(&self, target: &str) -> Option<(Decimal, String)> {
        match self.get(target) {
            Some(MappedValue::Vat(rate, code)) => Some((*rate, code.clone())),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Apply `rules` to `node`. The first failing conversion fails the record.
pub fn map_fields(
    node: &FeedNode,
    rules: &[FieldRule],
    config: &IngestConfig,
) -> Result<MappedRecord, IngestError> {
    let mut record = MappedRecord::default();
    for rule in rules {
        let raw: Vec<&str> = rule.sources.iter().map(|p| node.text_at(p)).collect();
        let value = rule.conversion.apply(&raw, config).map_err(|e| match e {
            IngestError::Conversion(msg) => {
                IngestError::Conversion(format!("{}: {msg}", rule.target))
            }
            other => other,
        })?;
        record.values.insert(rule.target, value);
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn parse_amount(raw: &str) -> Result<Option<Decimal>, IngestError> {
    if raw.is_empty() {
        return Ok(None);
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(Some)
        .map_err(|e| IngestError::Conversion(format!("invalid number \"{raw}\": {e}")))
}

/// Parse the `YYYY-MM-DD` prefix of an ISO-like timestamp.
pub fn parse_date(raw: &str) -> Result<NaiveDate, IngestError> {
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .map_err(|e| IngestError::Conversion(format!("invalid date \"{raw}\": {e}")))
}

/// Company name when present, otherwise "surname name".
pub fn compose_name(name: &str, surname: &str, company: &str) -> String {
    if !company.is_empty() {
        company.to_string()
    } else {
        format!("{surname} {name}").trim().to_string()
    }
}

pub fn compose_phone(phone: &str, mobile: &str) -> String {
    [phone, mobile]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" - ")
}

// ---------------------------------------------------------------------------
// Built-in rule sets
// ---------------------------------------------------------------------------

pub const HEADER_RULES: &[FieldRule] = &[
    FieldRule::new(
        "order.external_reference",
        Conversion::Text,
        &["General/bindCommerceNumber"],
    ),
    FieldRule::new(
        "order.channel_reference",
        Conversion::Text,
        &["General/Number"],
    ),
    FieldRule::new("order.date", Conversion::Date, &["General/Date"]),
    FieldRule::new("order.status", Conversion::Text, &["General/StateName"]),
    FieldRule::new(
        "order.payment",
        Conversion::Payment,
        &["Payments/PaymentName"],
    ),
    FieldRule::new("order.currency", Conversion::Text, &["Amounts/Currency"]),
    FieldRule::new(
        "order.internal_comment",
        Conversion::Text,
        &["Amounts/InternalComment"],
    ),
    FieldRule::new(
        "order.seller_note",
        Conversion::Text,
        &["Amounts/SellerNote"],
    ),
    FieldRule::new(
        "order.shipping_cost",
        Conversion::Amount,
        &["Amounts/ShippingCostWithoutTax"],
    ),
    FieldRule::new("order.total", Conversion::Amount, &["Amounts/Total"]),
];

pub const CUSTOMER_RULES: &[FieldRule] = &[
    FieldRule::new(
        "customer.alternate_code",
        Conversion::Text,
        &["Customer/Code"],
    ),
    FieldRule::new(
        "customer.name",
        Conversion::Name,
        &["Customer/Name", "Customer/Surname", "Customer/Company"],
    ),
    FieldRule::new("customer.street", Conversion::Text, &["Customer/Address"]),
    FieldRule::new(
        "customer.postcode",
        Conversion::Text,
        &["Customer/Postcode"],
    ),
    FieldRule::new("customer.city", Conversion::Text, &["Customer/City"]),
    FieldRule::new(
        "customer.province",
        Conversion::Text,
        &["Customer/Province"],
    ),
    FieldRule::new(
        "customer.country",
        Conversion::Country,
        &["Customer/CountryCode"],
    ),
    FieldRule::new("customer.vat_code", Conversion::Text, &["Customer/VatCode"]),
    FieldRule::new(
        "customer.fiscal_code",
        Conversion::Text,
        &["Customer/FiscalCode"],
    ),
    FieldRule::new(
        "customer.phone",
        Conversion::Phone,
        &["Customer/Phone", "Customer/MobPhone"],
    ),
    FieldRule::new("customer.email", Conversion::Text, &["Customer/Email"]),
    FieldRule::new("customer.pec", Conversion::Text, &["Customer/Pec"]),
    FieldRule::new(
        "customer.e_invoice_code",
        Conversion::Text,
        &["Customer/EInvoiceDestCode"],
    ),
];

pub const DELIVERY_RULES: &[FieldRule] = &[
    FieldRule::new(
        "delivery.name",
        Conversion::Name,
        &["Delivery/Name", "Delivery/Surname", "Delivery/Company"],
    ),
    FieldRule::new("delivery.street", Conversion::Text, &["Delivery/Address"]),
    FieldRule::new(
        "delivery.postcode",
        Conversion::Text,
        &["Delivery/Postcode"],
    ),
    FieldRule::new("delivery.city", Conversion::Text, &["Delivery/City"]),
    FieldRule::new(
        "delivery.province",
        Conversion::Text,
        &["Delivery/Province"],
    ),
    FieldRule::new(
        "delivery.country",
        Conversion::Country,
        &["Delivery/CountryCode"],
    ),
    FieldRule::new(
        "delivery.phone",
        Conversion::Phone,
        &["Delivery/Phone", "Delivery/MobPhone"],
    ),
    FieldRule::new("delivery.email", Conversion::Text, &["Delivery/Email"]),
];

/// Applied to each `Rows/Row` element.
pub const LINE_RULES: &[FieldRule] = &[
    FieldRule::new("line.code", Conversion::Text, &["Code"]),
    FieldRule::new("line.barcode", Conversion::Text, &["Barcode"]),
    FieldRule::new("line.description", Conversion::Text, &["Description"]),
    FieldRule::new("line.quantity", Conversion::Amount, &["Qty"]),
    FieldRule::new("line.unit_price", Conversion::Amount, &["PriceVatExcluded"]),
    FieldRule::new("line.unit_price_incl_vat", Conversion::Amount, &["Price"]),
    FieldRule::new("line.discount", Conversion::Amount, &["Discounts"]),
    FieldRule::new("line.vat", Conversion::VatRate, &["VatRate"]),
];

fn party(record: &MappedRecord, prefix: &str) -> PartyDetails {
    let field = |name: &str| record.text(&format!("{prefix}.{name}"));
    PartyDetails {
        name: field("name"),
        street: field("street"),
        postcode: field("postcode"),
        city: field("city"),
        province: field("province"),
        country: field("country"),
        phone: field("phone"),
        email: field("email"),
    }
}

/// Map one feed row into an [`ExternalOrderLine`].
pub fn map_line(row: &FeedNode, config: &IngestConfig) -> Result<ExternalOrderLine, IngestError> {
    let record = map_fields(row, LINE_RULES, config)?;
    let vat = record.vat("line.vat");
    Ok(ExternalOrderLine {
        code: record.optional_text("line.code"),
        barcode: record.optional_text("line.barcode"),
        description: record.text("line.description"),
        quantity: record.amount("line.quantity").unwrap_or_default(),
        unit_price: record.amount("line.unit_price").unwrap_or_default(),
        unit_price_incl_vat: record.amount("line.unit_price_incl_vat").unwrap_or_default(),
        discount: record.amount("line.discount").unwrap_or_default(),
        vat_rate: vat.as_ref().map(|(rate, _)| *rate),
        vat_code: vat.map(|(_, code)| code),
    })
}

/// Map a whole feed document. Any failing field or row fails the document.
pub fn map_document(
    node: &FeedNode,
    config: &IngestConfig,
) -> Result<ExternalOrderDocument, IngestError> {
    let header = map_fields(node, HEADER_RULES, config)?;
    let customer = map_fields(node, CUSTOMER_RULES, config)?;
    let delivery = map_fields(node, DELIVERY_RULES, config)?;

    let external_reference = header.text("order.external_reference");
    if external_reference.is_empty() {
        return Err(IngestError::Conversion(
            "order.external_reference: document has no order reference".into(),
        ));
    }
    let order_date = header
        .date("order.date")
        .ok_or_else(|| IngestError::Conversion("order.date: missing".into()))?;

    let lines = node
        .find_all("Rows/Row")
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            map_line(row, config).map_err(|e| match e {
                IngestError::Conversion(msg) => {
                    IngestError::Conversion(format!("row {}: {msg}", index + 1))
                }
                IngestError::Lookup(msg) => {
                    IngestError::Lookup(format!("row {}: {msg}", index + 1))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExternalOrderDocument {
        external_reference,
        channel_reference: header.text("order.channel_reference"),
        order_date,
        status: header.text("order.status"),
        customer: ExternalCustomer {
            alternate_code: customer.text("customer.alternate_code"),
            vat_code: customer.text("customer.vat_code"),
            fiscal_code: customer.text("customer.fiscal_code"),
            pec: customer.text("customer.pec"),
            e_invoice_code: customer.text("customer.e_invoice_code"),
            details: party(&customer, "customer"),
        },
        delivery: party(&delivery, "delivery"),
        payment_code: header.text("order.payment"),
        currency: header.text("order.currency"),
        internal_comment: header.text("order.internal_comment"),
        seller_note: header.text("order.seller_note"),
        shipping_cost: header.amount("order.shipping_cost").unwrap_or_default(),
        declared_total: header.amount("order.total"),
        lines,
    })
}
