use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::{FieldValue, RecordId, StoreError, Table};

// ---------------------------------------------------------------------------
// Incoming feed
// ---------------------------------------------------------------------------

/// One order of the incoming feed, after field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalOrderDocument {
    /// Upstream order number, stable across re-deliveries. Idempotency key.
    pub external_reference: String,
    /// Order number on the sales channel (marketplace, web shop).
    pub channel_reference: String,
    pub order_date: NaiveDate,
    /// Order state on the sales channel.
    pub status: String,
    pub customer: ExternalCustomer,
    pub delivery: PartyDetails,
    /// Payment-condition code, already resolved through the payment table.
    pub payment_code: String,
    pub currency: String,
    pub internal_comment: String,
    pub seller_note: String,
    pub shipping_cost: Decimal,
    /// Grand total as declared upstream; `None` when the feed omits it.
    pub declared_total: Option<Decimal>,
    pub lines: Vec<ExternalOrderLine>,
}

/// Customer identity as carried by the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalCustomer {
    /// Upstream customer code, used as fallback identity.
    pub alternate_code: String,
    pub vat_code: String,
    pub fiscal_code: String,
    /// Certified e-mail address.
    pub pec: String,
    /// E-invoicing recipient code.
    pub e_invoice_code: String,
    pub details: PartyDetails,
}

/// One order row of the feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalOrderLine {
    pub code: Option<String>,
    pub barcode: Option<String>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_price_incl_vat: Decimal,
    /// Discount percentage.
    pub discount: Decimal,
    pub vat_rate: Option<Decimal>,
    /// VAT code configured for `vat_rate`.
    pub vat_code: Option<String>,
}

/// Name, postal address and contacts shared by customers, delivery
/// addresses and the order header snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    pub name: String,
    pub street: String,
    pub postcode: String,
    pub city: String,
    pub province: String,
    /// ISO 3166-1 alpha-2.
    pub country: String,
    pub phone: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Master data written by the import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub code: String,
    pub alternate_code: String,
    pub vat_code: String,
    pub fiscal_code: String,
    pub pec: String,
    pub e_invoice_code: String,
    pub currency: String,
    pub company_code: String,
    pub details: PartyDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerField {
    Code,
    AlternateCode,
    VatCode,
}

impl Table for Customer {
    const NAME: &'static str = "customers";
    type Field = CustomerField;

    fn field(&self, field: CustomerField) -> FieldValue {
        match field {
            CustomerField::Code => self.code.as_str().into(),
            CustomerField::AlternateCode => self.alternate_code.as_str().into(),
            CustomerField::VatCode => self.vat_code.as_str().into(),
        }
    }

    fn before_write(&mut self, id: RecordId) -> Result<(), StoreError> {
        if self.code.is_empty() {
            self.code = format!("C{id:06}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    #[default]
    GoodsDelivery,
    Billing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub code: String,
    pub customer_code: String,
    pub company_code: String,
    pub address_type: AddressType,
    pub details: PartyDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressField {
    Code,
    Customer,
    Name,
    Street,
}

impl Table for DeliveryAddress {
    const NAME: &'static str = "delivery_addresses";
    type Field = AddressField;

    fn field(&self, field: AddressField) -> FieldValue {
        match field {
            AddressField::Code => self.code.as_str().into(),
            AddressField::Customer => self.customer_code.as_str().into(),
            AddressField::Name => self.details.name.as_str().into(),
            AddressField::Street => self.details.street.as_str().into(),
        }
    }

    fn before_write(&mut self, id: RecordId) -> Result<(), StoreError> {
        if self.code.is_empty() {
            self.code = format!("D{id:06}");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Sales order aggregate. One per external reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned document number.
    pub number: String,
    pub company_code: String,
    pub external_reference: String,
    pub channel_reference: String,
    pub order_date: Option<NaiveDate>,
    /// The only field a re-delivery may change.
    pub external_status: String,
    pub customer_code: String,
    pub address_code: String,
    pub billing: PartyDetails,
    pub delivery: PartyDetails,
    pub vat_code: String,
    pub fiscal_code: String,
    pub e_invoice_code: String,
    pub payment_code: String,
    pub currency: String,
    pub note: String,
    pub seller_note: String,
    /// Net of VAT, as delivered by the feed.
    pub shipping_cost: Decimal,
    /// VAT percentage applied to `shipping_cost` in the total.
    pub shipping_vat_rate: Decimal,
    pub document_type: String,
    pub movement_cause: Option<RecordId>,
    pub deposit: Option<RecordId>,
    pub lines: Vec<OrderLine>,
    /// Grand total, maintained by the store.
    pub total: Decimal,
}

impl Order {
    /// Sum of the VAT-inclusive line amounts after discount, plus shipping
    /// with its VAT. `None` on overflow.
    pub fn computed_total(&self) -> Option<Decimal> {
        let lines = self
            .lines
            .iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount()?))?;
        lines.checked_add(self.shipping_gross()?)
    }

    /// Shipping cost including VAT at `shipping_vat_rate`, rounded to cents.
    pub fn shipping_gross(&self) -> Option<Decimal> {
        if self.shipping_vat_rate.is_zero() {
            return Some(self.shipping_cost);
        }
        let factor = dec!(100).checked_add(self.shipping_vat_rate)?;
        Some((self.shipping_cost.checked_mul(factor)? / dec!(100)).round_dp(2))
    }

    pub fn rounding_line(&self) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.origin == LineOrigin::Rounding)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Number,
    ExternalReference,
    Customer,
}

impl Table for Order {
    const NAME: &'static str = "orders";
    type Field = OrderField;

    fn field(&self, field: OrderField) -> FieldValue {
        match field {
            OrderField::Number => self.number.as_str().into(),
            OrderField::ExternalReference => self.external_reference.as_str().into(),
            OrderField::Customer => self.customer_code.as_str().into(),
        }
    }

    fn before_write(&mut self, id: RecordId) -> Result<(), StoreError> {
        self.total = self.computed_total().ok_or_else(|| StoreError::Rejected {
            table: Self::NAME,
            reason: format!("total of order {} overflows", self.external_reference),
        })?;
        if self.number.is_empty() {
            self.number = id.to_string();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOrigin {
    /// Row received from the feed.
    #[default]
    Feed,
    /// Synthetic row aligning the stored total with the declared one.
    Rounding,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_price_incl_vat: Decimal,
    /// Discount percentage.
    pub discount: Decimal,
    pub vat_code: Option<String>,
    /// Unit-of-measure abbreviation.
    pub unit: Option<String>,
    pub origin: LineOrigin,
}

impl OrderLine {
    /// VAT-inclusive line amount after discount, rounded to cents.
    ///
    /// Rounding lines are taken at face value so they can close a gap of
    /// any precision. `None` when the amount does not fit a `Decimal`.
    pub fn amount(&self) -> Option<Decimal> {
        let gross = self.quantity.checked_mul(self.unit_price_incl_vat)?;
        if self.origin == LineOrigin::Rounding {
            return Some(gross);
        }
        let share = dec!(100).checked_sub(self.discount)?;
        Some((gross.checked_mul(share)? / dec!(100)).round_dp(2))
    }
}

// ---------------------------------------------------------------------------
// Catalog and reference data (read-only for the import)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductKind {
    #[default]
    Standard,
    Service,
    /// Text-only catalog entry; never matched by barcode or description.
    Descriptive,
}

impl ProductKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Service => "service",
            Self::Descriptive => "descriptive",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    pub description: String,
    pub barcode: String,
    pub kind: ProductKind,
    /// Set of units the product is sold in; see [`UnitOfMeasure`].
    pub unit_set: Option<RecordId>,
    pub vat_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    Code,
    Barcode,
    Description,
    Kind,
}

impl Table for Product {
    const NAME: &'static str = "products";
    type Field = ProductField;

    fn field(&self, field: ProductField) -> FieldValue {
        match field {
            ProductField::Code => self.code.as_str().into(),
            ProductField::Barcode => self.barcode.as_str().into(),
            ProductField::Description => self.description.as_str().into(),
            ProductField::Kind => self.kind.code().into(),
        }
    }
}

/// One unit inside a product unit set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitOfMeasure {
    pub unit_set: RecordId,
    pub abbreviation: String,
    /// Unit used on fiscal documents; wins over `preferred_for_sales`.
    pub fiscal: bool,
    pub preferred_for_sales: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitField {
    UnitSet,
}

impl Table for UnitOfMeasure {
    const NAME: &'static str = "units_of_measure";
    type Field = UnitField;

    fn field(&self, field: UnitField) -> FieldValue {
        match field {
            UnitField::UnitSet => self.unit_set.into(),
        }
    }
}

/// Stock holding the goods leave from, scoped by company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseDeposit {
    pub code: String,
    pub company_code: String,
    pub warehouse: Option<RecordId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositField {
    Code,
    Company,
}

impl Table for WarehouseDeposit {
    const NAME: &'static str = "warehouse_deposits";
    type Field = DepositField;

    fn field(&self, field: DepositField) -> FieldValue {
        match field {
            DepositField::Code => self.code.as_str().into(),
            DepositField::Company => self.company_code.as_str().into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentType {
    pub code: String,
    pub description: String,
    /// Warehouse movement cause applied to documents of this type.
    pub movement_cause: Option<RecordId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTypeField {
    Code,
}

impl Table for DocumentType {
    const NAME: &'static str = "document_types";
    type Field = DocumentTypeField;

    fn field(&self, field: DocumentTypeField) -> FieldValue {
        match field {
            DocumentTypeField::Code => self.code.as_str().into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution results
// ---------------------------------------------------------------------------

/// How a customer was bound to an incoming order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    ByVatCode(String),
    ByAlternateCode(String),
    Created,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByVatCode(code) => write!(f, "matched by VAT code {code}"),
            Self::ByAlternateCode(code) => write!(f, "matched by alternate code {code}"),
            Self::Created => f.write_str("newly created"),
        }
    }
}
