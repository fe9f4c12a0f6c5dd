use rust_decimal::Decimal;

use super::node::FeedNode;

/// Builder for feed documents in the connector's wire layout.
///
/// Handy for feeding orders that do not come from the XML connector, and
/// for tests. Only fields that were set are emitted, so unset fields read
/// as absent during mapping.
///
/// ```
/// use order_ingest::core::*;
/// use rust_decimal_macros::dec;
///
/// let node = FeedDocumentBuilder::new("BC-1", "2024-05-02")
///     .payment("PayPal")
///     .customer(FeedPartyBuilder::new("Mario", "Rossi").vat_code("IT01234567890"))
///     .add_row(FeedRowBuilder::new(dec!(2), dec!(12.20)).code("MUG"))
///     .total(dec!(24.40))
///     .build();
///
/// assert_eq!(node.text_at("General/bindCommerceNumber"), "BC-1");
/// assert_eq!(node.text_at("Customer/VatCode"), "IT01234567890");
/// assert_eq!(node.find_all("Rows/Row").len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FeedDocumentBuilder {
    general: Vec<(&'static str, String)>,
    payment: Option<String>,
    amounts: Vec<(&'static str, String)>,
    customer: Option<FeedPartyBuilder>,
    delivery: Option<FeedPartyBuilder>,
    rows: Vec<FeedRowBuilder>,
}

impl FeedDocumentBuilder {
    pub fn new(reference: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            general: vec![
                ("bindCommerceNumber", reference.into()),
                ("Date", date.into()),
            ],
            payment: None,
            amounts: Vec::new(),
            customer: None,
            delivery: None,
            rows: Vec::new(),
        }
    }

    pub fn channel_reference(mut self, number: impl Into<String>) -> Self {
        put(&mut self.general, "Number", number.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        put(&mut self.general, "StateName", status.into());
        self
    }

    pub fn payment(mut self, name: impl Into<String>) -> Self {
        self.payment = Some(name.into());
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        put(&mut self.amounts, "Currency", code.into());
        self
    }

    pub fn internal_comment(mut self, text: impl Into<String>) -> Self {
        put(&mut self.amounts, "InternalComment", text.into());
        self
    }

    pub fn seller_note(mut self, text: impl Into<String>) -> Self {
        put(&mut self.amounts, "SellerNote", text.into());
        self
    }

    pub fn shipping_cost(mut self, amount: Decimal) -> Self {
        put(&mut self.amounts, "ShippingCostWithoutTax", amount.to_string());
        self
    }

    /// Declared grand total.
    pub fn total(mut self, amount: Decimal) -> Self {
        put(&mut self.amounts, "Total", amount.to_string());
        self
    }

    pub fn customer(mut self, party: FeedPartyBuilder) -> Self {
        self.customer = Some(party);
        self
    }

    pub fn delivery(mut self, party: FeedPartyBuilder) -> Self {
        self.delivery = Some(party);
        self
    }

    pub fn add_row(mut self, row: FeedRowBuilder) -> Self {
        self.rows.push(row);
        self
    }

    pub fn build(self) -> FeedNode {
        let mut node = FeedNode::new("Document").child(group("General", self.general));
        if let Some(name) = self.payment {
            node = node.child(FeedNode::new("Payments").child(FeedNode::leaf("PaymentName", name)));
        }
        if !self.amounts.is_empty() {
            node = node.child(group("Amounts", self.amounts));
        }
        if let Some(customer) = self.customer {
            node = node.child(customer.build("Customer"));
        }
        if let Some(delivery) = self.delivery {
            node = node.child(delivery.build("Delivery"));
        }
        let mut rows = FeedNode::new("Rows");
        for row in self.rows {
            rows = rows.child(row.build());
        }
        node.child(rows)
    }
}

/// Set `field`, replacing an earlier value.
fn put(fields: &mut Vec<(&'static str, String)>, field: &'static str, value: String) {
    match fields.iter_mut().find(|(name, _)| *name == field) {
        Some(slot) => slot.1 = value,
        None => fields.push((field, value)),
    }
}

fn group(name: &str, fields: Vec<(&'static str, String)>) -> FeedNode {
    fields
        .into_iter()
        .fold(FeedNode::new(name), |node, (field, value)| {
            node.child(FeedNode::leaf(field, value))
        })
}

/// Customer or delivery block of a feed document.
#[derive(Debug, Clone)]
pub struct FeedPartyBuilder {
    fields: Vec<(&'static str, String)>,
}

impl FeedPartyBuilder {
    pub fn new(name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            fields: vec![("Name", name.into()), ("Surname", surname.into())],
        }
    }

    fn set(mut self, field: &'static str, value: String) -> Self {
        put(&mut self.fields, field, value);
        self
    }

    pub fn company(self, name: impl Into<String>) -> Self {
        self.set("Company", name.into())
    }

    /// Upstream customer code. Ignored in delivery blocks.
    pub fn code(self, code: impl Into<String>) -> Self {
        self.set("Code", code.into())
    }

    pub fn vat_code(self, code: impl Into<String>) -> Self {
        self.set("VatCode", code.into())
    }

    pub fn fiscal_code(self, code: impl Into<String>) -> Self {
        self.set("FiscalCode", code.into())
    }

    pub fn address(
        self,
        street: impl Into<String>,
        postcode: impl Into<String>,
        city: impl Into<String>,
        province: impl Into<String>,
    ) -> Self {
        self.set("Address", street.into())
            .set("Postcode", postcode.into())
            .set("City", city.into())
            .set("Province", province.into())
    }

    pub fn country(self, code: impl Into<String>) -> Self {
        self.set("CountryCode", code.into())
    }

    pub fn phone(self, phone: impl Into<String>) -> Self {
        self.set("Phone", phone.into())
    }

    pub fn mobile(self, mobile: impl Into<String>) -> Self {
        self.set("MobPhone", mobile.into())
    }

    pub fn email(self, email: impl Into<String>) -> Self {
        self.set("Email", email.into())
    }

    pub fn pec(self, pec: impl Into<String>) -> Self {
        self.set("Pec", pec.into())
    }

    pub fn e_invoice_code(self, code: impl Into<String>) -> Self {
        self.set("EInvoiceDestCode", code.into())
    }

    fn build(self, element: &str) -> FeedNode {
        group(element, self.fields)
    }
}

/// One `Rows/Row` entry.
#[derive(Debug, Clone)]
pub struct FeedRowBuilder {
    fields: Vec<(&'static str, String)>,
}

impl FeedRowBuilder {
    /// Row with quantity and VAT-inclusive unit price.
    pub fn new(quantity: Decimal, price: Decimal) -> Self {
        Self {
            fields: vec![("Qty", quantity.to_string()), ("Price", price.to_string())],
        }
    }

    fn set(mut self, field: &'static str, value: String) -> Self {
        put(&mut self.fields, field, value);
        self
    }

    pub fn code(self, code: impl Into<String>) -> Self {
        self.set("Code", code.into())
    }

    pub fn barcode(self, barcode: impl Into<String>) -> Self {
        self.set("Barcode", barcode.into())
    }

    pub fn description(self, text: impl Into<String>) -> Self {
        self.set("Description", text.into())
    }

    pub fn price_excl_vat(self, price: Decimal) -> Self {
        self.set("PriceVatExcluded", price.to_string())
    }

    /// Discount percentage.
    pub fn discount(self, percent: Decimal) -> Self {
        self.set("Discounts", percent.to_string())
    }

    pub fn vat_rate(self, percent: Decimal) -> Self {
        self.set("VatRate", percent.to_string())
    }

    fn build(self) -> FeedNode {
        group("Row", self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn unset_blocks_are_omitted() {
        let node = FeedDocumentBuilder::new("BC-1", "2024-05-02").build();
        assert!(node.find("Payments").is_none());
        assert!(node.find("Amounts").is_none());
        assert!(node.find("Customer").is_none());
        assert!(node.find_all("Rows/Row").is_empty());
    }

    #[test]
    fn party_and_rows_use_wire_names() {
        let node = FeedDocumentBuilder::new("BC-1", "2024-05-02")
            .delivery(
                FeedPartyBuilder::new("Mario", "Rossi")
                    .address("Via Roma 1", "40100", "Bologna", "BO")
                    .mobile("333 1234567"),
            )
            .add_row(
                FeedRowBuilder::new(dec!(1), dec!(9.90))
                    .barcode("8001234567890")
                    .discount(dec!(10)),
            )
            .shipping_cost(dec!(5.00))
            .build();

        assert_eq!(node.text_at("Delivery/Address"), "Via Roma 1");
        assert_eq!(node.text_at("Delivery/MobPhone"), "333 1234567");
        assert_eq!(node.text_at("Rows/Row/Barcode"), "8001234567890");
        assert_eq!(node.text_at("Rows/Row/Discounts"), "10");
        assert_eq!(node.text_at("Amounts/ShippingCostWithoutTax"), "5.00");
    }
}
