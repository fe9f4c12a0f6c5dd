//! End-to-end ingestion of XML feeds.
//!
//! Run with: `cargo test --test feed_tests`

#![cfg(feature = "xml")]

use order_ingest::core::*;
use order_ingest::feed::parse_feed;
use order_ingest::ingest::Ingestor;
use order_ingest::store::{MemoryStore, RecordStore};
use rust_decimal_macros::dec;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Documents>
  <Document>
    <General>
      <bindCommerceNumber>BC-1001</bindCommerceNumber>
      <Number>402-1234567-0000001</Number>
      <Date>2024-06-01T09:30:00+02:00</Date>
      <StateName>Paid</StateName>
    </General>
    <Payments><PaymentName>PayPal</PaymentName></Payments>
    <Amounts>
      <Currency>EUR</Currency>
      <ShippingCostWithoutTax>0</ShippingCostWithoutTax>
      <Total>100.00</Total>
    </Amounts>
    <Customer>
      <Code>WEB-1</Code>
      <Name>Mario</Name>
      <Surname>Rossi</Surname>
      <Company></Company>
      <Address>Via Roma 1</Address>
      <Postcode>40100</Postcode>
      <City>Bologna</City>
      <Province>BO</Province>
      <CountryCode>IT</CountryCode>
      <VatCode>IT01234567890</VatCode>
      <Email>mario@example.com</Email>
    </Customer>
    <Delivery>
      <Name>Mario</Name>
      <Surname>Rossi</Surname>
      <Address>Via Roma 1</Address>
      <Postcode>40100</Postcode>
      <City>Bologna</City>
      <CountryCode/>
    </Delivery>
    <Rows>
      <Row>
        <Code/>
        <Barcode>8001</Barcode>
        <Description>Coffee mug</Description>
        <Qty>1</Qty>
        <PriceVatExcluded>81.95</PriceVatExcluded>
        <Price>99.98</Price>
        <Discounts>0</Discounts>
        <VatRate>22.00</VatRate>
      </Row>
    </Rows>
  </Document>
  <Document>
    <General>
      <bindCommerceNumber>BC-1002</bindCommerceNumber>
      <Date>2024-06-01</Date>
    </General>
    <Payments><PaymentName>Satispay</PaymentName></Payments>
  </Document>
</Documents>"#;

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
    store
        .insert(Product {
            code: "MUG".into(),
            description: "Coffee mug".into(),
            barcode: "8001".into(),
            vat_code: Some("22".into()),
            ..Product::default()
        })
        .unwrap();
    store
        .insert(Product {
            code: "ROUND".into(),
            description: "Rounding".into(),
            kind: ProductKind::Service,
            ..Product::default()
        })
        .unwrap();
    store
}

fn config() -> IngestConfig {
    IngestConfig::new("1", "MAIN", "OC")
        .rounding_product("ROUND")
        .payment("PayPal", "PP")
        .vat_rate(dec!(22), "22")
}

#[test]
fn parses_documents_from_feed() {
    let documents = parse_feed(FEED).unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].text_at("Customer/VatCode"), "IT01234567890");
    assert_eq!(documents[0].text_at("Delivery/CountryCode"), "");
    assert_eq!(documents[1].text_at("Payments/PaymentName"), "Satispay");
}

#[test]
fn ingests_xml_feed() {
    let mut store = store();
    let config = config();
    let report = Ingestor::new(&mut store, &config).run_xml(FEED).unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
    let skipped: Vec<_> = report.skipped_documents().collect();
    assert_eq!(skipped[0].0, "BC-1002");
    assert!(skipped[0].1.contains("satispay"));

    let orders = store.all::<Order>();
    assert_eq!(orders.len(), 1);
    let order = &orders[0].record;
    assert_eq!(order.external_reference, "BC-1001");
    assert_eq!(order.channel_reference, "402-1234567-0000001");
    assert_eq!(order.lines[0].product_code, "MUG");
    assert_eq!(order.total, dec!(100.00));
    assert_eq!(order.rounding_line().map(|l| l.unit_price), Some(dec!(0.02)));
    assert_eq!(order.delivery.country, "IT");
}

#[test]
fn second_delivery_of_the_same_feed_changes_nothing() {
    let mut store = store();
    let config = config();
    Ingestor::new(&mut store, &config).run_xml(FEED).unwrap();
    let before = store.all::<Order>();

    let report = Ingestor::new(&mut store, &config).run_xml(FEED).unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.unchanged, 1);
    assert_eq!(store.all::<Order>(), before);
    assert_eq!(store.all::<Customer>().len(), 1);
}

#[test]
fn malformed_feed_fails_the_batch() {
    let mut store = store();
    let config = config();
    let truncated = &FEED[..FEED.len() / 2];
    let err = Ingestor::new(&mut store, &config)
        .run_xml(truncated)
        .unwrap_err();
    assert!(matches!(err, IngestError::FeedTransport(_)));
    assert!(!err.is_document_scoped());
    assert!(store.all::<Order>().is_empty());
    assert!(store.all::<Customer>().is_empty());
}

#[test]
fn empty_feed_is_an_empty_batch() {
    let mut store = store();
    let config = config();
    let report = Ingestor::new(&mut store, &config).run_xml("").unwrap();
    assert_eq!(report.processed(), 0);
    assert!(store.find_one::<Order>(&order_ingest::store::Predicate::eq(
        OrderField::ExternalReference,
        "BC-1001"
    ))
    .unwrap()
    .is_none());
}
