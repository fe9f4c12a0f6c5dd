use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use order_ingest::core::*;
use order_ingest::feed::parse_feed;
use order_ingest::ingest::Ingestor;
use order_ingest::store::{MemoryStore, RecordStore};

fn seeded_store() -> MemoryStore {
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
    for i in 0..500 {
        store
            .insert(Product {
                code: format!("P{i:04}"),
                description: format!("Catalog item {i}"),
                barcode: format!("800{i:010}"),
                vat_code: Some("22".into()),
                ..Product::default()
            })
            .unwrap();
    }
    store
        .insert(Product {
            code: "ROUND".into(),
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

/// `count` documents spread over 20 customers, 5 rows each, resolved by
/// barcode so the lookup chain is exercised.
fn build_documents(count: usize) -> Vec<FeedNode> {
    (0..count)
        .map(|n| {
            let customer = n % 20;
            let mut doc = FeedDocumentBuilder::new(format!("BC-{n:05}"), "2024-06-15")
                .status("Paid")
                .payment("PayPal")
                .customer(
                    FeedPartyBuilder::new("Customer", customer.to_string())
                        .code(format!("WEB-{customer}"))
                        .vat_code(format!("IT{customer:011}"))
                        .address(format!("Via Roma {customer}"), "40100", "Bologna", "BO"),
                )
                .delivery(
                    FeedPartyBuilder::new("Customer", customer.to_string())
                        .address(format!("Via Roma {customer}"), "40100", "Bologna", "BO"),
                )
                .total(dec!(100.00));
            for row in 0..5 {
                let i = (n * 5 + row) % 500;
                doc = doc.add_row(
                    FeedRowBuilder::new(dec!(1), dec!(19.99))
                        .barcode(format!("800{i:010}"))
                        .vat_rate(dec!(22)),
                );
            }
            doc.build()
        })
        .collect()
}

fn feed_xml(documents: &[FeedNode]) -> String {
    fn write(node: &FeedNode, out: &mut String) {
        out.push('<');
        out.push_str(&node.name);
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            write(child, out);
        }
        out.push_str("</");
        out.push_str(&node.name);
        out.push('>');
    }
    let mut out = String::from("<Documents>");
    for doc in documents {
        write(doc, &mut out);
    }
    out.push_str("</Documents>");
    out
}

fn bench_ingest_batch(c: &mut Criterion) {
    let config = config();
    let documents = build_documents(100);

    c.bench_function("ingest_100_documents", |b| {
        b.iter_batched(
            seeded_store,
            |mut store| {
                let report = Ingestor::new(&mut store, &config)
                    .run(black_box(&documents))
                    .unwrap();
                black_box(report)
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_redelivery(c: &mut Criterion) {
    let config = config();
    let documents = build_documents(100);
    let mut store = seeded_store();
    Ingestor::new(&mut store, &config).run(&documents).unwrap();

    c.bench_function("redeliver_100_documents", |b| {
        b.iter(|| {
            let report = Ingestor::new(&mut store, &config)
                .dry_run(true)
                .run(black_box(&documents))
                .unwrap();
            black_box(report)
        });
    });
}

fn bench_parse_feed(c: &mut Criterion) {
    let xml = feed_xml(&build_documents(100));
    c.bench_function("parse_feed_100_documents", |b| {
        b.iter(|| black_box(parse_feed(black_box(&xml))));
    });
}

criterion_group!(benches, bench_ingest_batch, bench_redelivery, bench_parse_feed);
criterion_main!(benches);
