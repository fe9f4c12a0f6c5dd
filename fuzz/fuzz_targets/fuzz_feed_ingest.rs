#![no_main]

use libfuzzer_sys::fuzz_target;
use order_ingest::core::{DocumentType, IngestConfig, WarehouseDeposit};
use order_ingest::ingest::Ingestor;
use order_ingest::store::{MemoryStore, RecordStore};

fuzz_target!(|data: &[u8]| {
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    let mut store = MemoryStore::new();
    let seeded = store
        .insert(WarehouseDeposit {
            code: "MAIN".into(),
            company_code: "1".into(),
            warehouse: None,
        })
        .and_then(|_| {
            store.insert(DocumentType {
                code: "OC".into(),
                ..DocumentType::default()
            })
        });
    if seeded.is_err() {
        return;
    }
    let config = IngestConfig::new("1", "MAIN", "OC").payment("PayPal", "PP");
    if Ingestor::new(&mut store, &config).run_xml(xml).is_ok() {
        // Every batch closes its transaction scopes.
        assert_eq!(store.depth(), 0);
    }
});
