//! # order-ingest
//!
//! Reconciliation engine for externally sourced sales orders. A batch of
//! feed documents, possibly duplicated and with partially identified
//! customers, is merged into a transactional record store without creating
//! duplicate customers, delivery addresses or orders.
//!
//! Each document runs in its own nested transaction: a document that
//! fails to map or resolve is rolled back and reported while the rest of
//! the batch goes on. Re-delivered orders only update their external
//! status. Newly created orders are aligned with the declared grand total
//! through a single rounding line.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use order_ingest::core::*;
//! use order_ingest::ingest::Ingestor;
//! use order_ingest::store::{MemoryStore, RecordStore};
//! use rust_decimal_macros::dec;
//!
//! let mut store = MemoryStore::new();
//! store
//!     .insert(WarehouseDeposit {
//!         code: "MAIN".into(),
//!         company_code: "1".into(),
//!         warehouse: None,
//!     })
//!     .unwrap();
//! store
//!     .insert(DocumentType {
//!         code: "OC".into(),
//!         ..DocumentType::default()
//!     })
//!     .unwrap();
//! store
//!     .insert(Product {
//!         code: "MUG".into(),
//!         description: "Mug".into(),
//!         ..Product::default()
//!     })
//!     .unwrap();
//!
//! let config = IngestConfig::new("1", "MAIN", "OC")
//!     .payment("PayPal", "PP")
//!     .vat_rate(dec!(22), "22");
//!
//! let document = FeedNode::new("Document")
//!     .child(FeedNode::new("General")
//!         .child(FeedNode::leaf("bindCommerceNumber", "BC-1"))
//!         .child(FeedNode::leaf("Date", "2024-05-02")))
//!     .child(FeedNode::new("Payments").child(FeedNode::leaf("PaymentName", "PayPal")))
//!     .child(FeedNode::new("Rows").child(FeedNode::new("Row")
//!         .child(FeedNode::leaf("Code", "MUG"))
//!         .child(FeedNode::leaf("Qty", "2"))
//!         .child(FeedNode::leaf("Price", "12.20"))
//!         .child(FeedNode::leaf("VatRate", "22"))));
//!
//! let report = Ingestor::new(&mut store, &config).run(&[document]).unwrap();
//! assert_eq!(report.created, 1);
//! assert_eq!(store.all::<Order>()[0].record.total, dec!(24.40));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Order model, configuration, mapping, store contract, ingestion |
//! | `xml` (default) | XML feed parsing |
//! | `http` | Authenticated feed retrieval over HTTP |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod store;

#[cfg(feature = "core")]
pub mod ingest;

#[cfg(feature = "xml")]
pub mod feed;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
