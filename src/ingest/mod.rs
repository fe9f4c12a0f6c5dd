//! Reconciliation of mapped orders against the record store.
//!
//! [`Ingestor`] drives a batch. For each document it maps the feed node,
//! checks whether the order is already known, resolves customer, delivery
//! address and lines, inserts the order and aligns its total with the
//! declared one. Everything the batch decides ends up in an
//! [`IngestReport`].

mod batch;
pub mod customer;
pub mod lines;
pub mod report;
pub mod rounding;
pub mod upsert;

pub use batch::{AbortSignal, Ingestor, ReferenceData};
pub use customer::{ResolvedCustomer, resolve_address, resolve_customer};
pub use lines::{ProductInfo, product_info, resolve_line, resolve_product_code};
pub use report::{
    DocumentOutcome, DocumentTrace, IngestEvent, IngestReport, LineMatch, ReportEntry, Severity,
};
pub use rounding::reconcile_total;
pub use upsert::{UpsertOutcome, find_order, refresh_status};
