//! Batch coordination: one outer transaction per run, one nested
//! transaction per document.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;

use crate::core::{
    DepositField, DocumentType, DocumentTypeField, ExternalOrderDocument, FeedNode, IngestConfig,
    IngestError, WarehouseDeposit, map_document,
};
use crate::store::{Predicate, RecordId, RecordStore, Transaction, with_transaction};

use super::customer::{resolve_address, resolve_customer};
use super::lines::{ProductInfo, product_info, resolve_line};
use super::report::{DocumentOutcome, DocumentTrace, IngestReport};
use super::rounding::reconcile_total;
use super::upsert::{UpsertOutcome, build_order, create_order, find_order, refresh_status};

/// Cooperative stop request, checked between documents.
///
/// Clones share the same flag, so one clone can be handed to another
/// thread while the batch runs.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reference records every order of the batch points at.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub company_code: String,
    pub deposit: RecordId,
    pub document_type: String,
    pub movement_cause: Option<RecordId>,
    pub rounding_product: Option<ProductInfo>,
    pub shipping_vat_rate: Decimal,
}

impl ReferenceData {
    /// Look up the configured deposit, document type and rounding product.
    pub fn resolve<S: RecordStore>(store: &S, config: &IngestConfig) -> Result<Self, IngestError> {
        let deposit = store
            .find_one::<WarehouseDeposit>(
                &Predicate::eq(DepositField::Code, config.deposit_code.as_str())
                    .and(Predicate::eq(DepositField::Company, config.company_code.as_str())),
            )?
            .ok_or_else(|| {
                IngestError::Configuration(format!(
                    "warehouse deposit {} not found for company {}",
                    config.deposit_code, config.company_code
                ))
            })?;

        let document_type = store
            .find_one::<DocumentType>(&Predicate::eq(
                DocumentTypeField::Code,
                config.document_type_code.as_str(),
            ))?
            .ok_or_else(|| {
                IngestError::Configuration(format!(
                    "document type {} not found",
                    config.document_type_code
                ))
            })?;

        let rounding_product = match &config.rounding_product_code {
            Some(code) => Some(product_info(store, code)?.ok_or_else(|| {
                IngestError::Configuration(format!("rounding product {code} not found"))
            })?),
            None => None,
        };

        Ok(Self {
            company_code: config.company_code.clone(),
            deposit: deposit.id,
            document_type: document_type.record.code,
            movement_cause: document_type.record.movement_cause,
            rounding_product,
            shipping_vat_rate: config.shipping_vat_rate.unwrap_or_default(),
        })
    }
}

/// Runs order feeds into a record store.
///
/// ```
/// use order_ingest::core::IngestConfig;
/// use order_ingest::ingest::Ingestor;
/// use order_ingest::store::MemoryStore;
///
/// let mut store = MemoryStore::new();
/// let config = IngestConfig::new("1", "MAIN", "OC");
/// // No deposit or document type is seeded: the batch refuses to open.
/// assert!(Ingestor::new(&mut store, &config).run(&[]).is_err());
/// ```
pub struct Ingestor<'a, S: RecordStore> {
    store: &'a mut S,
    config: &'a IngestConfig,
    dry_run: bool,
    abort: AbortSignal,
}

impl<'a, S: RecordStore> Ingestor<'a, S> {
    pub fn new(store: &'a mut S, config: &'a IngestConfig) -> Self {
        Self {
            store,
            config,
            dry_run: false,
            abort: AbortSignal::new(),
        }
    }

    /// Process everything, then roll the whole batch back.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort = signal;
        self
    }

    /// Ingest `documents` in order.
    ///
    /// Document-scoped failures roll back that document and land in the
    /// report. Batch-scoped failures roll back everything and are returned.
    pub fn run(&mut self, documents: &[FeedNode]) -> Result<IngestReport, IngestError> {
        let config = self.config;
        let refs = ReferenceData::resolve(&*self.store, config)?;
        let mut report = IngestReport::new(self.dry_run);

        tracing::info!(
            documents = documents.len(),
            dry_run = self.dry_run,
            company = %config.company_code,
            "order import started"
        );

        let mut batch = Transaction::begin(&mut *self.store)?;
        for (index, node) in documents.iter().enumerate() {
            if self.abort.is_raised() {
                tracing::warn!(remaining = documents.len() - index, "order import aborted");
                report.aborted = true;
                break;
            }

            let label = document_label(node, index);
            let mut trace = DocumentTrace::new(label.as_str());
            let result = with_transaction(&mut *batch, |store| {
                process_document(store, node, config, &refs, &mut trace)
            });
            match result {
                Ok(outcome) => report.absorb(trace, outcome),
                Err(e) if e.is_document_scoped() => report.skip(&label, &e),
                Err(e) => {
                    tracing::error!(document = %label, error = %e, "order import failed");
                    return Err(e);
                }
            }
        }

        if self.dry_run {
            batch.rollback()?;
        } else {
            batch.commit()?;
        }
        report.log_summary();
        Ok(report)
    }

    /// Parse an XML feed and ingest its documents.
    #[cfg(feature = "xml")]
    pub fn run_xml(&mut self, xml: &str) -> Result<IngestReport, IngestError> {
        let documents = crate::feed::parse_feed(xml)?;
        self.run(&documents)
    }
}

/// External reference of a feed document, or its 1-based position.
fn document_label(node: &FeedNode, index: usize) -> String {
    match node.text_at("General/bindCommerceNumber") {
        "" => format!("#{}", index + 1),
        reference => reference.to_string(),
    }
}

fn process_document<S: RecordStore>(
    store: &mut S,
    node: &FeedNode,
    config: &IngestConfig,
    refs: &ReferenceData,
    trace: &mut DocumentTrace,
) -> Result<DocumentOutcome, IngestError> {
    let document = map_document(node, config)?;
    apply_document(store, &document, refs, trace).inspect_err(|e| {
        tracing::debug!(
            document = %trace.document(),
            error = %e,
            record = %serde_json::to_string(&document).unwrap_or_default(),
            "document rolled back"
        );
    })
}

fn apply_document<S: RecordStore>(
    store: &mut S,
    document: &ExternalOrderDocument,
    refs: &ReferenceData,
    trace: &mut DocumentTrace,
) -> Result<DocumentOutcome, IngestError> {
    // Re-deliveries skip resolution entirely.
    if let Some(existing) = find_order(store, &document.external_reference)? {
        return Ok(
            match refresh_status(store, existing, &document.status, trace)? {
                UpsertOutcome::StatusChanged { .. } => DocumentOutcome::StatusUpdated,
                UpsertOutcome::Unchanged { .. } => DocumentOutcome::Unchanged,
            },
        );
    }

    let customer = resolve_customer(
        store,
        &document.customer,
        &document.currency,
        &refs.company_code,
        trace,
    )?;
    let address = resolve_address(
        store,
        &document.delivery,
        &customer.code,
        &refs.company_code,
        trace,
    )?;

    let mut lines = Vec::with_capacity(document.lines.len());
    for (index, line) in document.lines.iter().enumerate() {
        lines.push(resolve_line(&*store, index + 1, line, trace)?);
    }

    let order = build_order(document, &customer, &address, lines, refs);
    let (order_id, _) = create_order(store, order, &customer, trace)?;

    if let Some(declared) = document.declared_total {
        reconcile_total(
            store,
            order_id,
            declared,
            refs.rounding_product.as_ref(),
            trace,
        )?;
    }
    Ok(DocumentOutcome::Created)
}
