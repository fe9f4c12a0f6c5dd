//! Structured outcome of an ingestion batch.
//!
//! Every resolution decision is logged through `tracing` when it happens
//! and collected per document in a [`DocumentTrace`]. The trace joins the
//! [`IngestReport`] only if the document commits; a rolled-back document
//! contributes a single skip entry instead.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::core::{IngestError, Provenance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A decision taken while processing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IngestEvent {
    MissingVatCode,
    CustomerResolved { code: String, provenance: Provenance },
    AddressCreated { code: String },
    AddressReused { code: String },
    LineResolved { line: usize, product: String, via: LineMatch },
    OrderCreated { number: String, customer: String, provenance: Provenance },
    RoundingApplied { number: String, amount: Decimal },
    /// A difference was found but no rounding product is configured.
    RoundingUnavailable { number: String, amount: Decimal },
    AlreadyImported { number: String },
    StatusChanged { number: String, from: String, to: String },
    Skipped { reason: String },
}

/// Which step of the line fallback chain produced the product code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineMatch {
    Code,
    Barcode,
    Description,
}

impl IngestEvent {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingVatCode
            | Self::RoundingApplied { .. }
            | Self::RoundingUnavailable { .. }
            | Self::AlreadyImported { .. } => Severity::Warning,
            Self::Skipped { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for IngestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVatCode => f.write_str("customer data without VAT code"),
            Self::CustomerResolved { code, provenance } => {
                write!(f, "customer {code} ({provenance})")
            }
            Self::AddressCreated { code } => write!(f, "new delivery address {code}"),
            Self::AddressReused { code } => write!(f, "reused delivery address {code}"),
            Self::LineResolved { line, product, via } => {
                write!(f, "row {line} resolved to product {product} by {via:?}")
            }
            Self::OrderCreated {
                number,
                customer,
                provenance,
            } => write!(
                f,
                "new order {number} for customer {customer} ({provenance})"
            ),
            Self::RoundingApplied { number, amount } => {
                write!(f, "rounding line of {amount} added to order {number}")
            }
            Self::RoundingUnavailable { number, amount } => write!(
                f,
                "order {number} differs from the declared total by {amount}, \
                 no rounding product configured"
            ),
            Self::AlreadyImported { number } => {
                write!(f, "order already imported as {number}")
            }
            Self::StatusChanged { number, from, to } => {
                write!(f, "order {number} status changed from \"{from}\" to \"{to}\"")
            }
            Self::Skipped { reason } => write!(f, "document skipped: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub severity: Severity,
    /// External reference of the document, or `#n` when it has none.
    pub document: String,
    pub event: IngestEvent,
}

/// Events of one document, pending its commit.
#[derive(Debug, Clone)]
pub struct DocumentTrace {
    document: String,
    events: Vec<IngestEvent>,
}

impl DocumentTrace {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            events: Vec::new(),
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn events(&self) -> &[IngestEvent] {
        &self.events
    }

    /// Log `event` and keep it for the report.
    pub fn push(&mut self, event: IngestEvent) {
        emit(&self.document, &event);
        self.events.push(event);
    }
}

fn emit(document: &str, event: &IngestEvent) {
    match event.severity() {
        Severity::Info => tracing::info!(document, "{event}"),
        Severity::Warning => tracing::warn!(document, "{event}"),
        Severity::Error => tracing::error!(document, "{event}"),
    }
}

/// How a single document ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DocumentOutcome {
    Created,
    StatusUpdated,
    Unchanged,
    Skipped,
}

/// End-of-run report of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub dry_run: bool,
    /// Set when the abort signal stopped the batch early.
    pub aborted: bool,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub entries: Vec<ReportEntry>,
}

impl IngestReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    pub fn absorb(&mut self, trace: DocumentTrace, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Created => self.created += 1,
            DocumentOutcome::StatusUpdated => self.updated += 1,
            DocumentOutcome::Unchanged => self.unchanged += 1,
            DocumentOutcome::Skipped => self.skipped += 1,
        }
        let DocumentTrace { document, events } = trace;
        self.entries
            .extend(events.into_iter().map(|event| ReportEntry {
                severity: event.severity(),
                document: document.clone(),
                event,
            }));
    }

    /// Record a rolled-back document.
    pub fn skip(&mut self, document: &str, error: &IngestError) {
        let mut trace = DocumentTrace::new(document);
        trace.push(IngestEvent::Skipped {
            reason: error.to_string(),
        });
        self.absorb(trace, DocumentOutcome::Skipped);
    }

    pub fn processed(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped
    }

    /// Entries at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.severity >= severity)
    }

    pub fn skipped_documents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|e| match &e.event {
            IngestEvent::Skipped { reason } => Some((e.document.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn rounding_corrections(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().filter_map(|e| match &e.event {
            IngestEvent::RoundingApplied { number, amount } => Some((number.as_str(), *amount)),
            _ => None,
        })
    }

    pub(crate) fn log_summary(&self) {
        tracing::info!(
            created = self.created,
            updated = self.updated,
            unchanged = self.unchanged,
            skipped = self.skipped,
            dry_run = self.dry_run,
            aborted = self.aborted,
            "order import finished"
        );
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} created, {} updated, {} unchanged, {} skipped",
            self.created, self.updated, self.unchanged, self.skipped
        )?;
        if self.dry_run {
            writeln!(f, "dry run: no changes committed")?;
        }
        if self.aborted {
            writeln!(f, "aborted before the end of the feed")?;
        }
        for entry in &self.entries {
            if entry.severity == Severity::Info && !reportable(&entry.event) {
                continue;
            }
            writeln!(f, "[{}] {}: {}", entry.severity, entry.document, entry.event)?;
        }
        Ok(())
    }
}

/// Info events worth a line in the printed report.
fn reportable(event: &IngestEvent) -> bool {
    matches!(
        event,
        IngestEvent::OrderCreated { .. }
            | IngestEvent::AddressCreated { .. }
            | IngestEvent::StatusChanged { .. }
            | IngestEvent::CustomerResolved {
                provenance: Provenance::Created,
                ..
            }
    )
}
