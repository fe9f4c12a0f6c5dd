use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while ingesting an order feed.
///
/// The first three variants are scoped to a single document: the document
/// is rolled back and the batch moves on. The last two abort the batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// A source field could not be converted (bad date, unknown country, ...).
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Reference data needed by the document is not configured or not found.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// The record store rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The feed could not be fetched or parsed.
    #[error("feed transport error: {0}")]
    FeedTransport(String),

    /// Batch-level settings are missing or point at records that do not exist.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl IngestError {
    /// True when the error only invalidates the current document.
    pub fn is_document_scoped(&self) -> bool {
        matches!(
            self,
            Self::Conversion(_) | Self::Lookup(_) | Self::Persistence(_)
        )
    }
}

impl From<::config::ConfigError> for IngestError {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_classification() {
        assert!(IngestError::Conversion("x".into()).is_document_scoped());
        assert!(IngestError::Lookup("x".into()).is_document_scoped());
        assert!(
            IngestError::Persistence(StoreError::Rejected {
                table: "orders",
                reason: "x".into()
            })
            .is_document_scoped()
        );
        assert!(!IngestError::FeedTransport("x".into()).is_document_scoped());
        assert!(!IngestError::Configuration("x".into()).is_document_scoped());
    }

    #[test]
    fn messages_name_the_category() {
        let e = IngestError::Lookup("payment method \"cash\" not configured".into());
        assert_eq!(
            e.to_string(),
            "lookup error: payment method \"cash\" not configured"
        );
    }
}
