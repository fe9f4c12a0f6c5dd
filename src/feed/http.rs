//! Authenticated HTTP retrieval of the order feed.

use std::time::Duration;

use crate::core::{FeedNode, FeedSource, IngestError};

const TIMEOUT: Duration = Duration::from_secs(30);

/// GET the feed body.
///
/// The token travels in a `token` header; caching is disabled. Transport
/// failures and non-success statuses are [`IngestError::FeedTransport`].
pub async fn fetch_feed(source: &FeedSource) -> Result<String, IngestError> {
    let client = reqwest::Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| IngestError::FeedTransport(e.to_string()))?;

    let resp = client
        .get(&source.url)
        .header("cache-control", "no-cache")
        .header("token", &source.token)
        .send()
        .await
        .map_err(|e| IngestError::FeedTransport(e.to_string()))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| IngestError::FeedTransport(e.to_string()))?;

    if !status.is_success() {
        tracing::error!(url = %source.url, %status, "order feed request failed");
        return Err(IngestError::FeedTransport(format!("HTTP {status}: {body}")));
    }
    tracing::debug!(url = %source.url, bytes = body.len(), "order feed received");
    Ok(body)
}

/// Fetch and parse the feed into its documents.
pub async fn fetch_documents(source: &FeedSource) -> Result<Vec<FeedNode>, IngestError> {
    let body = fetch_feed(source).await?;
    super::parse_feed(&body)
}
