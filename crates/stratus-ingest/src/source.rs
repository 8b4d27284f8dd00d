//! The upstream document seam.

use async_trait::async_trait;
use stratus_core::SourceDocument;
use thiserror::Error;

/// Why a source produced no document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Nothing left to ingest this run. Drains end here without error.
    #[error("no document available this run")]
    NoDocument,

    /// Opaque upstream failure. The engine reports it without interpreting it.
    #[error("provider failure: {0}")]
    Provider(String),
}

/// Hands the engine one response document per call.
///
/// Retrieval mechanics (HTTP clients, queues, capture files) stay behind
/// this seam so the pipeline can be exercised without a live provider.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Source name, for logs.
    fn name(&self) -> &str;

    /// The next document, or [`FetchError::NoDocument`] once drained.
    async fn fetch(&mut self) -> Result<SourceDocument, FetchError>;
}
