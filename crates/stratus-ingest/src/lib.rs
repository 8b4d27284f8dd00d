//! Document ingestion.
//!
//! A [`DocumentSource`] hands the engine one provider document per fetch;
//! [`IngestRunner`] pushes each document through flatten and write, and
//! applies the caller's [`FailurePolicy`] when a document will not flatten.

pub mod fixture;
pub mod runner;
pub mod source;

pub use fixture::*;
pub use runner::*;
pub use source::*;

use stratus_core::FlattenError;
use stratus_db::StoreError;
use thiserror::Error;

/// Anything that can end an ingestion run early.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("flatten failed: {0}")]
    Flatten(#[from] FlattenError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

pub type IngestResult<T> = Result<T, IngestError>;
