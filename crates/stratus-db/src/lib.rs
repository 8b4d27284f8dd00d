//! Persistence layer for flattened observations
//!
//! One `ObservationStore` seam, two backends: the MySQL column families
//! and an in-memory store with matching insert-or-replace semantics.
//! Schema DDL and the reconstruction view are generated from the core
//! field table; writes go through the retrying `WriteExecutor`.

pub mod client;
pub mod executor;
pub mod memory;
pub mod queries;
pub mod schema;

pub use client::*;
pub use executor::*;
pub use memory::*;
pub use schema::*;

use async_trait::async_trait;
use stratus_core::{FlatRecord, FlattenError, NaturalKey, Observation, PlanError, WritePlan};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid write plan: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("table `{table}` does not carry a payload column")]
    MissingPayload { table: &'static str },

    #[error("stored payload for {key} does not reconstruct: {source}")]
    Reconstruction {
        key: NaturalKey,
        #[source]
        source: FlattenError,
    },

    #[error("write for {key} gave up after {attempts} attempts")]
    RetriesExhausted {
        key: NaturalKey,
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// How a store disposed of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// New logical row.
    Inserted,
    /// Existing row overwritten with different values.
    Replaced,
    /// Identical re-submit; nothing changed.
    Unchanged,
}

/// One storage backend for flattened observations.
///
/// `insert` is a single attempt; bounded retry lives in the executor so
/// every backend inherits the same policy.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Insert or idempotently replace one observation under the plan's
    /// column family.
    async fn insert(&self, observation: &Observation, plan: &WritePlan)
        -> StoreResult<Disposition>;

    /// Read one record back. Families that carry the payload reconstruct
    /// from it; the normalized family rehydrates its columns.
    async fn read_back(
        &self,
        key: NaturalKey,
        plan: &WritePlan,
    ) -> StoreResult<Option<FlatRecord>>;

    /// Count of logical rows in the plan's table.
    async fn logical_rows(&self, plan: &WritePlan) -> StoreResult<u64>;
}
