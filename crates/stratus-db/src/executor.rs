//! Retrying write execution

use crate::{Disposition, ObservationStore, StoreError, StoreResult};
use std::time::Duration;
use stratus_core::{NaturalKey, Observation, Strategy};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Bounded exponential backoff for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff after the given 1-based attempt: doubling from the base,
    /// capped at the ceiling.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Result of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub key: NaturalKey,
    pub strategy: Strategy,
    pub attempts: u32,
    pub disposition: Disposition,
}

/// Drives single-attempt stores, retrying transient failures so every
/// backend inherits the same bounded-backoff behavior.
pub struct WriteExecutor<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: ObservationStore> WriteExecutor<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Write one observation under the given strategy.
    ///
    /// Only transient connectivity failures are retried; any other store
    /// error surfaces immediately. Once the attempt ceiling is hit the
    /// last cause is wrapped in `RetriesExhausted`, never swallowed.
    pub async fn write(
        &self,
        observation: &Observation,
        strategy: Strategy,
    ) -> StoreResult<WriteOutcome> {
        let plan = strategy.plan();
        let key = observation.key();
        let mut attempt = 1u32;

        loop {
            match self.store.insert(observation, plan).await {
                Ok(disposition) => {
                    debug!(%key, %strategy, attempt, ?disposition, "observation written");
                    return Ok(WriteOutcome {
                        key,
                        strategy,
                        attempts: attempt,
                        disposition,
                    });
                }
                Err(StoreError::Database(cause)) if is_transient(&cause) => {
                    if attempt >= self.policy.max_attempts {
                        return Err(StoreError::RetriesExhausted {
                            key,
                            attempts: attempt,
                            source: cause,
                        });
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        %key,
                        %strategy,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %cause,
                        "transient store failure, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Connectivity failures worth another attempt. Everything else, from
/// constraint violations to decode errors, is not retryable.
fn is_transient(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};
    use stratus_core::{flatten, SourceDocument};

    fn observation() -> Observation {
        let doc = SourceDocument::from_text(
            r#"{"id": 42, "dt": 1000, "cod": 200, "main": {"temp": 12.5}}"#,
        )
        .unwrap();
        flatten(&doc).unwrap()
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    /// Store double that fails the first `failures` inserts.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        transient: bool,
        calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32, transient: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicU32::new(failures),
                transient,
                calls: AtomicU32::new(0),
            }
        }

        fn error(&self) -> sqlx::Error {
            if self.transient {
                sqlx::Error::PoolTimedOut
            } else {
                sqlx::Error::RowNotFound
            }
        }
    }

    #[async_trait::async_trait]
    impl ObservationStore for FlakyStore {
        async fn insert(
            &self,
            observation: &Observation,
            plan: &stratus_core::WritePlan,
        ) -> StoreResult<Disposition> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(StoreError::Database(self.error()));
            }
            self.inner.insert(observation, plan).await
        }

        async fn read_back(
            &self,
            key: NaturalKey,
            plan: &stratus_core::WritePlan,
        ) -> StoreResult<Option<stratus_core::FlatRecord>> {
            self.inner.read_back(key, plan).await
        }

        async fn logical_rows(&self, plan: &stratus_core::WritePlan) -> StoreResult<u64> {
            self.inner.logical_rows(plan).await
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(500));
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let store = FlakyStore::new(2, true);
        let executor = WriteExecutor::with_policy(store, fast_policy(4));

        let outcome = executor.write(&observation(), Strategy::Hybrid).await.unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.disposition, Disposition::Inserted);

        let rows = executor
            .store()
            .logical_rows(Strategy::Hybrid.plan())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn the_ceiling_surfaces_the_last_cause() {
        let store = FlakyStore::new(10, true);
        let executor = WriteExecutor::with_policy(store, fast_policy(3));

        let err = executor.write(&observation(), Strategy::Raw).await.unwrap_err();
        match err {
            StoreError::RetriesExhausted { key, attempts, source } => {
                assert_eq!(key.location_id, 42);
                assert_eq!(attempts, 3);
                assert!(matches!(source, sqlx::Error::PoolTimedOut));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(executor.store().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_surface_immediately() {
        let store = FlakyStore::new(10, false);
        let executor = WriteExecutor::with_policy(store, fast_policy(4));

        let err = executor.write(&observation(), Strategy::Raw).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
        assert_eq!(executor.store().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_writes_report_one_attempt() {
        let executor = WriteExecutor::new(MemoryStore::new());
        let outcome = executor.write(&observation(), Strategy::Raw).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.disposition, Disposition::Inserted);
    }
}
