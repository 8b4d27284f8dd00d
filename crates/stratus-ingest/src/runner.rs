//! Per-run ingestion driver.

use stratus_core::{flatten, Strategy};
use stratus_db::{ObservationStore, WriteExecutor, WriteOutcome};
use tracing::{info, warn};

use crate::{DocumentSource, FetchError, IngestError, IngestResult};

/// What a batch run does with a document that will not flatten.
///
/// Fetch and store failures are not covered: a broken provider or an
/// exhausted database ends the run under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the document, count it, and continue with the next one.
    SkipDocument,
    /// Fail the whole run on the first bad document.
    AbortRun,
}

/// Tally of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents that reached the store.
    pub written: u64,
    /// Documents dropped under [`FailurePolicy::SkipDocument`].
    pub skipped: u64,
    /// One outcome per written document, in ingestion order.
    pub outcomes: Vec<WriteOutcome>,
}

/// Drives fetch, flatten, and write for one source.
pub struct IngestRunner<S> {
    source: Box<dyn DocumentSource>,
    executor: WriteExecutor<S>,
    strategy: Strategy,
    policy: FailurePolicy,
}

impl<S: ObservationStore> IngestRunner<S> {
    pub fn new(source: Box<dyn DocumentSource>, executor: WriteExecutor<S>, strategy: Strategy) -> Self {
        Self {
            source,
            executor,
            strategy,
            policy: FailurePolicy::SkipDocument,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn executor(&self) -> &WriteExecutor<S> {
        &self.executor
    }

    /// Ingest exactly one document from the source.
    pub async fn ingest_document(&mut self) -> IngestResult<WriteOutcome> {
        let document = self.source.fetch().await?;
        let observation = flatten(&document)?;
        let outcome = self.executor.write(&observation, self.strategy).await?;
        Ok(outcome)
    }

    /// Drain the source. Documents that will not flatten are handled per
    /// the failure policy; fetch and store failures always end the run.
    pub async fn drain(&mut self) -> IngestResult<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            match self.ingest_document().await {
                Ok(outcome) => {
                    summary.written += 1;
                    summary.outcomes.push(outcome);
                }
                Err(IngestError::Fetch(FetchError::NoDocument)) => break,
                Err(IngestError::Flatten(cause)) if self.policy == FailurePolicy::SkipDocument => {
                    summary.skipped += 1;
                    warn!(source = self.source.name(), error = %cause, "skipping document");
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            source = self.source.name(),
            strategy = %self.strategy,
            written = summary.written,
            skipped = summary.skipped,
            "ingestion run complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixtureSource;
    use stratus_db::{Disposition, MemoryStore, RetryPolicy};

    const OBSERVATION: &str = r#"{
        "id": 1264521,
        "name": "Madurai",
        "main": {"temp": 25.01, "humidity": 83},
        "dt": 1756276515,
        "cod": 200
    }"#;

    fn runner(texts: &[&str], store: MemoryStore) -> IngestRunner<MemoryStore> {
        let source = FixtureSource::from_texts(texts.iter().copied()).unwrap();
        IngestRunner::new(Box::new(source), WriteExecutor::new(store), Strategy::Hybrid)
    }

    #[tokio::test]
    async fn one_document_is_fetched_flattened_and_written() {
        let store = MemoryStore::new();
        let mut run = runner(&[OBSERVATION], store.clone());

        let outcome = run.ingest_document().await.unwrap();
        assert_eq!(outcome.disposition, Disposition::Inserted);
        assert_eq!(outcome.key.location_id, 1264521);
        assert_eq!(outcome.strategy, run.strategy());
        assert_eq!(run.executor().policy(), RetryPolicy::default());
        assert_eq!(
            store.logical_rows(Strategy::Hybrid.plan()).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn a_drained_source_ends_single_document_ingestion() {
        let mut run = runner(&[], MemoryStore::new());
        assert!(matches!(
            run.ingest_document().await,
            Err(IngestError::Fetch(FetchError::NoDocument))
        ));
    }

    #[tokio::test]
    async fn abort_run_surfaces_the_first_bad_document() {
        // Second document is missing the location id.
        let bad = r#"{"name": "nowhere", "dt": 1756276515, "cod": 200}"#;
        let store = MemoryStore::new();
        let mut run = runner(&[OBSERVATION, bad, OBSERVATION], store.clone())
            .with_policy(FailurePolicy::AbortRun);

        assert!(matches!(run.drain().await, Err(IngestError::Flatten(_))));
        assert_eq!(
            store.logical_rows(Strategy::Hybrid.plan()).await.unwrap(),
            1
        );
    }
}
