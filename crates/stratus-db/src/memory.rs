//! In-memory observation store
//!
//! Backs tests and local runs with the same insert-or-replace and
//! read-back semantics as the MySQL families. Cheap to clone; clones
//! share the underlying tables, mirroring the pooled client.

use crate::{Disposition, ObservationStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use stratus_core::{
    compiled_fields, field, reconstruct, FieldValue, FlatRecord, NaturalKey, Observation,
    PlanError, WritePlan,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct StoredRow {
    columns: Vec<(&'static str, FieldValue)>,
    payload: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<&'static str, HashMap<NaturalKey, StoredRow>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored payload text for one key, for asserting verbatim retention.
    pub async fn stored_payload(&self, key: NaturalKey, plan: &WritePlan) -> Option<String> {
        let tables = self.tables.lock().await;
        tables.get(plan.table)?.get(&key)?.payload.clone()
    }
}

/// Project the plan's column subset (and payload) out of an observation.
fn project(observation: &Observation, plan: &WritePlan) -> StoreResult<StoredRow> {
    let mut columns = Vec::with_capacity(plan.field_columns.len());
    for &column in &plan.field_columns {
        field(column).ok_or(PlanError::UnknownColumn {
            table: plan.table,
            column,
        })?;
        let value = observation
            .record
            .get(column)
            .cloned()
            .unwrap_or(FieldValue::Null);
        columns.push((column, value));
    }
    let payload = plan
        .payload_column
        .map(|_| observation.payload.clone());
    Ok(StoredRow { columns, payload })
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn insert(
        &self,
        observation: &Observation,
        plan: &WritePlan,
    ) -> StoreResult<Disposition> {
        let row = project(observation, plan)?;
        let mut tables = self.tables.lock().await;
        let table = tables.entry(plan.table).or_default();

        let disposition = match table.get(&observation.key()) {
            None => Disposition::Inserted,
            Some(existing) if *existing == row => Disposition::Unchanged,
            Some(_) => Disposition::Replaced,
        };
        table.insert(observation.key(), row);
        Ok(disposition)
    }

    async fn read_back(
        &self,
        key: NaturalKey,
        plan: &WritePlan,
    ) -> StoreResult<Option<FlatRecord>> {
        let tables = self.tables.lock().await;
        let Some(row) = tables.get(plan.table).and_then(|t| t.get(&key)) else {
            return Ok(None);
        };

        if let Some(payload) = &row.payload {
            return reconstruct(payload)
                .map(Some)
                .map_err(|source| StoreError::Reconstruction { key, source });
        }

        let values = compiled_fields()
            .iter()
            .map(|f| {
                row.columns
                    .iter()
                    .find(|(column, _)| *column == f.column())
                    .map(|(_, value)| value.clone())
                    .unwrap_or(FieldValue::Null)
            })
            .collect();
        Ok(Some(FlatRecord::new(key, values)))
    }

    async fn logical_rows(&self, plan: &WritePlan) -> StoreResult<u64> {
        let tables = self.tables.lock().await;
        Ok(tables.get(plan.table).map(|t| t.len() as u64).unwrap_or(0))
    }
}
