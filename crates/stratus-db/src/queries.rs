//! Store operations against the MySQL column families

use crate::schema;
use crate::{DbClient, Disposition, ObservationStore, StoreError, StoreResult};
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{MySql, Row};
use stratus_core::{
    compiled_fields, field, reconstruct, CompiledField, FieldKind, FieldValue, FlatRecord,
    NaturalKey, Observation, PlanError, Strategy, WritePlan,
};
use tracing::{debug, instrument};

impl DbClient {
    /// Create the three column families and the reconstruction view if
    /// they do not exist yet.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for strategy in Strategy::ALL {
            let ddl = schema::create_table_sql(strategy.plan())?;
            sqlx::query(&ddl).execute(self.pool()).await?;
        }
        sqlx::query(&schema::create_view_sql())
            .execute(self.pool())
            .await?;

        debug!("column families and reconstruction view ensured");
        Ok(())
    }

    /// Stored payload text for one key, from a payload-carrying family.
    #[instrument(skip(self, plan), fields(table = plan.table))]
    pub async fn fetch_payload(
        &self,
        key: NaturalKey,
        plan: &WritePlan,
    ) -> StoreResult<Option<String>> {
        let column = plan
            .payload_column
            .ok_or(StoreError::MissingPayload { table: plan.table })?;

        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            column,
            plan.table,
            key_predicate(plan)
        );
        let row = sqlx::query(&sql)
            .bind(key.location_id)
            .bind(key.observation_time)
            .fetch_optional(self.pool())
            .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let value: sqlx::types::Json<serde_json::Value> = row.try_get(column)?;
                Ok(Some(value.0.to_string()))
            }
        }
    }

    async fn fetch_columns(
        &self,
        key: NaturalKey,
        plan: &WritePlan,
    ) -> StoreResult<Option<FlatRecord>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {}",
            plan.table,
            key_predicate(plan)
        );
        let row = sqlx::query(&sql)
            .bind(key.location_id)
            .bind(key.observation_time)
            .fetch_optional(self.pool())
            .await?;

        let Some(row) = row else { return Ok(None) };

        let mut values = Vec::with_capacity(compiled_fields().len());
        for f in compiled_fields() {
            let value = if plan.field_columns.contains(&f.column()) {
                decode_field(&row, f)?
            } else {
                FieldValue::Null
            };
            values.push(value);
        }
        Ok(Some(FlatRecord::new(key, values)))
    }
}

#[async_trait]
impl ObservationStore for DbClient {
    #[instrument(skip(self, observation, plan), fields(key = %observation.key(), table = plan.table))]
    async fn insert(
        &self,
        observation: &Observation,
        plan: &WritePlan,
    ) -> StoreResult<Disposition> {
        let sql = schema::insert_sql(plan)?;
        let mut query = sqlx::query(&sql);

        for &column in &plan.field_columns {
            let f = field(column).ok_or(PlanError::UnknownColumn {
                table: plan.table,
                column,
            })?;
            let value = observation
                .record
                .get(column)
                .cloned()
                .unwrap_or(FieldValue::Null);
            query = bind_field(query, f.kind(), value);
        }
        if plan.payload_column.is_some() {
            query = query.bind(observation.payload.clone());
        }

        let result = query.execute(self.pool()).await?;
        let disposition = match result.rows_affected() {
            0 => Disposition::Unchanged,
            1 => Disposition::Inserted,
            _ => Disposition::Replaced,
        };

        debug!(rows = result.rows_affected(), "observation write");
        Ok(disposition)
    }

    async fn read_back(
        &self,
        key: NaturalKey,
        plan: &WritePlan,
    ) -> StoreResult<Option<FlatRecord>> {
        if plan.carries_payload() {
            match self.fetch_payload(key, plan).await? {
                None => Ok(None),
                Some(payload) => reconstruct(&payload)
                    .map(Some)
                    .map_err(|source| StoreError::Reconstruction { key, source }),
            }
        } else {
            self.fetch_columns(key, plan).await
        }
    }

    #[instrument(skip(self, plan), fields(table = plan.table))]
    async fn logical_rows(&self, plan: &WritePlan) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", plan.table);
        let row = sqlx::query(&sql).fetch_one(self.pool()).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }
}

/// Equality predicate over the plan's key columns, bound in the
/// `KEY_COLUMNS` order.
fn key_predicate(plan: &WritePlan) -> String {
    plan.key_columns
        .iter()
        .map(|column| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Bind one record value; nulls are typed by the column's kind.
fn bind_field(
    query: Query<'_, MySql, MySqlArguments>,
    kind: FieldKind,
    value: FieldValue,
) -> Query<'_, MySql, MySqlArguments> {
    match value {
        FieldValue::Integer(v) => query.bind(v),
        FieldValue::Float(v) => query.bind(v),
        FieldValue::Text(v) => query.bind(v),
        FieldValue::Null => match kind {
            FieldKind::Integer => query.bind(Option::<i64>::None),
            FieldKind::Float => query.bind(Option::<f64>::None),
            FieldKind::Text => query.bind(Option::<String>::None),
        },
    }
}

fn decode_field(row: &MySqlRow, field: &CompiledField) -> StoreResult<FieldValue> {
    let value = match field.kind() {
        FieldKind::Integer => row
            .try_get::<Option<i64>, _>(field.column())?
            .map(FieldValue::Integer),
        FieldKind::Float => row
            .try_get::<Option<f64>, _>(field.column())?
            .map(FieldValue::Float),
        FieldKind::Text => row
            .try_get::<Option<String>, _>(field.column())?
            .map(FieldValue::Text),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}
