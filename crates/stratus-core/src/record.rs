//! Flattened records and their identity

use crate::fields::{columns, column_index, FIELDS};
use crate::value::FieldValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The caller-independent identity of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub location_id: i64,
    pub observation_time: i64,
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.location_id, self.observation_time)
    }
}

/// One flattened observation record: a value per field-table row, in
/// table order, plus the extracted natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    key: NaturalKey,
    values: Vec<FieldValue>,
}

impl FlatRecord {
    /// Build a record from values in field-table order. Callers supply one
    /// value per table row; store backends use this to rehydrate rows.
    pub fn new(key: NaturalKey, values: Vec<FieldValue>) -> Self {
        debug_assert_eq!(values.len(), FIELDS.len());
        Self { key, values }
    }

    pub fn key(&self) -> NaturalKey {
        self.key
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Value of a column, by field-table name.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        column_index(column).map(|idx| &self.values[idx])
    }

    /// Iterate `(column, value)` pairs in table order.
    pub fn columns(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        FIELDS
            .iter()
            .map(|f| f.column)
            .zip(self.values.iter())
    }

    /// Observation instant as a calendar timestamp. Derived on demand;
    /// the stored form stays integer seconds.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.key.observation_time, 0)
    }

    pub fn sunrise(&self) -> Option<DateTime<Utc>> {
        self.timestamp_column(columns::SUNRISE_TIME)
    }

    pub fn sunset(&self) -> Option<DateTime<Utc>> {
        self.timestamp_column(columns::SUNSET_TIME)
    }

    fn timestamp_column(&self, column: &str) -> Option<DateTime<Utc>> {
        self.get(column)
            .and_then(FieldValue::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// A flattened record together with the payload it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub record: FlatRecord,
    pub payload: String,
}

impl Observation {
    pub fn key(&self) -> NaturalKey {
        self.record.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    fn record_with(column: &str, value: FieldValue) -> FlatRecord {
        let mut values = vec![FieldValue::Null; FIELDS.len()];
        if let Some(idx) = column_index(column) {
            values[idx] = value;
        }
        FlatRecord::new(
            NaturalKey {
                location_id: 1264521,
                observation_time: 1763485325,
            },
            values,
        )
    }

    #[test]
    fn get_resolves_by_column_name() {
        let record = record_with("humidity", FieldValue::Integer(94));
        assert_eq!(record.get("humidity"), Some(&FieldValue::Integer(94)));
        assert_eq!(record.get("visibility"), Some(&FieldValue::Null));
        assert_eq!(record.get("bogus"), None);
    }

    #[test]
    fn calendar_derivations_come_from_stored_seconds() {
        let record = record_with("sunrise_time", FieldValue::Integer(1763426594));

        let observed = record.observed_at().unwrap();
        assert_eq!(observed.timestamp(), 1763485325);

        let sunrise = record.sunrise().unwrap();
        assert_eq!(sunrise.timestamp(), 1763426594);

        // absent upstream -> no derivation, never a zero epoch
        assert!(record.sunset().is_none());
    }

    #[test]
    fn key_displays_for_logs() {
        let key = NaturalKey {
            location_id: 1264521,
            observation_time: 1763485325,
        };
        assert_eq!(key.to_string(), "(1264521, 1763485325)");
    }
}
