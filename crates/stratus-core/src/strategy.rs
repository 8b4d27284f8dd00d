//! Storage strategies and their write plans
//!
//! A strategy is a pure data lookup: each variant resolves to a static
//! `WritePlan` naming its table, column subset, and idempotency key. A
//! plan whose key is not among its columns cannot exist past validation.

use crate::fields::{column_index, columns};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Target tables, one per column family.
pub mod tables {
    pub const RAW: &str = "weather_raw";
    pub const NORMALIZED: &str = "weather_normalized";
    pub const HYBRID: &str = "weather_hybrid";
}

/// The natural key, shared by every family.
pub const KEY_COLUMNS: &[&str] = &[columns::LOCATION_ID, columns::OBSERVATION_TIME];

const HYBRID_FIELDS: &[&str] = &[
    columns::LOCATION_ID,
    columns::LOCATION_NAME,
    columns::OBSERVATION_TIME,
    columns::TEMPERATURE,
    columns::HUMIDITY,
    columns::CONDITION_DESCRIPTION,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Natural key plus the verbatim payload.
    Raw,
    /// Every field-table column, no payload.
    Normalized,
    /// Indexed key fields plus the payload.
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Raw, Strategy::Normalized, Strategy::Hybrid];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Raw => "raw",
            Strategy::Normalized => "normalized",
            Strategy::Hybrid => "hybrid",
        }
    }

    pub fn plan(&self) -> &'static WritePlan {
        match self {
            Strategy::Raw => raw_plan(),
            Strategy::Normalized => normalized_plan(),
            Strategy::Hybrid => hybrid_plan(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown storage strategy `{0}`, expected raw, normalized, or hybrid")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(Strategy::Raw),
            "normalized" => Ok(Strategy::Normalized),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// What one strategy writes: target table, record columns in write order,
/// key columns, and whether the payload rides along.
#[derive(Debug, Clone, PartialEq)]
pub struct WritePlan {
    pub strategy: Strategy,
    pub table: &'static str,
    pub key_columns: &'static [&'static str],
    pub field_columns: Vec<&'static str>,
    pub payload_column: Option<&'static str>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("table `{table}` declares no natural-key columns")]
    NoKey { table: &'static str },

    #[error("table `{table}` references unknown column `{column}`")]
    UnknownColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("table `{table}` is missing natural-key column `{column}`")]
    MissingKeyColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl WritePlan {
    /// Reject plans whose columns are not field-table columns or whose
    /// key is not fully carried.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.key_columns.is_empty() {
            return Err(PlanError::NoKey { table: self.table });
        }
        for &column in &self.field_columns {
            if column_index(column).is_none() {
                return Err(PlanError::UnknownColumn {
                    table: self.table,
                    column,
                });
            }
        }
        for &key in self.key_columns {
            if !self.field_columns.contains(&key) {
                return Err(PlanError::MissingKeyColumn {
                    table: self.table,
                    column: key,
                });
            }
        }
        Ok(())
    }

    /// All columns in insert order: record fields first, payload last.
    pub fn insert_columns(&self) -> Vec<&'static str> {
        let mut cols = self.field_columns.clone();
        if let Some(payload) = self.payload_column {
            cols.push(payload);
        }
        cols
    }

    pub fn carries_payload(&self) -> bool {
        self.payload_column.is_some()
    }
}

fn raw_plan() -> &'static WritePlan {
    static PLAN: OnceLock<WritePlan> = OnceLock::new();
    PLAN.get_or_init(|| WritePlan {
        strategy: Strategy::Raw,
        table: tables::RAW,
        key_columns: KEY_COLUMNS,
        field_columns: KEY_COLUMNS.to_vec(),
        payload_column: Some(columns::PAYLOAD),
    })
}

fn normalized_plan() -> &'static WritePlan {
    static PLAN: OnceLock<WritePlan> = OnceLock::new();
    PLAN.get_or_init(|| WritePlan {
        strategy: Strategy::Normalized,
        table: tables::NORMALIZED,
        key_columns: KEY_COLUMNS,
        field_columns: crate::fields::FIELDS.iter().map(|f| f.column).collect(),
        payload_column: None,
    })
}

fn hybrid_plan() -> &'static WritePlan {
    static PLAN: OnceLock<WritePlan> = OnceLock::new();
    PLAN.get_or_init(|| WritePlan {
        strategy: Strategy::Hybrid,
        table: tables::HYBRID,
        key_columns: KEY_COLUMNS,
        field_columns: HYBRID_FIELDS.to_vec(),
        payload_column: Some(columns::PAYLOAD),
    })
}
