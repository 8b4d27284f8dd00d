//! Record assembly and read-time reconstruction
//!
//! `flatten` walks the field table once per document and never emits a
//! partial record. `reconstruct` applies the identical walk to a stored
//! payload; for any payload the two must agree field for field.

use crate::document::SourceDocument;
use crate::fields::{columns, compiled_fields, extract, FIELDS};
use crate::record::{FlatRecord, NaturalKey, Observation};
use crate::{FlattenError, FlattenResult};
use serde_json::Value;

/// Flatten one document into a writable observation.
pub fn flatten(document: &SourceDocument) -> FlattenResult<Observation> {
    let record = assemble(document.root())?;
    Ok(Observation {
        record,
        payload: document.payload().to_string(),
    })
}

/// Re-derive the flattened record from a stored payload.
pub fn reconstruct(payload: &str) -> FlattenResult<FlatRecord> {
    let root: Value = serde_json::from_str(payload)?;
    assemble(&root)
}

fn assemble(root: &Value) -> FlattenResult<FlatRecord> {
    let fields = compiled_fields();
    let mut values = Vec::with_capacity(fields.len());
    let mut location_id = None;
    let mut observation_time = None;

    for field in fields {
        let value = extract(root, field)?;
        if field.required() && value.is_null() {
            return Err(FlattenError::RequiredFieldMissing {
                field: field.spec.column,
                path: field.spec.path,
            });
        }
        if field.column() == columns::LOCATION_ID {
            location_id = value.as_i64();
        } else if field.column() == columns::OBSERVATION_TIME {
            observation_time = value.as_i64();
        }
        values.push(value);
    }

    let key = NaturalKey {
        location_id: location_id.ok_or_else(|| missing_key(columns::LOCATION_ID))?,
        observation_time: observation_time
            .ok_or_else(|| missing_key(columns::OBSERVATION_TIME))?,
    };

    Ok(FlatRecord::new(key, values))
}

fn missing_key(column: &'static str) -> FlattenError {
    let path = FIELDS
        .iter()
        .find(|f| f.column == column)
        .map(|f| f.path)
        .unwrap_or(column);
    FlattenError::RequiredFieldMissing {
        field: column,
        path,
    }
}
