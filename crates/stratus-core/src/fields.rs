//! The declarative field table
//!
//! One row per flattened column: target column name, source path
//! expression, coercion kind, and whether extraction may fail the
//! document. Extraction, record assembly, reconstruction, and the SQL
//! generators all walk this table; nothing else enumerates fields.

use crate::path::JsonPath;
use crate::value::{FieldKind, FieldValue};
use crate::{FlattenError, FlattenResult};
use serde_json::Value;
use std::sync::OnceLock;

/// One row of the field table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub path: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn spec(
    column: &'static str,
    path: &'static str,
    kind: FieldKind,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        column,
        path,
        kind,
        required,
    }
}

/// Column names referenced by name elsewhere in the workspace.
pub mod columns {
    pub const LOCATION_ID: &str = "location_id";
    pub const LOCATION_NAME: &str = "location_name";
    pub const CONDITION_DESCRIPTION: &str = "condition_description";
    pub const TEMPERATURE: &str = "temperature";
    pub const HUMIDITY: &str = "humidity";
    pub const OBSERVATION_TIME: &str = "observation_time";
    pub const SUNRISE_TIME: &str = "sunrise_time";
    pub const SUNSET_TIME: &str = "sunset_time";
    pub const RESPONSE_CODE: &str = "response_code";

    /// Raw-payload column carried by the raw and hybrid families.
    pub const PAYLOAD: &str = "payload";
}

/// The flattened schema, in column order.
pub const FIELDS: &[FieldSpec] = &[
    spec("location_id", "id", FieldKind::Integer, true),
    spec("location_name", "name", FieldKind::Text, false),
    spec("country_code", "sys.country", FieldKind::Text, false),
    spec("longitude", "coord.lon", FieldKind::Float, false),
    spec("latitude", "coord.lat", FieldKind::Float, false),
    spec("condition_id", "weather[0].id", FieldKind::Integer, false),
    spec("condition_main", "weather[0].main", FieldKind::Text, false),
    spec(
        "condition_description",
        "weather[0].description",
        FieldKind::Text,
        false,
    ),
    spec("condition_icon", "weather[0].icon", FieldKind::Text, false),
    spec("base", "base", FieldKind::Text, false),
    spec("temperature", "main.temp", FieldKind::Float, false),
    spec("feels_like", "main.feels_like", FieldKind::Float, false),
    spec("temp_min", "main.temp_min", FieldKind::Float, false),
    spec("temp_max", "main.temp_max", FieldKind::Float, false),
    spec("pressure", "main.pressure", FieldKind::Integer, false),
    spec("humidity", "main.humidity", FieldKind::Integer, false),
    spec("sea_level", "main.sea_level", FieldKind::Integer, false),
    spec("ground_level", "main.grnd_level", FieldKind::Integer, false),
    spec("visibility", "visibility", FieldKind::Integer, false),
    spec("wind_speed", "wind.speed", FieldKind::Float, false),
    spec("wind_degree", "wind.deg", FieldKind::Integer, false),
    spec("cloud_coverage", "clouds.all", FieldKind::Integer, false),
    spec("observation_time", "dt", FieldKind::Integer, true),
    spec("sunrise_time", "sys.sunrise", FieldKind::Integer, false),
    spec("sunset_time", "sys.sunset", FieldKind::Integer, false),
    spec("timezone_offset", "timezone", FieldKind::Integer, false),
    spec("sys_type", "sys.type", FieldKind::Integer, false),
    spec("sys_id", "sys.id", FieldKind::Integer, false),
    spec("response_code", "cod", FieldKind::Integer, true),
];

/// A field table row with its path expression compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub spec: &'static FieldSpec,
    pub path: JsonPath,
}

impl CompiledField {
    pub fn column(&self) -> &'static str {
        self.spec.column
    }

    pub fn kind(&self) -> FieldKind {
        self.spec.kind
    }

    pub fn required(&self) -> bool {
        self.spec.required
    }
}

/// The compiled table, built once. Path expressions are compile-time
/// constants, so a parse failure here is a defect in the table itself.
pub fn compiled_fields() -> &'static [CompiledField] {
    static COMPILED: OnceLock<Vec<CompiledField>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        FIELDS
            .iter()
            .map(|spec| CompiledField {
                spec,
                path: JsonPath::parse(spec.path).expect("field table path expression"),
            })
            .collect()
    })
}

/// Look up a table row by column name.
pub fn field(column: &str) -> Option<&'static CompiledField> {
    compiled_fields().iter().find(|f| f.column() == column)
}

/// Position of a column within the table (and within assembled records).
pub fn column_index(column: &str) -> Option<usize> {
    FIELDS.iter().position(|f| f.column == column)
}

/// Extract one field from a parsed document.
///
/// A failed descent or an explicit JSON null resolves to `Null`; a leaf of
/// the wrong shape is a malformed-field error.
pub fn extract(root: &Value, field: &CompiledField) -> FlattenResult<FieldValue> {
    let leaf = match field.path.lookup(root) {
        None | Some(Value::Null) => return Ok(FieldValue::Null),
        Some(leaf) => leaf,
    };

    field
        .kind()
        .coerce(leaf)
        .map_err(|found| FlattenError::MalformedField {
            field: field.spec.column,
            path: field.spec.path,
            expected: field.kind(),
            found,
        })
}
