//! Generated DDL and statements for the column families
//!
//! Everything here is rendered from the core field table and the write
//! plans, so the stored schema, the insert statements, and the
//! reconstruction view cannot drift from the flattener.

use stratus_core::{columns, compiled_fields, field, tables, FieldKind, PlanError, WritePlan};

/// Name of the read-only view deriving the normalized shape from
/// `weather_raw`.
pub const RECONSTRUCTED_VIEW: &str = "weather_reconstructed";

/// Column type for a field kind.
pub fn sql_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Integer => "BIGINT",
        FieldKind::Float => "DOUBLE",
        FieldKind::Text => "VARCHAR(255)",
    }
}

/// `JSON_VALUE ... RETURNING` type for a field kind.
///
/// `JSON_VALUE` yields SQL NULL for both an absent path and a JSON null,
/// which keeps missing-vs-zero intact; casting `JSON_EXTRACT` output would
/// fold nulls to zero for numeric kinds.
fn returning_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Integer => "SIGNED",
        FieldKind::Float => "DOUBLE",
        FieldKind::Text => "CHAR(255)",
    }
}

/// `CREATE TABLE` for one family. The natural key is the primary key;
/// required fields are the only NOT NULL record columns.
pub fn create_table_sql(plan: &WritePlan) -> Result<String, PlanError> {
    plan.validate()?;

    let mut lines = Vec::new();
    for &column in &plan.field_columns {
        let f = field(column).ok_or(PlanError::UnknownColumn {
            table: plan.table,
            column,
        })?;
        let constraint = if f.required() { "NOT NULL" } else { "NULL" };
        lines.push(format!("  {} {} {}", column, sql_type(f.kind()), constraint));
    }
    if let Some(payload) = plan.payload_column {
        lines.push(format!("  {} JSON NOT NULL", payload));
    }
    lines.push(format!("  PRIMARY KEY ({})", plan.key_columns.join(", ")));

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        plan.table,
        lines.join(",\n")
    ))
}

/// The reconstruction view over `weather_raw`: one output column per
/// field-table row, names and types matching the normalized family.
pub fn create_view_sql() -> String {
    let lines: Vec<String> = compiled_fields()
        .iter()
        .map(|f| {
            format!(
                "  JSON_VALUE({}, '{}' RETURNING {}) AS {}",
                columns::PAYLOAD,
                f.path.to_mysql(),
                returning_type(f.kind()),
                f.column()
            )
        })
        .collect();

    format!(
        "CREATE OR REPLACE VIEW {} AS\nSELECT\n{}\nFROM {}",
        RECONSTRUCTED_VIEW,
        lines.join(",\n"),
        tables::RAW
    )
}

/// Idempotent insert for one family. MySQL's affected-row count then
/// distinguishes insert (1), replace (2), and identical re-submit (0).
pub fn insert_sql(plan: &WritePlan) -> Result<String, PlanError> {
    plan.validate()?;

    let insert_columns = plan.insert_columns();
    let placeholders = vec!["?"; insert_columns.len()].join(", ");

    let updates: Vec<String> = insert_columns
        .iter()
        .filter(|&&column| !plan.key_columns.contains(&column))
        .map(|&column| format!("{} = VALUES({})", column, column))
        .collect();
    let update_clause = if updates.is_empty() {
        // key-only family: a valid no-op assignment keeps the statement legal
        plan.key_columns
            .first()
            .map(|k| format!("{} = {}", k, k))
            .unwrap_or_default()
    } else {
        updates.join(", ")
    };

    Ok(format!(
        "INSERT INTO {} ({})\nVALUES ({})\nON DUPLICATE KEY UPDATE {}",
        plan.table,
        insert_columns.join(", "),
        placeholders,
        update_clause
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::Strategy;

    #[test]
    fn raw_family_ddl() {
        insta::assert_snapshot!(create_table_sql(Strategy::Raw.plan()).unwrap(), @r###"
        CREATE TABLE IF NOT EXISTS weather_raw (
          location_id BIGINT NOT NULL,
          observation_time BIGINT NOT NULL,
          payload JSON NOT NULL,
          PRIMARY KEY (location_id, observation_time)
        )
        "###);
    }

    #[test]
    fn hybrid_family_ddl() {
        insta::assert_snapshot!(create_table_sql(Strategy::Hybrid.plan()).unwrap(), @r###"
        CREATE TABLE IF NOT EXISTS weather_hybrid (
          location_id BIGINT NOT NULL,
          location_name VARCHAR(255) NULL,
          observation_time BIGINT NOT NULL,
          temperature DOUBLE NULL,
          humidity BIGINT NULL,
          condition_description VARCHAR(255) NULL,
          payload JSON NOT NULL,
          PRIMARY KEY (location_id, observation_time)
        )
        "###);
    }

    #[test]
    fn normalized_family_ddl() {
        insta::assert_snapshot!(create_table_sql(Strategy::Normalized.plan()).unwrap(), @r###"
        CREATE TABLE IF NOT EXISTS weather_normalized (
          location_id BIGINT NOT NULL,
          location_name VARCHAR(255) NULL,
          country_code VARCHAR(255) NULL,
          longitude DOUBLE NULL,
          latitude DOUBLE NULL,
          condition_id BIGINT NULL,
          condition_main VARCHAR(255) NULL,
          condition_description VARCHAR(255) NULL,
          condition_icon VARCHAR(255) NULL,
          base VARCHAR(255) NULL,
          temperature DOUBLE NULL,
          feels_like DOUBLE NULL,
          temp_min DOUBLE NULL,
          temp_max DOUBLE NULL,
          pressure BIGINT NULL,
          humidity BIGINT NULL,
          sea_level BIGINT NULL,
          ground_level BIGINT NULL,
          visibility BIGINT NULL,
          wind_speed DOUBLE NULL,
          wind_degree BIGINT NULL,
          cloud_coverage BIGINT NULL,
          observation_time BIGINT NOT NULL,
          sunrise_time BIGINT NULL,
          sunset_time BIGINT NULL,
          timezone_offset BIGINT NULL,
          sys_type BIGINT NULL,
          sys_id BIGINT NULL,
          response_code BIGINT NOT NULL,
          PRIMARY KEY (location_id, observation_time)
        )
        "###);
    }

    #[test]
    fn reconstruction_view_covers_every_field() {
        insta::assert_snapshot!(create_view_sql(), @r###"
        CREATE OR REPLACE VIEW weather_reconstructed AS
        SELECT
          JSON_VALUE(payload, '$.id' RETURNING SIGNED) AS location_id,
          JSON_VALUE(payload, '$.name' RETURNING CHAR(255)) AS location_name,
          JSON_VALUE(payload, '$.sys.country' RETURNING CHAR(255)) AS country_code,
          JSON_VALUE(payload, '$.coord.lon' RETURNING DOUBLE) AS longitude,
          JSON_VALUE(payload, '$.coord.lat' RETURNING DOUBLE) AS latitude,
          JSON_VALUE(payload, '$.weather[0].id' RETURNING SIGNED) AS condition_id,
          JSON_VALUE(payload, '$.weather[0].main' RETURNING CHAR(255)) AS condition_main,
          JSON_VALUE(payload, '$.weather[0].description' RETURNING CHAR(255)) AS condition_description,
          JSON_VALUE(payload, '$.weather[0].icon' RETURNING CHAR(255)) AS condition_icon,
          JSON_VALUE(payload, '$.base' RETURNING CHAR(255)) AS base,
          JSON_VALUE(payload, '$.main.temp' RETURNING DOUBLE) AS temperature,
          JSON_VALUE(payload, '$.main.feels_like' RETURNING DOUBLE) AS feels_like,
          JSON_VALUE(payload, '$.main.temp_min' RETURNING DOUBLE) AS temp_min,
          JSON_VALUE(payload, '$.main.temp_max' RETURNING DOUBLE) AS temp_max,
          JSON_VALUE(payload, '$.main.pressure' RETURNING SIGNED) AS pressure,
          JSON_VALUE(payload, '$.main.humidity' RETURNING SIGNED) AS humidity,
          JSON_VALUE(payload, '$.main.sea_level' RETURNING SIGNED) AS sea_level,
          JSON_VALUE(payload, '$.main.grnd_level' RETURNING SIGNED) AS ground_level,
          JSON_VALUE(payload, '$.visibility' RETURNING SIGNED) AS visibility,
          JSON_VALUE(payload, '$.wind.speed' RETURNING DOUBLE) AS wind_speed,
          JSON_VALUE(payload, '$.wind.deg' RETURNING SIGNED) AS wind_degree,
          JSON_VALUE(payload, '$.clouds.all' RETURNING SIGNED) AS cloud_coverage,
          JSON_VALUE(payload, '$.dt' RETURNING SIGNED) AS observation_time,
          JSON_VALUE(payload, '$.sys.sunrise' RETURNING SIGNED) AS sunrise_time,
          JSON_VALUE(payload, '$.sys.sunset' RETURNING SIGNED) AS sunset_time,
          JSON_VALUE(payload, '$.timezone' RETURNING SIGNED) AS timezone_offset,
          JSON_VALUE(payload, '$.sys.type' RETURNING SIGNED) AS sys_type,
          JSON_VALUE(payload, '$.sys.id' RETURNING SIGNED) AS sys_id,
          JSON_VALUE(payload, '$.cod' RETURNING SIGNED) AS response_code
        FROM weather_raw
        "###);
    }

    #[test]
    fn raw_insert_updates_the_payload() {
        insta::assert_snapshot!(insert_sql(Strategy::Raw.plan()).unwrap(), @r###"
        INSERT INTO weather_raw (location_id, observation_time, payload)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE payload = VALUES(payload)
        "###);
    }

    #[test]
    fn hybrid_insert_updates_fields_and_payload() {
        insta::assert_snapshot!(insert_sql(Strategy::Hybrid.plan()).unwrap(), @r###"
        INSERT INTO weather_hybrid (location_id, location_name, observation_time, temperature, humidity, condition_description, payload)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE location_name = VALUES(location_name), temperature = VALUES(temperature), humidity = VALUES(humidity), condition_description = VALUES(condition_description), payload = VALUES(payload)
        "###);
    }

    #[test]
    fn normalized_insert_covers_every_column() {
        let sql = insert_sql(Strategy::Normalized.plan()).unwrap();

        assert!(sql.starts_with("INSERT INTO weather_normalized (location_id, "));
        assert_eq!(sql.matches('?').count(), stratus_core::FIELDS.len());
        // every non-key column is refreshed on replace
        assert_eq!(
            sql.matches(" = VALUES(").count(),
            stratus_core::FIELDS.len() - 2
        );
        assert!(!sql.contains("payload"));
    }

    #[test]
    fn generation_rejects_invalid_plans() {
        let bogus = WritePlan {
            strategy: Strategy::Raw,
            table: "weather_raw",
            key_columns: stratus_core::KEY_COLUMNS,
            field_columns: vec!["location_id", "observation_time", "dewpoint"],
            payload_column: None,
        };
        assert!(create_table_sql(&bogus).is_err());
        assert!(insert_sql(&bogus).is_err());
    }
}
