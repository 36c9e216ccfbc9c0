//! Per-album type-info tables.
//!
//! A type-info table has one row (id 1) holding, per user field, the name of
//! its `FieldType`, plus the album's schema version token. Content rows
//! reference this row through their `typeinfo` column.

use std::collections::HashMap;

use rusqlite::{Connection, params};
use sammel_model::naming::quote_identifier;
use sammel_model::{FieldType, MetaItemField};
use uuid::Uuid;

use crate::error::StoreError;

pub(crate) const TYPE_INFO_ROW_ID: i64 = 1;
pub(crate) const SCHEMA_VERSION_COLUMN: &str = "schema_version";

/// Create the type-info table for `fields` and fill in its single row.
/// Returns the new schema version.
pub(crate) fn create_type_info_table(
    conn: &Connection,
    type_info_table: &str,
    fields: &[MetaItemField],
) -> Result<Uuid, StoreError> {
    let mut columns = vec!["id INTEGER PRIMARY KEY".to_string()];
    columns.extend(
        fields
            .iter()
            .map(|f| format!("{} TEXT NOT NULL", quote_identifier(&f.name))),
    );
    columns.push(format!("{SCHEMA_VERSION_COLUMN} TEXT NOT NULL"));
    conn.execute_batch(&format!(
        "CREATE TABLE {} ({})",
        quote_identifier(type_info_table),
        columns.join(", ")
    ))?;

    let version = Uuid::new_v4();
    let mut names = vec!["id".to_string()];
    names.extend(fields.iter().map(|f| quote_identifier(&f.name)));
    names.push(SCHEMA_VERSION_COLUMN.to_string());
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();

    let mut values: Vec<rusqlite::types::Value> = vec![TYPE_INFO_ROW_ID.into()];
    values.extend(fields.iter().map(|f| f.field_type.name().to_string().into()));
    values.push(version.to_string().into());

    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(type_info_table),
            names.join(", "),
            placeholders.join(", ")
        ),
        rusqlite::params_from_iter(values),
    )?;
    log::debug!("Created type-info table '{type_info_table}' with {} fields", fields.len());
    Ok(version)
}

/// Append a column for `field` and record its type in the existing row.
pub(crate) fn append_column(
    conn: &Connection,
    type_info_table: &str,
    field: &MetaItemField,
) -> Result<(), StoreError> {
    let table = quote_identifier(type_info_table);
    let column = quote_identifier(&field.name);
    conn.execute_batch(&format!(
        "ALTER TABLE {table} ADD COLUMN {column} TEXT NOT NULL DEFAULT ''"
    ))?;
    conn.execute(
        &format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2"),
        params![field.field_type.name(), TYPE_INFO_ROW_ID],
    )?;
    Ok(())
}

pub(crate) fn regenerate_schema_version(
    conn: &Connection,
    type_info_table: &str,
) -> Result<Uuid, StoreError> {
    let version = Uuid::new_v4();
    conn.execute(
        &format!(
            "UPDATE {} SET {SCHEMA_VERSION_COLUMN} = ?1 WHERE id = ?2",
            quote_identifier(type_info_table)
        ),
        params![version.to_string(), TYPE_INFO_ROW_ID],
    )?;
    log::debug!("Schema version of '{type_info_table}' is now {version}");
    Ok(version)
}

pub(crate) fn schema_version(conn: &Connection, type_info_table: &str) -> Result<Uuid, StoreError> {
    let text: String = conn.query_row(
        &format!(
            "SELECT {SCHEMA_VERSION_COLUMN} FROM {} WHERE id = ?1",
            quote_identifier(type_info_table)
        ),
        [TYPE_INFO_ROW_ID],
        |row| row.get(0),
    )?;
    Uuid::parse_str(&text)
        .map_err(|e| StoreError::decode(SCHEMA_VERSION_COLUMN, FieldType::Uuid, e.to_string()))
}

/// Field name to declared type, read from the single type-info row.
pub(crate) fn field_types(
    conn: &Connection,
    type_info_table: &str,
) -> Result<HashMap<String, FieldType>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM {} WHERE id = ?1",
        quote_identifier(type_info_table)
    ))?;
    let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query([TYPE_INFO_ROW_ID])?;
    let Some(row) = rows.next()? else {
        return Err(StoreError::Inconsistent(format!(
            "type-info table '{type_info_table}' has no type row"
        )));
    };

    let mut types = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if name == "id" || name == SCHEMA_VERSION_COLUMN {
            continue;
        }
        let type_name: String = row.get(i)?;
        let field_type = type_name
            .parse()
            .map_err(|_| StoreError::decode(name, FieldType::Text, format!("unknown field type '{type_name}'")))?;
        types.insert(name.clone(), field_type);
    }
    Ok(types)
}

pub(crate) fn drop_type_info_table(conn: &Connection, type_info_table: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_identifier(type_info_table)))?;
    log::debug!("Dropped type-info table '{type_info_table}'");
    Ok(())
}

pub(crate) fn rename_type_info_table(conn: &Connection, from: &str, to: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_identifier(from),
        quote_identifier(to)
    ))?;
    Ok(())
}
