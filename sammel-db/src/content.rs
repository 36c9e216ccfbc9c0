//! Per-album content tables: one row per item.

use rusqlite::types::Value;
use rusqlite::{Connection, params};
use sammel_model::MetaItemField;
use sammel_model::naming::quote_identifier;
use uuid::Uuid;

use crate::error::StoreError;
use crate::type_info::{SCHEMA_VERSION_COLUMN, TYPE_INFO_ROW_ID};

pub(crate) const ID_COLUMN: &str = "id";
pub(crate) const TYPE_INFO_COLUMN: &str = "typeinfo";
pub(crate) const CONTENT_VERSION_COLUMN: &str = "content_version";

/// Column names that user fields may not take (compared ignoring case).
pub(crate) const RESERVED_COLUMNS: [&str; 4] = [
    ID_COLUMN,
    TYPE_INFO_COLUMN,
    CONTENT_VERSION_COLUMN,
    SCHEMA_VERSION_COLUMN,
];

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED_COLUMNS
        .iter()
        .any(|r| r.eq_ignore_ascii_case(name.trim()))
}

pub(crate) fn create_content_table(
    conn: &Connection,
    table: &str,
    type_info_table: &str,
    fields: &[MetaItemField],
) -> Result<(), StoreError> {
    let mut columns = vec![format!("{ID_COLUMN} INTEGER PRIMARY KEY")];
    columns.extend(fields.iter().map(|f| {
        format!(
            "{} {}",
            quote_identifier(&f.name),
            f.field_type.storage_type()
        )
    }));
    columns.push(format!("{CONTENT_VERSION_COLUMN} TEXT NOT NULL"));
    columns.push(format!(
        "{TYPE_INFO_COLUMN} INTEGER NOT NULL DEFAULT {TYPE_INFO_ROW_ID} REFERENCES {}(id)",
        quote_identifier(type_info_table)
    ));

    conn.execute_batch(&format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table),
        columns.join(", ")
    ))?;
    log::debug!("Created content table '{table}'");
    Ok(())
}

pub(crate) fn drop_content_table(conn: &Connection, table: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_identifier(table)))?;
    log::debug!("Dropped content table '{table}'");
    Ok(())
}

pub(crate) fn rename_table(conn: &Connection, from: &str, to: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "ALTER TABLE {} RENAME TO {}",
        quote_identifier(from),
        quote_identifier(to)
    ))?;
    log::debug!("Renamed table '{from}' to '{to}'");
    Ok(())
}

/// Physical column names in declaration order.
pub(crate) fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Column names of user fields, in declaration order.
pub(crate) fn user_column_names(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    Ok(column_names(conn, table)?
        .into_iter()
        .filter(|c| !is_reserved(c))
        .collect())
}

/// Append a column and set it to `default` in every existing row.
pub(crate) fn append_column(
    conn: &Connection,
    table: &str,
    field: &MetaItemField,
    default: Value,
) -> Result<usize, StoreError> {
    let table = quote_identifier(table);
    let column = quote_identifier(&field.name);
    conn.execute_batch(&format!(
        "ALTER TABLE {table} ADD COLUMN {column} {}",
        field.field_type.storage_type()
    ))?;
    let filled = conn.execute(&format!("UPDATE {table} SET {column} = ?1"), [default])?;
    Ok(filled)
}

/// Insert a row. When `id` is `None` the store assigns one.
pub(crate) fn insert_row(
    conn: &Connection,
    table: &str,
    id: Option<i64>,
    values: &[(String, Value)],
    content_version: Uuid,
) -> Result<i64, StoreError> {
    let mut names = Vec::with_capacity(values.len() + 3);
    let mut params: Vec<Value> = Vec::with_capacity(values.len() + 3);
    if let Some(id) = id {
        names.push(ID_COLUMN.to_string());
        params.push(Value::Integer(id));
    }
    for (name, value) in values {
        names.push(quote_identifier(name));
        params.push(value.clone());
    }
    names.push(CONTENT_VERSION_COLUMN.to_string());
    params.push(Value::Text(content_version.to_string()));
    names.push(TYPE_INFO_COLUMN.to_string());
    params.push(Value::Integer(TYPE_INFO_ROW_ID));

    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{i}")).collect();
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            names.join(", "),
            placeholders.join(", ")
        ),
        rusqlite::params_from_iter(params),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the given columns and the content version of one row.
/// Returns the number of rows changed (0 when the id does not exist).
pub(crate) fn update_row(
    conn: &Connection,
    table: &str,
    id: i64,
    values: &[(String, Value)],
    content_version: Uuid,
) -> Result<usize, StoreError> {
    let mut assignments: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{} = ?{}", quote_identifier(name), i + 1))
        .collect();
    assignments.push(format!("{CONTENT_VERSION_COLUMN} = ?{}", values.len() + 1));

    let mut params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
    params.push(Value::Text(content_version.to_string()));
    params.push(Value::Integer(id));

    let changed = conn.execute(
        &format!(
            "UPDATE {} SET {} WHERE {ID_COLUMN} = ?{}",
            quote_identifier(table),
            assignments.join(", "),
            values.len() + 2
        ),
        rusqlite::params_from_iter(params),
    )?;
    Ok(changed)
}

pub(crate) fn delete_row(conn: &Connection, table: &str, id: i64) -> Result<usize, StoreError> {
    let deleted = conn.execute(
        &format!("DELETE FROM {} WHERE {ID_COLUMN} = ?1", quote_identifier(table)),
        params![id],
    )?;
    Ok(deleted)
}

pub(crate) fn row_count(conn: &Connection, table: &str) -> Result<i64, StoreError> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
