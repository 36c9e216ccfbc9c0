//! Quicksearch: the covering index over quick-searchable fields and the
//! free-text queries that use it.

use chrono::NaiveDate;
use rusqlite::Connection;
use sammel_model::naming::{quote_identifier, select_all_query};
use sammel_model::query::predicate;
use sammel_model::types::{DATE_FORMAT, TIME_FORMAT, parse_time};
use sammel_model::{FieldType, MetaItemField, QueryOperator};

use crate::catalog::AlbumEntry;
use crate::error::StoreError;

/// Replace the album's index with one covering `columns`. An empty list
/// leaves the album without an index.
pub(crate) fn rebuild_index(
    conn: &Connection,
    entry: &AlbumEntry,
    columns: &[&str],
) -> Result<(), StoreError> {
    drop_indexes(conn, &entry.table_name)?;
    if columns.is_empty() {
        return Ok(());
    }
    let column_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
    conn.execute_batch(&format!(
        "CREATE INDEX {} ON {} ({})",
        quote_identifier(&entry.index_name()),
        quote_identifier(&entry.table_name),
        column_list.join(", ")
    ))?;
    log::debug!(
        "Rebuilt index '{}' over {}",
        entry.index_name(),
        columns.join(", ")
    );
    Ok(())
}

/// Drop every explicitly created index on a table.
pub(crate) fn drop_indexes(conn: &Connection, table: &str) -> Result<(), StoreError> {
    for index in index_names(conn, table)? {
        conn.execute_batch(&format!("DROP INDEX IF EXISTS {}", quote_identifier(&index)))?;
    }
    Ok(())
}

fn index_names(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL
         ORDER BY name",
    )?;
    let rows = stmt.query_map([table], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Name of the table's quicksearch index, if it has one.
pub(crate) fn table_index_name(conn: &Connection, table: &str) -> Result<Option<String>, StoreError> {
    Ok(index_names(conn, table)?.into_iter().next())
}

/// Columns covered by the table's quicksearch index, in index order.
pub(crate) fn indexed_column_names(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let Some(index) = table_index_name(conn, table)? else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
    let rows = stmt.query_map([index], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Compose the quicksearch query for `terms` over the quick-searchable
/// fields of an album.
///
/// Each term matches an item when any quick-searchable field matches it;
/// the per-term results are combined with `UNION`. Without terms or
/// quick-searchable fields every item is selected.
pub fn quicksearch_query<S: AsRef<str>>(
    album_name: &str,
    fields: &[MetaItemField],
    terms: &[S],
) -> String {
    let select_all = select_all_query(album_name);
    let searchable: Vec<&MetaItemField> = fields.iter().filter(|f| f.quick_searchable).collect();
    let terms: Vec<&str> = terms
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();
    if searchable.is_empty() || terms.is_empty() {
        return select_all;
    }

    let selects: Vec<String> = terms
        .iter()
        .filter_map(|term| {
            let predicates: Vec<String> = searchable
                .iter()
                .filter_map(|field| term_predicate(field, term))
                .collect();
            (!predicates.is_empty())
                .then(|| format!("{select_all} WHERE {}", predicates.join(" OR ")))
        })
        .collect();

    if selects.is_empty() {
        format!("{select_all} WHERE 0 = 1")
    } else {
        selects.join(" UNION ")
    }
}

/// Predicate matching `term` against one field, or `None` when the term
/// cannot be a value of the field's type.
fn term_predicate(field: &MetaItemField, term: &str) -> Option<String> {
    let (operator, value) = match field.field_type {
        FieldType::Text | FieldType::Url | FieldType::Option => {
            (QueryOperator::Like, term.to_string())
        }
        FieldType::Id | FieldType::Integer | FieldType::StarRating => {
            (QueryOperator::Equals, term.parse::<i64>().ok()?.to_string())
        }
        FieldType::Decimal => {
            term.parse::<f64>().ok()?;
            (QueryOperator::Equals, term.to_string())
        }
        FieldType::Date => {
            let date = NaiveDate::parse_from_str(term, DATE_FORMAT).ok()?;
            (QueryOperator::Equals, date.format(DATE_FORMAT).to_string())
        }
        FieldType::Time => {
            let time = parse_time(term)?;
            (QueryOperator::Equals, time.format(TIME_FORMAT).to_string())
        }
        FieldType::Uuid | FieldType::Picture => (QueryOperator::Equals, term.to_string()),
    };
    Some(predicate(&field.name, operator, &value))
}
