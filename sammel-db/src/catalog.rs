//! Album master table: the single record of which albums exist.

use rusqlite::{Connection, OptionalExtension, Row, params};
use sammel_model::naming::{self, INDEX_SUFFIX, PICTURE_TABLE_SUFFIX, TYPE_INFO_SUFFIX};

use crate::error::StoreError;

/// One row of the album master table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumEntry {
    pub album_name: String,
    pub table_name: String,
    pub type_info_table_name: String,
    pub has_pictures: bool,
}

impl AlbumEntry {
    pub fn picture_table_name(&self) -> String {
        format!("{}{PICTURE_TABLE_SUFFIX}", self.table_name)
    }

    pub fn index_name(&self) -> String {
        format!("{}{INDEX_SUFFIX}", self.table_name)
    }
}

const SELECT_ENTRY: &str =
    "SELECT album_name, album_table_name, type_info_table_name, has_pictures FROM album_master_table";

fn row_to_entry(row: &Row) -> rusqlite::Result<AlbumEntry> {
    Ok(AlbumEntry {
        album_name: row.get(0)?,
        table_name: row.get(1)?,
        type_info_table_name: row.get(2)?,
        has_pictures: row.get(3)?,
    })
}

pub(crate) fn register_album(conn: &Connection, entry: &AlbumEntry) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO album_master_table (album_name, album_table_name, type_info_table_name, has_pictures)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.album_name,
            entry.table_name,
            entry.type_info_table_name,
            entry.has_pictures,
        ],
    )?;
    log::debug!("Registered album '{}'", entry.album_name);
    Ok(())
}

pub(crate) fn unregister_album(conn: &Connection, table_name: &str) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM album_master_table WHERE album_table_name = ?1",
        [table_name],
    )?;
    Ok(())
}

/// Album names in case-insensitive alphabetical order.
pub(crate) fn list_albums(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT album_name FROM album_master_table ORDER BY album_name COLLATE NOCASE")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub(crate) fn list_entries(conn: &Connection) -> Result<Vec<AlbumEntry>, StoreError> {
    let mut stmt = conn.prepare(&format!("{SELECT_ENTRY} ORDER BY album_name COLLATE NOCASE"))?;
    let rows = stmt.query_map([], row_to_entry)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

/// Look up an album by display name. Matching is case-insensitive.
pub(crate) fn find_album(conn: &Connection, album_name: &str) -> Result<Option<AlbumEntry>, StoreError> {
    find_album_by_table(conn, &naming::table_name(album_name))
}

pub(crate) fn find_album_by_table(
    conn: &Connection,
    table_name: &str,
) -> Result<Option<AlbumEntry>, StoreError> {
    let entry = conn
        .query_row(
            &format!("{SELECT_ENTRY} WHERE album_table_name = ?1"),
            [naming::table_name(table_name)],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Point an entry at new table names, optionally changing its picture flag.
pub(crate) fn rename_album(
    conn: &Connection,
    old_table_name: &str,
    renamed: &AlbumEntry,
    has_pictures: Option<bool>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE album_master_table
         SET album_name = ?1, album_table_name = ?2, type_info_table_name = ?3,
             has_pictures = COALESCE(?4, has_pictures)
         WHERE album_table_name = ?5",
        params![
            renamed.album_name,
            renamed.table_name,
            renamed.type_info_table_name,
            has_pictures,
            old_table_name,
        ],
    )?;
    Ok(())
}

pub(crate) fn set_has_pictures(
    conn: &Connection,
    table_name: &str,
    has_pictures: bool,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE album_master_table SET has_pictures = ?1 WHERE album_table_name = ?2",
        params![has_pictures, table_name],
    )?;
    Ok(())
}

/// Suffixes of the objects an album owns or may create later.
const DERIVED_SUFFIXES: [&str; 3] = [TYPE_INFO_SUFFIX, PICTURE_TABLE_SUFFIX, INDEX_SUFFIX];

/// Whether two album table names would claim the same object name, either
/// directly or through one of the derived names.
fn table_names_collide(a: &str, b: &str) -> bool {
    a == b
        || DERIVED_SUFFIXES.iter().any(|suffix| {
            a.strip_suffix(suffix) == Some(b) || b.strip_suffix(suffix) == Some(a)
        })
}

/// An album name is available when no album uses it (ignoring case), no
/// album's table or derived names collide with the ones it would use, and
/// none of those objects exist already.
pub(crate) fn is_album_name_available(conn: &Connection, album_name: &str) -> Result<bool, StoreError> {
    let trimmed = album_name.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    let table = naming::table_name(trimmed);

    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM album_master_table WHERE album_name = ?1 COLLATE NOCASE)",
        [trimmed],
        |row| row.get(0),
    )?;
    if taken {
        return Ok(false);
    }
    if list_entries(conn)?
        .iter()
        .any(|entry| table_names_collide(&entry.table_name, &table))
    {
        return Ok(false);
    }

    let stray: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE lower(name) IN (?1, ?2, ?3, ?4))",
        params![
            table,
            naming::type_info_table_name(trimmed),
            naming::picture_table_name(trimmed),
            naming::index_name(trimmed),
        ],
        |row| row.get(0),
    )?;
    Ok(!stray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_collide() {
        assert!(table_names_collide("books", "books"));
        assert!(table_names_collide("books", "books_index"));
        assert!(table_names_collide("books_pictures", "books"));
        assert!(table_names_collide("books_typeinfo", "books"));
        assert!(!table_names_collide("books", "books_2"));
        assert!(!table_names_collide("books_index", "books_pictures"));
    }
}
