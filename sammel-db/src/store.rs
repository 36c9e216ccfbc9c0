//! The album store: one connection plus the picture file collaborator,
//! and every operation collaborators may call.
//!
//! Mutating operations run inside a savepoint and either complete or are
//! rolled back. Picture files are deleted only after the savepoint has been
//! released, so a failure there leaves the rows committed and is reported as
//! a dirty error.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql, params};
use sammel_model::naming::{self, quote_identifier};
use sammel_model::{
    AlbumItem, AlbumItemPicture, FieldType, MetaItemField, QueryComponent, SortOrder, build_query,
};
use uuid::Uuid;

use crate::catalog::{self, AlbumEntry};
use crate::content::{self, ID_COLUMN};
use crate::cursor::{AlbumItemCursor, ColumnMap, encode};
use crate::error::StoreError;
use crate::pictures::{self, PictureFiles};
use crate::quicksearch;
use crate::savepoint::Savepoint;
use crate::schema::{self, MASTER_TABLE};
use crate::type_info;

pub struct AlbumStore {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
    pub(crate) pictures: Box<dyn PictureFiles>,
    last_change: Cell<Option<DateTime<Utc>>>,
}

impl AlbumStore {
    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Open or create the store file at `path` and verify it is usable.
    pub fn open(path: &Path, pictures: impl PictureFiles + 'static) -> Result<Self, StoreError> {
        let conn = schema::open_database(path).map_err(StoreError::into_clean)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
            pictures: Box::new(pictures),
            last_change: Cell::new(None),
        };
        store.check()?;
        log::debug!("Opened album store at {}", path.display());
        Ok(store)
    }

    /// An empty store that lives only as long as the returned value.
    pub fn open_in_memory(pictures: impl PictureFiles + 'static) -> Result<Self, StoreError> {
        let conn = schema::open_memory().map_err(StoreError::into_clean)?;
        Ok(Self {
            conn,
            path: None,
            pictures: Box::new(pictures),
            last_change: Cell::new(None),
        })
    }

    /// Self-check: the catalog is readable, every registered album has its
    /// tables, and the engine's quick integrity check passes.
    pub fn check(&self) -> Result<(), StoreError> {
        self.read(|| self.check_tables())
    }

    fn check_tables(&self) -> Result<(), StoreError> {
        let result: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))?;
        if result != "ok" {
            return Err(StoreError::Inconsistent(result));
        }
        if !schema::table_exists(&self.conn, MASTER_TABLE)? {
            return Err(StoreError::Inconsistent(format!("{MASTER_TABLE} is missing")));
        }

        for entry in catalog::list_entries(&self.conn)? {
            for table in [&entry.table_name, &entry.type_info_table_name] {
                if !schema::table_exists(&self.conn, table)? {
                    return Err(StoreError::Inconsistent(format!(
                        "table '{table}' of album '{}' is missing",
                        entry.album_name
                    )));
                }
            }
            let picture_table = entry.picture_table_name();
            if schema::table_exists(&self.conn, &picture_table)? != entry.has_pictures {
                return Err(StoreError::Inconsistent(format!(
                    "picture table of album '{}' does not match its picture flag",
                    entry.album_name
                )));
            }
        }
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        match self.check() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Album store self-check failed: {e}");
                false
            }
        }
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::from(e).into_clean())
    }

    /// Copy the store file aside as `<stem>.corrupt-<millis>.<ext>` and reopen
    /// a fresh, empty store at the same path. Returns the fresh store and the
    /// path of the copy. An in-memory store is simply replaced.
    pub fn reset(self) -> Result<(Self, Option<PathBuf>), StoreError> {
        let Self {
            conn,
            path,
            pictures,
            ..
        } = self;
        if let Err((_, e)) = conn.close() {
            log::warn!("Closing the store before reset failed: {e}");
        }

        let Some(path) = path else {
            let conn = schema::open_memory()?;
            return Ok((
                Self {
                    conn,
                    path: None,
                    pictures,
                    last_change: Cell::new(Some(Utc::now())),
                },
                None,
            ));
        };

        let (store, aside) = Self::reset_file_boxed(path, pictures)?;
        Ok((store, Some(aside)))
    }

    /// Reset a store file that cannot be opened: copy it aside and create a
    /// fresh store at `path`. Returns the fresh store and the path of the copy.
    pub fn reset_file(path: &Path, pictures: impl PictureFiles + 'static) -> Result<(Self, PathBuf), StoreError> {
        Self::reset_file_boxed(path.to_path_buf(), Box::new(pictures))
    }

    fn reset_file_boxed(path: PathBuf, pictures: Box<dyn PictureFiles>) -> Result<(Self, PathBuf), StoreError> {
        let aside = corrupt_copy_path(&path, Utc::now());
        if path.exists() {
            std::fs::copy(&path, &aside).map_err(|e| StoreError::store_file(&aside, e))?;
            std::fs::remove_file(&path).map_err(|e| StoreError::store_file(&path, e))?;
            log::warn!("Moved store {} aside to {}", path.display(), aside.display());
        }
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut side = path.clone().into_os_string();
            side.push(suffix);
            let side = PathBuf::from(side);
            if side.exists() {
                std::fs::remove_file(&side).map_err(|e| StoreError::store_file(&side, e))?;
            }
        }

        let conn = schema::open_database(&path)?;
        let store = Self {
            conn,
            path: Some(path),
            pictures,
            last_change: Cell::new(Some(Utc::now())),
        };
        Ok((store, aside))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn pictures(&self) -> &dyn PictureFiles {
        self.pictures.as_ref()
    }

    /// The underlying connection, for inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// When the last mutation through this handle was committed.
    pub fn last_change(&self) -> Option<DateTime<Utc>> {
        self.last_change.get()
    }

    // ── Transactions ────────────────────────────────────────────────────────

    /// Run `op` inside a savepoint. On failure everything `op` did is rolled
    /// back and the error is reported clean; if the rollback itself fails the
    /// error is dirty.
    pub(crate) fn in_savepoint<T>(
        &self,
        operation: &str,
        op: impl FnOnce() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut savepoint =
            Savepoint::begin(&self.conn).map_err(|e| StoreError::from(e).into_clean())?;
        let result = op().and_then(|value| {
            savepoint.release()?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                self.last_change.set(Some(Utc::now()));
                Ok(value)
            }
            Err(err) => match savepoint.rollback() {
                Ok(()) => {
                    log::warn!("{operation} rolled back: {err}");
                    Err(err.into_clean())
                }
                Err(source) => {
                    log::error!("{operation} failed and could not be rolled back: {source}");
                    Err(StoreError::RollbackFailed {
                        cause: err.to_string(),
                        source,
                    })
                }
            },
        }
    }

    /// Read-only work touches nothing, so its failures are always clean.
    fn read<T>(&self, op: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        op().map_err(StoreError::into_clean)
    }

    // ── Albums ──────────────────────────────────────────────────────────────

    pub fn list_albums(&self) -> Result<Vec<String>, StoreError> {
        self.read(|| catalog::list_albums(&self.conn))
    }

    pub fn album(&self, album_name: &str) -> Result<AlbumEntry, StoreError> {
        self.read(|| self.entry(album_name))
    }

    pub fn album_names_with_pictures(&self) -> Result<Vec<String>, StoreError> {
        self.read(|| {
            Ok(catalog::list_entries(&self.conn)?
                .into_iter()
                .filter(|e| e.has_pictures)
                .map(|e| e.album_name)
                .collect())
        })
    }

    pub fn is_album_name_available(&self, album_name: &str) -> Result<bool, StoreError> {
        self.read(|| catalog::is_album_name_available(&self.conn, album_name))
    }

    /// A field name is available when it is not reserved and no field of the
    /// album has it, ignoring case.
    pub fn is_field_name_available(&self, album_name: &str, field_name: &str) -> Result<bool, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            let name = field_name.trim();
            if name.is_empty() || name.contains(['[', ']']) || content::is_reserved(name) {
                return Ok(false);
            }
            Ok(!self.fields_of(&entry)?.iter().any(|f| f.has_name(name)))
        })
    }

    /// The album's user fields in column order, with their types and
    /// quicksearch flags.
    pub fn album_fields(&self, album_name: &str) -> Result<Vec<MetaItemField>, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            self.fields_of(&entry)
        })
    }

    pub fn album_field_types(&self, album_name: &str) -> Result<HashMap<String, FieldType>, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            type_info::field_types(&self.conn, &entry.type_info_table_name)
        })
    }

    pub fn has_pictures(&self, album_name: &str) -> Result<bool, StoreError> {
        self.read(|| Ok(self.entry(album_name)?.has_pictures))
    }

    pub fn schema_version(&self, album_name: &str) -> Result<Uuid, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            type_info::schema_version(&self.conn, &entry.type_info_table_name)
        })
    }

    pub fn item_count(&self, album_name: &str) -> Result<i64, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            content::row_count(&self.conn, &entry.table_name)
        })
    }

    pub fn indexed_column_names(&self, album_name: &str) -> Result<Vec<String>, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            quicksearch::indexed_column_names(&self.conn, &entry.table_name)
        })
    }

    pub fn table_index_name(&self, album_name: &str) -> Result<Option<String>, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            quicksearch::table_index_name(&self.conn, &entry.table_name)
        })
    }

    pub fn is_album_quicksearchable(&self, album_name: &str) -> Result<bool, StoreError> {
        Ok(!self.indexed_column_names(album_name)?.is_empty())
    }

    pub fn is_field_quicksearchable(&self, album_name: &str, field_name: &str) -> Result<bool, StoreError> {
        Ok(self
            .indexed_column_names(album_name)?
            .iter()
            .any(|c| c == field_name))
    }

    pub fn is_date_field(&self, album_name: &str, field_name: &str) -> Result<bool, StoreError> {
        self.field_has_type(album_name, field_name, FieldType::Date)
    }

    pub fn is_option_field(&self, album_name: &str, field_name: &str) -> Result<bool, StoreError> {
        self.field_has_type(album_name, field_name, FieldType::Option)
    }

    fn field_has_type(&self, album_name: &str, field_name: &str, field_type: FieldType) -> Result<bool, StoreError> {
        Ok(self.album_field_types(album_name)?.get(field_name) == Some(&field_type))
    }

    // ── Items ───────────────────────────────────────────────────────────────

    /// Add an item and return its id.
    ///
    /// With `regenerate_content_version` unset the item's own content version
    /// is kept, which requires it to carry one. An item that carries an id
    /// keeps it. Schema fields missing from the item get the type's default.
    pub fn add_item(&self, item: &AlbumItem, regenerate_content_version: bool) -> Result<i64, StoreError> {
        let version = if regenerate_content_version {
            Uuid::new_v4()
        } else {
            item.content_version
                .ok_or_else(|| StoreError::MissingContentVersion(item.album_name.clone()))?
        };
        let (entry, values) = self.read(|| {
            let entry = self.entry(&item.album_name)?;
            let fields = self.fields_of(&entry)?;
            let values = encode_item(&entry, &fields, item, true)?;
            Ok((entry, values))
        })?;
        if !entry.has_pictures && !item.pictures.is_empty() {
            return Err(StoreError::invalid_item(&entry.album_name, "album has no picture support"));
        }

        let id = self.in_savepoint("add item", || {
            let id = content::insert_row(&self.conn, &entry.table_name, item.id, &values, version)?;
            if entry.has_pictures {
                pictures::insert_pictures(&self.conn, &entry, id, &item.pictures)?;
            }
            Ok(id)
        })?;
        log::debug!("Added item {id} to '{}'", entry.album_name);
        Ok(id)
    }

    /// Write every field of an existing item, replace its picture links and
    /// give it a new content version, which is returned.
    ///
    /// Files of pictures no longer linked are deleted after the row update
    /// has been committed; a crash in between leaves orphaned files.
    pub fn update_item(&self, item: &AlbumItem) -> Result<Uuid, StoreError> {
        let id = item
            .id
            .ok_or_else(|| StoreError::MissingItemId(item.album_name.clone()))?;
        let (entry, values) = self.read(|| {
            let entry = self.entry(&item.album_name)?;
            let fields = self.fields_of(&entry)?;
            let values = encode_item(&entry, &fields, item, false)?;
            Ok((entry, values))
        })?;
        if !entry.has_pictures && !item.pictures.is_empty() {
            return Err(StoreError::invalid_item(&entry.album_name, "album has no picture support"));
        }

        let version = Uuid::new_v4();
        let orphaned = self.in_savepoint("update item", || {
            if content::update_row(&self.conn, &entry.table_name, id, &values, version)? == 0 {
                return Err(StoreError::ItemNotFound {
                    album: entry.album_name.clone(),
                    id,
                });
            }
            if !entry.has_pictures {
                return Ok(Vec::new());
            }
            let stored = pictures::pictures_for_item(&self.conn, &entry, id)?;
            pictures::delete_pictures_for_item(&self.conn, &entry, id)?;
            pictures::insert_pictures(&self.conn, &entry, id, &item.pictures)?;
            Ok(stored
                .into_iter()
                .filter(|old| !item.pictures.iter().any(|p| p.same_files(old)))
                .collect::<Vec<_>>())
        })?;

        self.delete_picture_files(&orphaned)?;
        log::debug!("Updated item {id} of '{}'", entry.album_name);
        Ok(version)
    }

    /// Delete an item, its picture links and then its picture files.
    pub fn delete_item(&self, item: &AlbumItem) -> Result<(), StoreError> {
        let id = item
            .id
            .ok_or_else(|| StoreError::MissingItemId(item.album_name.clone()))?;
        let entry = self.album(&item.album_name)?;

        let removed = self.in_savepoint("delete item", || {
            let linked = if entry.has_pictures {
                pictures::pictures_for_item(&self.conn, &entry, id)?
            } else {
                Vec::new()
            };
            if content::delete_row(&self.conn, &entry.table_name, id)? == 0 {
                return Err(StoreError::ItemNotFound {
                    album: entry.album_name.clone(),
                    id,
                });
            }
            if entry.has_pictures {
                pictures::delete_pictures_for_item(&self.conn, &entry, id)?;
            }
            Ok(linked)
        })?;

        self.delete_picture_files(&removed)?;
        log::debug!("Deleted item {id} of '{}'", entry.album_name);
        Ok(())
    }

    pub fn fetch_item(&self, album_name: &str, id: i64) -> Result<AlbumItem, StoreError> {
        self.read(|| {
            let entry = self.entry(album_name)?;
            let sql = format!(
                "SELECT * FROM {} WHERE {ID_COLUMN} = ?1",
                quote_identifier(&entry.table_name)
            );
            self.fetch_rows(&entry, &sql, params![id], true)?
                .into_iter()
                .next()
                .ok_or_else(|| StoreError::ItemNotFound {
                    album: entry.album_name.clone(),
                    id,
                })
        })
    }

    /// Run a query and decode every row. The album is the table named in the
    /// query's `FROM` clause.
    pub fn fetch_items(&self, query: &str) -> Result<Vec<AlbumItem>, StoreError> {
        self.read(|| {
            let table = naming::query_table_name(query)
                .ok_or_else(|| StoreError::UnresolvedQuery(query.to_string()))?;
            let entry = catalog::find_album_by_table(&self.conn, &table)?
                .ok_or(StoreError::UnknownAlbum(table))?;
            self.fetch_rows(&entry, query, params![], true)
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn quicksearch_query<S: AsRef<str>>(&self, album_name: &str, terms: &[S]) -> Result<String, StoreError> {
        let entry = self.album(album_name)?;
        let fields = self.album_fields(&entry.album_name)?;
        Ok(quicksearch::quicksearch_query(&entry.album_name, &fields, terms))
    }

    pub fn quicksearch<S: AsRef<str>>(&self, album_name: &str, terms: &[S]) -> Result<Vec<AlbumItem>, StoreError> {
        let query = self.quicksearch_query(album_name, terms)?;
        self.fetch_items(&query)
    }

    /// Render structured predicates against the album's current schema.
    pub fn build_query(
        &self,
        components: &[QueryComponent],
        connect_by_and: bool,
        album_name: &str,
        sort: Option<&SortOrder>,
    ) -> Result<String, StoreError> {
        let entry = self.album(album_name)?;
        let fields = self.album_fields(&entry.album_name)?;
        Ok(build_query(components, connect_by_and, &entry.album_name, &fields, sort)?)
    }

    pub fn run_query(
        &self,
        components: &[QueryComponent],
        connect_by_and: bool,
        album_name: &str,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<AlbumItem>, StoreError> {
        let query = self.build_query(components, connect_by_and, album_name, sort)?;
        self.fetch_items(&query)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    pub(crate) fn entry(&self, album_name: &str) -> Result<AlbumEntry, StoreError> {
        catalog::find_album(&self.conn, album_name)?
            .ok_or_else(|| StoreError::UnknownAlbum(album_name.to_string()))
    }

    /// User fields of an album: column order from the content table, types
    /// from the type-info table, flags from the quicksearch index.
    pub(crate) fn fields_of(&self, entry: &AlbumEntry) -> Result<Vec<MetaItemField>, StoreError> {
        let types = type_info::field_types(&self.conn, &entry.type_info_table_name)?;
        let indexed = quicksearch::indexed_column_names(&self.conn, &entry.table_name)?;
        content::user_column_names(&self.conn, &entry.table_name)?
            .into_iter()
            .map(|name| {
                let field_type = *types.get(&name).ok_or_else(|| {
                    StoreError::Inconsistent(format!(
                        "field '{name}' of album '{}' has no recorded type",
                        entry.album_name
                    ))
                })?;
                let quick_searchable = indexed.contains(&name);
                Ok(MetaItemField::new(name, field_type, quick_searchable))
            })
            .collect()
    }

    pub(crate) fn fetch_rows(
        &self,
        entry: &AlbumEntry,
        sql: &str,
        params: &[&dyn ToSql],
        with_pictures: bool,
    ) -> Result<Vec<AlbumItem>, StoreError> {
        let types = type_info::field_types(&self.conn, &entry.type_info_table_name)?;
        let mut stmt = self.conn.prepare(sql)?;
        let columns = ColumnMap::new(&stmt.column_names(), &types)?;
        let rows = stmt.query(params)?;
        let mut cursor = AlbumItemCursor::new(rows, columns, &entry.album_name);

        let mut items = Vec::new();
        while let Some(mut item) = cursor.next_item()? {
            if with_pictures && entry.has_pictures {
                if let Some(id) = item.id {
                    item.pictures = pictures::pictures_for_item(&self.conn, entry, id)?;
                }
            }
            items.push(item);
        }
        Ok(items)
    }

    /// Delete the files of unlinked pictures. Every file is attempted; the
    /// first failure is reported.
    pub(crate) fn delete_picture_files(&self, removed: &[AlbumItemPicture]) -> Result<(), StoreError> {
        let mut first_error = None;
        for picture in removed {
            for path in [
                self.pictures.original_path(picture),
                self.pictures.thumbnail_path(picture),
            ] {
                if let Err(e) = self.pictures.delete_file(&path) {
                    log::error!("Failed to delete picture file {}: {e}", path.display());
                    first_error.get_or_insert(StoreError::picture_files(&path, e));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Validate an item against the album schema and encode its values in
/// column order. With `fill_missing`, schema fields absent from the item are
/// written with their type's default.
fn encode_item(
    entry: &AlbumEntry,
    fields: &[MetaItemField],
    item: &AlbumItem,
    fill_missing: bool,
) -> Result<Vec<(String, Value)>, StoreError> {
    let album = &entry.album_name;
    if let Some(bad) = item.fields.iter().find(|f| !f.is_valid()) {
        return Err(StoreError::invalid_item(
            album,
            format!("field '{}' is not a valid {} value", bad.name, bad.field_type),
        ));
    }
    if !item.is_valid() {
        return Err(StoreError::invalid_item(album, "a field name is used twice"));
    }

    for field in &item.fields {
        let Some(schema_field) = fields.iter().find(|f| f.name == field.name) else {
            return Err(StoreError::UnknownField {
                album: album.clone(),
                field: field.name.clone(),
            });
        };
        if schema_field.field_type != field.field_type {
            return Err(StoreError::invalid_item(
                album,
                format!(
                    "field '{}' holds {} values, not {}",
                    field.name, schema_field.field_type, field.field_type
                ),
            ));
        }
    }

    let mut values = Vec::with_capacity(fields.len());
    for schema_field in fields {
        let value = match item.field_value(&schema_field.name) {
            Some(value) => encode(value),
            None if fill_missing => match schema_field.field_type.default_value() {
                Some(default) => encode(&default),
                None => Value::Null,
            },
            None => continue,
        };
        values.push((schema_field.name.clone(), value));
    }
    Ok(values)
}

fn corrupt_copy_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let name = match path.extension() {
        Some(ext) => format!("{stem}.corrupt-{}.{}", at.timestamp_millis(), ext.to_string_lossy()),
        None => format!("{stem}.corrupt-{}", at.timestamp_millis()),
    };
    path.with_file_name(name)
}
