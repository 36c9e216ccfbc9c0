//! Structural album operations.
//!
//! SQLite can only append columns and rename tables in place. Removing,
//! renaming and reordering fields therefore rebuild the album in four
//! phases inside one savepoint:
//!
//! 1. snapshot every row,
//! 2. drop and recreate the content and type-info tables with the new field
//!    list (the picture table is kept, its links still match the item ids),
//! 3. replay the snapshot, transformed, keeping each item's id and content
//!    version,
//! 4. rebuild the quicksearch index and bump the schema version.

use rusqlite::params;
use rusqlite::types::Value;
use sammel_model::naming::{self, quote_identifier};
use sammel_model::{AlbumItem, FieldType, MetaItemField};
use uuid::Uuid;

use crate::catalog::{self, AlbumEntry};
use crate::content;
use crate::cursor::encode;
use crate::error::StoreError;
use crate::pictures;
use crate::quicksearch;
use crate::store::AlbumStore;
use crate::type_info;

/// How a rebuild changes the field list and every replayed item.
#[derive(Debug, Clone, Copy)]
enum Restructure<'a> {
    Remove(&'a str),
    Rename { from: &'a str, to: &'a str },
    Reorder { field: &'a str, preceding: Option<&'a str> },
}

impl Restructure<'_> {
    fn apply_to_schema(&self, fields: &mut Vec<MetaItemField>) {
        match *self {
            Restructure::Remove(name) => fields.retain(|f| f.name != name),
            Restructure::Rename { from, to } => {
                if let Some(field) = fields.iter_mut().find(|f| f.name == from) {
                    field.name = to.to_string();
                }
            }
            Restructure::Reorder { field, preceding } => {
                let Some(pos) = fields.iter().position(|f| f.name == field) else {
                    return;
                };
                let moved = fields.remove(pos);
                let target = preceding
                    .and_then(|p| fields.iter().position(|f| f.name == p))
                    .map_or(0, |i| i + 1);
                fields.insert(target, moved);
            }
        }
    }

    fn apply_to_item(&self, item: &mut AlbumItem) {
        match *self {
            Restructure::Remove(name) => {
                item.remove_field(name);
            }
            Restructure::Rename { from, to } => {
                item.rename_field(from, to);
            }
            Restructure::Reorder { field, preceding } => {
                item.reorder_field(field, preceding);
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            Restructure::Remove(name) => format!("remove field '{name}'"),
            Restructure::Rename { from, to } => format!("rename field '{from}' to '{to}'"),
            Restructure::Reorder { field, preceding: Some(p) } => {
                format!("move field '{field}' after '{p}'")
            }
            Restructure::Reorder { field, preceding: None } => {
                format!("move field '{field}' to the front")
            }
        }
    }
}

impl AlbumStore {
    // ── Albums ──────────────────────────────────────────────────────────────

    /// Create an album with the given fields.
    ///
    /// Fields must have distinct, non-reserved names and user types. Nothing
    /// is created when any check fails.
    pub fn create_album(
        &self,
        album_name: &str,
        fields: &[MetaItemField],
        has_pictures: bool,
    ) -> Result<AlbumEntry, StoreError> {
        let album_name = album_name.trim();
        if album_name.is_empty() {
            return Err(StoreError::EmptyAlbumName);
        }
        if !self.is_album_name_available(album_name)? {
            return Err(StoreError::AlbumNameTaken(album_name.to_string()));
        }
        let fields: Vec<MetaItemField> = fields
            .iter()
            .map(|f| MetaItemField {
                name: f.name.trim().to_string(),
                ..f.clone()
            })
            .collect();
        for (i, field) in fields.iter().enumerate() {
            check_new_field(album_name, &fields[..i], field)?;
        }

        let entry = AlbumEntry {
            album_name: album_name.to_string(),
            table_name: naming::table_name(album_name),
            type_info_table_name: naming::type_info_table_name(album_name),
            has_pictures,
        };
        self.in_savepoint("create album", || {
            type_info::create_type_info_table(&self.conn, &entry.type_info_table_name, &fields)?;
            content::create_content_table(
                &self.conn,
                &entry.table_name,
                &entry.type_info_table_name,
                &fields,
            )?;
            if has_pictures {
                pictures::create_picture_table(&self.conn, &entry.picture_table_name())?;
            }
            catalog::register_album(&self.conn, &entry)?;
            quicksearch::rebuild_index(&self.conn, &entry, &quick_columns(&fields))
        })?;

        log::info!("Created album '{album_name}' with {} fields", fields.len());
        Ok(entry)
    }

    /// Remove an album, its tables and its picture directory.
    pub fn remove_album(&self, album_name: &str) -> Result<(), StoreError> {
        let entry = self.album(album_name)?;
        self.in_savepoint("remove album", || {
            content::drop_content_table(&self.conn, &entry.table_name)?;
            type_info::drop_type_info_table(&self.conn, &entry.type_info_table_name)?;
            if entry.has_pictures {
                pictures::drop_picture_table(&self.conn, &entry.picture_table_name())?;
            }
            catalog::unregister_album(&self.conn, &entry.table_name)
        })?;

        if entry.has_pictures {
            self.pictures
                .delete_album_directory(&entry.album_name)
                .map_err(|e| {
                    StoreError::picture_files(&self.pictures.album_directory(&entry.album_name), e)
                })?;
        }
        log::info!("Removed album '{}'", entry.album_name);
        Ok(())
    }

    /// Rename an album. A change of case only updates the display name; any
    /// other change renames every album table and the picture directory.
    pub fn rename_album(&self, old_name: &str, new_name: &str) -> Result<Uuid, StoreError> {
        let entry = self.album(old_name)?;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(StoreError::EmptyAlbumName);
        }

        let renamed = AlbumEntry {
            album_name: new_name.to_string(),
            table_name: naming::table_name(new_name),
            type_info_table_name: naming::type_info_table_name(new_name),
            has_pictures: entry.has_pictures,
        };
        let same_tables = renamed.table_name == entry.table_name;
        if !same_tables && !self.is_album_name_available(new_name)? {
            return Err(StoreError::AlbumNameTaken(new_name.to_string()));
        }

        let version = self.in_savepoint("rename album", || {
            if !same_tables {
                let indexed = quicksearch::indexed_column_names(&self.conn, &entry.table_name)?;
                content::rename_table(&self.conn, &entry.table_name, &renamed.table_name)?;
                type_info::rename_type_info_table(
                    &self.conn,
                    &entry.type_info_table_name,
                    &renamed.type_info_table_name,
                )?;
                if entry.has_pictures {
                    content::rename_table(
                        &self.conn,
                        &entry.picture_table_name(),
                        &renamed.picture_table_name(),
                    )?;
                }
                let indexed: Vec<&str> = indexed.iter().map(String::as_str).collect();
                quicksearch::rebuild_index(&self.conn, &renamed, &indexed)?;
            }
            catalog::rename_album(&self.conn, &entry.table_name, &renamed, None)?;
            type_info::regenerate_schema_version(&self.conn, &renamed.type_info_table_name)
        })?;

        if entry.has_pictures && !same_tables {
            self.pictures
                .rename_album_directory(&entry.album_name, &renamed.album_name)
                .map_err(|e| {
                    StoreError::picture_files(&self.pictures.album_directory(&entry.album_name), e)
                })?;
        }
        log::info!("Renamed album '{}' to '{}'", entry.album_name, renamed.album_name);
        Ok(version)
    }

    /// Turn picture support on or off.
    ///
    /// Enabling creates the picture table. Disabling drops it with every
    /// link and then deletes the album's picture directory.
    pub fn set_album_picture_capability(&self, album_name: &str, enabled: bool) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        if entry.has_pictures == enabled {
            return Err(StoreError::PictureCapabilityUnchanged {
                album: entry.album_name,
                enabled,
            });
        }

        let version = self.in_savepoint("set picture capability", || {
            if enabled {
                pictures::create_picture_table(&self.conn, &entry.picture_table_name())?;
            } else {
                pictures::drop_picture_table(&self.conn, &entry.picture_table_name())?;
            }
            catalog::set_has_pictures(&self.conn, &entry.table_name, enabled)?;
            type_info::regenerate_schema_version(&self.conn, &entry.type_info_table_name)
        })?;

        if !enabled {
            self.pictures
                .delete_album_directory(&entry.album_name)
                .map_err(|e| {
                    StoreError::picture_files(&self.pictures.album_directory(&entry.album_name), e)
                })?;
        }
        log::info!(
            "Pictures {} for album '{}'",
            if enabled { "enabled" } else { "disabled" },
            entry.album_name
        );
        Ok(version)
    }

    // ── Fields ──────────────────────────────────────────────────────────────

    /// Append a field. Existing items get the type's default value.
    pub fn append_field(&self, album_name: &str, field: &MetaItemField) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        let fields = self.album_fields(&entry.album_name)?;
        check_new_field(&entry.album_name, &fields, field)?;

        let field = MetaItemField {
            name: field.name.trim().to_string(),
            ..field.clone()
        };
        let default = field
            .field_type
            .default_value()
            .map_or(Value::Null, |v| encode(&v));

        let version = self.in_savepoint("append field", || {
            let filled = content::append_column(&self.conn, &entry.table_name, &field, default)?;
            type_info::append_column(&self.conn, &entry.type_info_table_name, &field)?;
            log::debug!("Filled '{}' with its default in {filled} items", field.name);
            if field.quick_searchable {
                let mut quick = quick_columns(&fields);
                quick.push(field.name.as_str());
                quicksearch::rebuild_index(&self.conn, &entry, &quick)?;
            }
            type_info::regenerate_schema_version(&self.conn, &entry.type_info_table_name)
        })?;

        log::info!("Appended field {field} to album '{}'", entry.album_name);
        Ok(version)
    }

    /// Remove the field `expected`, dropping its value from every item.
    pub fn remove_field(&self, album_name: &str, expected: &MetaItemField) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        let actual = self.expect_field(&entry, expected)?;
        self.rebuild(&entry, Restructure::Remove(&actual.name))
    }

    /// Rename the field `expected`. Its type and values are unchanged.
    pub fn rename_field(
        &self,
        album_name: &str,
        expected: &MetaItemField,
        new_name: &str,
    ) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        let actual = self.expect_field(&entry, expected)?;
        if actual.field_type == FieldType::Id {
            return Err(StoreError::FieldTypeNotAllowed {
                field: actual.name,
                field_type: actual.field_type,
            });
        }

        let new_name = new_name.trim();
        let others: Vec<MetaItemField> = self
            .album_fields(&entry.album_name)?
            .into_iter()
            .filter(|f| f.name != actual.name)
            .collect();
        let renamed = MetaItemField::new(new_name, actual.field_type, actual.quick_searchable);
        check_new_field(&entry.album_name, &others, &renamed)?;
        if new_name == actual.name {
            return self.schema_version(&entry.album_name);
        }

        self.rebuild(
            &entry,
            Restructure::Rename {
                from: &actual.name,
                to: new_name,
            },
        )
    }

    /// Move `field` directly after `preceding`, or to the front when
    /// `preceding` is `None`.
    pub fn reorder_field(
        &self,
        album_name: &str,
        field: &MetaItemField,
        preceding: Option<&str>,
    ) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        let actual = self.expect_field(&entry, field)?;
        let fields = self.album_fields(&entry.album_name)?;

        let preceding = match preceding {
            Some(name) => Some(
                fields
                    .iter()
                    .find(|f| f.name == name)
                    .map(|f| f.name.as_str())
                    .ok_or_else(|| StoreError::UnknownField {
                        album: entry.album_name.clone(),
                        field: name.to_string(),
                    })?,
            ),
            None => None,
        };
        if preceding == Some(actual.name.as_str()) {
            return self.schema_version(&entry.album_name);
        }

        self.rebuild(
            &entry,
            Restructure::Reorder {
                field: &actual.name,
                preceding,
            },
        )
    }

    /// Add or remove a field from the quicksearch index. Setting the flag it
    /// already has changes nothing.
    pub fn set_quick_searchable(
        &self,
        album_name: &str,
        field_name: &str,
        quick_searchable: bool,
    ) -> Result<Uuid, StoreError> {
        let entry = self.album(album_name)?;
        let mut fields = self.album_fields(&entry.album_name)?;
        let Some(field) = fields.iter_mut().find(|f| f.name == field_name) else {
            return Err(StoreError::UnknownField {
                album: entry.album_name,
                field: field_name.to_string(),
            });
        };
        if field.quick_searchable == quick_searchable {
            return self.schema_version(&entry.album_name);
        }
        field.quick_searchable = quick_searchable;

        let version = self.in_savepoint("set quicksearch", || {
            quicksearch::rebuild_index(&self.conn, &entry, &quick_columns(&fields))?;
            type_info::regenerate_schema_version(&self.conn, &entry.type_info_table_name)
        })?;

        log::info!(
            "Quicksearch {} for '{field_name}' in album '{}'",
            if quick_searchable { "enabled" } else { "disabled" },
            entry.album_name
        );
        Ok(version)
    }

    // ── Internals ───────────────────────────────────────────────────────────

    /// Compare the caller's view of a field with the stored schema.
    ///
    /// Name and type must match. A differing quicksearch flag only affects
    /// the index, so it is logged and the stored field is used.
    fn expect_field(&self, entry: &AlbumEntry, expected: &MetaItemField) -> Result<MetaItemField, StoreError> {
        let actual = self
            .album_fields(&entry.album_name)?
            .into_iter()
            .find(|f| f.has_name(&expected.name))
            .ok_or_else(|| StoreError::UnknownField {
                album: entry.album_name.clone(),
                field: expected.name.clone(),
            })?;

        if actual.name != expected.name || actual.field_type != expected.field_type {
            return Err(StoreError::SchemaMismatch {
                album: entry.album_name.clone(),
                field: expected.name.clone(),
                expected: expected.clone(),
                actual,
            });
        }
        if actual.quick_searchable != expected.quick_searchable {
            log::warn!(
                "Field '{}' of album '{}': expected quicksearch {}, stored {}",
                actual.name,
                entry.album_name,
                expected.quick_searchable,
                actual.quick_searchable
            );
        }
        Ok(actual)
    }

    fn rebuild(&self, entry: &AlbumEntry, change: Restructure<'_>) -> Result<Uuid, StoreError> {
        let mut fields = self.album_fields(&entry.album_name)?;
        let description = change.describe();

        let version = self.in_savepoint(&description, || {
            // Snapshot, without picture links: the picture table survives.
            let snapshot_sql = format!("SELECT * FROM {}", quote_identifier(&entry.table_name));
            let mut items = self.fetch_rows(entry, &snapshot_sql, params![], false)?;
            log::debug!("Snapshot of '{}' holds {} items", entry.album_name, items.len());

            // Drop and recreate.
            content::drop_content_table(&self.conn, &entry.table_name)?;
            type_info::drop_type_info_table(&self.conn, &entry.type_info_table_name)?;
            catalog::unregister_album(&self.conn, &entry.table_name)?;

            change.apply_to_schema(&mut fields);
            type_info::create_type_info_table(&self.conn, &entry.type_info_table_name, &fields)?;
            content::create_content_table(
                &self.conn,
                &entry.table_name,
                &entry.type_info_table_name,
                &fields,
            )?;
            catalog::register_album(&self.conn, entry)?;

            // Replay.
            for item in &mut items {
                change.apply_to_item(item);
                self.add_item(item, false)?;
            }

            quicksearch::rebuild_index(&self.conn, entry, &quick_columns(&fields))?;
            type_info::regenerate_schema_version(&self.conn, &entry.type_info_table_name)
        })?;

        log::info!("Album '{}': {description}", entry.album_name);
        Ok(version)
    }
}

fn quick_columns(fields: &[MetaItemField]) -> Vec<&str> {
    fields
        .iter()
        .filter(|f| f.quick_searchable)
        .map(|f| f.name.as_str())
        .collect()
}

/// Checks a field about to join `existing`: a non-empty, non-reserved name
/// not yet taken (ignoring case) and a type users may choose. Query text
/// quotes columns as `[name]`, so brackets cannot appear in names.
fn check_new_field(album_name: &str, existing: &[MetaItemField], field: &MetaItemField) -> Result<(), StoreError> {
    let name = field.name.trim();
    if name.is_empty() {
        return Err(StoreError::EmptyFieldName);
    }
    if name.contains(['[', ']']) {
        return Err(StoreError::InvalidFieldName(name.to_string()));
    }
    if content::is_reserved(name) {
        return Err(StoreError::ReservedFieldName(name.to_string()));
    }
    if !field.field_type.is_user_type() {
        return Err(StoreError::FieldTypeNotAllowed {
            field: name.to_string(),
            field_type: field.field_type,
        });
    }
    if existing.iter().any(|f| f.has_name(name)) {
        return Err(StoreError::FieldNameTaken {
            album: album_name.to_string(),
            field: name.to_string(),
        });
    }
    Ok(())
}
