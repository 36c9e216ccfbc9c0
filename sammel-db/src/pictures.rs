//! Picture link tables and the picture file collaborator.
//!
//! Link rows live in `<album>_pictures`; the files themselves are managed by
//! a [`PictureFiles`] implementation outside the store's transactions.

use std::io;
use std::path::{Component, Path, PathBuf};

use rusqlite::{Connection, params};
use sammel_model::AlbumItemPicture;
use sammel_model::naming::{self, quote_identifier};

use crate::catalog::AlbumEntry;
use crate::error::StoreError;

/// Subdirectory of an album's picture directory holding thumbnails.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// File-system access for stored pictures.
pub trait PictureFiles {
    /// Directory holding the pictures of an album.
    fn album_directory(&self, album_name: &str) -> PathBuf;

    /// Delete one file. A file that is already gone is not an error.
    fn delete_file(&self, path: &Path) -> io::Result<()>;

    fn delete_album_directory(&self, album_name: &str) -> io::Result<()>;

    fn rename_album_directory(&self, old_album_name: &str, new_album_name: &str) -> io::Result<()>;

    fn original_path(&self, picture: &AlbumItemPicture) -> PathBuf {
        self.album_directory(&picture.album_name)
            .join(&picture.original_filename)
    }

    fn thumbnail_path(&self, picture: &AlbumItemPicture) -> PathBuf {
        self.album_directory(&picture.album_name)
            .join(THUMBNAILS_DIR)
            .join(&picture.thumbnail_filename)
    }
}

/// Pictures stored under `<root>/<album table name>/`.
#[derive(Debug, Clone)]
pub struct LocalPictureFiles {
    root: PathBuf,
}

impl LocalPictureFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PictureFiles for LocalPictureFiles {
    fn album_directory(&self, album_name: &str) -> PathBuf {
        self.root.join(naming::table_name(album_name))
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("Picture file {} was already gone", path.display());
                Ok(())
            }
            other => other,
        }
    }

    fn delete_album_directory(&self, album_name: &str) -> io::Result<()> {
        match std::fs::remove_dir_all(self.album_directory(album_name)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn rename_album_directory(&self, old_album_name: &str, new_album_name: &str) -> io::Result<()> {
        let from = self.album_directory(old_album_name);
        let to = self.album_directory(new_album_name);
        if from == to || !from.exists() {
            return Ok(());
        }
        std::fs::rename(from, to)
    }
}

// ── Link Table ──────────────────────────────────────────────────────────────

pub(crate) fn create_picture_table(conn: &Connection, picture_table: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "CREATE TABLE {} (
            id INTEGER PRIMARY KEY,
            original_picture_filename TEXT NOT NULL,
            thumbnail_picture_filename TEXT NOT NULL,
            album_item_foreign_key INTEGER NOT NULL
        )",
        quote_identifier(picture_table)
    ))?;
    log::debug!("Created picture table '{picture_table}'");
    Ok(())
}

pub(crate) fn drop_picture_table(conn: &Connection, picture_table: &str) -> Result<(), StoreError> {
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_identifier(picture_table)))?;
    log::debug!("Dropped picture table '{picture_table}'");
    Ok(())
}

pub(crate) fn insert_pictures(
    conn: &Connection,
    entry: &AlbumEntry,
    item_id: i64,
    pictures: &[AlbumItemPicture],
) -> Result<(), StoreError> {
    let sql = format!(
        "INSERT INTO {} (original_picture_filename, thumbnail_picture_filename, album_item_foreign_key)
         VALUES (?1, ?2, ?3)",
        quote_identifier(&entry.picture_table_name())
    );
    for picture in pictures {
        for name in [&picture.original_filename, &picture.thumbnail_filename] {
            if !is_plain_file_name(name) {
                return Err(StoreError::invalid_item(
                    &entry.album_name,
                    format!("picture file name '{name}' must be a plain file name"),
                ));
            }
        }
        conn.execute(
            &sql,
            params![picture.original_filename, picture.thumbnail_filename, item_id],
        )?;
    }
    Ok(())
}

/// A single normal path component: no separators, no `..`, not absolute.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub(crate) fn pictures_for_item(
    conn: &Connection,
    entry: &AlbumEntry,
    item_id: i64,
) -> Result<Vec<AlbumItemPicture>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, original_picture_filename, thumbnail_picture_filename
         FROM {} WHERE album_item_foreign_key = ?1 ORDER BY id",
        quote_identifier(&entry.picture_table_name())
    ))?;
    let rows = stmt.query_map([item_id], |row| {
        Ok(AlbumItemPicture {
            id: Some(row.get(0)?),
            original_filename: row.get(1)?,
            thumbnail_filename: row.get(2)?,
            album_name: entry.album_name.clone(),
            album_item_id: Some(item_id),
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

pub(crate) fn delete_pictures_for_item(
    conn: &Connection,
    entry: &AlbumEntry,
    item_id: i64,
) -> Result<usize, StoreError> {
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {} WHERE album_item_foreign_key = ?1",
            quote_identifier(&entry.picture_table_name())
        ),
        [item_id],
    )?;
    Ok(deleted)
}
