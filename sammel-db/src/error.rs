//! Store errors and their clean/dirty classification.

use std::path::Path;

use sammel_model::{FieldType, MetaItemField, QueryError};
use thiserror::Error;

/// How much of the store a failed operation may have touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorState {
    /// Nothing was changed, or every change was rolled back.
    Clean,
    /// Changes may be partially applied. Run [`crate::AlbumStore::check`]
    /// before mutating the store again.
    Dirty,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Album '{0}' does not exist")]
    UnknownAlbum(String),

    #[error("Album name '{0}' is already in use")]
    AlbumNameTaken(String),

    #[error("Album name must not be empty")]
    EmptyAlbumName,

    #[error("Field name must not be empty")]
    EmptyFieldName,

    #[error("Album '{album}' has no field named '{field}'")]
    UnknownField { album: String, field: String },

    #[error("Album '{album}' already has a field named '{field}'")]
    FieldNameTaken { album: String, field: String },

    #[error("Field name '{0}' must not contain '[' or ']'")]
    InvalidFieldName(String),

    #[error("'{0}' is reserved and cannot be used as a field name")]
    ReservedFieldName(String),

    #[error("Field '{field}' of album '{album}' has changed: expected {expected}, found {actual}")]
    SchemaMismatch {
        album: String,
        field: String,
        expected: MetaItemField,
        actual: MetaItemField,
    },

    #[error("Field '{field}' cannot be of type {field_type} here")]
    FieldTypeNotAllowed { field: String, field_type: FieldType },

    #[error("Invalid item for album '{album}': {reason}")]
    InvalidItem { album: String, reason: String },

    #[error("Item for album '{0}' has no content version to keep")]
    MissingContentVersion(String),

    #[error("Item for album '{0}' has no id")]
    MissingItemId(String),

    #[error("Album '{album}' has no item with id {id}")]
    ItemNotFound { album: String, id: i64 },

    #[error("Picture support for album '{album}' is already set to {enabled}")]
    PictureCapabilityUnchanged { album: String, enabled: bool },

    #[error("Cannot read column '{column}' as {field_type}: {reason}")]
    Decode {
        column: String,
        field_type: FieldType,
        reason: String,
    },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Query does not select from a table: {0}")]
    UnresolvedQuery(String),

    #[error("Store format {found} is newer than the supported format {supported}")]
    UnsupportedFormat { found: i32, supported: i32 },

    #[error("Store is inconsistent: {0}")]
    Inconsistent(String),

    #[error("SQLite error: {source}")]
    Storage {
        state: ErrorState,
        source: rusqlite::Error,
    },

    #[error("Rollback after '{cause}' failed: {source}")]
    RollbackFailed {
        cause: String,
        source: rusqlite::Error,
    },

    #[error("Picture file error at {path}: {source}")]
    PictureFiles {
        path: String,
        source: std::io::Error,
    },

    #[error("Store file error at {path}: {source}")]
    StoreFile {
        path: String,
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn state(&self) -> ErrorState {
        match self {
            StoreError::Storage { state, .. } => *state,
            StoreError::RollbackFailed { .. }
            | StoreError::PictureFiles { .. }
            | StoreError::StoreFile { .. }
            | StoreError::Inconsistent(_) => ErrorState::Dirty,
            _ => ErrorState::Clean,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == ErrorState::Dirty
    }

    /// Reclassify an engine failure as clean once nothing it touched remains.
    pub(crate) fn into_clean(self) -> Self {
        match self {
            StoreError::Storage { source, .. } => StoreError::Storage {
                state: ErrorState::Clean,
                source,
            },
            other => other,
        }
    }

    pub(crate) fn picture_files(path: &Path, source: std::io::Error) -> Self {
        StoreError::PictureFiles {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn store_file(path: &Path, source: std::io::Error) -> Self {
        StoreError::StoreFile {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn decode(column: &str, field_type: FieldType, reason: impl Into<String>) -> Self {
        StoreError::Decode {
            column: column.to_string(),
            field_type,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_item(album: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidItem {
            album: album.to_string(),
            reason: reason.into(),
        }
    }
}

/// Engine failures count as dirty until a rollback proves otherwise.
impl From<rusqlite::Error> for StoreError {
    fn from(source: rusqlite::Error) -> Self {
        StoreError::Storage {
            state: ErrorState::Dirty,
            source,
        }
    }
}
