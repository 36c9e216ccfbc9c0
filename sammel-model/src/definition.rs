//! YAML album definitions.
//!
//! An album definition names an album, its picture support, and its fields:
//!
//! ```text
//! name: Books
//! has_pictures: false
//! fields:
//!   - name: Title
//!     type: Text
//!     quick_searchable: true
//!   - name: Pages
//!     type: Integer
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MetaItemField;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yml::Error,
    },
    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumDefinition {
    pub name: String,
    #[serde(default)]
    pub has_pictures: bool,
    pub fields: Vec<MetaItemField>,
}

/// Load a single album definition from a YAML file.
pub fn load_album_definition(path: &Path) -> Result<AlbumDefinition, DefinitionError> {
    let contents = std::fs::read_to_string(path).map_err(|e| DefinitionError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_yml::from_str(&contents).map_err(|e| DefinitionError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load every `.yaml`/`.yml` album definition in a directory, in file-name
/// order. A missing directory yields no definitions.
pub fn load_album_definitions(dir: &Path) -> Result<Vec<AlbumDefinition>, DefinitionError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(DefinitionError::DirNotFound(dir.display().to_string()));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| DefinitionError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    entries
        .iter()
        .map(|entry| load_album_definition(&entry.path()))
        .collect()
}
