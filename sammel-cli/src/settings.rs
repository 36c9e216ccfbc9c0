//! Settings file and store path resolution.
//!
//! The settings file is `~/.config/sammel/settings.toml`:
//!
//! ```toml
//! [store]
//! database_path = "/home/me/albums.db"
//! pictures_dir = "/home/me/album-pictures"
//! ```

use std::io;
use std::path::{Path, PathBuf};

const STORE_TABLE: &str = "store";
pub(crate) const DATABASE_KEY: &str = "database_path";
pub(crate) const PICTURES_KEY: &str = "pictures_dir";

/// Canonical path to the settings file: `~/.config/sammel/settings.toml`.
pub(crate) fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("sammel").join("settings.toml")
}

/// Where data lives when nothing else is configured: `~/.local/share/sammel`.
fn data_dir() -> PathBuf {
    let data = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    data.join("sammel")
}

/// Where a store path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathSource {
    CommandLine,
    SettingsFile,
    Default,
}

impl std::fmt::Display for PathSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PathSource::CommandLine => "command line",
            PathSource::SettingsFile => "settings file",
            PathSource::Default => "default",
        })
    }
}

/// Resolve a store path using a priority chain:
///
/// 1. CLI override (if `Some`)
/// 2. Saved `[store] <key>` in `settings.toml`
/// 3. `default_name` under the data directory
pub(crate) fn resolve_path(
    settings: &Path,
    cli_override: Option<PathBuf>,
    key: &str,
    default_name: &str,
) -> (PathBuf, PathSource) {
    if let Some(p) = cli_override {
        return (p, PathSource::CommandLine);
    }
    if let Some(p) = load_path(settings, key) {
        return (p, PathSource::SettingsFile);
    }
    (data_dir().join(default_name), PathSource::Default)
}

pub(crate) fn resolve_database_path(cli_override: Option<PathBuf>) -> (PathBuf, PathSource) {
    resolve_path(&settings_path(), cli_override, DATABASE_KEY, "albums.db")
}

pub(crate) fn resolve_pictures_dir(cli_override: Option<PathBuf>) -> (PathBuf, PathSource) {
    resolve_path(&settings_path(), cli_override, PICTURES_KEY, "pictures")
}

/// Read `store.<key>` from a settings file, if set.
fn load_path(settings: &Path, key: &str) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(settings).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    let value = doc.get(STORE_TABLE)?.get(key)?.as_str()?;
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

/// Save (or clear) `store.<key>` in a settings file.
///
/// Uses `toml::Value` for a surgical update so other keys are preserved.
pub(crate) fn save_path(settings: &Path, key: &str, path: Option<&Path>) -> io::Result<()> {
    let mut doc: toml::Value = if let Ok(contents) = std::fs::read_to_string(settings) {
        contents
            .parse()
            .unwrap_or_else(|_| toml::Value::Table(Default::default()))
    } else {
        toml::Value::Table(Default::default())
    };

    // Ensure [store] table exists
    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings.toml root is not a table"))?;
    let store = table
        .entry(STORE_TABLE)
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let store_table = store
        .as_table_mut()
        .ok_or_else(|| io::Error::other("[store] is not a table"))?;

    match path {
        Some(p) => {
            store_table.insert(
                key.to_string(),
                toml::Value::String(p.to_string_lossy().into_owned()),
            );
        }
        None => {
            store_table.remove(key);
        }
    }

    // Write atomically
    if let Some(parent) = settings.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = settings.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, settings)?;

    Ok(())
}

/// Load the full settings file as a pretty-printed TOML string for display.
pub(crate) fn load_settings_string(settings: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(settings).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}
