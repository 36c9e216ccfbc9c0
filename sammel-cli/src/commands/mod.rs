pub(crate) mod album;
pub(crate) mod config;
pub(crate) mod field;
pub(crate) mod item;
pub(crate) mod search;
pub(crate) mod store;

use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use sammel_db::{AlbumStore, LocalPictureFiles};
use sammel_model::{AlbumItem, FieldType, MetaItemField};

use crate::CliError;
use crate::settings::{self, PathSource};

/// Store file and picture directory after resolving flags and settings.
pub(crate) struct StorePaths {
    pub database: PathBuf,
    pub database_source: PathSource,
    pub pictures: PathBuf,
    pub pictures_source: PathSource,
}

impl StorePaths {
    pub(crate) fn resolve(database: Option<PathBuf>, pictures: Option<PathBuf>) -> Self {
        let (database, database_source) = settings::resolve_database_path(database);
        let (pictures, pictures_source) = settings::resolve_pictures_dir(pictures);
        Self {
            database,
            database_source,
            pictures,
            pictures_source,
        }
    }

    /// Open the store, creating the file and its directory on first use.
    pub(crate) fn open(&self) -> Result<AlbumStore, CliError> {
        if let Some(parent) = self.database.parent() {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("Opening album store {}", self.database.display());
        AlbumStore::open(&self.database, LocalPictureFiles::new(&self.pictures)).map_err(
            CliError::store(format!(
                "Failed to open album store {}",
                self.database.display()
            )),
        )
    }
}

/// Parse a field given as `NAME:TYPE` or `NAME:TYPE:quick`.
pub(crate) fn parse_field_spec(spec: &str) -> Result<MetaItemField, CliError> {
    let mut parts = spec.split(':');
    let name = parts.next().unwrap_or_default().trim();
    let field_type = parts
        .next()
        .ok_or_else(|| CliError::input(format!("'{spec}' is not NAME:TYPE")))?;
    let quick = match parts.next().map(str::trim) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case("quick") => true,
        Some(flag) => {
            return Err(CliError::input(format!(
                "Unknown field flag '{flag}' in '{spec}' (expected 'quick')"
            )));
        }
    };
    if parts.next().is_some() || name.is_empty() {
        return Err(CliError::input(format!("'{spec}' is not NAME:TYPE[:quick]")));
    }

    let field_type: FieldType = field_type.parse().map_err(|e| {
        CliError::input(format!(
            "{e}; choose one of {}",
            FieldType::USER_TYPES
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })?;
    Ok(MetaItemField::new(name, field_type, quick))
}

/// Split `FIELD=VALUE`. The value may itself contain `=`.
pub(crate) fn parse_assignment(arg: &str) -> Result<(&str, &str), CliError> {
    match arg.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => Ok((field.trim(), value)),
        _ => Err(CliError::input(format!("'{arg}' is not FIELD=VALUE"))),
    }
}

/// Find a field by name, exact match first, then ignoring case.
pub(crate) fn find_field<'a>(
    album: &str,
    fields: &'a [MetaItemField],
    name: &str,
) -> Result<&'a MetaItemField, CliError> {
    fields
        .iter()
        .find(|f| f.name == name)
        .or_else(|| fields.iter().find(|f| f.has_name(name)))
        .ok_or_else(|| CliError::input(format!("Album '{album}' has no field '{name}'")))
}

/// Print one item: id header, then one line per field.
pub(crate) fn log_item(item: &AlbumItem) {
    let id = item
        .id
        .map_or_else(|| "new".to_string(), |id| id.to_string());
    log::info!(
        "{}",
        format!("#{id}").if_supports_color(Stdout, |t| t.bold()),
    );
    let width = item.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for field in &item.fields {
        log::info!(
            "  {:<width$}  {}",
            field.name.if_supports_color(Stdout, |t| t.cyan()),
            field.value,
        );
    }
    for picture in &item.pictures {
        log::info!(
            "  {:<width$}  {}",
            "picture".if_supports_color(Stdout, |t| t.dimmed()),
            picture.original_filename,
        );
    }
}

/// Print items one line each, values separated by `|`.
pub(crate) fn log_item_table(items: &[AlbumItem]) {
    for item in items {
        let values: Vec<String> = item.fields.iter().map(|f| f.value.to_string()).collect();
        log::info!(
            "{:>6}  {}",
            item.id.unwrap_or_default().if_supports_color(Stdout, |t| t.dimmed()),
            values.join(" | "),
        );
    }
    crate::log_blank();
    log::info!("{} item(s)", items.len());
}
