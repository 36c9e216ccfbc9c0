use std::path::PathBuf;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use sammel_model::{MetaItemField, load_album_definition};

use crate::CliError;

use super::{StorePaths, parse_field_spec};

pub(crate) fn run_album_list(paths: &StorePaths) -> Result<(), CliError> {
    let store = paths.open()?;
    let albums = store
        .list_albums()
        .map_err(CliError::store("Failed to list albums"))?;

    if albums.is_empty() {
        log::info!("No albums yet.");
        log::info!("Create one with 'sammel album create NAME --field Title:Text:quick'.");
        return Ok(());
    }

    log::info!("{}", "Albums".if_supports_color(Stdout, |t| t.bold()));
    for name in albums {
        let count = store
            .item_count(&name)
            .map_err(CliError::store(format!("Failed to count items of '{name}'")))?;
        let pictures = store
            .has_pictures(&name)
            .map_err(CliError::store(format!("Failed to read album '{name}'")))?;
        log::info!(
            "  {} {}{}",
            name.if_supports_color(Stdout, |t| t.cyan()),
            format!("({count} items)").if_supports_color(Stdout, |t| t.dimmed()),
            if pictures {
                format!(" {}", "[pictures]".if_supports_color(Stdout, |t| t.green()))
            } else {
                String::new()
            },
        );
    }
    Ok(())
}

pub(crate) fn run_album_create(
    paths: &StorePaths,
    name: Option<String>,
    specs: &[String],
    pictures: bool,
    from: Option<PathBuf>,
) -> Result<(), CliError> {
    let (name, fields, pictures) = match from {
        Some(path) => {
            let definition = load_album_definition(&path)
                .map_err(|e| CliError::input(format!("Failed to load {}: {e}", path.display())))?;
            (
                name.unwrap_or(definition.name),
                definition.fields,
                pictures || definition.has_pictures,
            )
        }
        None => {
            let fields = specs
                .iter()
                .map(|s| parse_field_spec(s))
                .collect::<Result<Vec<_>, _>>()?;
            let name = name.ok_or_else(|| CliError::input("An album name is required"))?;
            (name, fields, pictures)
        }
    };

    let store = paths.open()?;
    let entry = store
        .create_album(&name, &fields, pictures)
        .map_err(CliError::store(format!("Failed to create album '{name}'")))?;

    log::info!(
        "Created album {} with {} field(s).",
        entry.album_name.if_supports_color(Stdout, |t| t.bold()),
        fields.len(),
    );
    for field in &fields {
        log::info!("  {field}");
    }
    Ok(())
}

pub(crate) fn run_album_rename(paths: &StorePaths, old: &str, new: &str) -> Result<(), CliError> {
    let store = paths.open()?;
    store
        .rename_album(old, new)
        .map_err(CliError::store(format!("Failed to rename album '{old}'")))?;
    log::info!("Renamed album '{old}' to '{new}'.");
    Ok(())
}

pub(crate) fn run_album_remove(paths: &StorePaths, name: &str, confirm: bool) -> Result<(), CliError> {
    let store = paths.open()?;
    let entry = store
        .album(name)
        .map_err(CliError::store("Failed to find album"))?;
    let count = store
        .item_count(name)
        .map_err(CliError::store(format!("Failed to count items of '{name}'")))?;

    if !confirm {
        log::warn!(
            "This will permanently delete album '{}' with {count} item(s){}.",
            entry.album_name,
            if entry.has_pictures {
                " and all its pictures"
            } else {
                ""
            },
        );
        log::info!("Re-run with --confirm to proceed:");
        log::info!("  sammel album remove '{}' --confirm", entry.album_name);
        return Ok(());
    }

    store
        .remove_album(name)
        .map_err(CliError::store(format!("Failed to remove album '{name}'")))?;
    log::info!(
        "{}",
        format!("Album '{}' removed.", entry.album_name).if_supports_color(Stdout, |t| t.bold()),
    );
    Ok(())
}

pub(crate) fn run_album_fields(paths: &StorePaths, name: &str) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields: Vec<MetaItemField> = store
        .album_fields(name)
        .map_err(CliError::store("Failed to read fields"))?;
    let version = store
        .schema_version(name)
        .map_err(CliError::store("Failed to read schema version"))?;

    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    for field in &fields {
        log::info!(
            "  {:<width$}  {:<10}{}",
            field.name.if_supports_color(Stdout, |t| t.cyan()),
            field.field_type.name(),
            if field.quick_searchable {
                "quicksearch"
            } else {
                ""
            },
        );
    }
    log::debug!("Schema version {version}");
    Ok(())
}

pub(crate) fn run_album_pictures(paths: &StorePaths, name: &str, enabled: bool) -> Result<(), CliError> {
    let store = paths.open()?;
    store
        .set_album_picture_capability(name, enabled)
        .map_err(CliError::store(format!("Failed to change picture support of '{name}'")))?;
    log::info!(
        "Pictures {} for album '{name}'.",
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}
