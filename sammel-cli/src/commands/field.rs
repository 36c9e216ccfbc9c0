use crate::CliError;

use super::{StorePaths, find_field, parse_field_spec};

pub(crate) fn run_field_add(paths: &StorePaths, album: &str, spec: &str) -> Result<(), CliError> {
    let field = parse_field_spec(spec)?;
    let store = paths.open()?;
    store
        .append_field(album, &field)
        .map_err(CliError::store(format!("Failed to add field to '{album}'")))?;
    log::info!("Added field {field} to '{album}'.");
    Ok(())
}

pub(crate) fn run_field_remove(paths: &StorePaths, album: &str, name: &str) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields = store
        .album_fields(album)
        .map_err(CliError::store("Failed to read fields"))?;
    let field = find_field(album, &fields, name)?;

    store
        .remove_field(album, field)
        .map_err(CliError::store(format!("Failed to remove field '{name}'")))?;
    log::info!("Removed field '{}' from '{album}'.", field.name);
    Ok(())
}

pub(crate) fn run_field_rename(
    paths: &StorePaths,
    album: &str,
    name: &str,
    new_name: &str,
) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields = store
        .album_fields(album)
        .map_err(CliError::store("Failed to read fields"))?;
    let field = find_field(album, &fields, name)?;

    store
        .rename_field(album, field, new_name)
        .map_err(CliError::store(format!("Failed to rename field '{name}'")))?;
    log::info!("Renamed field '{}' to '{new_name}'.", field.name);
    Ok(())
}

pub(crate) fn run_field_move(
    paths: &StorePaths,
    album: &str,
    name: &str,
    after: Option<&str>,
) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields = store
        .album_fields(album)
        .map_err(CliError::store("Failed to read fields"))?;
    let field = find_field(album, &fields, name)?;
    let preceding = after
        .map(|a| find_field(album, &fields, a).map(|f| f.name.as_str()))
        .transpose()?;

    store
        .reorder_field(album, field, preceding)
        .map_err(CliError::store(format!("Failed to move field '{name}'")))?;
    match preceding {
        Some(p) => log::info!("Moved field '{}' after '{p}'.", field.name),
        None => log::info!("Moved field '{}' to the front.", field.name),
    }
    Ok(())
}

pub(crate) fn run_field_quicksearch(
    paths: &StorePaths,
    album: &str,
    name: &str,
    enabled: bool,
) -> Result<(), CliError> {
    let store = paths.open()?;
    let fields = store
        .album_fields(album)
        .map_err(CliError::store("Failed to read fields"))?;
    let field = find_field(album, &fields, name)?;

    store
        .set_quick_searchable(album, &field.name, enabled)
        .map_err(CliError::store(format!("Failed to change quicksearch for '{name}'")))?;
    log::info!(
        "Quicksearch {} for field '{}'.",
        if enabled { "enabled" } else { "disabled" },
        field.name
    );
    Ok(())
}
