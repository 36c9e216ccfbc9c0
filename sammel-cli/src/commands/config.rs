use std::path::Path;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::CliError;
use crate::settings::{self, DATABASE_KEY, PICTURES_KEY};

use super::StorePaths;

pub(crate) fn run_config_show(paths: &StorePaths) -> Result<(), CliError> {
    let settings_path = settings::settings_path();

    log::info!("{}", "Paths".if_supports_color(Stdout, |t| t.bold()));
    log::info!(
        "  Album store: {} {}",
        paths.database.display(),
        format!("({})", paths.database_source).if_supports_color(Stdout, |t| t.dimmed()),
    );
    log::info!(
        "  Pictures:    {} {}",
        paths.pictures.display(),
        format!("({})", paths.pictures_source).if_supports_color(Stdout, |t| t.dimmed()),
    );
    crate::log_blank();

    log::info!(
        "{} {}",
        "Settings file".if_supports_color(Stdout, |t| t.bold()),
        settings_path.display()
    );
    match settings::load_settings_string(&settings_path) {
        Some(contents) if !contents.trim().is_empty() => {
            for line in contents.lines() {
                log::info!("  {line}");
            }
        }
        _ => log::info!("  (not set)"),
    }
    Ok(())
}

pub(crate) fn run_config_path() -> Result<(), CliError> {
    log::info!("{}", settings::settings_path().display());
    Ok(())
}

fn save(key: &str, path: &Path) -> Result<(), CliError> {
    let path = std::path::absolute(path)?;
    let settings_path = settings::settings_path();
    settings::save_path(&settings_path, key, Some(&path)).map_err(|e| {
        CliError::config(format!("Failed to write {}: {e}", settings_path.display()))
    })?;
    log::info!("Saved {key} = {}", path.display());
    Ok(())
}

pub(crate) fn run_config_set_database(path: &Path) -> Result<(), CliError> {
    save(DATABASE_KEY, path)
}

pub(crate) fn run_config_set_pictures(path: &Path) -> Result<(), CliError> {
    save(PICTURES_KEY, path)
}
