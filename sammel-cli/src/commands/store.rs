use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use sammel_db::{AlbumStore, LocalPictureFiles};

use crate::CliError;

use super::StorePaths;

pub(crate) fn run_store_check(paths: &StorePaths) -> Result<(), CliError> {
    // Opening runs the self-check
    let store = paths.open()?;
    let albums = store
        .list_albums()
        .map_err(CliError::store("Failed to list albums"))?;
    log::info!(
        "{} {} ({} album(s))",
        "OK".if_supports_color(Stdout, |t| t.green()),
        paths.database.display(),
        albums.len(),
    );
    Ok(())
}

pub(crate) fn run_store_reset(paths: &StorePaths, confirm: bool) -> Result<(), CliError> {
    if !paths.database.exists() {
        log::info!("No album store at {}; nothing to reset.", paths.database.display());
        return Ok(());
    }

    if !confirm {
        log::warn!(
            "This will move {} aside and start with an empty album store.",
            paths.database.display()
        );
        log::info!("Picture files are left in place.");
        log::info!("Re-run with --confirm to proceed:");
        log::info!("  sammel store reset --confirm");
        return Ok(());
    }

    let (store, aside) =
        AlbumStore::reset_file(&paths.database, LocalPictureFiles::new(&paths.pictures))
            .map_err(CliError::store("Failed to reset album store"))?;
    store
        .close()
        .map_err(CliError::store("Failed to close album store"))?;

    log::info!(
        "{}",
        "Album store reset.".if_supports_color(Stdout, |t| t.bold())
    );
    log::info!("  Old store kept at {}", aside.display());
    Ok(())
}
