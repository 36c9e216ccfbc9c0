use crate::CliError;

use super::{StorePaths, log_item_table};

pub(crate) fn run_search(paths: &StorePaths, album: &str, terms: &[String]) -> Result<(), CliError> {
    let store = paths.open()?;
    let query = store
        .quicksearch_query(album, terms)
        .map_err(CliError::store(format!("Failed to search '{album}'")))?;
    log::debug!("Quicksearch query: {query}");

    let items = store
        .fetch_items(&query)
        .map_err(CliError::store(format!("Failed to search '{album}'")))?;
    log_item_table(&items);
    Ok(())
}
