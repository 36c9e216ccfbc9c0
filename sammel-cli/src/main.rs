//! sammel CLI
//!
//! Command-line interface for keeping collections of typed items in albums.

mod cli_types;
mod commands;
mod error;
mod settings;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use cli_types::{AlbumAction, Cli, Commands, ConfigAction, FieldAction, ItemAction, StoreAction};
pub(crate) use error::CliError;

/// Print an empty line through the logger so `--quiet` silences it too.
pub(crate) fn log_blank() {
    log::info!("");
}

/// Install the logger. Info messages are the regular output: without
/// `--verbose` they are printed bare, with it every line gets a timestamp
/// and level.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if verbose {
        builder.format_timestamp_millis();
    } else {
        builder.format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level.as_str().to_lowercase(), record.args()),
        });
    }
    builder.init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let paths = commands::StorePaths::resolve(cli.database, cli.pictures);

    match cli.command {
        Commands::Album { action } => match action {
            AlbumAction::List => commands::album::run_album_list(&paths),
            AlbumAction::Create {
                name,
                fields,
                pictures,
                from,
            } => commands::album::run_album_create(&paths, name, &fields, pictures, from),
            AlbumAction::Rename { old, new } => commands::album::run_album_rename(&paths, &old, &new),
            AlbumAction::Remove { name, confirm } => {
                commands::album::run_album_remove(&paths, &name, confirm)
            }
            AlbumAction::Fields { name } => commands::album::run_album_fields(&paths, &name),
            AlbumAction::Pictures { name, state } => {
                commands::album::run_album_pictures(&paths, &name, state.enabled())
            }
        },
        Commands::Field { action } => match action {
            FieldAction::Add { album, spec } => commands::field::run_field_add(&paths, &album, &spec),
            FieldAction::Remove { album, field } => {
                commands::field::run_field_remove(&paths, &album, &field)
            }
            FieldAction::Rename {
                album,
                field,
                new_name,
            } => commands::field::run_field_rename(&paths, &album, &field, &new_name),
            FieldAction::Move {
                album,
                field,
                after,
            } => commands::field::run_field_move(&paths, &album, &field, after.as_deref()),
            FieldAction::Quicksearch {
                album,
                field,
                state,
            } => commands::field::run_field_quicksearch(&paths, &album, &field, state.enabled()),
        },
        Commands::Item { action } => match action {
            ItemAction::Add { album, values } => commands::item::run_item_add(&paths, &album, &values),
            ItemAction::Update { album, id, values } => {
                commands::item::run_item_update(&paths, &album, id, &values)
            }
            ItemAction::Delete { album, id } => commands::item::run_item_delete(&paths, &album, id),
            ItemAction::Show { album, id } => commands::item::run_item_show(&paths, &album, id),
            ItemAction::List {
                album,
                conditions,
                any,
                sort,
                desc,
            } => commands::item::run_item_list(
                &paths,
                &album,
                &conditions,
                !any,
                sort.as_deref(),
                !desc,
            ),
        },
        Commands::Search { album, terms } => commands::search::run_search(&paths, &album, &terms),
        Commands::Store { action } => match action {
            StoreAction::Check => commands::store::run_store_check(&paths),
            StoreAction::Reset { confirm } => commands::store::run_store_reset(&paths, confirm),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(&paths),
            ConfigAction::Path => commands::config::run_config_path(),
            ConfigAction::SetDatabase { path } => commands::config::run_config_set_database(&path),
            ConfigAction::SetPictures { path } => commands::config::run_config_set_pictures(&path),
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            if e.is_dirty() {
                eprintln!(
                    "{}",
                    "The album store may be partially modified. Run 'sammel store check', \
                     and 'sammel store reset' if the check fails."
                        .if_supports_color(Stderr, |t| t.yellow()),
                );
            }
            ExitCode::FAILURE
        }
    }
}
