//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sammel")]
#[command(about = "Keep collections of typed items in albums", long_about = None)]
pub(crate) struct Cli {
    /// Album store file (defaults to the settings file, then the data directory)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Directory holding album pictures
    #[arg(long, global = true)]
    pub pictures: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Create, rename and remove albums
    Album {
        #[command(subcommand)]
        action: AlbumAction,
    },

    /// Change the fields of an album
    Field {
        #[command(subcommand)]
        action: FieldAction,
    },

    /// Add, change and list items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Quicksearch an album
    Search {
        /// Album to search
        album: String,

        /// Terms; an item matches when any quick-searchable field matches any term
        terms: Vec<String>,
    },

    /// Check or reset the album store
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// On/off switch for flags.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Switch {
    On,
    Off,
}

impl Switch {
    pub(crate) fn enabled(self) -> bool {
        matches!(self, Switch::On)
    }
}

#[derive(Subcommand)]
pub(crate) enum AlbumAction {
    /// List all albums
    List,

    /// Create an album
    Create {
        /// Album name (taken from the definition file when --from is used)
        #[arg(required_unless_present = "from")]
        name: Option<String>,

        /// Field as NAME:TYPE or NAME:TYPE:quick (repeatable)
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Store pictures with items
        #[arg(long)]
        pictures: bool,

        /// Read the album definition from a YAML file
        #[arg(long, conflicts_with = "fields")]
        from: Option<PathBuf>,
    },

    /// Rename an album
    Rename { old: String, new: String },

    /// Remove an album with all its items and pictures
    Remove {
        name: String,

        /// Actually remove; without it only shows what would be removed
        #[arg(long)]
        confirm: bool,
    },

    /// Show the fields of an album
    Fields { name: String },

    /// Turn picture support on or off
    Pictures { name: String, state: Switch },
}

#[derive(Subcommand)]
pub(crate) enum FieldAction {
    /// Append a field given as NAME:TYPE or NAME:TYPE:quick
    Add { album: String, spec: String },

    /// Remove a field and its values
    Remove { album: String, field: String },

    /// Rename a field
    Rename {
        album: String,
        field: String,
        new_name: String,
    },

    /// Move a field after another one, or to the front
    Move {
        album: String,
        field: String,

        /// Field to place it after (front when omitted)
        #[arg(long)]
        after: Option<String>,
    },

    /// Include a field in quicksearch or leave it out
    Quicksearch {
        album: String,
        field: String,
        state: Switch,
    },
}

#[derive(Subcommand)]
pub(crate) enum ItemAction {
    /// Add an item from FIELD=VALUE pairs
    Add { album: String, values: Vec<String> },

    /// Change fields of an item from FIELD=VALUE pairs
    Update {
        album: String,
        id: i64,
        values: Vec<String>,
    },

    /// Delete an item and its pictures
    Delete { album: String, id: i64 },

    /// Show one item
    Show { album: String, id: i64 },

    /// List items, optionally filtered and sorted
    List {
        album: String,

        /// Condition as FIELD:OPERATOR:VALUE, e.g. Pages:>:400 (repeatable)
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,

        /// Match any condition instead of all of them
        #[arg(long)]
        any: bool,

        /// Field to sort by
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum StoreAction {
    /// Verify that every album's tables are present and consistent
    Check,

    /// Move the store file aside and start with an empty store
    Reset {
        /// Actually reset; without it only shows what would happen
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show resolved paths and their sources
    Show,

    /// Print the settings file path
    Path,

    /// Save the album store file path
    SetDatabase { path: PathBuf },

    /// Save the picture directory
    SetPictures { path: PathBuf },
}
