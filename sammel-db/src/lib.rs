//! SQLite persistence layer for albums.
//!
//! Provides the album catalog, per-album type-info and content tables,
//! picture links, quicksearch indexes and the rebuild-based schema
//! migrations, all behind the [`AlbumStore`] façade. Backed by SQLite via
//! rusqlite with the bundled feature.

mod catalog;
mod content;
mod cursor;
pub mod error;
mod migration;
pub mod pictures;
mod quicksearch;
mod savepoint;
pub mod schema;
mod store;
mod type_info;

pub use catalog::AlbumEntry;
pub use error::{ErrorState, StoreError};
pub use pictures::{LocalPictureFiles, PictureFiles, THUMBNAILS_DIR};
pub use quicksearch::quicksearch_query;
pub use schema::{CURRENT_VERSION, open_database, open_memory};
pub use store::AlbumStore;
