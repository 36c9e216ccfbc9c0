//! Album data model, query builder, and YAML album definitions.
//!
//! This crate defines field types, typed values and items without any
//! database dependencies. `sammel-db` persists them.

pub mod definition;
pub mod naming;
pub mod query;
pub mod types;

pub use definition::{AlbumDefinition, DefinitionError, load_album_definition, load_album_definitions};
pub use query::{QueryComponent, QueryError, QueryOperator, SortOrder, build_query};
pub use types::*;
