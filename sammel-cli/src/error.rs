use sammel_db::StoreError;
use thiserror::Error;

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Store operation failed
    #[error("{context}: {source}")]
    Store {
        context: String,
        source: StoreError,
    },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Malformed command-line input
    #[error("{0}")]
    Input(String),
}

impl CliError {
    pub(crate) fn store(context: impl Into<String>) -> impl FnOnce(StoreError) -> Self {
        let context = context.into();
        move |source| Self::Store { context, source }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Whether the store may be left partially modified.
    pub(crate) fn is_dirty(&self) -> bool {
        matches!(self, Self::Store { source, .. } if source.is_dirty())
    }
}
