//! Error types for stackplan core data loading.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while parsing sizes or loading inventories, catalogs and config.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse inventory: {0}")]
    Inventory(String),

    #[error("failed to parse catalog: {0}")]
    Catalog(String),

    #[error("duplicate charm in catalog: {0}")]
    DuplicateCharm(String),

    #[error("failed to parse config: {0}")]
    Config(String),
}
