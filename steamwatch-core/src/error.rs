//! Error types for steamwatch-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Field, Subject};

/// All errors that can arise from snapshot store operations.
///
/// A failed write never leaves partial state behind: every mutating store
/// call runs inside one SQLite transaction.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure (locked database, disk full, schema mismatch, ...).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not create the directory holding the database file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Field value could not be encoded for the history table.
    #[error("history value encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The app or package row does not exist.
    #[error("{subject} not found in store")]
    NotFound { subject: Subject },

    /// The field is not tracked on this kind of subject.
    #[error("field '{field}' is not tracked on {subject}")]
    InvalidField { subject: Subject, field: Field },
}

/// Errors from loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the offending file.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// The text given on the command line is neither an app id nor a store URL.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid app id '{0}'")]
pub struct AppIdError(pub String);

/// A major-unit amount that cannot be represented in minor units.
#[derive(Debug, Error, PartialEq)]
#[error("invalid amount {0}: must be a finite, non-negative number")]
pub struct AmountError(pub f64);
