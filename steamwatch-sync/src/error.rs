//! Error types for steamwatch-sync.

use steamwatch_core::{AppId, StoreError};
use steamwatch_storeapi::FetchError;
use thiserror::Error;

/// Errors surfaced by coordinator operations that are not per-entity.
///
/// Per-entity failures inside a fetch run are collected into a
/// [`RunReport`](crate::RunReport) instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The app id is not in the store at all.
    #[error("app {0} is not watched")]
    NotWatched(AppId),
}

/// A failed observer. Logged by the bus, never propagated.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Message(String),

    /// A hook command ran but exited unsuccessfully.
    #[error("command `{command}` failed: {status}")]
    CommandFailed { command: String, status: String },

    /// A hook command could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}
