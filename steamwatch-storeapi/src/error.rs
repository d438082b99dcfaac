use steamwatch_core::{AppId, PackageId};
use thiserror::Error;

/// Errors from fetching catalog data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, TLS error.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The store answered with a non-200 status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not the JSON shape the store normally returns.
    #[error("unexpected response from {url}: {message}")]
    Malformed { url: String, message: String },

    /// The store reports `success: false` for this app.
    #[error("app {0} not found on the store")]
    AppNotFound(AppId),

    /// The store reports `success: false` for this package.
    #[error("package {0} not found on the store")]
    PackageNotFound(PackageId),

    /// Canned failure from an in-memory fetcher.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
