//! Catalog fetching for steamwatch.
//!
//! [`CatalogFetcher`] is the seam between the coordinator and the outside
//! world. [`SteamStoreApi`] talks to the Steam store over HTTP;
//! [`StubFetcher`] serves canned data from memory.

mod client;
mod error;
pub mod stub;
pub mod wire;

use steamwatch_core::{AppId, FetchedApp};

pub use client::SteamStoreApi;
pub use error::FetchError;
pub use stub::StubFetcher;

/// Retrieve the current catalog view of one app and its packages.
///
/// Fields the catalog does not report are `None` in the returned snapshots.
pub trait CatalogFetcher {
    fn fetch(&self, app_id: AppId) -> Result<FetchedApp, FetchError>;
}

impl<T: CatalogFetcher + ?Sized> CatalogFetcher for &T {
    fn fetch(&self, app_id: AppId) -> Result<FetchedApp, FetchError> {
        (**self).fetch(app_id)
    }
}

impl<T: CatalogFetcher + ?Sized> CatalogFetcher for Box<T> {
    fn fetch(&self, app_id: AppId) -> Result<FetchedApp, FetchError> {
        (**self).fetch(app_id)
    }
}
