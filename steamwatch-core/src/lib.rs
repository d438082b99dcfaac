//! steamwatch core library: domain types, snapshot store, configuration, errors.
//!
//! Public API surface:
//! - [`types`]: ids, tracked fields, records, snapshots, event kinds
//! - [`store`]: [`SnapshotStore`] (current state + append-only history)
//! - [`config`]: YAML config load
//! - [`money`] / [`appid`]: input normalization
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod appid;
pub mod config;
pub mod error;
pub mod money;
pub mod store;
pub mod types;

pub use appid::extract_app_id;
pub use config::{Config, OutputFormat};
pub use error::{AmountError, AppIdError, ConfigError, StoreError};
pub use money::{format_amount, to_minor_units};
pub use store::{HistoryQuery, HistoryScope, SnapshotStore};
pub use types::{
    AppId, AppRecord, AppSnapshot, EventKind, FetchedApp, Field, FieldChange, FieldValue,
    HistoryEntry, PackageId, PackageRecord, PackageSnapshot, Subject,
};
