//! # steamwatch-sync
//!
//! Change detection and notification.
//!
//! [`Coordinator`] runs one fetch cycle per watched app: fetch through a
//! [`CatalogFetcher`](steamwatch_storeapi::CatalogFetcher), diff against the
//! [`SnapshotStore`](steamwatch_core::SnapshotStore), persist, then publish
//! on the [`NotificationBus`].

pub mod bus;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod threshold;
pub mod views;

pub use bus::{Delivery, Event, Handler, NotificationBus, Payload};
pub use coordinator::{Coordinator, CycleStage, EntityOutcome, EntityReport, RunReport, WatchOutcome};
pub use diff::{compute_changes, Change};
pub use error::{HandlerError, SyncError};
pub use views::{AppReport, PackageReport, RecentChange, WatchedApp};
