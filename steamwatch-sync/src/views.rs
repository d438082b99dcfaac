//! Read-only shapes returned by `ls`, `report` and `recent`.

use serde::Serialize;
use steamwatch_core::{AppRecord, HistoryEntry, PackageRecord};

/// An app with its linked packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchedApp {
    pub app: AppRecord,
    pub packages: Vec<PackageRecord>,
}

/// Change history of one app, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppReport {
    pub app: AppRecord,
    /// App-level field changes.
    pub history: Vec<HistoryEntry>,
    pub packages: Vec<PackageReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub package: PackageRecord,
    pub history: Vec<HistoryEntry>,
}

/// A history entry with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentChange {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub app_name: Option<String>,
    /// `None` for app-level changes or packages no longer stored.
    pub package_name: Option<String>,
}
