//! Watch coordinator: one fetch cycle per app.
//!
//! ## Cycle
//!
//! ```text
//! FETCHING → DIFFING → PERSISTING → NOTIFYING → DONE
//!     ↓          ↓          ↓
//!   FAILED     FAILED     FAILED
//! ```
//!
//! Apps are processed one after another. A failure ends that app's cycle and
//! is recorded in the [`RunReport`]; the run moves on to the next app.
//!
//! Persistence is split per subject: a new app and its packages land in one
//! transaction, otherwise every subject (the app's own fields, each linked
//! package, each package's field batch) is its own transaction. When one
//! subject fails to persist, its events are dropped, the others are still
//! published, and the app is reported as failed at PERSISTING.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use steamwatch_core::{
    AppId, AppRecord, EventKind, FetchedApp, Field, FieldChange, FieldValue, HistoryQuery,
    PackageId, PackageRecord, SnapshotStore, Subject,
};
use steamwatch_storeapi::CatalogFetcher;

use crate::bus::{Event, NotificationBus, Payload};
use crate::diff::{self, Change};
use crate::error::SyncError;
use crate::threshold;
use crate::views::{AppReport, PackageReport, RecentChange, WatchedApp};

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Fetching,
    Diffing,
    Persisting,
    Notifying,
    Done,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleStage::Fetching => "fetching",
            CycleStage::Diffing => "diffing",
            CycleStage::Persisting => "persisting",
            CycleStage::Notifying => "notifying",
            CycleStage::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Done,
    /// Not processed, e.g. the app is disabled.
    Skipped { reason: String },
    Failed { stage: CycleStage, error: String },
}

/// Result of one app's cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub app_id: AppId,
    pub name: Option<String>,
    pub outcome: EntityOutcome,
    /// History rows written.
    pub recorded: usize,
    /// Events published, including derived `threshold` events.
    pub published: usize,
    pub handler_failures: usize,
    /// Subjects whose changes could not be persisted.
    pub failed_subjects: Vec<Subject>,
}

impl EntityReport {
    fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            name: None,
            outcome: EntityOutcome::Done,
            recorded: 0,
            published: 0,
            handler_failures: 0,
            failed_subjects: Vec::new(),
        }
    }

    fn failed(mut self, stage: CycleStage, error: impl fmt::Display) -> Self {
        tracing::warn!(app = %self.app_id, %stage, %error, "cycle failed");
        self.outcome = EntityOutcome::Failed {
            stage,
            error: error.to_string(),
        };
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, EntityOutcome::Failed { .. })
    }
}

/// Per-app outcomes of a fetch run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub entities: Vec<EntityReport>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.entities.iter().any(EntityReport::is_failed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities.iter().filter(|e| e.is_failed())
    }

    pub fn published(&self) -> usize {
        self.entities.iter().map(|e| e.published).sum()
    }
}

/// What `watch` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// First time this id is watched. The cycle may still have failed.
    Added(EntityReport),
    /// A disabled app was enabled again and fetched.
    Reenabled(EntityReport),
    AlreadyWatched(AppRecord),
}

impl WatchOutcome {
    pub fn report(&self) -> Option<&EntityReport> {
        match self {
            WatchOutcome::Added(r) | WatchOutcome::Reenabled(r) => Some(r),
            WatchOutcome::AlreadyWatched(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Owns the store, the fetcher and the bus for the lifetime of the process.
pub struct Coordinator<F> {
    store: SnapshotStore,
    fetcher: F,
    bus: NotificationBus,
}

impl<F: CatalogFetcher> Coordinator<F> {
    pub fn new(store: SnapshotStore, fetcher: F) -> Self {
        Self::with_bus(store, fetcher, NotificationBus::new())
    }

    pub fn with_bus(store: SnapshotStore, fetcher: F, bus: NotificationBus) -> Self {
        Self {
            store,
            fetcher,
            bus,
        }
    }

    pub fn bus_mut(&mut self) -> &mut NotificationBus {
        &mut self.bus
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Watchlist
    // -----------------------------------------------------------------------

    /// Start watching `app_id`. `threshold` is in minor units.
    pub fn watch(&mut self, app_id: AppId, threshold: Option<i64>) -> Result<WatchOutcome, SyncError> {
        match self.store.get_app(app_id)? {
            Some(mut app) if app.enabled => {
                if threshold.is_some() && threshold != app.threshold {
                    self.store.set_threshold(app_id, threshold)?;
                    app.threshold = threshold;
                    tracing::info!(app = %app_id, ?threshold, "threshold updated");
                }
                tracing::warn!(app = %app_id, "already on the watchlist");
                Ok(WatchOutcome::AlreadyWatched(app))
            }
            Some(mut app) => {
                self.store.set_enabled(app_id, true)?;
                app.enabled = true;
                if threshold.is_some() {
                    self.store.set_threshold(app_id, threshold)?;
                    app.threshold = threshold;
                }
                tracing::info!(app = %app_id, name = ?app.name, "re-enabled on the watchlist");
                let delivery = self.bus.publish(&Event {
                    kind: EventKind::AppAdded,
                    app,
                    payload: Payload::App,
                });

                let mut report = self.run_cycle(app_id, None);
                report.published += 1;
                report.handler_failures += delivery.failed;
                Ok(WatchOutcome::Reenabled(report))
            }
            None => {
                let report = self.run_cycle(app_id, threshold);
                if !report.is_failed() {
                    tracing::info!(app = %app_id, name = ?report.name, "added to the watchlist");
                }
                Ok(WatchOutcome::Added(report))
            }
        }
    }

    /// Stop watching `app_id`: disable it, or delete it with all of its
    /// packages and history. Returns `None` when there was nothing to do.
    pub fn unwatch(&mut self, app_id: AppId, delete: bool) -> Result<Option<AppRecord>, SyncError> {
        let Some(mut app) = self.store.get_app(app_id)? else {
            tracing::warn!(app = %app_id, "not on the watchlist");
            return Ok(None);
        };

        if delete {
            self.store.delete_app(app_id)?;
            tracing::info!(app = %app_id, name = ?app.name, "deleted");
        } else if app.enabled {
            self.store.set_enabled(app_id, false)?;
            tracing::info!(app = %app_id, name = ?app.name, "disabled");
        } else {
            tracing::warn!(app = %app_id, "already disabled");
            return Ok(None);
        }

        app.enabled = false;
        self.bus.publish(&Event {
            kind: EventKind::AppRemoved,
            app: app.clone(),
            payload: Payload::App,
        });
        Ok(Some(app))
    }

    // -----------------------------------------------------------------------
    // Fetch runs
    // -----------------------------------------------------------------------

    /// Fetch one watched app. Disabled apps are skipped.
    pub fn fetch(&mut self, app_id: AppId) -> Result<EntityReport, SyncError> {
        let app = self
            .store
            .get_app(app_id)?
            .ok_or(SyncError::NotWatched(app_id))?;
        if !app.enabled {
            tracing::warn!(app = %app_id, "disabled, not fetching");
            let mut report = EntityReport::new(app_id);
            report.name = app.name;
            report.outcome = EntityOutcome::Skipped {
                reason: "disabled".to_string(),
            };
            return Ok(report);
        }
        Ok(self.run_cycle(app_id, None))
    }

    /// Fetch every enabled app.
    pub fn fetch_all(&mut self) -> Result<RunReport, SyncError> {
        let apps = self.store.list_apps(false)?;
        let mut run = RunReport::default();
        for app in apps {
            run.entities.push(self.run_cycle(app.id, None));
        }
        Ok(run)
    }

    /// Fetch the given apps; ids that cannot be fetched are reported as failed.
    pub fn fetch_many(&mut self, ids: &[AppId]) -> RunReport {
        let mut run = RunReport::default();
        for &app_id in ids {
            let report = match self.fetch(app_id) {
                Ok(report) => report,
                Err(err) => EntityReport::new(app_id).failed(CycleStage::Fetching, err),
            };
            run.entities.push(report);
        }
        run
    }

    fn run_cycle(&mut self, app_id: AppId, threshold: Option<i64>) -> EntityReport {
        let mut report = EntityReport::new(app_id);

        tracing::debug!(app = %app_id, stage = %CycleStage::Fetching, "cycle stage");
        let fetched = match self.fetcher.fetch(app_id) {
            Ok(fetched) => fetched,
            Err(err) => return report.failed(CycleStage::Fetching, err),
        };
        report.name = fetched.app.name.clone();

        tracing::debug!(app = %app_id, stage = %CycleStage::Diffing, "cycle stage");
        let changes = match diff::compute_changes(&self.store, app_id, &fetched) {
            Ok(changes) => changes,
            Err(err) => return report.failed(CycleStage::Diffing, err),
        };
        if changes.is_empty() {
            tracing::debug!(app = %app_id, "no changes");
            return report;
        }

        tracing::debug!(app = %app_id, stage = %CycleStage::Persisting, changes = changes.len(), "cycle stage");
        let at = Utc::now();
        let mut errors = Vec::new();
        let persisted = self.persist(app_id, threshold, changes, at, &mut report, &mut errors);

        let app = if persisted.is_empty() {
            None
        } else {
            match self.store.get_app(app_id) {
                Ok(app) => app,
                Err(err) => return report.failed(CycleStage::Persisting, err),
            }
        };

        if let Some(app) = app {
            tracing::debug!(app = %app_id, stage = %CycleStage::Notifying, events = persisted.len(), "cycle stage");
            for event in build_events(&app, &persisted, &fetched, at) {
                let delivery = self.bus.publish(&event);
                report.published += 1;
                report.handler_failures += delivery.failed;
            }
        }

        if !errors.is_empty() {
            return report.failed(CycleStage::Persisting, errors.join("; "));
        }
        tracing::debug!(app = %app_id, stage = %CycleStage::Done, recorded = report.recorded, "cycle stage");
        report
    }

    /// Write `changes`; returns the ones that were stored, in order.
    fn persist(
        &mut self,
        app_id: AppId,
        threshold: Option<i64>,
        changes: Vec<Change>,
        at: DateTime<Utc>,
        report: &mut EntityReport,
        errors: &mut Vec<String>,
    ) -> Vec<Change> {
        if let Some(Change::AppAdded { snapshot }) = changes.first() {
            let record = AppRecord::from_snapshot(app_id, snapshot, threshold, at);
            let packages: Vec<PackageRecord> = changes
                .iter()
                .filter_map(|c| match c {
                    Change::PackageLinked { snapshot } => {
                        Some(PackageRecord::from_snapshot(app_id, snapshot, at))
                    }
                    _ => None,
                })
                .collect();
            return match self.store.add_app_with_packages(&record, &packages) {
                Ok(()) => changes,
                Err(err) => {
                    report.failed_subjects.push(Subject::App(app_id));
                    errors.push(format!("app {app_id}: {err}"));
                    Vec::new()
                }
            };
        }

        let mut persisted = Vec::with_capacity(changes.len());
        for group in group_by_subject(app_id, changes) {
            let subject = group[0].subject(app_id);
            let result = match &group[0] {
                Change::PackageLinked { snapshot } => self
                    .store
                    .link_package(app_id, &PackageRecord::from_snapshot(app_id, snapshot, at))
                    .map(|_| ()),
                _ => {
                    let fields: Vec<FieldChange> = group
                        .iter()
                        .filter_map(|c| match c {
                            Change::Field { change, .. } => Some(change.clone()),
                            _ => None,
                        })
                        .collect();
                    self.store
                        .record_changes(subject, &fields, at)
                        .map(|entries| report.recorded += entries.len())
                }
            };
            match result {
                Ok(()) => persisted.extend(group),
                Err(err) => {
                    tracing::error!(app = %app_id, %subject, error = %err, "failed to persist changes");
                    report.failed_subjects.push(subject);
                    errors.push(format!("{subject}: {err}"));
                }
            }
        }
        persisted
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Watched apps with their packages.
    pub fn ls(&self, include_disabled: bool) -> Result<Vec<WatchedApp>, SyncError> {
        let apps = self.store.list_apps(include_disabled)?;
        let mut out = Vec::with_capacity(apps.len());
        for app in apps {
            let packages = self.store.packages_for(app.id)?;
            out.push(WatchedApp { app, packages });
        }
        Ok(out)
    }

    /// History of one app; `limit` applies per app and per package.
    pub fn report(&self, app_id: AppId, limit: Option<usize>) -> Result<AppReport, SyncError> {
        let app = self
            .store
            .get_app(app_id)?
            .ok_or(SyncError::NotWatched(app_id))?;
        let history = self
            .store
            .history(&HistoryQuery::subject(Subject::App(app_id)).limit(limit))?;
        let mut packages = Vec::new();
        for package in self.store.packages_for(app_id)? {
            let history = self
                .store
                .history(&HistoryQuery::subject(Subject::Package(package.id)).limit(limit))?;
            packages.push(PackageReport { package, history });
        }
        Ok(AppReport {
            app,
            history,
            packages,
        })
    }

    /// [`report`](Self::report) for every enabled app.
    pub fn report_all(&self, limit: Option<usize>) -> Result<Vec<AppReport>, SyncError> {
        self.store
            .list_apps(false)?
            .into_iter()
            .map(|app| self.report(app.id, limit))
            .collect()
    }

    /// The newest changes across all apps.
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<RecentChange>, SyncError> {
        let entries = self.store.recent(limit)?;
        let mut app_names: HashMap<AppId, Option<String>> = HashMap::new();
        let mut package_names: HashMap<PackageId, Option<String>> = HashMap::new();
        let mut out = Vec::with_capacity(entries.len());

        for entry in entries {
            let app_name = match app_names.get(&entry.app_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.store.get_app(entry.app_id)?.and_then(|a| a.name);
                    app_names.insert(entry.app_id, name.clone());
                    name
                }
            };
            let package_name = match entry.subject {
                Subject::App(_) => None,
                Subject::Package(id) => match package_names.get(&id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.store.get_package(id)?.and_then(|p| p.name);
                        package_names.insert(id, name.clone());
                        name
                    }
                },
            };
            out.push(RecentChange {
                entry,
                app_name,
                package_name,
            });
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Split changes into runs of the same subject, keeping order.
fn group_by_subject(app_id: AppId, changes: Vec<Change>) -> Vec<Vec<Change>> {
    let mut groups: Vec<Vec<Change>> = Vec::new();
    for change in changes {
        match groups.last_mut() {
            Some(group)
                if group[0].subject(app_id) == change.subject(app_id)
                    && !matches!(change, Change::PackageLinked { .. }) =>
            {
                group.push(change)
            }
            _ => groups.push(vec![change]),
        }
    }
    groups
}

/// Turn persisted changes into events, inserting a `threshold` event right
/// after each `price_changed` that crosses the app's threshold.
fn build_events(app: &AppRecord, persisted: &[Change], fetched: &FetchedApp, at: DateTime<Utc>) -> Vec<Event> {
    let mut events = Vec::with_capacity(persisted.len());
    for change in persisted {
        let payload = match change {
            Change::AppAdded { .. } => Payload::App,
            Change::PackageLinked { snapshot } => Payload::PackageLinked {
                package: PackageRecord::from_snapshot(app.id, snapshot, at),
            },
            Change::Field { subject, change } => Payload::FieldChanged {
                package: match subject {
                    Subject::Package(id) => Some(*id),
                    Subject::App(_) => None,
                },
                field: change.field,
                previous: change.previous.clone(),
                current: change.current.clone(),
            },
        };
        events.push(Event {
            kind: change.event_kind(),
            app: app.clone(),
            payload,
        });

        let Some(limit) = app.threshold else {
            continue;
        };
        let Change::Field {
            subject: Subject::Package(package),
            change,
        } = change
        else {
            continue;
        };
        if change.field != Field::Price
            || !threshold::crossed(limit, change.previous.as_ref(), &change.current)
        {
            continue;
        }
        let FieldValue::Amount(price) = change.current else {
            continue;
        };
        let currency = fetched
            .packages
            .iter()
            .find(|p| p.id == *package)
            .and_then(|p| p.currency.clone());
        events.push(Event {
            kind: EventKind::Threshold,
            app: app.clone(),
            payload: Payload::Threshold {
                package: *package,
                threshold: limit,
                price,
                currency,
            },
        });
    }
    events
}
