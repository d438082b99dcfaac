//! Field-level change detection.
//!
//! [`compute_changes`] compares a fetch against the stored state of one app
//! and returns the changes in publication order:
//!
//! 1. `app_added` (first sight only; no field diffs follow it)
//! 2. app fields: `release_date` → `coming_soon` → `supports_linux`
//! 3. per fetched package, in fetch order: `package_linked` for unknown
//!    packages, else `price` → `currency` → `coming_soon` → `supports_linux`
//!
//! A field the fetch did not report is "no information": it never produces a
//! change. Stored packages missing from the fetch are left alone. A package
//! owned by a disabled app counts as unknown and is linked again here.
//!
//! Nothing is written here.

use std::collections::{HashMap, HashSet};

use steamwatch_core::{
    AppId, AppRecord, AppSnapshot, EventKind, FetchedApp, Field, FieldChange, FieldValue,
    PackageId, PackageRecord, PackageSnapshot, SnapshotStore, StoreError, Subject,
};

/// One detected change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The app is not in the store yet.
    AppAdded { snapshot: AppSnapshot },
    /// A package seen for the first time under this app.
    PackageLinked { snapshot: PackageSnapshot },
    /// A tracked field of the app or one of its packages differs.
    Field { subject: Subject, change: FieldChange },
}

impl Change {
    pub fn event_kind(&self) -> EventKind {
        match self {
            Change::AppAdded { .. } => EventKind::AppAdded,
            Change::PackageLinked { .. } => EventKind::PackageLinked,
            Change::Field { change, .. } => change.field.event_kind(),
        }
    }

    /// The store row this change writes to.
    pub fn subject(&self, app_id: AppId) -> Subject {
        match self {
            Change::AppAdded { .. } => Subject::App(app_id),
            Change::PackageLinked { snapshot } => Subject::Package(snapshot.id),
            Change::Field { subject, .. } => *subject,
        }
    }
}

/// Load the stored state of `app_id` and diff `fetched` against it.
pub fn compute_changes(
    store: &SnapshotStore,
    app_id: AppId,
    fetched: &FetchedApp,
) -> Result<Vec<Change>, StoreError> {
    let prior = store.get_app(app_id)?;
    let known = match prior {
        Some(_) => store.packages_for(app_id)?,
        None => Vec::new(),
    };

    // A package stays with another app while that app is watched. Packages
    // of disabled apps are free to be linked here.
    let mut foreign = HashMap::new();
    for package in &fetched.packages {
        if known.iter().any(|k| k.id == package.id) {
            continue;
        }
        let Some(other) = store.get_package(package.id)? else {
            continue;
        };
        let owner_enabled = store.get_app(other.app_id)?.is_some_and(|owner| owner.enabled);
        if owner_enabled {
            foreign.insert(package.id, other.app_id);
        }
    }

    Ok(diff_app(prior.as_ref(), &known, &foreign, fetched))
}

/// Pure diff of `fetched` against already-loaded prior state.
///
/// `foreign` maps package ids that belong to some other, enabled app to that
/// app. Those are never linked.
pub fn diff_app(
    prior: Option<&AppRecord>,
    known: &[PackageRecord],
    foreign: &HashMap<PackageId, AppId>,
    fetched: &FetchedApp,
) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut seen = HashSet::new();

    let Some(prior) = prior else {
        changes.push(Change::AppAdded {
            snapshot: fetched.app.clone(),
        });
        for package in &fetched.packages {
            if seen.insert(package.id) && !foreign.contains_key(&package.id) {
                changes.push(Change::PackageLinked {
                    snapshot: package.clone(),
                });
            }
        }
        return changes;
    };

    let app_subject = Subject::App(prior.id);
    for field in Field::APP_FIELDS {
        if let Some(change) = diff_field(field, prior.value(field), fetched.app.value(field)) {
            changes.push(Change::Field {
                subject: app_subject,
                change,
            });
        }
    }

    let known: HashMap<PackageId, &PackageRecord> = known.iter().map(|p| (p.id, p)).collect();
    for package in &fetched.packages {
        if !seen.insert(package.id) {
            continue;
        }
        match known.get(&package.id) {
            Some(stored) => {
                let subject = Subject::Package(package.id);
                for field in Field::PACKAGE_FIELDS {
                    if let Some(change) = diff_field(field, stored.value(field), package.value(field)) {
                        changes.push(Change::Field { subject, change });
                    }
                }
            }
            None => match foreign.get(&package.id) {
                Some(owner) => {
                    tracing::warn!(
                        app = %prior.id,
                        package = %package.id,
                        owner = %owner,
                        "package already belongs to another app, not linking"
                    );
                }
                None => changes.push(Change::PackageLinked {
                    snapshot: package.clone(),
                }),
            },
        }
    }

    changes
}

/// `None` when the fetch has no value or the value is unchanged.
fn diff_field(
    field: Field,
    stored: Option<FieldValue>,
    fetched: Option<FieldValue>,
) -> Option<FieldChange> {
    let current = fetched?;
    if stored.as_ref() == Some(&current) {
        return None;
    }
    Some(FieldChange {
        field,
        previous: stored,
        current,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
