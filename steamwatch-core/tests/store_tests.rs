//! Snapshot store persistence tests against an on-disk database.

use assert_fs::prelude::*;
use chrono::{Duration, Utc};
use predicates::prelude::predicate;
use steamwatch_core::{
    AppId, AppRecord, Field, FieldChange, FieldValue, HistoryQuery, PackageId, PackageRecord,
    SnapshotStore, StoreError, Subject,
};

fn record(id: u32, name: &str) -> AppRecord {
    AppRecord {
        id: AppId(id),
        name: Some(name.to_string()),
        kind: "game".to_string(),
        enabled: true,
        threshold: Some(1500),
        release_date: None,
        coming_soon: Some(false),
        supports_linux: Some(true),
        added_at: Utc::now(),
    }
}

fn pkg(id: u32, app: u32, price: i64) -> PackageRecord {
    PackageRecord {
        id: PackageId(id),
        app_id: AppId(app),
        name: Some(format!("Package {id}")),
        price: Some(price),
        currency: Some("EUR".to_string()),
        coming_soon: Some(false),
        supports_linux: Some(true),
        linked_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// 1. Durability
// ---------------------------------------------------------------------------

#[test]
fn state_survives_reopen() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let db = dir.child("data").child("steamwatch.db");

    {
        let mut store = SnapshotStore::open(db.path()).expect("open");
        store
            .add_app_with_packages(&record(677340, "The Colonists"), &[pkg(1, 677340, 1999)])
            .expect("add");
        store
            .record_change(
                Subject::Package(PackageId(1)),
                Field::Price,
                Some(FieldValue::Amount(1999)),
                FieldValue::Amount(1499),
                Utc::now(),
            )
            .expect("record");
    }

    db.assert(predicate::path::exists());
    let store = SnapshotStore::open(db.path()).expect("reopen");
    let app = store.get_app(AppId(677340)).expect("get").expect("present");
    assert_eq!(app.threshold, Some(1500));
    assert_eq!(store.packages_for(AppId(677340)).expect("packages")[0].price, Some(1499));
    assert_eq!(store.recent(None).expect("recent").len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Atomicity
// ---------------------------------------------------------------------------

#[test]
fn failed_batch_leaves_no_partial_state() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let mut store = SnapshotStore::open(&dir.path().join("s.db")).expect("open");
    store
        .add_app_with_packages(&record(1, "A"), &[pkg(10, 1, 500)])
        .expect("add");

    let changes = vec![
        FieldChange {
            field: Field::Price,
            previous: Some(FieldValue::Amount(500)),
            current: FieldValue::Amount(400),
        },
        FieldChange {
            field: Field::Currency,
            previous: Some(FieldValue::Text("EUR".into())),
            current: FieldValue::Text("USD".into()),
        },
        // not a package field
        FieldChange {
            field: Field::ReleaseDate,
            previous: None,
            current: FieldValue::Text("2025".into()),
        },
    ];
    let err = store
        .record_changes(Subject::Package(PackageId(10)), &changes, Utc::now())
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidField { .. }), "got: {err}");
    assert!(err.to_string().contains("release_date"));

    let package = store.get_package(PackageId(10)).expect("get").expect("present");
    assert_eq!(package.price, Some(500));
    assert_eq!(package.currency.as_deref(), Some("EUR"));
    assert!(store.recent(None).expect("recent").is_empty());
}

#[test]
fn duplicate_app_insert_is_rejected_without_packages() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app(&record(1, "A")).expect("add");
    let err = store
        .add_app_with_packages(&record(1, "A again"), &[pkg(10, 1, 500)])
        .unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)), "got: {err}");
    assert!(store.get_package(PackageId(10)).expect("get").is_none());
}

// ---------------------------------------------------------------------------
// 3. History ordering
// ---------------------------------------------------------------------------

#[test]
fn recent_spans_apps_newest_first() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app_with_packages(&record(1, "A"), &[pkg(10, 1, 500)]).expect("add");
    store.add_app_with_packages(&record(2, "B"), &[pkg(20, 2, 700)]).expect("add");

    let t0 = Utc::now();
    store
        .record_change(Subject::Package(PackageId(10)), Field::Price, None, FieldValue::Amount(450), t0)
        .expect("record");
    store
        .record_change(
            Subject::Package(PackageId(20)),
            Field::Price,
            None,
            FieldValue::Amount(650),
            t0 + Duration::seconds(5),
        )
        .expect("record");
    store
        .record_change(
            Subject::App(AppId(1)),
            Field::SupportsLinux,
            Some(FieldValue::Flag(true)),
            FieldValue::Flag(false),
            t0 + Duration::seconds(10),
        )
        .expect("record");

    let recent = store.recent(Some(2)).expect("recent");
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].subject, Subject::App(AppId(1)));
    assert_eq!(recent[1].subject, Subject::Package(PackageId(20)));
    assert!(recent[0].recorded_at >= recent[1].recorded_at);

    let only_b = store.history(&HistoryQuery::apps(vec![AppId(2)])).expect("history");
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].app_id, AppId(2));
}

#[test]
fn sequence_numbers_increase() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app_with_packages(&record(1, "A"), &[pkg(10, 1, 500)]).expect("add");
    let at = Utc::now();
    let first = store
        .record_change(Subject::Package(PackageId(10)), Field::Price, None, FieldValue::Amount(1), at)
        .expect("record");
    let second = store
        .record_change(Subject::Package(PackageId(10)), Field::Price, None, FieldValue::Amount(2), at)
        .expect("record");
    assert!(second.seq > first.seq);
}

// ---------------------------------------------------------------------------
// 4. Structural changes
// ---------------------------------------------------------------------------

#[test]
fn missing_subjects_report_not_found() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    assert!(matches!(
        store.set_enabled(AppId(5), false),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(store.delete_app(AppId(5)), Err(StoreError::NotFound { .. })));
    let err = store.remove_package(PackageId(5)).unwrap_err();
    assert!(err.to_string().contains("package 5"), "got: {err}");
}

#[test]
fn threshold_can_be_cleared() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app(&record(1, "A")).expect("add");
    store.set_threshold(AppId(1), None).expect("clear");
    assert_eq!(store.get_app(AppId(1)).expect("get").expect("present").threshold, None);
}

#[test]
fn link_package_moves_an_owned_package_and_keeps_its_history() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app_with_packages(&record(1, "A"), &[pkg(10, 1, 500)]).expect("add");
    store
        .record_change(
            Subject::Package(PackageId(10)),
            Field::Price,
            Some(FieldValue::Amount(500)),
            FieldValue::Amount(400),
            Utc::now(),
        )
        .expect("record");
    store.add_app(&record(2, "B")).expect("add");

    let previous = store.link_package(AppId(2), &pkg(10, 2, 450)).expect("link");
    assert_eq!(previous, Some(AppId(1)));

    let moved = store.get_package(PackageId(10)).expect("get").expect("present");
    assert_eq!(moved.app_id, AppId(2));
    assert_eq!(moved.price, Some(450));
    assert!(store.packages_for(AppId(1)).expect("packages").is_empty());
    let history = store
        .history(&HistoryQuery::subject(Subject::Package(PackageId(10))))
        .expect("history");
    assert_eq!(history.len(), 1);

    assert!(store.link_package(AppId(3), &pkg(11, 3, 100)).is_err(), "unknown app");
    assert_eq!(store.link_package(AppId(2), &pkg(12, 2, 100)).expect("link"), None);
}

#[test]
fn new_app_takes_over_existing_packages() {
    let mut store = SnapshotStore::open_in_memory().expect("open");
    store.add_app_with_packages(&record(1, "A"), &[pkg(10, 1, 500)]).expect("add");
    store.set_enabled(AppId(1), false).expect("disable");

    store
        .add_app_with_packages(&record(2, "B"), &[pkg(10, 2, 500), pkg(20, 2, 700)])
        .expect("add");
    let owned: Vec<PackageId> = store
        .packages_for(AppId(2))
        .expect("packages")
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(owned, vec![PackageId(10), PackageId(20)]);
}
