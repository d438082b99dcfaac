//! SQLite snapshot store.
//!
//! # Tables
//!
//! ```text
//! apps      id PK | name | kind | enabled | threshold | release_date | coming_soon | supports_linux | added_at
//! packages  id PK | app_id → apps | name | price | currency | coming_soon | supports_linux | linked_at
//! history   seq PK AUTOINCREMENT | app_id | subject_kind | subject_id | field | previous | current | recorded_at
//! ```
//!
//! `apps` / `packages` hold the current value of every tracked field.
//! `history` is append-only; rows are only ever removed together with their
//! app by [`SnapshotStore::delete_app`].
//!
//! Every mutation runs in one transaction, so a crash or error never leaves a
//! current value updated without its history row (or the reverse).
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with microsecond
//! precision; lexical order equals chronological order.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};

use crate::error::StoreError;
use crate::types::{
    AppId, AppRecord, Field, FieldChange, FieldValue, HistoryEntry, PackageId, PackageRecord,
    Subject,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS apps (
        id             INTEGER PRIMARY KEY,
        name           TEXT,
        kind           TEXT NOT NULL,
        enabled        INTEGER NOT NULL DEFAULT 1,
        threshold      INTEGER,
        release_date   TEXT,
        coming_soon    INTEGER,
        supports_linux INTEGER,
        added_at       TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_apps_enabled ON apps(enabled);

    CREATE TABLE IF NOT EXISTS packages (
        id             INTEGER PRIMARY KEY,
        app_id         INTEGER NOT NULL REFERENCES apps(id),
        name           TEXT,
        price          INTEGER,
        currency       TEXT,
        coming_soon    INTEGER,
        supports_linux INTEGER,
        linked_at      TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_packages_app ON packages(app_id);

    CREATE TABLE IF NOT EXISTS history (
        seq          INTEGER PRIMARY KEY AUTOINCREMENT,
        app_id       INTEGER NOT NULL,
        subject_kind TEXT NOT NULL,
        subject_id   INTEGER NOT NULL,
        field        TEXT NOT NULL,
        previous     TEXT,
        current      TEXT NOT NULL,
        recorded_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_history_subject ON history(subject_kind, subject_id);
    CREATE INDEX IF NOT EXISTS idx_history_app ON history(app_id);
    CREATE INDEX IF NOT EXISTS idx_history_time ON history(recorded_at);
";

const APP_COLUMNS: &str =
    "id, name, kind, enabled, threshold, release_date, coming_soon, supports_linux, added_at";
const PACKAGE_COLUMNS: &str =
    "id, app_id, name, price, currency, coming_soon, supports_linux, linked_at";
const HISTORY_COLUMNS: &str =
    "seq, app_id, subject_kind, subject_id, field, previous, current, recorded_at";

/// Which history rows to read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryScope {
    #[default]
    All,
    Subject(Subject),
    /// Rows for these apps and all of their packages.
    Apps(Vec<AppId>),
}

/// A history read: scope, optional lower time bound (inclusive), optional limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryQuery {
    pub scope: HistoryScope,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn subject(subject: Subject) -> Self {
        Self {
            scope: HistoryScope::Subject(subject),
            ..Self::default()
        }
    }

    pub fn apps(ids: Vec<AppId>) -> Self {
        Self {
            scope: HistoryScope::Apps(ids),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }
}

/// Persistent current state plus append-only change history.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!(path = %path.display(), "opened snapshot store");
        Self::with_connection(conn)
    }

    /// A throwaway store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_app(&self, id: AppId) -> Result<Option<AppRecord>, StoreError> {
        let sql = format!("SELECT {APP_COLUMNS} FROM apps WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.0], map_app)
            .optional()?)
    }

    pub fn get_package(&self, id: PackageId) -> Result<Option<PackageRecord>, StoreError> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id.0], map_package)
            .optional()?)
    }

    /// Packages linked to `app_id`, in discovery order.
    pub fn packages_for(&self, app_id: AppId) -> Result<Vec<PackageRecord>, StoreError> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE app_id = ?1 ORDER BY linked_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![app_id.0], map_package)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Watched apps sorted by name; disabled apps last when included.
    pub fn list_apps(&self, include_disabled: bool) -> Result<Vec<AppRecord>, StoreError> {
        let filter = if include_disabled { "" } else { "WHERE enabled = 1" };
        let sql = format!(
            "SELECT {APP_COLUMNS} FROM apps {filter} ORDER BY enabled DESC, name COLLATE NOCASE, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_app)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// History rows, newest first. Equal timestamps are ordered by insertion,
    /// later inserts first, so the first row for a field is always its most
    /// recent change.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        match &query.scope {
            HistoryScope::All => {}
            HistoryScope::Subject(subject) => {
                let (kind, id) = subject_key(subject);
                values.push(Value::Text(kind.to_string()));
                values.push(Value::Integer(id));
                clauses.push(format!(
                    "subject_kind = ?{} AND subject_id = ?{}",
                    values.len() - 1,
                    values.len()
                ));
            }
            HistoryScope::Apps(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                let mut placeholders = Vec::with_capacity(ids.len());
                for id in ids {
                    values.push(Value::Integer(i64::from(id.0)));
                    placeholders.push(format!("?{}", values.len()));
                }
                clauses.push(format!("app_id IN ({})", placeholders.join(", ")));
            }
        }

        if let Some(since) = query.since {
            values.push(Value::Text(encode_time(since)));
            clauses.push(format!("recorded_at >= ?{}", values.len()));
        }

        let mut sql = format!("SELECT {HISTORY_COLUMNS} FROM history");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY recorded_at DESC, seq DESC");
        if let Some(limit) = query.limit {
            values.push(Value::Integer(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), map_history)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The newest `limit` changes across every app.
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>, StoreError> {
        self.history(&HistoryQuery::default().limit(limit))
    }

    // -----------------------------------------------------------------------
    // Structural writes
    // -----------------------------------------------------------------------

    pub fn add_app(&mut self, record: &AppRecord) -> Result<(), StoreError> {
        insert_app(&self.conn, record)?;
        tracing::debug!(app = %record.id, "added app");
        Ok(())
    }

    /// Insert a new app together with its packages in one transaction.
    ///
    /// Packages that already exist are moved to the new app, as with
    /// [`link_package`](Self::link_package).
    pub fn add_app_with_packages(
        &mut self,
        record: &AppRecord,
        packages: &[PackageRecord],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_app(&tx, record)?;
        for package in packages {
            link_package_tx(&tx, record.id, package)?;
        }
        tx.commit()?;
        tracing::debug!(app = %record.id, packages = packages.len(), "added app");
        Ok(())
    }

    pub fn set_enabled(&mut self, id: AppId, enabled: bool) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE apps SET enabled = ?1 WHERE id = ?2",
            params![enabled, id.0],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                subject: Subject::App(id),
            });
        }
        Ok(())
    }

    pub fn set_threshold(&mut self, id: AppId, threshold: Option<i64>) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE apps SET threshold = ?1 WHERE id = ?2",
            params![threshold, id.0],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                subject: Subject::App(id),
            });
        }
        Ok(())
    }

    /// Remove an app, its packages, and all of their history.
    pub fn delete_app(&mut self, id: AppId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let history = tx.execute("DELETE FROM history WHERE app_id = ?1", params![id.0])?;
        let packages = tx.execute("DELETE FROM packages WHERE app_id = ?1", params![id.0])?;
        let n = tx.execute("DELETE FROM apps WHERE id = ?1", params![id.0])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                subject: Subject::App(id),
            });
        }
        tx.commit()?;
        tracing::debug!(app = %id, packages, history, "deleted app");
        Ok(())
    }

    pub fn add_package(&mut self, app_id: AppId, record: &PackageRecord) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_package(&tx, app_id, record)?;
        tx.commit()?;
        tracing::debug!(app = %app_id, package = %record.id, "linked package");
        Ok(())
    }

    /// Link a package to `app_id`, taking it over if another app owns it.
    ///
    /// The stored fields are replaced by `record`. History rows keep the app
    /// they were recorded under. Returns the previous owner, if any.
    pub fn link_package(
        &mut self,
        app_id: AppId,
        record: &PackageRecord,
    ) -> Result<Option<AppId>, StoreError> {
        let tx = self.conn.transaction()?;
        let previous = link_package_tx(&tx, app_id, record)?;
        tx.commit()?;
        match previous {
            Some(owner) => tracing::info!(app = %app_id, package = %record.id, from = %owner, "moved package"),
            None => tracing::debug!(app = %app_id, package = %record.id, "linked package"),
        }
        Ok(previous)
    }

    /// Detach a package. Its history rows stay in the audit trail.
    pub fn remove_package(&mut self, id: PackageId) -> Result<(), StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM packages WHERE id = ?1", params![id.0])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                subject: Subject::Package(id),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Change recording
    // -----------------------------------------------------------------------

    /// Append one history row and update the current value, atomically.
    pub fn record_change(
        &mut self,
        subject: Subject,
        field: Field,
        previous: Option<FieldValue>,
        current: FieldValue,
        at: DateTime<Utc>,
    ) -> Result<HistoryEntry, StoreError> {
        let change = FieldChange {
            field,
            previous,
            current,
        };
        let mut entries = self.record_changes(subject, std::slice::from_ref(&change), at)?;
        entries.pop().ok_or(StoreError::NotFound { subject })
    }

    /// Record several field changes of one subject in a single transaction.
    /// Either every change lands (history row + current value) or none does.
    pub fn record_changes(
        &mut self,
        subject: Subject,
        changes: &[FieldChange],
        at: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let tx = self.conn.transaction()?;
        let app_id = owning_app(&tx, &subject)?;
        let (table, id) = match subject {
            Subject::App(id) => ("apps", i64::from(id.0)),
            Subject::Package(id) => ("packages", i64::from(id.0)),
        };
        let (kind, subject_id) = subject_key(&subject);
        let recorded_at = encode_time(at);

        let mut entries = Vec::with_capacity(changes.len());
        for change in changes {
            if !change.field.applies_to(&subject) {
                return Err(StoreError::InvalidField {
                    subject,
                    field: change.field,
                });
            }

            // `field` names come from a closed enum, never from input.
            let column = change.field.as_str();
            tx.execute(
                &format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2"),
                params![column_value(&change.current), id],
            )?;

            let previous = change
                .previous
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let current = serde_json::to_string(&change.current)?;
            tx.execute(
                "INSERT INTO history (app_id, subject_kind, subject_id, field, previous, current, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![app_id.0, kind, subject_id, column, previous, current, recorded_at],
            )?;

            entries.push(HistoryEntry {
                seq: tx.last_insert_rowid(),
                app_id,
                subject,
                field: change.field,
                previous: change.previous.clone(),
                current: change.current.clone(),
                recorded_at: at,
            });
        }

        tx.commit()?;
        tracing::debug!(%subject, changes = entries.len(), "recorded changes");
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn insert_package(tx: &Transaction<'_>, app_id: AppId, record: &PackageRecord) -> Result<(), StoreError> {
    tx.execute(
        &format!("INSERT INTO packages ({PACKAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            record.id.0,
            app_id.0,
            record.name,
            record.price,
            record.currency,
            record.coming_soon,
            record.supports_linux,
            encode_time(record.linked_at),
        ],
    )?;
    Ok(())
}

fn insert_app(conn: &Connection, record: &AppRecord) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO apps ({APP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            record.id.0,
            record.name,
            record.kind,
            record.enabled,
            record.threshold,
            record.release_date,
            record.coming_soon,
            record.supports_linux,
            encode_time(record.added_at),
        ],
    )?;
    Ok(())
}

/// Insert `record` under `app_id`, or move an existing row there.
fn link_package_tx(
    tx: &Transaction<'_>,
    app_id: AppId,
    record: &PackageRecord,
) -> Result<Option<AppId>, StoreError> {
    let previous = tx
        .query_row(
            "SELECT app_id FROM packages WHERE id = ?1",
            params![record.id.0],
            |row| row.get::<_, u32>(0),
        )
        .optional()?
        .map(AppId)
        .filter(|owner| *owner != app_id);
    tx.execute(
        &format!(
            "INSERT INTO packages ({PACKAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 app_id = excluded.app_id,
                 name = excluded.name,
                 price = excluded.price,
                 currency = excluded.currency,
                 coming_soon = excluded.coming_soon,
                 supports_linux = excluded.supports_linux,
                 linked_at = excluded.linked_at"
        ),
        params![
            record.id.0,
            app_id.0,
            record.name,
            record.price,
            record.currency,
            record.coming_soon,
            record.supports_linux,
            encode_time(record.linked_at),
        ],
    )?;
    Ok(previous)
}

/// The app a subject belongs to; also proves the subject row exists.
fn owning_app(tx: &Transaction<'_>, subject: &Subject) -> Result<AppId, StoreError> {
    let found = match subject {
        Subject::App(id) => tx
            .query_row("SELECT id FROM apps WHERE id = ?1", params![id.0], |row| {
                row.get::<_, u32>(0)
            })
            .optional()?,
        Subject::Package(id) => tx
            .query_row(
                "SELECT app_id FROM packages WHERE id = ?1",
                params![id.0],
                |row| row.get::<_, u32>(0),
            )
            .optional()?,
    };
    found
        .map(AppId)
        .ok_or(StoreError::NotFound { subject: *subject })
}

fn subject_key(subject: &Subject) -> (&'static str, i64) {
    match subject {
        Subject::App(id) => ("app", i64::from(id.0)),
        Subject::Package(id) => ("package", i64::from(id.0)),
    }
}

fn column_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Amount(v) => Value::Integer(*v),
        FieldValue::Text(v) => Value::Text(v.clone()),
        FieldValue::Flag(v) => Value::Integer(i64::from(*v)),
    }
}

fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn decode_value(idx: usize, text: &str) -> rusqlite::Result<FieldValue> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn map_app(row: &Row<'_>) -> rusqlite::Result<AppRecord> {
    Ok(AppRecord {
        id: AppId(row.get(0)?),
        name: row.get(1)?,
        kind: row.get(2)?,
        enabled: row.get(3)?,
        threshold: row.get(4)?,
        release_date: row.get(5)?,
        coming_soon: row.get(6)?,
        supports_linux: row.get(7)?,
        added_at: decode_time(row, 8)?,
    })
}

fn map_package(row: &Row<'_>) -> rusqlite::Result<PackageRecord> {
    Ok(PackageRecord {
        id: PackageId(row.get(0)?),
        app_id: AppId(row.get(1)?),
        name: row.get(2)?,
        price: row.get(3)?,
        currency: row.get(4)?,
        coming_soon: row.get(5)?,
        supports_linux: row.get(6)?,
        linked_at: decode_time(row, 7)?,
    })
}

fn map_history(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    let kind: String = row.get(2)?;
    let subject_id: u32 = row.get(3)?;
    let subject = match kind.as_str() {
        "app" => Subject::App(AppId(subject_id)),
        "package" => Subject::Package(PackageId(subject_id)),
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                2,
                Type::Text,
                format!("unknown subject kind '{other}'").into(),
            ))
        }
    };
    let field: String = row.get(4)?;
    let field = field.parse::<Field>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into())
    })?;
    let previous: Option<String> = row.get(5)?;
    let current: String = row.get(6)?;

    Ok(HistoryEntry {
        seq: row.get(0)?,
        app_id: AppId(row.get(1)?),
        subject,
        field,
        previous: previous.as_deref().map(|p| decode_value(5, p)).transpose()?,
        current: decode_value(6, &current)?,
        recorded_at: decode_time(row, 7)?,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn app(id: u32, name: &str) -> AppRecord {
        AppRecord {
            id: AppId(id),
            name: Some(name.to_string()),
            kind: "game".to_string(),
            enabled: true,
            threshold: None,
            release_date: Some("2024-Q4".to_string()),
            coming_soon: Some(true),
            supports_linux: Some(false),
            added_at: Utc::now(),
        }
    }

    fn package(id: u32, app_id: u32) -> PackageRecord {
        PackageRecord {
            id: PackageId(id),
            app_id: AppId(app_id),
            name: Some(format!("pkg {id}")),
            price: Some(1999),
            currency: Some("USD".to_string()),
            coming_soon: Some(false),
            supports_linux: Some(true),
            linked_at: Utc::now(),
        }
    }

    fn seeded() -> SnapshotStore {
        let mut store = SnapshotStore::open_in_memory().expect("store");
        store
            .add_app_with_packages(&app(316750, "Stardew"), &[package(1, 316750)])
            .expect("seed");
        store
    }

    #[test]
    fn unknown_ids_are_absent() {
        let store = SnapshotStore::open_in_memory().unwrap();
        assert!(store.get_app(AppId(1)).unwrap().is_none());
        assert!(store.get_package(PackageId(1)).unwrap().is_none());
    }

    #[test]
    fn app_and_package_roundtrip() {
        let store = seeded();
        let loaded = store.get_app(AppId(316750)).unwrap().expect("app");
        assert_eq!(loaded.name.as_deref(), Some("Stardew"));
        assert_eq!(loaded.release_date.as_deref(), Some("2024-Q4"));
        assert_eq!(loaded.coming_soon, Some(true));
        let pkg = store.get_package(PackageId(1)).unwrap().expect("package");
        assert_eq!(pkg.app_id, AppId(316750));
        assert_eq!(pkg.price, Some(1999));
    }

    #[test]
    fn record_change_updates_current_and_appends_history() {
        let mut store = seeded();
        let entry = store
            .record_change(
                Subject::Package(PackageId(1)),
                Field::Price,
                Some(FieldValue::Amount(1999)),
                FieldValue::Amount(999),
                Utc::now(),
            )
            .expect("record");
        assert_eq!(entry.app_id, AppId(316750));

        let pkg = store.get_package(PackageId(1)).unwrap().unwrap();
        assert_eq!(pkg.price, Some(999));

        let history = store
            .history(&HistoryQuery::subject(Subject::Package(PackageId(1))))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous, Some(FieldValue::Amount(1999)));
        assert_eq!(history[0].current, FieldValue::Amount(999));
    }

    #[test]
    fn app_level_change_updates_app_row() {
        let mut store = seeded();
        store
            .record_change(
                Subject::App(AppId(316750)),
                Field::ReleaseDate,
                Some(FieldValue::Text("2024-Q4".into())),
                FieldValue::Text("30 May, 2025".into()),
                Utc::now(),
            )
            .unwrap();
        let loaded = store.get_app(AppId(316750)).unwrap().unwrap();
        assert_eq!(loaded.release_date.as_deref(), Some("30 May, 2025"));
    }

    #[test]
    fn invalid_field_rolls_back_the_whole_batch() {
        let mut store = seeded();
        let changes = [
            FieldChange {
                field: Field::Price,
                previous: Some(FieldValue::Amount(1999)),
                current: FieldValue::Amount(1),
            },
            FieldChange {
                field: Field::ReleaseDate,
                previous: None,
                current: FieldValue::Text("soon".into()),
            },
        ];
        let err = store
            .record_changes(Subject::Package(PackageId(1)), &changes, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField { .. }), "got: {err}");

        let pkg = store.get_package(PackageId(1)).unwrap().unwrap();
        assert_eq!(pkg.price, Some(1999), "price must be unchanged after rollback");
        assert!(store.recent(None).unwrap().is_empty(), "no history row may survive");
    }

    #[test]
    fn recording_on_unknown_package_is_not_found() {
        let mut store = seeded();
        let err = store
            .record_change(
                Subject::Package(PackageId(99)),
                Field::Price,
                None,
                FieldValue::Amount(1),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn history_is_newest_first_with_insertion_tiebreak() {
        let mut store = seeded();
        let t0 = Utc::now();
        let subject = Subject::Package(PackageId(1));
        for (i, price) in [100, 200, 300].into_iter().enumerate() {
            // the last two share a timestamp
            let at = if i == 0 { t0 } else { t0 + Duration::seconds(1) };
            store
                .record_change(subject, Field::Price, None, FieldValue::Amount(price), at)
                .unwrap();
        }
        let history = store.history(&HistoryQuery::subject(subject)).unwrap();
        let prices: Vec<_> = history.iter().map(|e| e.current.clone()).collect();
        assert_eq!(
            prices,
            vec![FieldValue::Amount(300), FieldValue::Amount(200), FieldValue::Amount(100)]
        );
    }

    #[test]
    fn history_limit_and_since() {
        let mut store = seeded();
        let t0 = Utc::now() - Duration::hours(2);
        let subject = Subject::Package(PackageId(1));
        store
            .record_change(subject, Field::Price, None, FieldValue::Amount(1), t0)
            .unwrap();
        store
            .record_change(subject, Field::Price, None, FieldValue::Amount(2), t0 + Duration::hours(1))
            .unwrap();
        store
            .record_change(subject, Field::Price, None, FieldValue::Amount(3), t0 + Duration::hours(2))
            .unwrap();

        let limited = store.history(&HistoryQuery::subject(subject).limit(Some(2))).unwrap();
        assert_eq!(limited.len(), 2);

        let since = store
            .history(&HistoryQuery::subject(subject).since(Some(t0 + Duration::minutes(30))))
            .unwrap();
        assert_eq!(since.len(), 2);
    }

    #[test]
    fn app_scope_includes_packages_and_app_fields() {
        let mut store = seeded();
        store.add_app(&app(2, "Other")).unwrap();
        store
            .record_change(Subject::App(AppId(316750)), Field::ComingSoon, None, FieldValue::Flag(false), Utc::now())
            .unwrap();
        store
            .record_change(Subject::Package(PackageId(1)), Field::Currency, None, FieldValue::Text("EUR".into()), Utc::now())
            .unwrap();
        store
            .record_change(Subject::App(AppId(2)), Field::SupportsLinux, None, FieldValue::Flag(true), Utc::now())
            .unwrap();

        let scoped = store.history(&HistoryQuery::apps(vec![AppId(316750)])).unwrap();
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|e| e.app_id == AppId(316750)));
        assert!(store.history(&HistoryQuery::apps(vec![])).unwrap().is_empty());
    }

    #[test]
    fn list_apps_respects_enabled_flag() {
        let mut store = seeded();
        store.add_app(&app(2, "Beta")).unwrap();
        store.set_enabled(AppId(2), false).unwrap();
        let enabled = store.list_apps(false).unwrap();
        assert_eq!(enabled.len(), 1);
        let all = store.list_apps(true).unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[1].enabled, "disabled apps sort last");
    }

    #[test]
    fn delete_app_removes_packages_and_history() {
        let mut store = seeded();
        store
            .record_change(Subject::Package(PackageId(1)), Field::Price, None, FieldValue::Amount(5), Utc::now())
            .unwrap();
        store.delete_app(AppId(316750)).unwrap();
        assert!(store.get_app(AppId(316750)).unwrap().is_none());
        assert!(store.get_package(PackageId(1)).unwrap().is_none());
        assert!(store.recent(None).unwrap().is_empty());
    }

    #[test]
    fn remove_package_keeps_history() {
        let mut store = seeded();
        store
            .record_change(Subject::Package(PackageId(1)), Field::Price, None, FieldValue::Amount(5), Utc::now())
            .unwrap();
        store.remove_package(PackageId(1)).unwrap();
        assert!(store.packages_for(AppId(316750)).unwrap().is_empty());
        assert_eq!(store.recent(None).unwrap().len(), 1);
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("steamwatch.db");
        let mut store = SnapshotStore::open(&path).expect("open");
        store.add_app(&app(1, "x")).unwrap();
        drop(store);
        let reopened = SnapshotStore::open(&path).expect("reopen");
        assert!(reopened.get_app(AppId(1)).unwrap().is_some());
    }
}
