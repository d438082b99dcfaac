//! Domain types for steamwatch.
//!
//! Records (`AppRecord`, `PackageRecord`) are what the store holds.
//! Snapshots (`AppSnapshot`, `PackageSnapshot`) are what a catalog fetch returns;
//! every snapshot field is optional because the store API omits fields freely.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Steam store app id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppId(pub u32);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for AppId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Steam store package id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub u32);

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for PackageId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Tracked fields
// ---------------------------------------------------------------------------

/// A tracked field. Apps track release date and the two flags; packages track
/// price, currency and the two flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Price,
    Currency,
    ReleaseDate,
    ComingSoon,
    SupportsLinux,
}

impl Field {
    /// App-level fields in comparison order.
    pub const APP_FIELDS: [Field; 3] = [Field::ReleaseDate, Field::ComingSoon, Field::SupportsLinux];

    /// Package-level fields in comparison order.
    pub const PACKAGE_FIELDS: [Field; 4] = [
        Field::Price,
        Field::Currency,
        Field::ComingSoon,
        Field::SupportsLinux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Price => "price",
            Field::Currency => "currency",
            Field::ReleaseDate => "release_date",
            Field::ComingSoon => "coming_soon",
            Field::SupportsLinux => "supports_linux",
        }
    }

    /// Whether `subject` carries this field.
    pub fn applies_to(&self, subject: &Subject) -> bool {
        match subject {
            Subject::App(_) => Self::APP_FIELDS.contains(self),
            Subject::Package(_) => Self::PACKAGE_FIELDS.contains(self),
        }
    }

    /// The event kind published when this field changes.
    pub fn event_kind(&self) -> EventKind {
        match self {
            Field::Price => EventKind::PriceChanged,
            Field::Currency => EventKind::CurrencyChanged,
            Field::ReleaseDate => EventKind::ReleaseDateChanged,
            Field::ComingSoon => EventKind::ComingSoonChanged,
            Field::SupportsLinux => EventKind::SupportsLinuxChanged,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(Field::Price),
            "currency" => Ok(Field::Currency),
            "release_date" => Ok(Field::ReleaseDate),
            "coming_soon" => Ok(Field::ComingSoon),
            "supports_linux" => Ok(Field::SupportsLinux),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

/// A typed field value. Prices are always integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Amount(i64),
    Text(String),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Amount(v) => v.fmt(f),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Flag(v) => v.fmt(f),
        }
    }
}

/// The owner of a tracked field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    App(AppId),
    Package(PackageId),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::App(id) => write!(f, "app {id}"),
            Subject::Package(id) => write!(f, "package {id}"),
        }
    }
}

/// One detected change of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: Field,
    pub previous: Option<FieldValue>,
    pub current: FieldValue,
}

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// The nine notification categories observers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AppAdded,
    AppRemoved,
    PackageLinked,
    Threshold,
    CurrencyChanged,
    PriceChanged,
    ReleaseDateChanged,
    ComingSoonChanged,
    SupportsLinuxChanged,
}

impl EventKind {
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::AppAdded,
            EventKind::AppRemoved,
            EventKind::PackageLinked,
            EventKind::Threshold,
            EventKind::CurrencyChanged,
            EventKind::PriceChanged,
            EventKind::ReleaseDateChanged,
            EventKind::ComingSoonChanged,
            EventKind::SupportsLinuxChanged,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::AppAdded => "app_added",
            EventKind::AppRemoved => "app_removed",
            EventKind::PackageLinked => "package_linked",
            EventKind::Threshold => "threshold",
            EventKind::CurrencyChanged => "currency_changed",
            EventKind::PriceChanged => "price_changed",
            EventKind::ReleaseDateChanged => "release_date_changed",
            EventKind::ComingSoonChanged => "coming_soon_changed",
            EventKind::SupportsLinuxChanged => "supports_linux_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event kind '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// A watched app as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: AppId,
    pub name: Option<String>,
    /// `game`, `dlc`, ... as reported by the store.
    pub kind: String,
    pub enabled: bool,
    /// Price threshold in minor units.
    pub threshold: Option<i64>,
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub supports_linux: Option<bool>,
    pub added_at: DateTime<Utc>,
}

impl AppRecord {
    /// Seed a new, enabled record from a fetched snapshot.
    pub fn from_snapshot(
        id: AppId,
        snapshot: &AppSnapshot,
        threshold: Option<i64>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: snapshot.name.clone(),
            kind: snapshot.kind.clone().unwrap_or_else(|| "game".to_string()),
            enabled: true,
            threshold,
            release_date: snapshot.release_date.clone(),
            coming_soon: snapshot.coming_soon,
            supports_linux: snapshot.supports_linux,
            added_at,
        }
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::ReleaseDate => self.release_date.clone().map(FieldValue::Text),
            Field::ComingSoon => self.coming_soon.map(FieldValue::Flag),
            Field::SupportsLinux => self.supports_linux.map(FieldValue::Flag),
            Field::Price | Field::Currency => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("app {}", self.id))
    }
}

/// A package as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: PackageId,
    pub app_id: AppId,
    pub name: Option<String>,
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub coming_soon: Option<bool>,
    pub supports_linux: Option<bool>,
    pub linked_at: DateTime<Utc>,
}

impl PackageRecord {
    pub fn from_snapshot(app_id: AppId, snapshot: &PackageSnapshot, linked_at: DateTime<Utc>) -> Self {
        Self {
            id: snapshot.id,
            app_id,
            name: snapshot.name.clone(),
            price: snapshot.price,
            currency: snapshot.currency.clone(),
            coming_soon: snapshot.coming_soon,
            supports_linux: snapshot.supports_linux,
            linked_at,
        }
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Price => self.price.map(FieldValue::Amount),
            Field::Currency => self.currency.clone().map(FieldValue::Text),
            Field::ComingSoon => self.coming_soon.map(FieldValue::Flag),
            Field::SupportsLinux => self.supports_linux.map(FieldValue::Flag),
            Field::ReleaseDate => None,
        }
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("package {}", self.id))
    }
}

// ---------------------------------------------------------------------------
// Fetched snapshots
// ---------------------------------------------------------------------------

/// App fields as returned by one catalog fetch. `None` means "not reported".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSnapshot {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub release_date: Option<String>,
    pub coming_soon: Option<bool>,
    pub supports_linux: Option<bool>,
}

impl AppSnapshot {
    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::ReleaseDate => self.release_date.clone().map(FieldValue::Text),
            Field::ComingSoon => self.coming_soon.map(FieldValue::Flag),
            Field::SupportsLinux => self.supports_linux.map(FieldValue::Flag),
            Field::Price | Field::Currency => None,
        }
    }
}

/// Package fields as returned by one catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSnapshot {
    pub id: PackageId,
    pub name: Option<String>,
    /// Final price in minor units.
    pub price: Option<i64>,
    pub currency: Option<String>,
    pub coming_soon: Option<bool>,
    pub supports_linux: Option<bool>,
}

impl PackageSnapshot {
    /// A snapshot with only the id set.
    pub fn new(id: PackageId) -> Self {
        Self {
            id,
            name: None,
            price: None,
            currency: None,
            coming_soon: None,
            supports_linux: None,
        }
    }

    pub fn value(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::Price => self.price.map(FieldValue::Amount),
            Field::Currency => self.currency.clone().map(FieldValue::Text),
            Field::ComingSoon => self.coming_soon.map(FieldValue::Flag),
            Field::SupportsLinux => self.supports_linux.map(FieldValue::Flag),
            Field::ReleaseDate => None,
        }
    }
}

/// The result of fetching one app: its own fields plus its packages in the
/// order the store listed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedApp {
    pub app: AppSnapshot,
    pub packages: Vec<PackageSnapshot>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One immutable row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Insertion sequence; breaks timestamp ties.
    pub seq: i64,
    pub app_id: AppId,
    pub subject: Subject,
    pub field: Field,
    pub previous: Option<FieldValue>,
    pub current: FieldValue,
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
