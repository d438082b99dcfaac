//! JSON shapes of the `appdetails` / `packagedetails` endpoints.
//!
//! Both endpoints answer with an object keyed by the requested id:
//!
//! ```text
//! { "316750": { "success": true, "data": { ... } } }
//! { "316750": { "success": false } }
//! ```
//!
//! Every field inside `data` is optional; an absent field becomes `None` in
//! the snapshot and is never reported as a change.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use steamwatch_core::{AppSnapshot, PackageId, PackageSnapshot};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppData {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    release_date: Option<ReleaseData>,
    platforms: Option<Platforms>,
    packages: Vec<IdRepr>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PackageData {
    name: Option<String>,
    price: Option<PriceData>,
    platforms: Option<Platforms>,
    release_date: Option<ReleaseData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReleaseData {
    coming_soon: Option<bool>,
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Platforms {
    linux: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceData {
    currency: Option<String>,
    /// Already in minor units.
    #[serde(rename = "final")]
    final_price: Option<i64>,
}

/// Package ids come back as numbers or as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(u32),
    Text(String),
}

/// What one `appdetails` call yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDetails {
    pub snapshot: AppSnapshot,
    pub packages: Vec<PackageId>,
}

/// Why a body could not be turned into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// `success` was false or the id key was missing.
    NotFound,
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Decode an `appdetails` body for `key`.
pub fn parse_app_details(key: &str, body: serde_json::Value) -> Result<AppDetails, WireError> {
    let data: AppData = unwrap_envelope(key, body)?;

    let mut packages = Vec::with_capacity(data.packages.len());
    for id in data.packages {
        packages.push(match id {
            IdRepr::Number(n) => PackageId(n),
            IdRepr::Text(s) => s
                .trim()
                .parse::<u32>()
                .map(PackageId)
                .map_err(|_| WireError::Malformed(format!("invalid package id '{s}'")))?,
        });
    }

    let release = data.release_date.unwrap_or_default();
    Ok(AppDetails {
        snapshot: AppSnapshot {
            name: data.name,
            kind: data.kind,
            release_date: release.date.filter(|d| !d.trim().is_empty()),
            coming_soon: release.coming_soon,
            supports_linux: data.platforms.and_then(|p| p.linux),
        },
        packages,
    })
}

/// Decode a `packagedetails` body for package `id`.
pub fn parse_package_details(
    id: PackageId,
    body: serde_json::Value,
) -> Result<PackageSnapshot, WireError> {
    let data: PackageData = unwrap_envelope(&id.to_string(), body)?;
    let price = data.price.unwrap_or_default();
    Ok(PackageSnapshot {
        id,
        name: data.name,
        price: price.final_price,
        currency: price.currency,
        coming_soon: data.release_date.and_then(|r| r.coming_soon),
        supports_linux: data.platforms.and_then(|p| p.linux),
    })
}

fn unwrap_envelope<T: DeserializeOwned>(key: &str, body: serde_json::Value) -> Result<T, WireError> {
    let mut map: HashMap<String, Envelope<T>> =
        serde_json::from_value(body).map_err(|e| WireError::Malformed(e.to_string()))?;
    let envelope = map.remove(key).ok_or(WireError::NotFound)?;
    if !envelope.success {
        return Err(WireError::NotFound);
    }
    envelope
        .data
        .ok_or_else(|| WireError::Malformed(format!("'{key}' has success=true but no data")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
