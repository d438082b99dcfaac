//! Blocking HTTP client for the Steam store API.

use std::time::Duration;

use steamwatch_core::config::{Config, DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS};
use steamwatch_core::{AppId, FetchedApp, PackageId};

use crate::error::FetchError;
use crate::wire::{self, WireError};
use crate::CatalogFetcher;

/// Fetches `appdetails` and then `packagedetails` for every listed package.
pub struct SteamStoreApi {
    agent: ureq::Agent,
    base_url: String,
    country_code: Option<String>,
}

impl SteamStoreApi {
    pub fn new(base_url: impl Into<String>, country_code: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("steamwatch/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            country_code,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.api_base_url.clone(),
            config.country_code.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    fn get_json(&self, endpoint: &str, param: &str, id: &str) -> Result<(String, serde_json::Value), FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let mut request = self.agent.get(&url).query(param, id);
        if let Some(cc) = &self.country_code {
            request = request.query("cc", cc);
        }
        tracing::debug!(%url, %param, %id, "GET");

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                return Err(FetchError::Status { url, status });
            }
            Err(source) => {
                return Err(FetchError::Transport {
                    url,
                    source: Box::new(source),
                })
            }
        };
        tracing::debug!(status = response.status(), "response");

        let body = response
            .into_json::<serde_json::Value>()
            .map_err(|e| FetchError::Malformed {
                url: url.clone(),
                message: e.to_string(),
            })?;
        Ok((url, body))
    }

    fn fetch_package(&self, id: PackageId) -> Result<steamwatch_core::PackageSnapshot, FetchError> {
        let (url, body) = self.get_json("packagedetails", "packageids", &id.to_string())?;
        wire::parse_package_details(id, body).map_err(|e| match e {
            WireError::NotFound => FetchError::PackageNotFound(id),
            WireError::Malformed(message) => FetchError::Malformed { url, message },
        })
    }
}

impl Default for SteamStoreApi {
    fn default() -> Self {
        Self::new(
            DEFAULT_API_BASE_URL,
            None,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        )
    }
}

impl CatalogFetcher for SteamStoreApi {
    fn fetch(&self, app_id: AppId) -> Result<FetchedApp, FetchError> {
        let key = app_id.to_string();
        let (url, body) = self.get_json("appdetails", "appids", &key)?;
        let details = wire::parse_app_details(&key, body).map_err(|e| match e {
            WireError::NotFound => FetchError::AppNotFound(app_id),
            WireError::Malformed(message) => FetchError::Malformed { url, message },
        })?;

        let mut packages = Vec::with_capacity(details.packages.len());
        for id in details.packages {
            match self.fetch_package(id) {
                Ok(snapshot) => packages.push(snapshot),
                // Delisted packages stay listed on the app for a while.
                Err(FetchError::PackageNotFound(id)) => {
                    tracing::warn!(app = %app_id, package = %id, "package not found on the store, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(FetchedApp {
            app: details.snapshot,
            packages,
        })
    }
}
