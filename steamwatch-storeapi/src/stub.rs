//! In-memory catalog for tests and offline runs.
//!
//! Clones share state, so a test can keep one handle and change the catalog
//! between cycles while the coordinator owns another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use steamwatch_core::{AppId, FetchedApp};

use crate::error::FetchError;
use crate::CatalogFetcher;

#[derive(Debug, Clone)]
enum Canned {
    Found(FetchedApp),
    Fail(String),
}

#[derive(Debug, Default)]
struct State {
    apps: HashMap<AppId, Canned>,
    calls: Vec<AppId>,
}

#[derive(Debug, Clone, Default)]
pub struct StubFetcher {
    state: Arc<Mutex<State>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `app` for `id` from now on.
    pub fn set(&self, id: AppId, app: FetchedApp) {
        self.lock().apps.insert(id, Canned::Found(app));
    }

    /// Fail every fetch of `id` with [`FetchError::Unavailable`].
    pub fn fail(&self, id: AppId, message: impl Into<String>) {
        self.lock().apps.insert(id, Canned::Fail(message.into()));
    }

    /// Forget `id`; fetches then report [`FetchError::AppNotFound`].
    pub fn remove(&self, id: AppId) {
        self.lock().apps.remove(&id);
    }

    /// Every id fetched so far, in call order.
    pub fn calls(&self) -> Vec<AppId> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CatalogFetcher for StubFetcher {
    fn fetch(&self, app_id: AppId) -> Result<FetchedApp, FetchError> {
        let mut state = self.lock();
        state.calls.push(app_id);
        match state.apps.get(&app_id) {
            Some(Canned::Found(app)) => Ok(app.clone()),
            Some(Canned::Fail(message)) => Err(FetchError::Unavailable(message.clone())),
            None => Err(FetchError::AppNotFound(app_id)),
        }
    }
}
