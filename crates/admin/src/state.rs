//! Application state shared across handlers.

use std::sync::Arc;

use chocolatier_backend::Backend;
use chocolatier_core::auth::AuthProvider;
use chocolatier_core::store::DataStore;
use chrono::{NaiveDate, Utc};

use crate::config::AdminConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: Backend,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig, backend: Backend) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, backend }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Data store, read and written with the service key when one is set.
    #[must_use]
    pub fn store(&self) -> &dyn DataStore {
        self.inner.backend.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &dyn AuthProvider {
        self.inner.backend.auth.as_ref()
    }

    /// Day used for season phases and the dashboard's current season.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
