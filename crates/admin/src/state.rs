//! Application state shared across handlers.

use std::sync::{Arc, Mutex};

use farmhouse_core::site_config::SiteConfig;
use farmhouse_core::storage::{FileStore, StorageError};

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The catalog working copy is per session and
/// lives in the session, not here.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    site_store: Mutex<FileStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the site data directory cannot be created.
    pub fn new(config: AdminConfig) -> Result<Self, StorageError> {
        let site_store = FileStore::open(&config.site_data_dir)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                site_store: Mutex::new(site_store),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Read the shared site configuration.
    #[must_use]
    pub fn site_config(&self) -> SiteConfig {
        match self.inner.site_store.lock() {
            Ok(store) => SiteConfig::load(&*store),
            Err(poisoned) => SiteConfig::load(&*poisoned.into_inner()),
        }
    }

    /// Load, change and save the site configuration under one lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn update_site_config(
        &self,
        change: impl FnOnce(&mut SiteConfig),
    ) -> Result<SiteConfig, StorageError> {
        let mut store = match self.inner.site_store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut config = SiteConfig::load(&*store);
        change(&mut config);
        config.save(&mut *store)?;
        Ok(config)
    }

    /// Remove the stored site configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn reset_site_config(&self) -> Result<(), StorageError> {
        let mut store = match self.inner.site_store.lock() {
            Ok(store) => store,
            Err(poisoned) => poisoned.into_inner(),
        };
        SiteConfig::reset(&mut *store)
    }
}
