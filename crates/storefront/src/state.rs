//! Application state shared across handlers.

use std::sync::{Arc, Mutex};

use farmhouse_core::catalog::Catalog;
use farmhouse_core::order::PaymentHandles;
use farmhouse_core::shipping::ShippingRates;
use farmhouse_core::site_config::SiteConfig;
use farmhouse_core::storage::{FileStore, StorageError};

use crate::catalog::CatalogLoader;
use crate::config::StorefrontConfig;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot build catalog client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("cannot open site data directory: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog loader, the shared site configuration and settings.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogLoader,
    site_store: Mutex<FileStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the site data
    /// directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let catalog = CatalogLoader::new(&config.catalog)?;
        let site_store = FileStore::open(&config.site_data_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                site_store: Mutex::new(site_store),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog loader.
    #[must_use]
    pub fn catalog(&self) -> &CatalogLoader {
        &self.inner.catalog
    }

    /// Read the current site configuration.
    ///
    /// Read on every request so admin changes apply immediately.
    #[must_use]
    pub fn site_config(&self) -> SiteConfig {
        match self.inner.site_store.lock() {
            Ok(store) => SiteConfig::load(&*store),
            Err(poisoned) => SiteConfig::load(&*poisoned.into_inner()),
        }
    }

    /// Rate card with the catalog's per-ZIP overrides, if a catalog is at hand.
    #[must_use]
    pub fn shipping_rates(&self, catalog: Option<&Catalog>) -> ShippingRates {
        let rates = self.inner.config.shipping.clone();
        match catalog {
            Some(catalog) => rates.with_overrides(catalog.shipping_zones.clone()),
            None => rates,
        }
    }

    #[must_use]
    pub fn payment_handles(&self) -> &PaymentHandles {
        &self.inner.config.payments
    }
}
