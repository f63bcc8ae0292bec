//! Site configuration: the orders-paused switch and sold-out products.
//!
//! Stored as one JSON object under [`CONFIG_KEY`]. Only the admin server and
//! the CLI write it; the storefront reads it on every request so a toggle
//! takes effect without reloading the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{KeyValueStore, StorageError};
use crate::types::ProductId;

/// Storage slot holding the configuration.
pub const CONFIG_KEY: &str = "yellowfarmhouse_config";

/// Persisted site configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default)]
    pub orders_paused: bool,
    #[serde(default)]
    pub sold_out_products: Vec<ProductId>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            orders_paused: false,
            sold_out_products: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl SiteConfig {
    /// Read the configuration, falling back to defaults when the slot is
    /// empty, unreadable or malformed.
    pub fn load(store: &impl KeyValueStore) -> Self {
        let raw = match store.get_item(CONFIG_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Site config unreadable, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Site config malformed, using defaults");
                Self::default()
            }
        }
    }

    /// Persist the configuration, stamping `last_updated`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn save(&mut self, store: &mut impl KeyValueStore) -> Result<(), StorageError> {
        self.last_updated = Utc::now();
        let json = serde_json::to_string(self)
            .map_err(|e| StorageError::Unavailable(format!("cannot encode site config: {e}")))?;
        store.set_item(CONFIG_KEY, &json)?;
        tracing::info!(
            orders_paused = self.orders_paused,
            sold_out = self.sold_out_products.len(),
            "Site config saved"
        );
        Ok(())
    }

    /// Remove the stored configuration so defaults apply again.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn reset(store: &mut impl KeyValueStore) -> Result<(), StorageError> {
        store.remove_item(CONFIG_KEY)?;
        tracing::info!("Site config reset to defaults");
        Ok(())
    }

    /// Pause or resume ordering.
    pub const fn pause_orders(&mut self, paused: bool) {
        self.orders_paused = paused;
    }

    #[must_use]
    pub const fn orders_paused(&self) -> bool {
        self.orders_paused
    }

    /// Mark a product sold out or available. Repeating either is a no-op.
    pub fn set_sold_out(&mut self, id: &ProductId, sold_out: bool) {
        let position = self.sold_out_products.iter().position(|p| p == id);
        match (sold_out, position) {
            (true, None) => self.sold_out_products.push(id.clone()),
            (false, Some(i)) => {
                self.sold_out_products.remove(i);
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn is_sold_out(&self, id: &ProductId) -> bool {
        self.sold_out_products.contains(id)
    }
}
