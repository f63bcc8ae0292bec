//! Site configuration commands.
//!
//! # Usage
//!
//! ```bash
//! yfhs config --store data/site show
//! yfhs config --store data/site pause
//! yfhs config --store data/site sold-out pumpkin-pie
//! yfhs config --store data/site reset
//! ```
//!
//! `--store` is the same directory the storefront and admin use as
//! `SITE_DATA_DIR`.

use std::io::Write;

use farmhouse_core::ProductId;
use farmhouse_core::site_config::SiteConfig;
use farmhouse_core::storage::{KeyValueStore, StorageError};
use thiserror::Error;

/// Errors from config commands.
#[derive(Debug, Error)]
pub enum ConfigCommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// A change to the site configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    Pause,
    Resume,
    SoldOut(String),
    Available(String),
}

/// Print the current configuration.
///
/// # Errors
///
/// Returns an error if output cannot be written.
pub fn show(store: &impl KeyValueStore, out: &mut impl Write) -> Result<(), ConfigCommandError> {
    let config = SiteConfig::load(store);
    let orders = if config.orders_paused() { "paused" } else { "open" };
    writeln!(out, "orders:   {orders}")?;
    if config.sold_out_products.is_empty() {
        writeln!(out, "sold out: none")?;
    } else {
        let ids: Vec<&str> = config.sold_out_products.iter().map(ProductId::as_str).collect();
        writeln!(out, "sold out: {}", ids.join(", "))?;
    }
    writeln!(out, "updated:  {}", config.last_updated.to_rfc3339())?;
    Ok(())
}

/// Apply `change`, save, and print the result.
///
/// # Errors
///
/// Returns an error if the store rejects the write.
pub fn apply(
    store: &mut impl KeyValueStore,
    change: ConfigChange,
    out: &mut impl Write,
) -> Result<(), ConfigCommandError> {
    let mut config = SiteConfig::load(&*store);
    match &change {
        ConfigChange::Pause => config.pause_orders(true),
        ConfigChange::Resume => config.pause_orders(false),
        ConfigChange::SoldOut(id) => config.set_sold_out(&ProductId::new(id.as_str()), true),
        ConfigChange::Available(id) => config.set_sold_out(&ProductId::new(id.as_str()), false),
    }
    config.save(&mut *store)?;
    tracing::info!(?change, "Site config changed");
    show(&*store, out)
}

/// Remove the stored configuration.
///
/// # Errors
///
/// Returns an error if the store rejects the removal.
pub fn reset(store: &mut impl KeyValueStore, out: &mut impl Write) -> Result<(), ConfigCommandError> {
    SiteConfig::reset(store)?;
    writeln!(out, "site config reset to defaults")?;
    Ok(())
}
