//! Yellow Farmhouse Treats Core - Shared domain library.
//!
//! This crate provides the types and logic used across all bakery components:
//! - `storefront` - Public menu, cart and order page
//! - `admin` - Catalog editor and site settings
//! - `cli` - Command-line tools for catalog files, carts and shipping quotes
//!
//! # Architecture
//!
//! The core crate has no HTTP and no async. Persistence goes through the
//! synchronous [`storage::KeyValueStore`] trait, so the same cart and site
//! configuration logic runs over a session slot, an in-memory map or a
//! directory of JSON files.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices and emails
//! - [`storage`] - Key/value storage slots (memory and file backed)
//! - [`catalog`] - Catalog document model, normalization and validation
//! - [`cart`] - Cart store and order totals
//! - [`undo`] - Short-lived undo buffer for destructive cart actions
//! - [`shipping`] - ZIP/state validation and shipping quotes
//! - [`order`] - Order summary, payment links and the order form
//! - [`site_config`] - Orders-paused and sold-out flags

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod shipping;
pub mod site_config;
pub mod storage;
pub mod types;
pub mod undo;

pub use types::*;
