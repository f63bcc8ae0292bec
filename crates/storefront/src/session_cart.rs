//! The visitor's cart and undo history, kept in their session.
//!
//! Each request copies the raw cart slot out of the session into a
//! quota-limited [`MemoryStore`], runs the [`CartStore`] logic against it and
//! writes the slot back. A cart too large for the slot is kept whole under
//! [`UNSAVED_KEY`] instead, and its warning is repeated on every request until
//! the cart is emptied. Concurrent requests from one session are
//! last-write-wins.

use chrono::Utc;
use farmhouse_core::cart::{CART_KEY, CartStore, LineItem, StorageWarning};
use farmhouse_core::storage::MemoryStore;
use farmhouse_core::undo::{UndoAction, UndoBuffer};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

/// Session key for the undo history.
pub const UNDO_KEY: &str = "yfhs_undo";

/// Session key for a cart that failed to save into [`CART_KEY`].
pub const UNSAVED_KEY: &str = "yfhs_cart_unsaved";

/// Largest serialized cart accepted, in bytes.
pub const CART_QUOTA_BYTES: usize = 64 * 1024;

#[derive(Debug, Serialize, Deserialize)]
struct UnsavedCart {
    items: Vec<LineItem>,
    warning: StorageWarning,
}

/// A cart loaded from the session.
#[derive(Debug)]
pub struct SessionCart {
    store: CartStore<MemoryStore>,
    undo: UndoBuffer,
    unsaved_warning: Option<StorageWarning>,
}

impl SessionCart {
    /// Load the cart and undo history.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        let undo = session.get::<UndoBuffer>(UNDO_KEY).await?.unwrap_or_default();
        let storage = MemoryStore::with_quota(CART_QUOTA_BYTES);

        if let Some(unsaved) = session.get::<UnsavedCart>(UNSAVED_KEY).await? {
            return Ok(Self {
                store: CartStore::unsaved(storage, unsaved.items),
                undo,
                unsaved_warning: Some(unsaved.warning),
            });
        }

        let storage = match session.get::<String>(CART_KEY).await? {
            Some(raw) => storage.with_item(CART_KEY, raw),
            None => storage,
        };
        Ok(Self {
            store: CartStore::new(storage),
            undo,
            unsaved_warning: None,
        })
    }

    pub fn store(&mut self) -> &mut CartStore<MemoryStore> {
        &mut self.store
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        self.store.items()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.store.item_count()
    }

    /// Remember a destructive action so it can be undone.
    pub fn record(&mut self, action: UndoAction) {
        self.undo.push(action, Utc::now());
    }

    /// Undo the most recent unexpired action, returning what was undone.
    pub fn undo(&mut self) -> Option<UndoAction> {
        let action = self.undo.pop(Utc::now())?;
        self.store.restore(action.clone());
        Some(action)
    }

    /// Description of the action [`SessionCart::undo`] would revert.
    #[must_use]
    pub fn pending_undo(&self) -> Option<String> {
        self.undo.peek(Utc::now()).map(UndoAction::describe)
    }

    /// Forget the undo history.
    pub fn forget_undo(&mut self) {
        self.undo.clear();
    }

    /// Write the cart and undo history back, returning the storage warnings
    /// that apply to this request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn save(self, session: &Session) -> Result<Vec<StorageWarning>, tower_sessions::session::Error> {
        let Self {
            mut store,
            undo,
            unsaved_warning,
        } = self;
        let mut warnings = store.take_warnings();

        if store.is_degraded() && !store.items().is_empty() {
            let warning = match (warnings.first(), unsaved_warning) {
                (Some(first), _) => first.clone(),
                (None, Some(carried)) => {
                    warnings.push(carried.clone());
                    carried
                }
                (None, None) => StorageWarning {
                    message: "Your cart could not be saved.".to_owned(),
                },
            };
            let unsaved = UnsavedCart {
                items: store.items().to_vec(),
                warning,
            };
            session.insert(UNSAVED_KEY, unsaved).await?;
        } else {
            let degraded = store.is_degraded();
            let mut storage = store.into_storage();
            session.remove::<UnsavedCart>(UNSAVED_KEY).await?;
            // An emptied degraded cart never wrote its slot either.
            match storage.take(CART_KEY).filter(|_| !degraded) {
                Some(raw) => session.insert(CART_KEY, raw).await?,
                None => {
                    session.remove::<String>(CART_KEY).await?;
                }
            }
        }

        if undo.is_empty(Utc::now()) {
            session.remove::<UndoBuffer>(UNDO_KEY).await?;
        } else {
            session.insert(UNDO_KEY, undo).await?;
        }

        Ok(warnings)
    }
}
