//! Undo buffer for destructive cart actions.
//!
//! Holds the most recent [`UNDO_CAPACITY`] removals and clears, each
//! undoable for [`UNDO_WINDOW_SECS`] seconds. The current time is passed in so
//! expiry is deterministic in tests; the buffer itself serializes to JSON so
//! it can live in a visitor's session next to the cart.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::LineItem;

/// Number of actions remembered.
pub const UNDO_CAPACITY: usize = 5;

/// How long an action stays undoable.
pub const UNDO_WINDOW_SECS: i64 = 30;

/// Something the visitor can take back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UndoAction {
    /// One line removed from position `index`.
    RemovedItem { index: usize, item: LineItem },
    /// The whole cart emptied.
    ClearedCart { items: Vec<LineItem> },
}

impl UndoAction {
    /// Short description for the undo button.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::RemovedItem { item, .. } => format!("Removed {}", item.label()),
            Self::ClearedCart { items } => {
                let count: u32 = items.iter().map(|i| i.quantity).sum();
                format!("Cleared {count} item(s)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UndoEntry {
    action: UndoAction,
    recorded_at: DateTime<Utc>,
}

/// Ring buffer of recent undoable actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoBuffer {
    entries: VecDeque<UndoEntry>,
}

impl UndoBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an action, dropping the oldest once full.
    pub fn push(&mut self, action: UndoAction, now: DateTime<Utc>) {
        self.prune(now);
        if self.entries.len() == UNDO_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(UndoEntry {
            action,
            recorded_at: now,
        });
    }

    /// Take the most recent action that has not expired.
    pub fn pop(&mut self, now: DateTime<Utc>) -> Option<UndoAction> {
        self.prune(now);
        self.entries.pop_back().map(|e| e.action)
    }

    /// The action [`UndoBuffer::pop`] would return, without taking it.
    #[must_use]
    pub fn peek(&self, now: DateTime<Utc>) -> Option<&UndoAction> {
        self.entries
            .back()
            .filter(|e| !Self::expired(e, now))
            .map(|e| &e.action)
    }

    /// Number of unexpired actions.
    #[must_use]
    pub fn len(&self, now: DateTime<Utc>) -> usize {
        self.entries.iter().filter(|e| !Self::expired(e, now)).count()
    }

    #[must_use]
    pub fn is_empty(&self, now: DateTime<Utc>) -> bool {
        self.len(now) == 0
    }

    /// Forget everything, e.g. after an order is placed.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.entries.retain(|e| !Self::expired(e, now));
    }

    fn expired(entry: &UndoEntry, now: DateTime<Utc>) -> bool {
        now - entry.recorded_at >= Duration::seconds(UNDO_WINDOW_SECS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn item(name: &str) -> LineItem {
        LineItem::new(name, Price::dollars(10), 1)
    }

    fn removed(name: &str) -> UndoAction {
        UndoAction::RemovedItem {
            index: 0,
            item: item(name),
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_pop_returns_most_recent_first() {
        let mut buffer = UndoBuffer::new();
        buffer.push(removed("Pie"), t0());
        buffer.push(removed("Cake"), t0());

        assert_eq!(buffer.pop(t0()), Some(removed("Cake")));
        assert_eq!(buffer.pop(t0()), Some(removed("Pie")));
        assert_eq!(buffer.pop(t0()), None);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut buffer = UndoBuffer::new();
        for i in 0..7 {
            buffer.push(removed(&format!("Item {i}")), t0());
        }
        assert_eq!(buffer.len(t0()), UNDO_CAPACITY);

        let mut names = Vec::new();
        while let Some(UndoAction::RemovedItem { item, .. }) = buffer.pop(t0()) {
            names.push(item.name);
        }
        assert_eq!(names.last().map(String::as_str), Some("Item 2"));
    }

    #[test]
    fn test_entries_expire_after_window() {
        let mut buffer = UndoBuffer::new();
        buffer.push(removed("Pie"), t0());
        buffer.push(removed("Cake"), t0() + Duration::seconds(20));

        let later = t0() + Duration::seconds(UNDO_WINDOW_SECS);
        assert_eq!(buffer.len(later), 1);
        assert_eq!(buffer.peek(later), Some(&removed("Cake")));

        let much_later = t0() + Duration::seconds(60);
        assert!(buffer.is_empty(much_later));
        assert_eq!(buffer.pop(much_later), None);
    }

    #[test]
    fn test_serde_roundtrip_for_session_storage() {
        let mut buffer = UndoBuffer::new();
        buffer.push(
            UndoAction::ClearedCart {
                items: vec![item("Fudge"), item("Brownies")],
            },
            t0(),
        );
        let json = serde_json::to_string(&buffer).unwrap();
        assert!(json.contains("\"kind\":\"clearedCart\""));

        let restored: UndoBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, buffer);
    }

    #[test]
    fn test_describe() {
        assert_eq!(removed("Pie").describe(), "Removed Pie");
        let cleared = UndoAction::ClearedCart {
            items: vec![item("A"), item("B")],
        };
        assert_eq!(cleared.describe(), "Cleared 2 item(s)");
    }
}
