//! Individual contributors (entries) within a price level.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Action applied to an entry by the most recent book event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryAction {
    Add,
    Update,
    Delete,
    Unknown,
}

/// A single contributor (e.g. one participant's order) within a price level.
///
/// Entries are kept in arrival order inside their level. They are only
/// tracked when the feed carries entry detail and entry processing is
/// enabled on the listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    id: String,
    size: Decimal,
    action: EntryAction,
}

impl Entry {
    pub fn new(id: impl Into<String>, size: Decimal, action: EntryAction) -> Self {
        Self {
            id: id.into(),
            size,
            action,
        }
    }

    /// Unique entry id within the level.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> Decimal {
        self.size
    }

    pub fn action(&self) -> EntryAction {
        self.action
    }

    pub(crate) fn set_size(&mut self, size: Decimal) {
        self.size = size;
    }

    pub(crate) fn set_action(&mut self, action: EntryAction) {
        self.action = action;
    }
}
