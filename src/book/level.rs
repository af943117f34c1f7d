//! Price levels: the aggregate size and contributing entries at one price.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::Side;
use super::entry::{Entry, EntryAction};

/// Action applied to a price level by the most recent book event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelAction {
    Add,
    Update,
    Delete,
    Unknown,
}

/// A price level shared between books.
///
/// The full book and any depth-filtered view hold clones of the same `Rc`,
/// so removing a level from one book never invalidates it for the other.
/// Identity comparisons between books use [`Rc::ptr_eq`].
pub type SharedLevel = Rc<RefCell<PriceLevel>>;

/// Aggregated quantity available at one price on one side of the book.
///
/// Identity is `(side, price)`. The level records the action of the last
/// event that touched it and, when entry processing is enabled, the
/// individual entries contributing to its size, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    price: Decimal,
    side: Side,
    size: Decimal,
    action: LevelAction,
    entries: Vec<Entry>,
}

impl PriceLevel {
    pub fn new(price: Decimal, side: Side) -> Self {
        Self {
            price,
            side,
            size: Decimal::ZERO,
            action: LevelAction::Add,
            entries: Vec::new(),
        }
    }

    /// Wraps the level for shared ownership between books.
    pub fn shared(self) -> SharedLevel {
        Rc::new(RefCell::new(self))
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Aggregate visible quantity at this price.
    pub fn size(&self) -> Decimal {
        self.size
    }

    pub fn action(&self) -> LevelAction {
        self.action
    }

    pub fn set_size(&mut self, size: Decimal) {
        self.size = size;
    }

    pub fn set_action(&mut self, action: LevelAction) {
        self.action = action;
    }

    /// Entries contributing to this level, in arrival order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn find_entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Appends a new entry. The entry id is assumed unique within the level.
    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Updates the size of an existing entry. Returns `false` when no entry
    /// with that id exists.
    pub fn update_entry(&mut self, id: &str, size: Decimal) -> bool {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                entry.set_size(size);
                entry.set_action(EntryAction::Update);
                true
            }
            None => {
                debug!(id, price = %self.price, "update for unknown entry");
                false
            }
        }
    }

    /// Removes an entry by id. Returns the removed entry, if any.
    pub fn remove_entry(&mut self, id: &str) -> Option<Entry> {
        match self.entries.iter().position(|e| e.id() == id) {
            Some(pos) => Some(self.entries.remove(pos)),
            None => {
                debug!(id, price = %self.price, "delete for unknown entry");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn entries_kept_in_arrival_order() {
        let mut level = PriceLevel::new(dec!(100.0), Side::Bid);
        level.add_entry(Entry::new("b", dec!(2), EntryAction::Add));
        level.add_entry(Entry::new("a", dec!(1), EntryAction::Add));
        level.add_entry(Entry::new("c", dec!(3), EntryAction::Add));

        let ids: Vec<&str> = level.entries().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn update_unknown_entry_is_a_noop() {
        let mut level = PriceLevel::new(dec!(100.0), Side::Bid);
        assert!(!level.update_entry("missing", dec!(5)));
        assert_eq!(level.num_entries(), 0);
    }

    #[test]
    fn remove_entry_by_id() {
        let mut level = PriceLevel::new(dec!(100.0), Side::Ask);
        level.add_entry(Entry::new("a", dec!(1), EntryAction::Add));
        level.add_entry(Entry::new("b", dec!(2), EntryAction::Add));

        let removed = level.remove_entry("a").expect("entry should exist");
        assert_eq!(removed.id(), "a");
        assert_eq!(level.num_entries(), 1);
        assert!(level.remove_entry("a").is_none());
    }
}
