//! Order book data structures.
//!
//! An [`OrderBook`] is two sorted collections of shared price levels, bids
//! descending and asks ascending by price. Levels are reference-counted so
//! the same objects can appear in both a full book and a depth-filtered
//! view of it.

pub mod entry;
pub mod level;

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::rc::Rc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use self::level::SharedLevel;

/// Side of the book a level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// A book shared between the listener that owns it and any views onto it.
pub type SharedBook = Rc<RefCell<OrderBook>>;

/// A two-sided collection of price levels, each side kept in strict price
/// order with the best price first.
///
/// The book stores [`SharedLevel`] references; clearing or deleting only
/// drops this book's reference, never the level itself, so a second book
/// holding the same levels is unaffected.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: BTreeMap<Reverse<Decimal>, SharedLevel>,
    asks: BTreeMap<Decimal, SharedLevel>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the book for shared ownership.
    pub fn shared(self) -> SharedBook {
        Rc::new(RefCell::new(self))
    }

    /// Inserts a level at its sorted position for its side.
    ///
    /// A second level at the same price replaces the first; the feed should
    /// never produce one, so the replacement is logged.
    pub fn add_level(&mut self, level: SharedLevel) {
        let (side, price) = {
            let l = level.borrow();
            (l.side(), l.price())
        };
        let replaced = match side {
            Side::Bid => self.bids.insert(Reverse(price), level),
            Side::Ask => self.asks.insert(price, level),
        };
        if let Some(old) = replaced {
            warn!(%price, ?side, size = %old.borrow().size(),
                "add for a price already in book, replacing");
        }
    }

    /// Removes a level by identity (side and price). Removing a level that
    /// is not present is logged and otherwise a no-op.
    pub fn delete_level(&mut self, level: &SharedLevel) {
        let (side, price) = {
            let l = level.borrow();
            (l.side(), l.price())
        };
        let removed = match side {
            Side::Bid => self.bids.remove(&Reverse(price)),
            Side::Ask => self.asks.remove(&price),
        };
        if removed.is_none() {
            warn!(%price, ?side, "delete for a price not in book");
        }
    }

    /// Looks up the level at `price`, if any.
    pub fn level_at_price(&self, side: Side, price: Decimal) -> Option<SharedLevel> {
        match side {
            Side::Bid => self.bids.get(&Reverse(price)).cloned(),
            Side::Ask => self.asks.get(&price).cloned(),
        }
    }

    /// Returns the level at a zero-based position from the best price.
    ///
    /// `None` when `pos` is past the end of that side; asking for a
    /// position beyond the book is a normal outcome, not an error.
    pub fn level_at_position(&self, side: Side, pos: usize) -> Option<SharedLevel> {
        self.side_levels(side).nth(pos)
    }

    /// Best (first) level on a side.
    pub fn best_level(&self, side: Side) -> Option<SharedLevel> {
        self.side_levels(side).next()
    }

    /// Iterates a side best price first (bids descending, asks ascending).
    pub fn side_levels(&self, side: Side) -> Box<dyn Iterator<Item = SharedLevel> + '_> {
        match side {
            Side::Bid => Box::new(self.bids.values().cloned()),
            Side::Ask => Box::new(self.asks.values().cloned()),
        }
    }

    /// Number of levels on a side.
    pub fn depth(&self, side: Side) -> usize {
        match side {
            Side::Bid => self.bids.len(),
            Side::Ask => self.asks.len(),
        }
    }

    /// Sum of level sizes on a side.
    pub fn total_size(&self, side: Side) -> Decimal {
        self.side_levels(side).map(|l| l.borrow().size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Empties both sides.
    ///
    /// Only this book's references are dropped; levels shared with another
    /// book stay alive there.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }
}
