//! Book event payloads and the handler interface.
//!
//! Every inbound message produces at most one event: a recap, a single
//! [`BasicDelta`], a [`ComplexDelta`] of several atomic changes, a clear,
//! or a gap notification. Handlers implement [`BookHandler`] and receive
//! the event together with the book it applies to.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::book::SharedBook;
use crate::book::entry::{Entry, EntryAction};
use crate::book::level::{LevelAction, SharedLevel};

/// One atomic book mutation: a level action, the size change it caused,
/// and (when entry processing is enabled) the entry it concerns.
#[derive(Debug, Clone)]
pub struct BasicDelta {
    entry: Option<Entry>,
    level: SharedLevel,
    size_delta: Decimal,
    level_action: LevelAction,
    entry_action: EntryAction,
}

impl BasicDelta {
    pub fn new(
        entry: Option<Entry>,
        level: SharedLevel,
        size_delta: Decimal,
        level_action: LevelAction,
        entry_action: EntryAction,
    ) -> Self {
        Self {
            entry,
            level,
            size_delta,
            level_action,
            entry_action,
        }
    }

    /// The entry this change concerns, when entry detail is tracked.
    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    /// The price level this change concerns.
    pub fn level(&self) -> &SharedLevel {
        &self.level
    }

    /// Change in the level's aggregate size caused by this delta.
    pub fn size_delta(&self) -> Decimal {
        self.size_delta
    }

    pub fn level_action(&self) -> LevelAction {
        self.level_action
    }

    pub fn entry_action(&self) -> EntryAction {
        self.entry_action
    }
}

/// An ordered sequence of atomic changes produced by one inbound message.
#[derive(Debug, Clone, Default)]
pub struct ComplexDelta {
    deltas: Vec<BasicDelta>,
}

impl ComplexDelta {
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Iterates the atomic changes in message order.
    pub fn iter(&self) -> std::slice::Iter<'_, BasicDelta> {
        self.deltas.iter()
    }
}

impl From<Vec<BasicDelta>> for ComplexDelta {
    fn from(deltas: Vec<BasicDelta>) -> Self {
        Self { deltas }
    }
}

impl<'a> IntoIterator for &'a ComplexDelta {
    type Item = &'a BasicDelta;
    type IntoIter = std::slice::Iter<'a, BasicDelta>;

    fn into_iter(self) -> Self::IntoIter {
        self.deltas.iter()
    }
}

/// Inclusive range of sequence numbers missed between two updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapRange {
    pub begin: u64,
    pub end: u64,
}

/// Opaque per-feed context handed back unchanged to every handler callback.
///
/// The engine never interprets it; it exists so a handler serving several
/// feeds can tell them apart.
#[derive(Debug, Clone, Default)]
pub struct Subscription {
    pub symbol: String,
    pub source: Option<String>,
}

impl Subscription {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source: None,
        }
    }
}

/// Per-event metadata carried through from the inbound message unchanged.
#[derive(Debug, Clone, Default)]
pub struct EventDetail {
    pub symbol: String,
    pub part_id: Option<String>,
    pub seq_num: u64,
    pub src_time: Option<String>,
    pub line_time: Option<String>,
    pub event_time: Option<String>,
    pub send_time: Option<String>,
    pub msg_qualifier: Option<u16>,
}

/// A handler registered with a listener or depth filter.
///
/// Handlers are shared with the dispatcher on the single delivery thread;
/// `Rc<RefCell<_>>` lets one object (such as a [`DepthFilter`]) be both a
/// registered handler and independently accessible to the application.
///
/// [`DepthFilter`]: crate::depth_filter::DepthFilter
pub type SharedHandler = Rc<RefCell<dyn BookHandler>>;

/// Receiver for book events.
///
/// One method per event variant; a dispatcher calls exactly one of them per
/// inbound message. Implementations run on the delivery thread and must not
/// assume any other synchronization. Panics propagate to the caller that
/// drove dispatch; nothing is swallowed.
pub trait BookHandler {
    /// Full-state resynchronization. `book` is the complete state to adopt.
    fn on_book_recap(&mut self, sub: &Subscription, detail: &EventDetail, book: &SharedBook);

    /// A single atomic change was applied to `book`.
    fn on_book_delta(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        delta: &BasicDelta,
        book: &SharedBook,
    );

    /// Several atomic changes from one message were applied to `book`,
    /// in the order `delta` iterates them.
    fn on_book_complex_delta(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        delta: &ComplexDelta,
        book: &SharedBook,
    );

    /// The book was emptied. Views are empty until the next recap.
    fn on_book_clear(&mut self, sub: &Subscription, detail: &EventDetail, book: &SharedBook);

    /// Updates were missed; `book` may be stale until the next recap.
    fn on_book_gap(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        gap: GapRange,
        book: &SharedBook,
    );
}
