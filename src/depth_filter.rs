//! Bounded-depth ("top-N") views of a full order book.
//!
//! A [`DepthFilter`] registers as a handler on a parent
//! [`OrderBookListener`], mirrors the top `max_depth` levels per side into
//! a truncated book of shared level references, and re-emits equivalent
//! recap/delta/clear/gap events scoped to that view. Changes beyond the
//! visible window are absorbed; levels leaving the window produce eviction
//! deltas and levels entering it produce promotion deltas, so downstream
//! handlers always see a self-consistent top-N book.

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use crate::book::entry::{Entry, EntryAction};
use crate::book::level::{LevelAction, SharedLevel};
use crate::book::{OrderBook, SharedBook, Side};
use crate::error::FathomError;
use crate::events::{
    BasicDelta, BookHandler, ComplexDelta, EventDetail, GapRange, SharedHandler, Subscription,
};
use crate::listener::OrderBookListener;

/// Visible-window state for one side of the truncated book.
#[derive(Debug, Default)]
struct SideState {
    /// Number of visible levels, at most `max_depth`.
    depth: usize,
    /// Price of the worst visible level; `None` while the side is empty.
    boundary: Option<Decimal>,
}

/// Derives a top-N view of a full order book from its event stream.
///
/// The truncated book holds references to the same [`PriceLevel`] objects
/// as the full book; it never owns them, so clearing or evicting only
/// drops references. Like the listener, a filter is driven by a single
/// delivery thread.
///
/// [`PriceLevel`]: crate::book::level::PriceLevel
pub struct DepthFilter {
    truncated: SharedBook,
    full_book: Option<SharedBook>,
    handlers: Vec<SharedHandler>,
    pending: Vec<BasicDelta>,
    max_depth: usize,
    process_entries: bool,
    bid: SideState,
    ask: SideState,
}

impl std::fmt::Debug for DepthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthFilter")
            .field("max_depth", &self.max_depth)
            .field("process_entries", &self.process_entries)
            .field("bid", &self.bid)
            .field("ask", &self.ask)
            .field("pending_len", &self.pending.len())
            .field("handlers_len", &self.handlers.len())
            .field("has_full_book", &self.full_book.is_some())
            .finish()
    }
}

impl DepthFilter {
    /// Creates a filter keeping `max_depth` levels per side.
    ///
    /// # Errors
    ///
    /// Returns [`FathomError::Config`] when `max_depth` is zero.
    pub fn new(max_depth: usize, process_entries: bool) -> crate::Result<Self> {
        if max_depth == 0 {
            return Err(FathomError::Config(
                "depth filter requires a positive max depth".to_string(),
            ));
        }
        Ok(Self {
            truncated: OrderBook::new().shared(),
            full_book: None,
            handlers: Vec::new(),
            pending: Vec::new(),
            max_depth,
            process_entries,
            bid: SideState::default(),
            ask: SideState::default(),
        })
    }

    /// Creates a filter inheriting the parent's entry-processing mode and
    /// registers it as one of the parent's handlers.
    ///
    /// # Errors
    ///
    /// Returns [`FathomError::Config`] when `max_depth` is zero.
    pub fn attach(
        parent: &mut OrderBookListener,
        max_depth: usize,
    ) -> crate::Result<Rc<RefCell<DepthFilter>>> {
        let filter = Rc::new(RefCell::new(Self::new(
            max_depth,
            parent.process_entries(),
        )?));
        parent.add_handler(Rc::clone(&filter) as SharedHandler);
        Ok(filter)
    }

    /// Registers a handler for the truncated view's events.
    pub fn add_handler(&mut self, handler: SharedHandler) {
        self.handlers.push(handler);
    }

    pub fn remove_handlers(&mut self) {
        self.handlers.clear();
    }

    /// The truncated (top-N) book.
    pub fn book(&self) -> SharedBook {
        Rc::clone(&self.truncated)
    }

    /// The full book, once the first recap has been seen.
    pub fn full_book(&self) -> Option<SharedBook> {
        self.full_book.clone()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of visible levels on a side.
    pub fn depth(&self, side: Side) -> usize {
        self.state(side).depth
    }

    /// Price of the worst visible level on a side.
    pub fn boundary(&self, side: Side) -> Option<Decimal> {
        self.state(side).boundary
    }

    fn state(&self, side: Side) -> &SideState {
        match side {
            Side::Bid => &self.bid,
            Side::Ask => &self.ask,
        }
    }

    fn state_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::Bid => &mut self.bid,
            Side::Ask => &mut self.ask,
        }
    }

    /// `true` when `price` is further from the top of the book than
    /// `boundary` on the given side.
    fn worse(side: Side, price: Decimal, boundary: Decimal) -> bool {
        match side {
            Side::Bid => price < boundary,
            Side::Ask => price > boundary,
        }
    }

    /// Repopulates the truncated book from the full book, top `max_depth`
    /// levels a side, and resets the per-side window state.
    fn rebuild(&mut self, book: &SharedBook) {
        let mut trunc = self.truncated.borrow_mut();
        trunc.clear();
        let full = book.borrow();
        for side in [Side::Bid, Side::Ask] {
            let mut depth = 0;
            let mut boundary = None;
            for level in full.side_levels(side).take(self.max_depth) {
                boundary = Some(level.borrow().price());
                trunc.add_level(level);
                depth += 1;
            }
            let state = match side {
                Side::Bid => &mut self.bid,
                Side::Ask => &mut self.ask,
            };
            state.depth = depth;
            state.boundary = boundary;
        }
    }

    fn process_delta(&mut self, event: &BasicDelta, full: &SharedBook) {
        let (side, delta_price) = {
            let level = event.level().borrow();
            (level.side(), level.price())
        };

        // Beyond the visible window while the window is full: irrelevant
        // to the view, absorb silently.
        let state = self.state(side);
        if state.depth == self.max_depth {
            if let Some(boundary) = state.boundary {
                if Self::worse(side, delta_price, boundary) {
                    return;
                }
            }
        }

        match event.level_action() {
            LevelAction::Update => self.push_event_delta(event),
            LevelAction::Add => self.apply_add(event, side, delta_price),
            LevelAction::Delete => self.apply_delete(event, side, full),
            LevelAction::Unknown => {}
        }
    }

    fn apply_add(&mut self, event: &BasicDelta, side: Side, delta_price: Decimal) {
        self.truncated
            .borrow_mut()
            .add_level(Rc::clone(event.level()));

        if self.state(side).depth == self.max_depth {
            self.push_event_delta(event);

            // The window is now over-full by one: the worst visible level
            // leaves the view.
            let (evicted, new_boundary) = {
                let trunc = self.truncated.borrow();
                let visible = trunc.depth(side);
                assert!(
                    visible > self.max_depth,
                    "depth view out of sync with full book on {side:?} side"
                );
                let evicted = trunc
                    .level_at_position(side, visible - 1)
                    .expect("depth view lost its boundary level");
                let boundary_level = trunc
                    .level_at_position(side, visible - 2)
                    .expect("depth view lost its boundary level");
                (evicted, boundary_level.borrow().price())
            };
            self.state_mut(side).boundary = Some(new_boundary);
            let evicted_size = evicted.borrow().size();
            self.push_delta(
                None,
                Rc::clone(&evicted),
                evicted_size,
                LevelAction::Delete,
                EntryAction::Unknown,
            );
            self.truncated.borrow_mut().delete_level(&evicted);
        } else {
            let state = self.state_mut(side);
            let new_worst = match state.boundary {
                Some(boundary) => Self::worse(side, delta_price, boundary),
                None => true,
            };
            if new_worst {
                state.boundary = Some(delta_price);
            }
            state.depth += 1;
            self.push_event_delta(event);
        }
    }

    fn apply_delete(&mut self, event: &BasicDelta, side: Side, full: &SharedBook) {
        self.truncated.borrow_mut().delete_level(event.level());
        self.push_event_delta(event);

        // The level just below the old window, which should now enter
        // view. None when the full book has gone shallower than the view;
        // that is a normal outcome.
        let depth = self.state(side).depth;
        let promoted = depth
            .checked_sub(1)
            .and_then(|pos| full.borrow().level_at_position(side, pos));

        match promoted {
            Some(level) => {
                self.truncated.borrow_mut().add_level(Rc::clone(&level));
                self.push_promotion_deltas(&level);
                let price = level.borrow().price();
                self.state_mut(side).boundary = Some(price);
            }
            None => {
                let new_depth = depth.saturating_sub(1);
                let boundary = new_depth
                    .checked_sub(1)
                    .and_then(|pos| self.truncated.borrow().level_at_position(side, pos))
                    .map(|level| level.borrow().price());
                let state = self.state_mut(side);
                state.depth = new_depth;
                state.boundary = boundary;
            }
        }
    }

    /// Synthesizes the deltas announcing a promoted level: per entry in
    /// arrival order when entry processing is on (an add for the first,
    /// updates for the rest), otherwise one add carrying the full size.
    fn push_promotion_deltas(&mut self, level: &SharedLevel) {
        if !self.process_entries {
            let size = level.borrow().size();
            self.push_delta(
                None,
                Rc::clone(level),
                size,
                LevelAction::Add,
                EntryAction::Unknown,
            );
            return;
        }
        let entries: Vec<Entry> = level.borrow().entries().to_vec();
        for (i, entry) in entries.into_iter().enumerate() {
            let action = if i == 0 {
                LevelAction::Add
            } else {
                LevelAction::Update
            };
            let size = entry.size();
            self.push_delta(Some(entry), Rc::clone(level), size, action, EntryAction::Add);
        }
    }

    /// Contributes a delta received from the parent, stripped of entry
    /// detail when this filter runs level-aggregate only.
    fn push_event_delta(&mut self, event: &BasicDelta) {
        if self.process_entries {
            self.pending.push(event.clone());
        } else {
            self.push_delta(
                None,
                Rc::clone(event.level()),
                event.size_delta(),
                event.level_action(),
                EntryAction::Unknown,
            );
        }
    }

    fn push_delta(
        &mut self,
        entry: Option<Entry>,
        level: SharedLevel,
        size_delta: Decimal,
        level_action: LevelAction,
        entry_action: EntryAction,
    ) {
        self.pending
            .push(BasicDelta::new(entry, level, size_delta, level_action, entry_action));
    }

    /// Emits the accumulated deltas for one inbound message: nothing when
    /// every change fell outside the view, a simple delta for one change,
    /// a complex delta for several.
    fn emit_pending(&mut self, sub: &Subscription, detail: &EventDetail) {
        if self.pending.is_empty() {
            return;
        }
        if self.pending.len() == 1 {
            let delta = self.pending.remove(0);
            for handler in &self.handlers {
                handler
                    .borrow_mut()
                    .on_book_delta(sub, detail, &delta, &self.truncated);
            }
        } else {
            let complex = ComplexDelta::from(std::mem::take(&mut self.pending));
            for handler in &self.handlers {
                handler
                    .borrow_mut()
                    .on_book_complex_delta(sub, detail, &complex, &self.truncated);
            }
        }
        self.pending.clear();
    }
}

impl BookHandler for DepthFilter {
    fn on_book_recap(&mut self, sub: &Subscription, detail: &EventDetail, book: &SharedBook) {
        if self.full_book.is_none() {
            self.full_book = Some(Rc::clone(book));
        }
        self.rebuild(book);
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_recap(sub, detail, &self.truncated);
        }
    }

    fn on_book_delta(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        delta: &BasicDelta,
        book: &SharedBook,
    ) {
        self.process_delta(delta, book);
        self.emit_pending(sub, detail);
    }

    fn on_book_complex_delta(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        delta: &ComplexDelta,
        book: &SharedBook,
    ) {
        for basic in delta {
            self.process_delta(basic, book);
        }
        self.emit_pending(sub, detail);
    }

    fn on_book_clear(&mut self, sub: &Subscription, detail: &EventDetail, _book: &SharedBook) {
        self.truncated.borrow_mut().clear();
        self.bid = SideState::default();
        self.ask = SideState::default();
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_clear(sub, detail, &self.truncated);
        }
    }

    fn on_book_gap(
        &mut self,
        sub: &Subscription,
        detail: &EventDetail,
        gap: GapRange,
        _book: &SharedBook,
    ) {
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_gap(sub, detail, gap, &self.truncated);
        }
    }
}
