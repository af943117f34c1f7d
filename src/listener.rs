//! Full-book maintenance driven by inbound book messages.
//!
//! [`OrderBookListener`] consumes [`BookMessage`]s in sequence, keeps the
//! full book current, and emits one event per message to its registered
//! handlers: a recap, a delta (simple or complex), a clear, or a gap.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::book::entry::{Entry, EntryAction};
use crate::book::level::{LevelAction, PriceLevel, SharedLevel};
use crate::book::{OrderBook, SharedBook};
use crate::config::BookConfig;
use crate::events::{
    BasicDelta, ComplexDelta, EventDetail, GapRange, SharedHandler, Subscription,
};
use crate::models::book::{BookMessage, BookMsgKind, LevelUpdate};

/// Consumes inbound book messages and maintains the full order book.
///
/// Not internally thread-safe: a listener is driven by exactly one delivery
/// thread, and handlers run on that thread inside `process_message`.
pub struct OrderBookListener {
    subscription: Subscription,
    book: SharedBook,
    handlers: Vec<SharedHandler>,
    detail: EventDetail,
    pending: Vec<BasicDelta>,
    event_seq_num: u64,
    gap_begin: u64,
    gap_end: u64,
    process_entries: bool,
}

impl OrderBookListener {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            book: OrderBook::new().shared(),
            handlers: Vec::new(),
            detail: EventDetail::default(),
            pending: Vec::new(),
            event_seq_num: 0,
            gap_begin: 0,
            gap_end: 0,
            process_entries: true,
        }
    }

    pub fn with_config(subscription: Subscription, config: &BookConfig) -> Self {
        let mut listener = Self::new(subscription);
        listener.process_entries = config.process_entries;
        listener
    }

    /// Registers a handler; events are delivered in registration order.
    pub fn add_handler(&mut self, handler: SharedHandler) {
        self.handlers.push(handler);
    }

    pub fn remove_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Whether individual entries within a level are tracked. When off,
    /// deltas carry only level-aggregate changes.
    pub fn process_entries(&self) -> bool {
        self.process_entries
    }

    pub fn set_process_entries(&mut self, process: bool) {
        self.process_entries = process;
    }

    /// The full book this listener maintains.
    pub fn book(&self) -> SharedBook {
        Rc::clone(&self.book)
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn symbol(&self) -> &str {
        &self.detail.symbol
    }

    pub fn part_id(&self) -> Option<&str> {
        self.detail.part_id.as_deref()
    }

    pub fn event_seq_num(&self) -> u64 {
        self.event_seq_num
    }

    pub fn src_time(&self) -> Option<&str> {
        self.detail.src_time.as_deref()
    }

    pub fn line_time(&self) -> Option<&str> {
        self.detail.line_time.as_deref()
    }

    pub fn event_time(&self) -> Option<&str> {
        self.detail.event_time.as_deref()
    }

    pub fn send_time(&self) -> Option<&str> {
        self.detail.send_time.as_deref()
    }

    pub fn msg_qualifier(&self) -> Option<u16> {
        self.detail.msg_qualifier
    }

    /// First sequence number of the most recently detected gap.
    pub fn begin_gap_seq_num(&self) -> u64 {
        self.gap_begin
    }

    /// Last sequence number of the most recently detected gap.
    pub fn end_gap_seq_num(&self) -> u64 {
        self.gap_end
    }

    /// Applies one inbound message and dispatches the resulting event.
    ///
    /// Recaps rebuild the book and emit a recap event. Updates are checked
    /// against the expected sequence number (duplicates are dropped, gaps
    /// emit a gap event first), then applied; zero net changes emit
    /// nothing, one change emits a delta, several a complex delta.
    pub fn process_message(&mut self, msg: &BookMessage) {
        self.update_detail(msg);
        match msg.kind {
            BookMsgKind::Recap => {
                self.pending.clear();
                self.book.borrow_mut().clear();
                self.event_seq_num = msg.seq_num;
                for lu in &msg.levels {
                    self.apply_level_update(lu, true);
                }
                self.invoke_recap_handlers();
            }
            BookMsgKind::Clear => {
                self.pending.clear();
                self.book.borrow_mut().clear();
                self.event_seq_num = msg.seq_num;
                self.invoke_clear_handlers();
            }
            BookMsgKind::Update => {
                if !self.check_seq_num(msg.seq_num) {
                    return;
                }
                for lu in &msg.levels {
                    self.apply_level_update(lu, false);
                }
                self.invoke_delta_handlers();
            }
        }
    }

    fn update_detail(&mut self, msg: &BookMessage) {
        self.detail = EventDetail {
            symbol: msg.symbol.clone(),
            part_id: msg.part_id.clone(),
            seq_num: msg.seq_num,
            src_time: msg.src_time.clone(),
            line_time: msg.line_time.clone(),
            event_time: msg.event_time.clone(),
            send_time: msg.send_time.clone(),
            msg_qualifier: msg.msg_qualifier,
        };
    }

    /// Returns `false` when the update is a duplicate and must be dropped.
    /// A non-contiguous sequence number emits a gap event, then the update
    /// is still applied.
    fn check_seq_num(&mut self, seq: u64) -> bool {
        if seq == self.event_seq_num {
            debug!(seq, symbol = %self.detail.symbol, "ignoring duplicate book update");
            return false;
        }
        if seq != 0 && seq != self.event_seq_num + 1 {
            self.gap_begin = self.event_seq_num + 1;
            self.gap_end = seq.saturating_sub(1);
            self.event_seq_num = seq;
            warn!(begin = self.gap_begin, end = self.gap_end,
                symbol = %self.detail.symbol, "sequence gap detected");
            self.invoke_gap_handlers();
        }
        self.event_seq_num = seq;
        true
    }

    fn apply_level_update(&mut self, lu: &LevelUpdate, is_recap: bool) {
        if lu.action == LevelAction::Delete {
            self.delete_level(lu, is_recap);
            return;
        }
        let existing = self.book.borrow().level_at_price(lu.side, lu.price);
        match existing {
            Some(level) => self.update_existing_level(&level, lu, is_recap),
            None => self.insert_new_level(lu, is_recap),
        }
    }

    fn delete_level(&mut self, lu: &LevelUpdate, is_recap: bool) {
        let existing = self.book.borrow().level_at_price(lu.side, lu.price);
        let Some(level) = existing else {
            debug!(price = %lu.price, side = ?lu.side, "delete for unknown price level");
            return;
        };
        let old_size = level.borrow().size();
        level.borrow_mut().set_action(LevelAction::Delete);
        self.book.borrow_mut().delete_level(&level);
        if !is_recap {
            let size_delta = lu.size_change.unwrap_or(-old_size);
            self.pending.push(BasicDelta::new(
                None,
                level,
                size_delta,
                LevelAction::Delete,
                EntryAction::Unknown,
            ));
        }
    }

    fn insert_new_level(&mut self, lu: &LevelUpdate, is_recap: bool) {
        if lu.action != LevelAction::Add {
            debug!(price = %lu.price, side = ?lu.side,
                "update for unknown price level, adding");
        }
        let mut level = PriceLevel::new(lu.price, lu.side);
        if self.process_entries {
            for eu in &lu.entries {
                if eu.action == EntryAction::Delete {
                    continue;
                }
                level.add_entry(Entry::new(eu.id.as_str(), eu.size, EntryAction::Add));
            }
        }
        level.set_size(lu.size);
        let shared = level.shared();
        self.book.borrow_mut().add_level(Rc::clone(&shared));
        if is_recap {
            return;
        }

        let entries: Vec<Entry> = shared.borrow().entries().to_vec();
        if self.process_entries && !entries.is_empty() {
            // First entry carries the level add, the rest arrive as updates.
            for (i, entry) in entries.into_iter().enumerate() {
                let action = if i == 0 {
                    LevelAction::Add
                } else {
                    LevelAction::Update
                };
                let size = entry.size();
                self.pending.push(BasicDelta::new(
                    Some(entry),
                    Rc::clone(&shared),
                    size,
                    action,
                    EntryAction::Add,
                ));
            }
        } else {
            let size_delta = lu.size_change.unwrap_or(lu.size);
            self.pending.push(BasicDelta::new(
                None,
                shared,
                size_delta,
                LevelAction::Add,
                EntryAction::Unknown,
            ));
        }
    }

    fn update_existing_level(&mut self, level: &SharedLevel, lu: &LevelUpdate, is_recap: bool) {
        if lu.action == LevelAction::Add {
            debug!(price = %lu.price, side = ?lu.side,
                "add for a price already in book, updating");
        }
        let old_size = level.borrow().size();

        // (entry, entry action, contribution to the level's size change)
        let mut entry_deltas: Vec<(Entry, EntryAction, rust_decimal::Decimal)> = Vec::new();
        if self.process_entries {
            let mut l = level.borrow_mut();
            for eu in &lu.entries {
                match eu.action {
                    EntryAction::Add => {
                        let entry = Entry::new(eu.id.as_str(), eu.size, EntryAction::Add);
                        l.add_entry(entry.clone());
                        entry_deltas.push((entry, EntryAction::Add, eu.size));
                    }
                    EntryAction::Update => {
                        let prev = l.find_entry(&eu.id).map(|e| e.size());
                        match prev {
                            Some(prev_size) => {
                                l.update_entry(&eu.id, eu.size);
                                let entry =
                                    Entry::new(eu.id.as_str(), eu.size, EntryAction::Update);
                                entry_deltas.push((
                                    entry,
                                    EntryAction::Update,
                                    eu.size - prev_size,
                                ));
                            }
                            None => {
                                // Tolerate an update for an entry never seen.
                                let entry = Entry::new(eu.id.as_str(), eu.size, EntryAction::Add);
                                l.add_entry(entry.clone());
                                entry_deltas.push((entry, EntryAction::Add, eu.size));
                            }
                        }
                    }
                    EntryAction::Delete => {
                        if let Some(entry) = l.remove_entry(&eu.id) {
                            let size = entry.size();
                            entry_deltas.push((entry, EntryAction::Delete, -size));
                        }
                    }
                    EntryAction::Unknown => {}
                }
            }
        }

        {
            let mut l = level.borrow_mut();
            l.set_size(lu.size);
            l.set_action(LevelAction::Update);
        }
        if is_recap {
            return;
        }

        if !entry_deltas.is_empty() {
            for (entry, entry_action, size_delta) in entry_deltas {
                self.pending.push(BasicDelta::new(
                    Some(entry),
                    Rc::clone(level),
                    size_delta,
                    LevelAction::Update,
                    entry_action,
                ));
            }
        } else {
            let size_delta = lu.size_change.unwrap_or(lu.size - old_size);
            self.pending.push(BasicDelta::new(
                None,
                Rc::clone(level),
                size_delta,
                LevelAction::Update,
                EntryAction::Unknown,
            ));
        }
    }

    fn invoke_recap_handlers(&mut self) {
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_recap(&self.subscription, &self.detail, &self.book);
        }
    }

    fn invoke_clear_handlers(&mut self) {
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_clear(&self.subscription, &self.detail, &self.book);
        }
    }

    fn invoke_gap_handlers(&mut self) {
        let gap = GapRange {
            begin: self.gap_begin,
            end: self.gap_end,
        };
        for handler in &self.handlers {
            handler
                .borrow_mut()
                .on_book_gap(&self.subscription, &self.detail, gap, &self.book);
        }
    }

    fn invoke_delta_handlers(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        if self.pending.len() == 1 {
            let delta = self.pending.remove(0);
            for handler in &self.handlers {
                handler.borrow_mut().on_book_delta(
                    &self.subscription,
                    &self.detail,
                    &delta,
                    &self.book,
                );
            }
        } else {
            let complex = ComplexDelta::from(std::mem::take(&mut self.pending));
            for handler in &self.handlers {
                handler.borrow_mut().on_book_complex_delta(
                    &self.subscription,
                    &self.detail,
                    &complex,
                    &self.book,
                );
            }
        }
        self.pending.clear();
    }
}
