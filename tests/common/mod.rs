//! Shared test utilities: message builders and a recording handler.
#![allow(dead_code)] // not every test binary uses every helper

use std::cell::RefCell;
use std::rc::Rc;

use rust_decimal::Decimal;

use fathom::book::entry::EntryAction;
use fathom::book::level::LevelAction;
use fathom::book::{SharedBook, Side};
use fathom::depth_filter::DepthFilter;
use fathom::events::{
    BasicDelta, BookHandler, ComplexDelta, EventDetail, GapRange, SharedHandler, Subscription,
};
use fathom::listener::OrderBookListener;
use fathom::models::book::{BookMessage, BookMsgKind, EntryUpdate, LevelUpdate};

/// Symbol used by every built message.
pub const SYMBOL: &str = "TEST/BOOK";

pub fn level(price: Decimal, side: Side, size: Decimal, action: LevelAction) -> LevelUpdate {
    LevelUpdate {
        price,
        side,
        size,
        size_change: None,
        action,
        entries: Vec::new(),
    }
}

pub fn level_with_entries(
    price: Decimal,
    side: Side,
    size: Decimal,
    action: LevelAction,
    entries: Vec<EntryUpdate>,
) -> LevelUpdate {
    LevelUpdate {
        price,
        side,
        size,
        size_change: None,
        action,
        entries,
    }
}

pub fn entry(id: &str, size: Decimal, action: EntryAction) -> EntryUpdate {
    EntryUpdate {
        id: id.to_string(),
        size,
        action,
    }
}

fn message(kind: BookMsgKind, seq_num: u64, levels: Vec<LevelUpdate>) -> BookMessage {
    BookMessage {
        symbol: SYMBOL.to_string(),
        part_id: None,
        kind,
        seq_num,
        src_time: None,
        line_time: None,
        event_time: None,
        send_time: None,
        msg_qualifier: None,
        levels,
    }
}

pub fn recap(seq_num: u64, levels: Vec<LevelUpdate>) -> BookMessage {
    message(BookMsgKind::Recap, seq_num, levels)
}

pub fn update(seq_num: u64, levels: Vec<LevelUpdate>) -> BookMessage {
    message(BookMsgKind::Update, seq_num, levels)
}

pub fn clear_msg(seq_num: u64) -> BookMessage {
    message(BookMsgKind::Clear, seq_num, Vec::new())
}

/// Flattened copy of one atomic change, captured at dispatch time.
#[derive(Debug, Clone)]
pub struct RecordedDelta {
    pub price: Decimal,
    pub side: Side,
    pub size_delta: Decimal,
    pub level_action: LevelAction,
    pub entry_action: EntryAction,
    pub entry_id: Option<String>,
}

impl RecordedDelta {
    fn from_basic(delta: &BasicDelta) -> Self {
        let (price, side) = {
            let level = delta.level().borrow();
            (level.price(), level.side())
        };
        Self {
            price,
            side,
            size_delta: delta.size_delta(),
            level_action: delta.level_action(),
            entry_action: delta.entry_action(),
            entry_id: delta.entry().map(|e| e.id().to_string()),
        }
    }
}

/// One event observed by the recording handler.
#[derive(Debug, Clone)]
pub enum RecordedEvent {
    Recap {
        bid_prices: Vec<Decimal>,
        ask_prices: Vec<Decimal>,
    },
    Delta(RecordedDelta),
    ComplexDelta(Vec<RecordedDelta>),
    Clear,
    Gap {
        begin: u64,
        end: u64,
    },
}

/// Handler that records every event it receives, for later assertions.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<RecordedEvent>,
}

impl Recorder {
    pub fn shared() -> Rc<RefCell<Recorder>> {
        Rc::new(RefCell::new(Recorder::default()))
    }
}

/// Registers a fresh recorder on a listener and returns it.
pub fn attach_recorder(listener: &mut OrderBookListener) -> Rc<RefCell<Recorder>> {
    let rec = Recorder::shared();
    listener.add_handler(Rc::clone(&rec) as SharedHandler);
    rec
}

/// Registers a fresh recorder on a depth filter and returns it.
pub fn attach_filter_recorder(filter: &Rc<RefCell<DepthFilter>>) -> Rc<RefCell<Recorder>> {
    let rec = Recorder::shared();
    filter
        .borrow_mut()
        .add_handler(Rc::clone(&rec) as SharedHandler);
    rec
}

impl BookHandler for Recorder {
    fn on_book_recap(&mut self, _sub: &Subscription, _detail: &EventDetail, book: &SharedBook) {
        let book = book.borrow();
        self.events.push(RecordedEvent::Recap {
            bid_prices: book
                .side_levels(Side::Bid)
                .map(|l| l.borrow().price())
                .collect(),
            ask_prices: book
                .side_levels(Side::Ask)
                .map(|l| l.borrow().price())
                .collect(),
        });
    }

    fn on_book_delta(
        &mut self,
        _sub: &Subscription,
        _detail: &EventDetail,
        delta: &BasicDelta,
        _book: &SharedBook,
    ) {
        self.events
            .push(RecordedEvent::Delta(RecordedDelta::from_basic(delta)));
    }

    fn on_book_complex_delta(
        &mut self,
        _sub: &Subscription,
        _detail: &EventDetail,
        delta: &ComplexDelta,
        _book: &SharedBook,
    ) {
        self.events.push(RecordedEvent::ComplexDelta(
            delta.iter().map(RecordedDelta::from_basic).collect(),
        ));
    }

    fn on_book_clear(&mut self, _sub: &Subscription, _detail: &EventDetail, _book: &SharedBook) {
        self.events.push(RecordedEvent::Clear);
    }

    fn on_book_gap(
        &mut self,
        _sub: &Subscription,
        _detail: &EventDetail,
        gap: GapRange,
        _book: &SharedBook,
    ) {
        self.events.push(RecordedEvent::Gap {
            begin: gap.begin,
            end: gap.end,
        });
    }
}
