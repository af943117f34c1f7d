//! Market-data order book engine with bounded-depth view filtering.
//!
//! Consumes a stream of incremental book messages, reconstructs a sorted
//! two-sided book of shared price levels, and emits recap/delta/clear/gap
//! events to registered handlers. A [`DepthFilter`] wraps a listener's
//! event stream and derives a top-N view of the full book, translating
//! full-book deltas into equivalent bounded-view deltas.

pub mod book;
pub mod config;
pub mod depth_filter;
pub mod error;
pub mod events;
pub mod listener;
pub mod models;

pub use book::{OrderBook, SharedBook, Side};
pub use depth_filter::DepthFilter;
pub use error::{FathomError, Result};
pub use events::{BasicDelta, BookHandler, ComplexDelta, EventDetail, GapRange, Subscription};
pub use listener::OrderBookListener;
