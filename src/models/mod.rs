//! Inbound message models consumed by the listener.
//!
//! The engine is transport-agnostic: whatever carries the feed, updates are
//! handed to the listener as the typed messages defined here.

pub mod book;
