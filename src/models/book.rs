//! Order book message models.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::book::Side;
use crate::book::entry::EntryAction;
use crate::book::level::LevelAction;
use crate::error::FathomError;

/// Kind of inbound book message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookMsgKind {
    /// Full-state snapshot replacing the book.
    Recap,
    /// Incremental update carrying one or more level changes.
    Update,
    /// The book should be emptied.
    Clear,
}

/// An inbound order book message.
///
/// Carries identity and timing fields that pass through to handlers
/// unchanged, plus the level changes to apply. Timestamps keep the wire's
/// string form; the engine never parses them.
#[derive(Debug, Clone, Deserialize)]
pub struct BookMessage {
    pub symbol: String,
    #[serde(default)]
    pub part_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: BookMsgKind,
    pub seq_num: u64,
    #[serde(default)]
    pub src_time: Option<String>,
    #[serde(default)]
    pub line_time: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub send_time: Option<String>,
    #[serde(default)]
    pub msg_qualifier: Option<u16>,
    #[serde(default)]
    pub levels: Vec<LevelUpdate>,
}

impl BookMessage {
    /// Parses a message from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`FathomError::MalformedMessage`] when the payload is not a
    /// structurally valid book message.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text).map_err(|e| FathomError::MalformedMessage(e.to_string()))
    }
}

/// One price-level change within a book message.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelUpdate {
    pub price: Decimal,
    pub side: Side,
    /// Aggregate size at this price after the change.
    pub size: Decimal,
    /// Signed change in aggregate size, when the feed supplies it.
    #[serde(default)]
    pub size_change: Option<Decimal>,
    pub action: LevelAction,
    #[serde(default)]
    pub entries: Vec<EntryUpdate>,
}

/// One entry change within a price-level update.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryUpdate {
    pub id: String,
    pub size: Decimal,
    pub action: EntryAction,
}
