use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat message aligned to the stream timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Seconds from stream start.
    pub offset_secs: f64,
    pub username: String,
    pub body: String,
    /// Wall-clock send time, when the export carries one.
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse result for a whole chat log: messages that parsed, plus how many
/// records were skipped because their timestamp or body was garbled.
#[derive(Debug, Clone, Default)]
pub struct ParsedChat {
    pub messages: Vec<ChatMessage>,
    pub skipped: u32,
}

impl ParsedChat {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
