use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fmt;

const PREVIEW_LEN: usize = 32;

/// A message delivered by the broker on one of our subscriptions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub received_at: DateTime<Local>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        InboundMessage {
            topic: topic.into(),
            payload: payload.into(),
            received_at: Local::now(),
        }
    }

    /// Payload as text. Invalid UTF-8 sequences become U+FFFD.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = self.payload_text();
        let preview: String = text.chars().take(PREVIEW_LEN).collect();
        let ellipsis = if text.chars().count() > PREVIEW_LEN { "..." } else { "" };
        write!(
            f,
            "{} {}: {}{}",
            self.received_at.format("%H:%M:%S%.3f"),
            self.topic,
            preview,
            ellipsis
        )
    }
}
