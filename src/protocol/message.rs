use serde::{Deserialize, Serialize};

use super::frame::FrameSpec;

/// What a resolved command puts on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutgoingPayload {
    /// Structured SBUS frame
    Frame(FrameSpec),
    /// Raw text, already wrapped in preamble and postamble
    Text(String),
}

impl OutgoingPayload {
    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingPayload::Frame(_) => "frame",
            OutgoingPayload::Text(_) => "text",
        }
    }
}

impl From<FrameSpec> for OutgoingPayload {
    fn from(spec: FrameSpec) -> Self {
        OutgoingPayload::Frame(spec)
    }
}
