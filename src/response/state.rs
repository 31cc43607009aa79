use serde::{Deserialize, Serialize};

use crate::core::State;

/// A typed representation an item accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    OnOff,
    OpenClosed,
    UpDown,
    Percent,
    Decimal,
    String,
}

impl StateKind {
    /// Parses text into a state of this kind
    ///
    /// Keyword and numeric kinds ignore surrounding whitespace; `String`
    /// takes the text verbatim and never fails.
    pub fn parse(&self, text: &str) -> Option<State> {
        let trimmed = text.trim();
        match self {
            StateKind::OnOff => match trimmed {
                "ON" => Some(State::On),
                "OFF" => Some(State::Off),
                _ => None,
            },
            StateKind::OpenClosed => match trimmed {
                "OPEN" => Some(State::Open),
                "CLOSED" => Some(State::Closed),
                _ => None,
            },
            StateKind::UpDown => match trimmed {
                "UP" => Some(State::Up),
                "DOWN" => Some(State::Down),
                _ => None,
            },
            StateKind::Percent => trimmed
                .parse::<u8>()
                .ok()
                .filter(|value| *value <= 100)
                .map(State::Percent),
            StateKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(State::Decimal),
            StateKind::String => Some(State::Text(text.to_string())),
        }
    }
}

/// Returns the state from the first kind that accepts the text
pub fn map_state(kinds: &[StateKind], text: &str) -> Option<State> {
    kinds.iter().find_map(|kind| kind.parse(text))
}
