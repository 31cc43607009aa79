use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A command published on the event bus for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Switch on
    On,
    /// Switch off
    Off,
    /// Relative step up (dimmers)
    Increase,
    /// Relative step down (dimmers)
    Decrease,
    /// Roller shutter up
    Up,
    /// Roller shutter down
    Down,
    /// Roller shutter stop
    Stop,
    /// Roller shutter move
    Move,
    /// Numeric command
    Decimal(f64),
    /// Any other command text
    Text(String),
}

impl Command {
    /// Returns the textual form used for rule matching and text payloads
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::On => f.write_str("ON"),
            Command::Off => f.write_str("OFF"),
            Command::Increase => f.write_str("INCREASE"),
            Command::Decrease => f.write_str("DECREASE"),
            Command::Up => f.write_str("UP"),
            Command::Down => f.write_str("DOWN"),
            Command::Stop => f.write_str("STOP"),
            Command::Move => f.write_str("MOVE"),
            Command::Decimal(value) => write!(f, "{}", value),
            Command::Text(text) => f.write_str(text),
        }
    }
}

impl FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ON" => Command::On,
            "OFF" => Command::Off,
            "INCREASE" => Command::Increase,
            "DECREASE" => Command::Decrease,
            "UP" => Command::Up,
            "DOWN" => Command::Down,
            "STOP" => Command::Stop,
            "MOVE" => Command::Move,
            other => match other.parse::<f64>() {
                Ok(value) if value.is_finite() => Command::Decimal(value),
                _ => Command::Text(other.to_string()),
            },
        })
    }
}

/// A typed item state published back to the event bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum State {
    On,
    Off,
    Open,
    Closed,
    Up,
    Down,
    /// Percentage in 0..=100
    Percent(u8),
    Decimal(f64),
    Text(String),
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::On => f.write_str("ON"),
            State::Off => f.write_str("OFF"),
            State::Open => f.write_str("OPEN"),
            State::Closed => f.write_str("CLOSED"),
            State::Up => f.write_str("UP"),
            State::Down => f.write_str("DOWN"),
            State::Percent(value) => write!(f, "{}", value),
            State::Decimal(value) => write!(f, "{}", value),
            State::Text(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_keywords() {
        assert_eq!("ON".parse::<Command>().unwrap(), Command::On);
        assert_eq!("DECREASE".parse::<Command>().unwrap(), Command::Decrease);
        assert_eq!(Command::Increase.as_text(), "INCREASE");
    }

    #[test]
    fn test_command_numbers_and_text() {
        assert_eq!("3".parse::<Command>().unwrap(), Command::Decimal(3.0));
        assert_eq!(Command::Decimal(3.0).as_text(), "3");
        assert_eq!(
            "on".parse::<Command>().unwrap(),
            Command::Text("on".to_string())
        );
        assert_eq!(
            "NaN".parse::<Command>().unwrap(),
            Command::Text("NaN".to_string())
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::Closed.to_string(), "CLOSED");
        assert_eq!(State::Percent(75).to_string(), "75");
        assert_eq!(State::Decimal(21.5).to_string(), "21.5");
    }
}
