//! Core types for the UDP gateway
//!
//! This module contains the building blocks shared by the codec, the
//! transport and the response pipeline.

pub mod config;
pub mod error;
pub mod serde;
pub mod types;

pub use self::config::{ConfigHandle, GatewayConfig};
pub use self::error::{Error, Result};
pub use self::types::{Command, State};

/// Largest datagram the gateway will read
pub const MAX_DATAGRAM_SIZE: usize = 65507;
