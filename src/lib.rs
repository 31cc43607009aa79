//! UDP gateway: event bus commands to SBUS frames and ASCII datagrams
//!
//! This library translates "set item X to command Y" requests into wire
//! frames, sends them over UDP, optionally waits for a reply and turns replies
//! into typed state updates.
pub mod binding;
pub mod command;
pub mod core;
pub mod network;
pub mod protocol;
pub mod response;
mod util;

// Re-export commonly used items
pub use crate::binding::{CommandOutcome, UdpBinding};
pub use crate::core::{Command, Error, GatewayConfig, Result, State};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
