//! Runtime configuration
//!
//! A [`GatewayConfig`] is an immutable snapshot. [`ConfigHandle`] holds the
//! current snapshot and swaps it wholesale on every configuration update, so
//! an operation that grabbed a snapshot keeps seeing the same values until it
//! finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::util::{non_blank, parse_flag, unescape};

/// Option carrying the reply timeout in milliseconds
pub const OPTION_TIMEOUT: &str = "buffersize";
/// Option carrying the blocking flag
pub const OPTION_BLOCKING: &str = "retryinterval";
pub const OPTION_PREAMBLE: &str = "preamble";
pub const OPTION_POSTAMBLE: &str = "postamble";
pub const OPTION_UPDATE_WITH_RESPONSE: &str = "updatewithresponse";
pub const OPTION_CHARSET: &str = "charset";

/// Settings read by every outbound command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Time to wait for a reply in blocking mode
    #[serde(serialize_with = "super::serde::serialize_millis")]
    #[serde(deserialize_with = "super::serde::deserialize_millis")]
    pub timeout: Duration,
    /// Wait for a reply after every write
    pub blocking: bool,
    /// Text prepended to text payloads
    pub preamble: String,
    /// Text appended to text payloads
    pub postamble: String,
    /// Publish the decoded reply as the item's new state
    pub update_with_response: bool,
    /// Character set for text payloads and replies
    pub charset: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            timeout: Duration::from_millis(3000),
            blocking: false,
            preamble: String::new(),
            postamble: "\r\n".to_string(),
            update_with_response: true,
            charset: "ASCII".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Builds the next snapshot from this one and a set of textual options
    ///
    /// Blank or unparsable values keep the current value.
    pub fn with_options(&self, options: &HashMap<String, String>) -> GatewayConfig {
        let mut next = self.clone();
        let get = |key: &str| non_blank(options.get(key).map(String::as_str));

        match get(OPTION_TIMEOUT).map(|v| (v, v.trim().parse::<u64>())) {
            Some((_, Ok(millis))) => next.timeout = Duration::from_millis(millis),
            Some((raw, Err(e))) => warn!(
                "Ignoring invalid {} '{}' ({}), keeping {}ms",
                OPTION_TIMEOUT,
                raw,
                e,
                next.timeout.as_millis()
            ),
            None => info!(
                "The maximum time out for blocking write operations will be set to the default value of {}ms",
                next.timeout.as_millis()
            ),
        }

        match get(OPTION_BLOCKING) {
            Some(v) => next.blocking = parse_flag(v),
            None => info!(
                "The blocking nature of read/write operations will be set to the default value of {}",
                next.blocking
            ),
        }

        match get(OPTION_PREAMBLE) {
            Some(v) => next.preamble = unescape(v),
            None => info!(
                "The preamble for all write operations will be set to the default value of {:?}",
                next.preamble
            ),
        }

        match get(OPTION_POSTAMBLE) {
            Some(v) => next.postamble = unescape(v),
            None => info!(
                "The postamble for all write operations will be set to the default value of {:?}",
                next.postamble
            ),
        }

        match get(OPTION_UPDATE_WITH_RESPONSE) {
            Some(v) => next.update_with_response = parse_flag(v),
            None => info!(
                "Updating states with returned values will be set to the default value of {}",
                next.update_with_response
            ),
        }

        match get(OPTION_CHARSET) {
            Some(v) => next.charset = v.trim().to_string(),
            None => info!(
                "The character set will be set to the default value of {}",
                next.charset
            ),
        }

        next
    }
}

/// Shared handle to the current configuration snapshot
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    current: Arc<RwLock<Arc<GatewayConfig>>>,
}

impl ConfigHandle {
    /// Creates a handle holding the given snapshot
    pub fn new(config: GatewayConfig) -> Self {
        ConfigHandle {
            current: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Returns the current snapshot
    pub fn snapshot(&self) -> Arc<GatewayConfig> {
        Arc::clone(&*self.current.read())
    }

    /// Replaces the current snapshot
    pub fn replace(&self, config: GatewayConfig) {
        *self.current.write() = Arc::new(config);
    }

    /// Applies a configuration update event and returns the new snapshot
    pub fn apply(&self, options: &HashMap<String, String>) -> Arc<GatewayConfig> {
        let mut current = self.current.write();
        let next = Arc::new(current.with_options(options));
        *current = Arc::clone(&next);
        next
    }
}
