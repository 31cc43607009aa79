use tokio::sync::mpsc;
use tracing::debug;

use crate::core::State;

/// Receives state updates produced by the gateway
pub trait EventPublisher: Send + Sync {
    fn post_update(&self, item: &str, state: State);
}

/// A state update for one item
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub item: String,
    pub state: State,
}

/// Publishes updates onto an mpsc queue
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<StateUpdate>,
}

impl ChannelPublisher {
    /// Creates a publisher and the receiving end of its queue
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StateUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelPublisher { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn post_update(&self, item: &str, state: State) {
        let update = StateUpdate {
            item: item.to_string(),
            state,
        };
        if let Err(e) = self.tx.send(update) {
            debug!("Dropping update for item {}: event bus closed", e.0.item);
        }
    }
}
