use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::core::{Command, Result};
use crate::response::{StateKind, TransformSpec};

/// Command key matching any command of an item
pub const ANY_COMMAND: &str = "*";

/// Per-item binding configuration consulted by the gateway
pub trait BindingProvider: Send + Sync {
    /// Transformation for the item's protocol command, used both to build text
    /// payloads and to rewrite replies
    fn protocol_command(&self, item: &str, command: &Command) -> Option<TransformSpec>;

    /// State kinds the item accepts, in order of preference
    fn accepted_kinds(&self, item: &str, command: &Command) -> Vec<StateKind>;
}

#[derive(Debug, Default, Clone)]
struct ItemBinding {
    commands: HashMap<String, TransformSpec>,
    kinds: Vec<StateKind>,
}

/// In-memory binding configuration
#[derive(Debug, Default)]
pub struct ItemBindings {
    items: RwLock<HashMap<String, ItemBinding>>,
}

impl ItemBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a command of an item to a `kind(pattern)` transformation
    ///
    /// `command` is the exact command text or [`ANY_COMMAND`]. A malformed
    /// transformation is rejected here, before anything is sent.
    pub fn bind(&self, item: &str, command: &str, transformation: &str) -> Result<()> {
        let spec: TransformSpec = transformation.parse()?;
        debug!("Binding command {} of item {} to {}", command, item, spec);
        self.items
            .write()
            .entry(item.to_string())
            .or_default()
            .commands
            .insert(command.to_string(), spec);
        Ok(())
    }

    /// Sets the state kinds an item accepts
    pub fn accept(&self, item: &str, kinds: impl Into<Vec<StateKind>>) {
        self.items.write().entry(item.to_string()).or_default().kinds = kinds.into();
    }

    /// Whether anything is configured for the item
    pub fn contains(&self, item: &str) -> bool {
        self.items.read().contains_key(item)
    }
}

impl BindingProvider for ItemBindings {
    fn protocol_command(&self, item: &str, command: &Command) -> Option<TransformSpec> {
        let items = self.items.read();
        let binding = items.get(item)?;
        binding
            .commands
            .get(&command.as_text())
            .or_else(|| binding.commands.get(ANY_COMMAND))
            .cloned()
    }

    fn accepted_kinds(&self, item: &str, _command: &Command) -> Vec<StateKind> {
        self.items
            .read()
            .get(item)
            .map(|binding| binding.kinds.clone())
            .unwrap_or_default()
    }
}
