use tracing::debug;

use super::dimmer::DimmerLevels;
use super::rule::{RuleEncoding, RuleTable};
use crate::core::{Command, Error, GatewayConfig, Result};
use crate::protocol::OutgoingPayload;

/// Turns item commands into wire payloads
#[derive(Debug, Default)]
pub struct CommandResolver {
    rules: RuleTable,
    dimmers: DimmerLevels,
}

impl CommandResolver {
    /// Creates a resolver over a rule table
    pub fn new(rules: RuleTable) -> Self {
        CommandResolver {
            rules,
            dimmers: DimmerLevels::new(),
        }
    }

    /// Dimmer levels owned by this resolver
    pub fn dimmers(&self) -> &DimmerLevels {
        &self.dimmers
    }

    /// Resolves a command for an item
    ///
    /// When no rule matches, `fallback` supplies the item's protocol command
    /// text, which is wrapped in the configured preamble and postamble. An
    /// item without a protocol command is a configuration error.
    pub fn resolve<F>(
        &self,
        item: &str,
        command: &Command,
        config: &GatewayConfig,
        fallback: F,
    ) -> Result<OutgoingPayload>
    where
        F: FnOnce() -> Option<String>,
    {
        let text = command.as_text();

        if let Some(rule) = self.rules.first_match(item, &text) {
            debug!("Command {} on item {} matched a {:?} rule", text, item, rule.encoding());
            return Ok(match rule.encoding() {
                RuleEncoding::Frame(spec) => OutgoingPayload::Frame(*spec),
                RuleEncoding::Dimmer(step) => {
                    let level = self.dimmers.step(step.dimmer_channel(), step.delta);
                    debug!(
                        "Dimmer channel {} on device {} now at {}",
                        step.channel, step.dest_id, level
                    );
                    OutgoingPayload::Frame(step.frame(level))
                }
                RuleEncoding::Text(literal) => OutgoingPayload::Text(literal.clone()),
            });
        }

        let body = fallback().ok_or_else(|| {
            Error::config(format!(
                "No protocol command configured for command {} on item {}",
                text, item
            ))
        })?;

        Ok(OutgoingPayload::Text(format!(
            "{}{}{}",
            config.preamble, body, config.postamble
        )))
    }
}
