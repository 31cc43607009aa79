use regex::Regex;

use super::dimmer::{DimmerChannel, LEVEL_STEP};
use crate::core::{Error, Result};
use crate::protocol::FrameSpec;

/// Opcode for single channel lighting control
pub const OPCODE_SINGLE_CHANNEL: u16 = 0x0031;

/// Opcode for audio player control
pub const OPCODE_AUDIO_CONTROL: u16 = 0x0218;

/// A frame whose level byte comes from a stepped dimmer level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimmerStep {
    pub source_id: u8,
    pub dest_id: u8,
    pub opcode: u16,
    /// Output number, sent as payload byte 0
    pub channel: u8,
    /// Signed level change
    pub delta: i16,
}

impl DimmerStep {
    /// Key of the level this step adjusts
    pub fn dimmer_channel(&self) -> DimmerChannel {
        DimmerChannel {
            device: self.dest_id,
            channel: self.channel,
        }
    }

    /// Builds the frame carrying `level`
    pub fn frame(&self, level: u8) -> FrameSpec {
        FrameSpec::new(
            self.source_id,
            self.dest_id,
            self.opcode,
            [self.channel, level, 0, 0],
        )
    }
}

/// How a matched command is put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEncoding {
    /// Fixed structured frame
    Frame(FrameSpec),
    /// Structured frame with a stepped dimmer level
    Dimmer(DimmerStep),
    /// Literal text, sent as is
    Text(String),
}

/// Maps one item/command pair to an encoding
#[derive(Debug, Clone)]
pub struct CommandRule {
    item_pattern: Regex,
    command: String,
    encoding: RuleEncoding,
}

impl CommandRule {
    /// Creates a rule; `item_pattern` must match the whole item name
    pub fn new(
        item_pattern: &str,
        command: impl Into<String>,
        encoding: RuleEncoding,
    ) -> Result<Self> {
        let item_pattern = Regex::new(&format!("^(?:{})$", item_pattern)).map_err(|e| {
            Error::config_parse(format!("Invalid item pattern '{}': {}", item_pattern, e))
        })?;
        Ok(CommandRule {
            item_pattern,
            command: command.into(),
            encoding,
        })
    }

    /// Whether the rule applies to this item and command text
    pub fn matches(&self, item: &str, command: &str) -> bool {
        self.command == command && self.item_pattern.is_match(item)
    }

    /// The rule's encoding
    pub fn encoding(&self) -> &RuleEncoding {
        &self.encoding
    }

    /// The command text this rule answers to
    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Ordered rule list evaluated first match wins
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<CommandRule>,
}

impl RuleTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule with the lowest priority so far
    pub fn push(&mut self, rule: CommandRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Builder form of [`RuleTable::push`]
    pub fn with(mut self, rule: CommandRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the first rule matching the item and command text
    pub fn first_match(&self, item: &str, command: &str) -> Option<&CommandRule> {
        self.rules.iter().find(|rule| rule.matches(item, command))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Device table for the reference installation
    ///
    /// `UDPswitch` drives lighting channel 21 on device 2, `DimmerTest` steps
    /// channel 2 on the same device, and `AudioSwitch` sends player control
    /// codes 1 to 4 to the audio module at address 200.
    pub fn reference() -> Result<Self> {
        let light = |level| FrameSpec::new(1, 2, OPCODE_SINGLE_CHANNEL, [21, level, 0, 0]);
        let dimmer = |delta| DimmerStep {
            source_id: 1,
            dest_id: 2,
            opcode: OPCODE_SINGLE_CHANNEL,
            channel: 2,
            delta,
        };
        let audio = |code| FrameSpec::new(1, 200, OPCODE_AUDIO_CONTROL, [4, code, 0, 0]);

        let mut table = RuleTable::new();
        table
            .push(CommandRule::new("UDPswitch", "ON", RuleEncoding::Frame(light(100)))?)
            .push(CommandRule::new("UDPswitch", "OFF", RuleEncoding::Frame(light(0)))?)
            .push(CommandRule::new(
                "DimmerTest",
                "DECREASE",
                RuleEncoding::Dimmer(dimmer(-LEVEL_STEP)),
            )?)
            .push(CommandRule::new(
                "DimmerTest",
                "INCREASE",
                RuleEncoding::Dimmer(dimmer(LEVEL_STEP)),
            )?);
        for code in [3u8, 4, 1, 2] {
            table.push(CommandRule::new(
                "AudioSwitch",
                code.to_string(),
                RuleEncoding::Frame(audio(code)),
            )?);
        }
        Ok(table)
    }
}
