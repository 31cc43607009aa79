use std::collections::HashMap;

use parking_lot::Mutex;

/// Highest dimmer level
pub const MAX_LEVEL: u8 = 100;

/// Level change applied by one INCREASE or DECREASE
pub const LEVEL_STEP: i16 = 25;

/// Identifies one dimmer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimmerChannel {
    /// Device the channel lives on
    pub device: u8,
    /// Output number on that device
    pub channel: u8,
}

/// Last level sent to each dimmer channel
///
/// Levels start at zero and live as long as the resolver.
#[derive(Debug, Default)]
pub struct DimmerLevels {
    levels: Mutex<HashMap<DimmerChannel, u8>>,
}

impl DimmerLevels {
    /// Creates an empty level table
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a channel's level by `delta`, clamped to 0..=100, and returns it
    pub fn step(&self, channel: DimmerChannel, delta: i16) -> u8 {
        let mut levels = self.levels.lock();
        let level = levels.entry(channel).or_insert(0);
        *level = i16::from(*level)
            .saturating_add(delta)
            .clamp(0, i16::from(MAX_LEVEL)) as u8;
        *level
    }

    /// Sets a channel's level, clamped to 0..=100
    pub fn set(&self, channel: DimmerChannel, level: u8) -> u8 {
        let level = level.min(MAX_LEVEL);
        self.levels.lock().insert(channel, level);
        level
    }

    /// Returns a channel's current level
    pub fn level(&self, channel: DimmerChannel) -> u8 {
        self.levels.lock().get(&channel).copied().unwrap_or(0)
    }
}
