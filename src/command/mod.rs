//! Command resolution module
//!
//! Maps item commands to structured frames or text payloads through an
//! ordered rule table, keeping per-channel dimmer levels.

pub mod dimmer;
pub mod resolver;
pub mod rule;

pub use self::dimmer::{DimmerChannel, DimmerLevels, LEVEL_STEP, MAX_LEVEL};
pub use self::resolver::CommandResolver;
pub use self::rule::{CommandRule, DimmerStep, RuleEncoding, RuleTable};
