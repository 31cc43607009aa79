//! Response interpretation module
//!
//! Reply datagrams are decoded with the configured character set, rewritten
//! by a named transformation and mapped onto the first state kind the item
//! accepts.

pub mod pipeline;
pub mod state;
pub mod transform;

pub use self::pipeline::ResponsePipeline;
pub use self::state::{map_state, StateKind};
pub use self::transform::{
    MapTransformation, RegexTransformation, TransformRegistry, TransformSpec,
    TransformationProvider,
};
