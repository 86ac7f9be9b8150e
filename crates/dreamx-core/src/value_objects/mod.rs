//! Value objects - immutable types that represent domain concepts

mod reaction;
mod snowflake;

pub use reaction::{
    ReactionKind, ReactionSummary, ReactionTarget, ReactionToggle, ToggleOutcome, MAX_KIND_LEN,
};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
