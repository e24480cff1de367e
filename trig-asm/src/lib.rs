//! Atomic types of the scenario trigger engine.
//!
//! The engine evaluates fixed-size trigger records every game tick: each
//! record holds up to 16 condition slots and 64 action slots plus a per-player
//! execution mask. This crate models those records bit-exactly as they appear
//! in a scenario file's `TRIG` chunk (2400 bytes per record, little-endian)
//! together with the unit-property template slots of the `UPRP` chunk.
//!
//! Nothing in here knows about registers, instruction counters or code
//! generation; those live one layer up. This crate is the schema: every magic
//! discriminant the engine understands is a named constant here, checked by a
//! single serialize/parse test suite.

#![warn(missing_docs)]

mod action;
mod condition;
mod cuwp;
mod macros;
mod trigger;
mod types;

#[cfg(test)]
mod encoding_tests;

pub use action::{
    Action, ActionFlags, ActionKind, NumberModifier, SwitchState, ToggleState, UnitOrder,
};
pub use condition::{Condition, ConditionFlags, ConditionKind, NumericComparison};
pub use cuwp::{UnitProperties, UnitPropertyFields, UnitSpecialFields, UnitStateFlags};
pub use trigger::{parse_triggers, serialize_triggers, Trigger};
pub use types::{
    AllianceStatus, DecodeError, LocationId, PlayerId, ResourceType, ScoreType, StringId,
    SwitchId, UnitId, ALL_PLAYERS, ALLIES, ANY_LOCATION, CURRENT_PLAYER, FOES,
    NEUTRAL_PLAYERS, NON_ALLIED_VICTORY, UNIT_TYPE_COUNT,
};
