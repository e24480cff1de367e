//! Code generator that synthesizes a general-purpose virtual machine out of
//! scenario trigger records.
//!
//! The target engine has no program counter, no arithmetic and no branching;
//! its only mutable state is the death-counter table, a `(player, unit type)`
//! grid of u32 cells, plus 256 global boolean switches. This crate lowers a
//! linear intermediate representation onto that substrate:
//!
//! - [`RegisterMap`] pins every virtual register to a unique death-counter
//!   cell;
//! - [`TriggerBuilder`] accumulates conditions and actions on one record
//!   under the instruction-counter discipline;
//! - [`Compiler`] walks the IR and emits the trigger program, synthesizing
//!   control flow from a designated instruction-counter register, arithmetic
//!   from batched power-of-two drains, and calls from an indirect-jump
//!   register guarded by a mutex switch.
//!
//! The output is the bit-exact byte image of the scenario's trigger chunk,
//! ready to be written back by the map-file layer.

pub mod codegen;
pub mod config;
pub mod consts;
pub mod error;
pub mod ir;
pub mod map;
pub mod registers;

mod builder;

pub use builder::TriggerBuilder;
pub use codegen::Compiler;
pub use config::Config;
pub use error::{ChunkKind, CodegenError, CodegenResult};
pub use registers::{RegisterDef, RegisterMap};

/// Commonly used items of this crate and the record schema.
pub mod prelude {
    pub use trig_asm::{
        Action, ActionKind, AllianceStatus, Condition, ConditionKind, NumberModifier,
        NumericComparison, ResourceType, ScoreType, SwitchState, ToggleState, Trigger, UnitOrder,
        UnitProperties,
    };

    pub use crate::builder::TriggerBuilder;
    pub use crate::codegen::Compiler;
    pub use crate::config::Config;
    pub use crate::consts::*;
    pub use crate::error::{ChunkKind, CodegenError, CodegenResult};
    pub use crate::ir::{
        Audience, EndGameKind, Instruction, JumpTarget, LeaderboardKind, ModifyKind, PushSource,
        Quantity, UnitPropertyKind,
    };
    pub use crate::map::MapData;
    pub use crate::registers::{RegisterDef, RegisterMap};
}
