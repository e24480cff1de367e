//! The code generator's typed error taxonomy.
//!
//! Every variant that can be attributed to an IR instruction carries the
//! instruction's index in the input stream, so the outer layer can map the
//! failure back to a source span.

use core::fmt;

/// Scenario chunk the generator requires on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// The string table (`STR`).
    Strings,
    /// The location table (`MRGN`).
    Locations,
    /// The unit-property template slots (`UPRP`).
    UnitProperties,
    /// The unit-property slot usage bitmap (`UPUS`).
    UnitPropertiesUsed,
    /// The trigger chunk (`TRIG`).
    Triggers,
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Strings => "STR",
            Self::Locations => "MRGN",
            Self::UnitProperties => "UPRP",
            Self::UnitPropertiesUsed => "UPUS",
            Self::Triggers => "TRIG",
        };
        f.write_str(tag)
    }
}

/// Failure modes of code generation. All of them abort emission; no partial
/// trigger chunk is ever written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CodegenError {
    /// The IR stream violates a structural contract.
    #[error("malformed IR: {reason}")]
    MalformedIr {
        /// What the stream got wrong.
        reason: String,
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A register handle exceeds the register map.
    #[error("out of registers: handle {register} does not fit a map of {cells} cells")]
    OutOfRegisters {
        /// The handle that missed.
        register: usize,
        /// Size of the register map.
        cells: usize,
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A push would descend past the bottom of the register map.
    #[error("stack overflow")]
    StackOverflow {
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A pop would ascend past the top of the register map.
    #[error("stack underflow")]
    StackUnderflow {
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// All 64 unit-property template slots are taken.
    #[error("all unit-property slots are in use")]
    CuwpExhausted {
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A location name does not resolve against the scenario.
    #[error("location {name:?} not found in the scenario")]
    LocationNotFound {
        /// The name that missed.
        name: String,
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A record ran out of action slots.
    #[error("no free action slot left on the trigger record")]
    TriggerActionsFull {
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// A record ran out of condition slots.
    #[error("no free condition slot left on the trigger record")]
    TriggerConditionsFull {
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// The instruction is recognized but has no lowering.
    #[error("not implemented: {what}")]
    NotImplemented {
        /// The unsupported construct.
        what: &'static str,
        /// Offending instruction index.
        ir: Option<usize>,
    },

    /// The scenario lacks a chunk the generator needs.
    #[error("scenario is missing its {0} chunk")]
    MissingChunk(ChunkKind),
}

impl CodegenError {
    /// Attributes the error to IR instruction `ir` if it is not already
    /// attributed.
    pub fn with_ir(mut self, index: usize) -> Self {
        if let Some(slot) = self.ir_slot() {
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        self
    }

    /// The IR instruction this error is attributed to, if any.
    pub fn ir_index(&self) -> Option<usize> {
        match self {
            Self::MalformedIr { ir, .. }
            | Self::OutOfRegisters { ir, .. }
            | Self::StackOverflow { ir }
            | Self::StackUnderflow { ir }
            | Self::CuwpExhausted { ir }
            | Self::LocationNotFound { ir, .. }
            | Self::TriggerActionsFull { ir }
            | Self::TriggerConditionsFull { ir }
            | Self::NotImplemented { ir, .. } => *ir,
            Self::MissingChunk(_) => None,
        }
    }

    fn ir_slot(&mut self) -> Option<&mut Option<usize>> {
        match self {
            Self::MalformedIr { ir, .. }
            | Self::OutOfRegisters { ir, .. }
            | Self::StackOverflow { ir }
            | Self::StackUnderflow { ir }
            | Self::CuwpExhausted { ir }
            | Self::LocationNotFound { ir, .. }
            | Self::TriggerActionsFull { ir }
            | Self::TriggerConditionsFull { ir }
            | Self::NotImplemented { ir, .. } => Some(ir),
            Self::MissingChunk(_) => None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedIr {
            reason: reason.into(),
            ir: None,
        }
    }
}

/// Result of a code generation step.
pub type CodegenResult<T> = Result<T, CodegenError>;
