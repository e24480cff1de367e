//! VM parameters: reserved registers, reserved switches, defaults.

use trig_asm::{PlayerId, SwitchId, UnitId};

/// Virtual register handle; an index into the [`RegisterMap`].
///
/// [`RegisterMap`]: crate::RegisterMap
pub type Register = usize;

/// Trigger address held in the instruction counter.
pub type Address = u32;

/// The register whose death counter selects the active trigger address.
pub const REG_INSTRUCTION_COUNTER: Register = 0;
/// Scratch cell of the copy macro.
pub const REG_COPY_STORAGE: Register = 1;
/// Left operand of the shared multiply routine.
pub const REG_MUL_LEFT: Register = 2;
/// Right operand (and result) of the shared multiply routine.
pub const REG_MUL_RIGHT: Register = 3;
/// Bit counter of the multiply routine.
pub const REG_TEMP0: Register = 4;
/// Shift-direction flag of the multiply routine.
pub const REG_TEMP1: Register = 5;
/// Accumulator seed of the multiply routine.
pub const REG_TEMP2: Register = 6;
/// Return-address cell drained into the instruction counter by the
/// indirect-jump triggers.
pub const REG_INDIRECT_JUMP: Register = 7;

/// Number of reserved register handles; the rest of the map is stack space.
pub const RESERVED_REGISTERS: usize = 8;

/// Sentinel handle resolved at each use site to the live top of the
/// compile-time stack; `REG_STACK_TOP + k` addresses the cell `k` below it.
pub const REG_STACK_TOP: Register = 0x8000;

/// Gates event triggers while the event queue is being polled.
pub const SWITCH_EVENTS_MUTEX: SwitchId = 0;
/// Set by a subtraction that would have gone below zero.
pub const SWITCH_ARITHMETIC_UNDERFLOW: SwitchId = 1;
/// Serializes indirect jumps against the main instruction stream.
pub const SWITCH_INSTRUCTION_COUNTER_MUTEX: SwitchId = 2;
/// First of eight switches randomized by `Rnd256`.
pub const SWITCH_RANDOM_BASE: SwitchId = 3;
/// First of eight per-player presence switches maintained by `ChkPlayers`.
pub const SWITCH_PLAYER_BASE: SwitchId = 11;
/// Number of reserved switches; ids above are free for user code.
pub const RESERVED_SWITCHES: usize = 19;

/// Player group stamped on switch conditions.
pub const REGISTERS_OWNER: PlayerId = 7;

/// Default power-of-two upper bound of the drain fan-out.
pub const DEFAULT_COPY_BATCH_SIZE: u32 = 8192;
/// Default number of hyper-triggers appended after the program.
pub const DEFAULT_HYPER_TRIGGER_COUNT: usize = 5;
/// Default 1-based owner of the executive trigger logic.
pub const DEFAULT_TRIGGERS_OWNER: u8 = 1;

/// Advisory ceiling on emitted records; exceeding it is logged, not fatal.
pub const MAX_TRIGGER_COUNT: usize = 16384;

/// Register maps smaller than this leave too little stack to be useful.
pub const MIN_USEFUL_REGISTERS: usize = 24;

/// Location name that resolves to the built-in whole-map location.
pub const ANY_LOCATION_NAME: &str = "AnyLocation";

/// Unit types no scenario can normally produce, safe to repurpose as
/// death-counter memory. Repeated across players 0..8 this pool yields the
/// default register map.
pub const DEFAULT_REGISTER_POOL: &[UnitId] = &[
    91,  // unused terran transport
    92,  // unused terran gunship
    203, // cave
    204, // cave-in
    205, // cantina
    206, // mining platform
    207, // independent command center
    208, // independent starport
    209, // independent jump gate
    210, // ruins
    211, // khaydarin crystal formation
    212, // independent power generator
];
