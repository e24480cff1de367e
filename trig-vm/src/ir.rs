//! The intermediate representation consumed by the code generator.
//!
//! The IR is a flat, already-optimized instruction stream produced by an
//! external front end. Instructions are a closed tagged union; the generator
//! matches on them exhaustively. Jump destinations are instruction indices
//! (absolute or relative), resolved and clamped during jump-target discovery.
//!
//! Unit-property templates and events are encoded structurally: a
//! [`Instruction::Unit`] is followed by its property entries and an
//! [`Instruction::Event`] by its condition entries; both groups are consumed
//! during pre-emission and skipped by the lowering pass.

use trig_asm::{
    AllianceStatus, NumberModifier, NumericComparison, PlayerId, ResourceType, ScoreType,
    SwitchId, ToggleState, UnitId, UnitOrder,
};

use crate::consts::Register;

/// What a `Push` puts on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushSource {
    /// An immediate value.
    Literal(u32),
    /// The current value of a register, copied non-destructively.
    Register(Register),
}

/// A quantity operand that is either immediate or consumed from the stack.
///
/// Register quantities must name [`REG_STACK_TOP`]; anything else is
/// malformed IR.
///
/// [`REG_STACK_TOP`]: crate::consts::REG_STACK_TOP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// An immediate value.
    Literal(u32),
    /// The value is popped off the given register, which must be the live
    /// stack top.
    Register(Register),
}

impl Quantity {
    /// Whether the quantity is immediate.
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

/// A jump destination expressed in instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTarget {
    /// Index into the instruction stream.
    Absolute(usize),
    /// Offset from the jump instruction itself.
    Relative(i32),
}

impl JumpTarget {
    /// Resolves the target against the stream, clamping over-runs to the
    /// last instruction.
    pub fn resolve(&self, at: usize, len: usize) -> usize {
        debug_assert!(len > 0);
        let index = match *self {
            Self::Absolute(index) => index as i64,
            Self::Relative(offset) => at as i64 + offset as i64,
        };
        index.clamp(0, len as i64 - 1) as usize
    }
}

/// Who observes a player-directed side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// A single player slot.
    Player(PlayerId),
    /// Every player.
    All,
}

/// Unit stat rewritten by `Modify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyKind {
    /// Hit points, percent.
    HitPoints,
    /// Energy, percent.
    Energy,
    /// Shield points, percent.
    ShieldPoints,
    /// Hangar count, absolute.
    HangarCount,
}

/// How `EndGame` ends the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndGameKind {
    /// End in victory.
    Victory,
    /// End in defeat.
    Defeat,
    /// End in a draw.
    Draw,
}

/// Which leaderboard to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardKind {
    /// Units controlled.
    Control {
        /// Counted unit type.
        unit: UnitId,
    },
    /// Units controlled at a location.
    ControlAtLocation {
        /// Counted unit type.
        unit: UnitId,
        /// Location name.
        location: String,
    },
    /// Greed (accumulated minerals and gas).
    Greed,
    /// Kills of a unit type.
    Kills {
        /// Counted unit type.
        unit: UnitId,
    },
    /// A score board.
    Points {
        /// Which score board.
        score: ScoreType,
    },
    /// A resource stock.
    Resources {
        /// Which resource.
        resource: ResourceType,
    },
}

/// One field of a unit-property template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitPropertyKind {
    /// Hit points, percent (clamped to 100).
    HitPoints,
    /// Shield points, percent (clamped to 100).
    ShieldPoints,
    /// Energy, percent (clamped to 100).
    Energy,
    /// Resource amount, raw.
    ResourceAmount,
    /// Hangar count, raw.
    HangarCount,
    /// Spawn cloaked.
    Cloaked,
    /// Spawn burrowed.
    Burrowed,
    /// Spawn in transit.
    InTransit,
    /// Spawn hallucinated.
    Hallucinated,
    /// Spawn invincible.
    Invincible,
}

/// One IR instruction.
///
/// `MulConst` is exact only for factors of the form `2^n` or `2^n + 1`; the
/// front end lowers every other product through `Mul`.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)] // payload fields are described by their names
pub enum Instruction {
    /// Does nothing; absorbed by the lowering pass.
    Nop,

    // Stack and register traffic.
    Push { source: PushSource },
    Pop { register: Option<Register> },
    SetReg { register: Register, value: u32 },
    IncReg { register: Register, amount: u32 },
    DecReg { register: Register, amount: u32 },
    CopyReg { dst: Register, src: Register },

    // Arithmetic over the two topmost stack cells.
    Add,
    Sub,
    Mul,
    MulConst { value: u32 },
    Div,
    Rnd256,

    // Control flow.
    Jmp { target: JumpTarget },
    JmpIfEq { register: Register, value: u32, target: JumpTarget },
    JmpIfNotEq { register: Register, value: u32, target: JumpTarget },
    JmpIfGrt { register: Register, value: u32, target: JumpTarget },
    JmpIfGrtOrEq { register: Register, value: u32, target: JumpTarget },
    JmpIfLess { register: Register, value: u32, target: JumpTarget },
    JmpIfLessOrEq { register: Register, value: u32, target: JumpTarget },
    JmpIfSwSet { switch: SwitchId, target: JumpTarget },
    JmpIfSwNotSet { switch: SwitchId, target: JumpTarget },
    SetSw { switch: SwitchId, state: bool },

    // Player presence.
    ChkPlayers,
    IsPresent { players: Vec<PlayerId> },

    // Observable side effects.
    DisplayMsg { audience: Audience, message: String },
    Wait { milliseconds: u32 },
    Spawn {
        player: PlayerId,
        unit: UnitId,
        quantity: Quantity,
        location: String,
        properties: Option<usize>,
    },
    Kill {
        player: PlayerId,
        unit: UnitId,
        quantity: Quantity,
        location: Option<String>,
    },
    Remove {
        player: PlayerId,
        unit: UnitId,
        quantity: Quantity,
        location: Option<String>,
    },
    Move {
        player: PlayerId,
        unit: UnitId,
        quantity: Quantity,
        src_location: String,
        dst_location: String,
    },
    Order {
        player: PlayerId,
        unit: UnitId,
        order: UnitOrder,
        src_location: String,
        dst_location: String,
    },
    Modify {
        player: PlayerId,
        unit: UnitId,
        kind: ModifyKind,
        quantity: Quantity,
        amount: u32,
        location: String,
    },
    Give {
        src_player: PlayerId,
        dst_player: PlayerId,
        unit: UnitId,
        quantity: Quantity,
        location: String,
    },
    MoveLoc {
        player: PlayerId,
        unit: UnitId,
        src_location: String,
        dst_location: String,
    },
    EndGame { audience: Audience, kind: EndGameKind },
    CenterView { audience: Audience, location: String },
    Ping { audience: Audience, location: String },

    // Resource, score, death-counter and countdown mutators.
    SetResource { player: PlayerId, resource: ResourceType, quantity: Quantity },
    IncResource { player: PlayerId, resource: ResourceType, quantity: Quantity },
    DecResource { player: PlayerId, resource: ResourceType, quantity: Quantity },
    SetScore { player: PlayerId, score: ScoreType, quantity: Quantity },
    IncScore { player: PlayerId, score: ScoreType, quantity: Quantity },
    DecScore { player: PlayerId, score: ScoreType, quantity: Quantity },
    SetDeaths { player: PlayerId, unit: UnitId, quantity: Quantity },
    IncDeaths { player: PlayerId, unit: UnitId, quantity: Quantity },
    DecDeaths { player: PlayerId, unit: UnitId, quantity: Quantity },
    SetCountdown { quantity: Quantity },
    AddCountdown { quantity: Quantity },
    SubCountdown { quantity: Quantity },
    PauseCountdown { unpause: bool },
    PauseGame { unpause: bool },
    MuteUnitSpeech { unmute: bool },

    // Presentation.
    Talk { audience: Audience, unit: UnitId, milliseconds: u32 },
    SetDoodad {
        player: PlayerId,
        unit: UnitId,
        state: ToggleState,
        location: String,
    },
    SetInvincible {
        player: PlayerId,
        unit: UnitId,
        state: ToggleState,
        location: String,
    },
    AiScript {
        audience: Audience,
        script: u32,
        location: Option<String>,
    },
    SetAlly {
        audience: Audience,
        target: PlayerId,
        status: AllianceStatus,
    },
    SetObj { audience: Audience, text: String },
    NextScen { name: String },
    Leaderboard { text: String, kind: LeaderboardKind },
    LeaderboardCpu { state: ToggleState },
    PlayWav {
        audience: Audience,
        name: String,
        milliseconds: u32,
    },
    Transmission {
        text: String,
        unit: UnitId,
        location: String,
        amount: u32,
        modifier: NumberModifier,
        wav_name: String,
        wav_milliseconds: u32,
    },

    // Pre-emitted groups.
    Unit { properties: u32 },
    UnitProp { kind: UnitPropertyKind, value: u32 },
    Event { switch: SwitchId, conditions: u32 },
    BringCond {
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        location: String,
        quantity: u32,
    },
    AccumCond {
        player: PlayerId,
        comparison: NumericComparison,
        resource: ResourceType,
        quantity: u32,
    },
    LeastResCond { player: PlayerId, resource: ResourceType },
    MostResCond { player: PlayerId, resource: ResourceType },
    ScoreCond {
        player: PlayerId,
        comparison: NumericComparison,
        score: ScoreType,
        quantity: u32,
    },
    LowScoreCond { player: PlayerId, score: ScoreType },
    HiScoreCond { player: PlayerId, score: ScoreType },
    TimeCond { comparison: NumericComparison, quantity: u32 },
    CmdCond {
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        quantity: u32,
    },
    CmdLeastCond { player: PlayerId, unit: UnitId, location: Option<String> },
    CmdMostCond { player: PlayerId, unit: UnitId, location: Option<String> },
    KillCond {
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        quantity: u32,
    },
    KillLeastCond { player: PlayerId, unit: UnitId },
    KillMostCond { player: PlayerId, unit: UnitId },
    DeathCond {
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        quantity: u32,
    },
    CountdownCond { comparison: NumericComparison, quantity: u32 },
    OpponentsCond {
        player: PlayerId,
        comparison: NumericComparison,
        quantity: u32,
    },
}

impl Instruction {
    /// The jump target, for the jump family.
    pub fn jump_target(&self) -> Option<JumpTarget> {
        match *self {
            Self::Jmp { target }
            | Self::JmpIfEq { target, .. }
            | Self::JmpIfNotEq { target, .. }
            | Self::JmpIfGrt { target, .. }
            | Self::JmpIfGrtOrEq { target, .. }
            | Self::JmpIfLess { target, .. }
            | Self::JmpIfLessOrEq { target, .. }
            | Self::JmpIfSwSet { target, .. }
            | Self::JmpIfSwNotSet { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether the instruction is an event-condition entry.
    pub fn is_event_condition(&self) -> bool {
        matches!(
            self,
            Self::BringCond { .. }
                | Self::AccumCond { .. }
                | Self::LeastResCond { .. }
                | Self::MostResCond { .. }
                | Self::ScoreCond { .. }
                | Self::LowScoreCond { .. }
                | Self::HiScoreCond { .. }
                | Self::TimeCond { .. }
                | Self::CmdCond { .. }
                | Self::CmdLeastCond { .. }
                | Self::CmdMostCond { .. }
                | Self::KillCond { .. }
                | Self::KillLeastCond { .. }
                | Self::KillMostCond { .. }
                | Self::DeathCond { .. }
                | Self::CountdownCond { .. }
                | Self::OpponentsCond { .. }
        )
    }

    /// Whether the lowering pass skips the instruction because pre-emission
    /// already consumed it (or it does nothing).
    pub fn is_preemitted(&self) -> bool {
        matches!(
            self,
            Self::Nop | Self::Unit { .. } | Self::UnitProp { .. } | Self::Event { .. }
        ) || self.is_event_condition()
    }
}
