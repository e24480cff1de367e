//! Shared id types, player groups and the small payload enums.

use core::fmt;

use crate::macros::impl_try_from_u8;

/// Unit type index. The engine knows `0..228` unit types; the death-counter
/// table has one column per type.
pub type UnitId = u16;

/// Zero-based index into the scenario's string table. Records store string
/// references one-based; the constructors in this crate perform the shift.
pub type StringId = u32;

/// Zero-based index into the scenario's location table. Records store
/// location references one-based; the constructors perform the shift.
pub type LocationId = u32;

/// Index into the engine's global boolean switch table, `0..256`.
pub type SwitchId = u32;

/// Zero-based player slot, `0..12`.
pub type PlayerId = u8;

/// Number of unit types the engine knows.
pub const UNIT_TYPE_COUNT: usize = 228;

/// The built-in location covering the entire map.
pub const ANY_LOCATION: LocationId = 63;

/// Player-group value selecting the player a trigger runs for.
pub const CURRENT_PLAYER: u32 = 13;
/// Player-group value selecting all enemies of the current player.
pub const FOES: u32 = 14;
/// Player-group value selecting all allies of the current player.
pub const ALLIES: u32 = 15;
/// Player-group value selecting the neutral players.
pub const NEUTRAL_PLAYERS: u32 = 16;
/// Player-group value selecting every player.
pub const ALL_PLAYERS: u32 = 17;
/// Player-group value selecting players with allied-victory enabled.
pub const NON_ALLIED_VICTORY: u32 = 26;

/// Resource kind selector used by resource conditions and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ResourceType {
    /// Minerals.
    Ore = 0,
    /// Vespene gas.
    Gas = 1,
    /// Minerals and gas combined.
    OreAndGas = 2,
}

impl_try_from_u8!(ResourceType, ResourceType, {
    Ore = 0,
    Gas = 1,
    OreAndGas = 2,
});

/// Score board selector used by score conditions and actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ScoreType {
    /// Sum of all other boards.
    Total = 0,
    /// Score for units produced.
    Units = 1,
    /// Score for buildings constructed.
    Buildings = 2,
    /// Units and buildings combined.
    UnitsAndBuildings = 3,
    /// Score for enemy units destroyed.
    Kills = 4,
    /// Score for enemy buildings razed.
    Razings = 5,
    /// Kills and razings combined.
    KillsAndRazings = 6,
    /// The custom score board.
    Custom = 7,
}

impl_try_from_u8!(ScoreType, ScoreType, {
    Total = 0,
    Units = 1,
    Buildings = 2,
    UnitsAndBuildings = 3,
    Kills = 4,
    Razings = 5,
    KillsAndRazings = 6,
    Custom = 7,
});

/// Diplomacy setting applied by the set-alliance-status action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum AllianceStatus {
    /// Treat the target as an enemy.
    Enemy = 0,
    /// Treat the target as an ally.
    Ally = 1,
    /// Ally with shared victory.
    AlliedVictory = 2,
}

impl_try_from_u8!(AllianceStatus, AllianceStatus, {
    Enemy = 0,
    Ally = 1,
    AlliedVictory = 2,
});

/// Failure while decoding engine records from raw chunk bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The byte does not name a known condition kind.
    ConditionKind(u8),
    /// The byte does not name a known action kind.
    ActionKind(u8),
    /// The byte does not name a known resource type.
    ResourceType(u8),
    /// The byte does not name a known score type.
    ScoreType(u8),
    /// The byte does not name a known alliance status.
    AllianceStatus(u8),
    /// The buffer is not a whole number of records.
    TruncatedChunk {
        /// Bytes present in the buffer.
        len: usize,
        /// Size of one record.
        record: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionKind(b) => write!(f, "unknown condition kind {b:#04x}"),
            Self::ActionKind(b) => write!(f, "unknown action kind {b:#04x}"),
            Self::ResourceType(b) => write!(f, "unknown resource type {b:#04x}"),
            Self::ScoreType(b) => write!(f, "unknown score type {b:#04x}"),
            Self::AllianceStatus(b) => write!(f, "unknown alliance status {b:#04x}"),
            Self::TruncatedChunk { len, record } => {
                write!(f, "chunk of {len} bytes is not a multiple of {record}-byte records")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
