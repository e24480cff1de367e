//! The 20-byte condition record and its discriminants.

use crate::macros::impl_try_from_u8;
use crate::types::{DecodeError, LocationId, PlayerId, ResourceType, ScoreType, SwitchId, UnitId};

/// Condition discriminant as stored at byte 15 of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ConditionKind {
    /// Empty slot; the engine skips it.
    NoCondition = 0,
    /// The countdown timer compares against an amount of seconds.
    CountdownTimer = 1,
    /// A player commands a quantity of units.
    Command = 2,
    /// A player brings a quantity of units to a location.
    Bring = 3,
    /// A player has accumulated a quantity of resources.
    Accumulate = 4,
    /// A player has killed a quantity of units.
    Kill = 5,
    /// A player commands the most of a unit type.
    CommandTheMost = 6,
    /// A player commands the most of a unit type at a location.
    CommandTheMostAt = 7,
    /// A player has the most kills of a unit type.
    MostKills = 8,
    /// A player has the highest score of a kind.
    HighestScore = 9,
    /// A player has the most of a resource.
    MostResources = 10,
    /// A global switch is in a given state.
    Switch = 11,
    /// Game time compares against an amount of seconds.
    ElapsedTime = 12,
    /// Marks a mission-briefing slot; never produced by the generator.
    Briefing = 13,
    /// A player has a quantity of remaining opponents.
    Opponents = 14,
    /// A death counter cell compares against a quantity.
    Deaths = 15,
    /// A player commands the least of a unit type.
    CommandTheLeast = 16,
    /// A player commands the least of a unit type at a location.
    CommandTheLeastAt = 17,
    /// A player has the fewest kills of a unit type.
    LeastKills = 18,
    /// A player has the lowest score of a kind.
    LowestScore = 19,
    /// A player has the least of a resource.
    LeastResources = 20,
    /// A player's score of a kind compares against a quantity.
    Score = 21,
    /// Always true.
    Always = 22,
    /// Never true.
    Never = 23,
}

impl_try_from_u8!(ConditionKind, ConditionKind, {
    NoCondition = 0,
    CountdownTimer = 1,
    Command = 2,
    Bring = 3,
    Accumulate = 4,
    Kill = 5,
    CommandTheMost = 6,
    CommandTheMostAt = 7,
    MostKills = 8,
    HighestScore = 9,
    MostResources = 10,
    Switch = 11,
    ElapsedTime = 12,
    Briefing = 13,
    Opponents = 14,
    Deaths = 15,
    CommandTheLeast = 16,
    CommandTheLeastAt = 17,
    LeastKills = 18,
    LowestScore = 19,
    LeastResources = 20,
    Score = 21,
    Always = 22,
    Never = 23,
});

/// Numeric comparison stored at byte 14 of quantified conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum NumericComparison {
    /// The observed value is `>=` the quantity.
    AtLeast = 0,
    /// The observed value is `<=` the quantity.
    AtMost = 1,
    /// The observed value is `==` the quantity.
    Exactly = 10,
}

/// Comparison byte for a switch condition expecting the set state.
const SWITCH_SET: u8 = 2;
/// Comparison byte for a switch condition expecting the cleared state.
const SWITCH_CLEARED: u8 = 3;

bitflags::bitflags! {
    /// Condition flag byte at offset 17.
    pub struct ConditionFlags: u8 {
        /// The condition is disabled in the editor.
        const DISABLED = 0x02;
        /// Always-display marker.
        const ALWAYS_DISPLAY = 0x04;
        /// The unit-properties field is meaningful.
        const UNIT_PROPERTIES_USED = 0x08;
        /// The unit-type field is meaningful.
        const UNIT_TYPE_USED = 0x10;
    }
}

/// One condition slot, as laid out on disk.
///
/// | offset | field        |
/// |--------|--------------|
/// | 0      | `location`   |
/// | 4      | `player`     |
/// | 8      | `quantity`   |
/// | 12     | `unit`       |
/// | 14     | `comparison` |
/// | 15     | `kind`       |
/// | 16     | `arg`        |
/// | 17     | `flags`      |
/// | 18     | `mask`       |
///
/// `location` and string references are stored one-based; the constructors
/// below take zero-based ids and shift. `comparison` is kept raw because it
/// multiplexes [`NumericComparison`] and the switch-state bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Condition {
    /// One-based location reference, 0 when unused.
    pub location: u32,
    /// Player group the condition observes.
    pub player: u32,
    /// Comparison operand.
    pub quantity: u32,
    /// Unit type, where meaningful.
    pub unit: UnitId,
    /// Raw comparison byte.
    pub comparison: u8,
    /// Condition discriminant.
    pub kind: ConditionKind,
    /// Kind-specific byte: resource type, score type or switch id.
    pub arg: u8,
    /// Flag byte.
    pub flags: u8,
    /// Editor mask word; always zero in generated records.
    pub mask: u16,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            location: 0,
            player: 0,
            quantity: 0,
            unit: 0,
            comparison: 0,
            kind: ConditionKind::NoCondition,
            arg: 0,
            flags: 0,
            mask: 0,
        }
    }
}

impl Condition {
    /// Serialized size of one condition slot.
    pub const LEN: usize = 20;

    fn quantified(kind: ConditionKind, comparison: NumericComparison) -> Self {
        Self {
            kind,
            comparison: comparison as u8,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// Always true.
    pub fn always() -> Self {
        Self {
            kind: ConditionKind::Always,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// A death-counter cell `(player, unit)` compares against `quantity`.
    ///
    /// This is the engine's only readable integer cell and therefore the
    /// test primitive for every virtual register.
    pub fn deaths(player: u32, unit: UnitId, comparison: NumericComparison, quantity: u32) -> Self {
        Self {
            player,
            unit,
            quantity,
            ..Self::quantified(ConditionKind::Deaths, comparison)
        }
    }

    /// A global switch is set (`true`) or cleared (`false`).
    pub fn switch_state(switch: SwitchId, set: bool) -> Self {
        Self {
            kind: ConditionKind::Switch,
            arg: switch as u8,
            comparison: if set { SWITCH_SET } else { SWITCH_CLEARED },
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` brings `quantity` of `unit` to `location`.
    pub fn bring(
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        location: LocationId,
        quantity: u32,
    ) -> Self {
        Self {
            player: player as u32,
            unit,
            location: location + 1,
            quantity,
            ..Self::quantified(ConditionKind::Bring, comparison)
        }
    }

    /// `player` has accumulated `quantity` of a resource.
    pub fn accumulate(
        player: PlayerId,
        comparison: NumericComparison,
        resource: ResourceType,
        quantity: u32,
    ) -> Self {
        Self {
            player: player as u32,
            arg: resource as u8,
            quantity,
            ..Self::quantified(ConditionKind::Accumulate, comparison)
        }
    }

    /// `player` holds the least of a resource.
    pub fn least_resources(player: PlayerId, resource: ResourceType) -> Self {
        Self {
            kind: ConditionKind::LeastResources,
            player: player as u32,
            arg: resource as u8,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` holds the most of a resource.
    pub fn most_resources(player: PlayerId, resource: ResourceType) -> Self {
        Self {
            kind: ConditionKind::MostResources,
            player: player as u32,
            arg: resource as u8,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// Game time compares against `seconds`.
    pub fn elapsed_time(comparison: NumericComparison, seconds: u32) -> Self {
        Self {
            quantity: seconds,
            ..Self::quantified(ConditionKind::ElapsedTime, comparison)
        }
    }

    /// `player` commands `quantity` of `unit`.
    pub fn command(
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        quantity: u32,
    ) -> Self {
        Self {
            player: player as u32,
            unit,
            quantity,
            ..Self::quantified(ConditionKind::Command, comparison)
        }
    }

    /// `player` commands the least of `unit`, optionally at a location.
    pub fn command_the_least(player: PlayerId, unit: UnitId, location: Option<LocationId>) -> Self {
        let (kind, location) = match location {
            Some(id) => (ConditionKind::CommandTheLeastAt, id + 1),
            None => (ConditionKind::CommandTheLeast, 0),
        };
        Self {
            kind,
            location,
            player: player as u32,
            unit,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` commands the most of `unit`, optionally at a location.
    pub fn command_the_most(player: PlayerId, unit: UnitId, location: Option<LocationId>) -> Self {
        let (kind, location) = match location {
            Some(id) => (ConditionKind::CommandTheMostAt, id + 1),
            None => (ConditionKind::CommandTheMost, 0),
        };
        Self {
            kind,
            location,
            player: player as u32,
            unit,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` has killed `quantity` of `unit`.
    pub fn kills(
        player: PlayerId,
        comparison: NumericComparison,
        unit: UnitId,
        quantity: u32,
    ) -> Self {
        Self {
            player: player as u32,
            unit,
            quantity,
            ..Self::quantified(ConditionKind::Kill, comparison)
        }
    }

    /// `player` has the fewest kills of `unit`.
    pub fn least_kills(player: PlayerId, unit: UnitId) -> Self {
        Self {
            kind: ConditionKind::LeastKills,
            player: player as u32,
            unit,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` has the most kills of `unit`.
    pub fn most_kills(player: PlayerId, unit: UnitId) -> Self {
        Self {
            kind: ConditionKind::MostKills,
            player: player as u32,
            unit,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player`'s score of `kind` compares against `quantity`.
    pub fn score(
        player: PlayerId,
        comparison: NumericComparison,
        score: ScoreType,
        quantity: u32,
    ) -> Self {
        Self {
            player: player as u32,
            arg: score as u8,
            quantity,
            ..Self::quantified(ConditionKind::Score, comparison)
        }
    }

    /// `player` has the lowest score of `kind`.
    pub fn lowest_score(player: PlayerId, score: ScoreType) -> Self {
        Self {
            kind: ConditionKind::LowestScore,
            player: player as u32,
            arg: score as u8,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// `player` has the highest score of `kind`.
    pub fn highest_score(player: PlayerId, score: ScoreType) -> Self {
        Self {
            kind: ConditionKind::HighestScore,
            player: player as u32,
            arg: score as u8,
            flags: ConditionFlags::UNIT_TYPE_USED.bits(),
            ..Self::default()
        }
    }

    /// The countdown timer compares against `seconds`.
    pub fn countdown(comparison: NumericComparison, seconds: u32) -> Self {
        Self {
            quantity: seconds,
            ..Self::quantified(ConditionKind::CountdownTimer, comparison)
        }
    }

    /// `player` has `quantity` remaining opponents.
    pub fn opponents(player: PlayerId, comparison: NumericComparison, quantity: u32) -> Self {
        Self {
            player: player as u32,
            quantity,
            ..Self::quantified(ConditionKind::Opponents, comparison)
        }
    }

    /// Whether this slot is unused.
    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, ConditionKind::NoCondition)
    }

    /// Serializes the slot to its on-disk layout.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.location.to_le_bytes());
        buf[4..8].copy_from_slice(&self.player.to_le_bytes());
        buf[8..12].copy_from_slice(&self.quantity.to_le_bytes());
        buf[12..14].copy_from_slice(&self.unit.to_le_bytes());
        buf[14] = self.comparison;
        buf[15] = self.kind as u8;
        buf[16] = self.arg;
        buf[17] = self.flags;
        buf[18..20].copy_from_slice(&self.mask.to_le_bytes());
        buf
    }

    /// Reads a slot back from its on-disk layout.
    pub fn from_bytes(buf: &[u8; Self::LEN]) -> Result<Self, DecodeError> {
        Ok(Self {
            location: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            player: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            quantity: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            unit: u16::from_le_bytes([buf[12], buf[13]]),
            comparison: buf[14],
            kind: ConditionKind::try_from(buf[15])?,
            arg: buf[16],
            flags: buf[17],
            mask: u16::from_le_bytes([buf[18], buf[19]]),
        })
    }
}
