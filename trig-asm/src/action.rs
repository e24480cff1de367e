//! The 32-byte action record and its discriminants.

use crate::macros::impl_try_from_u8;
use crate::types::{
    AllianceStatus, DecodeError, LocationId, PlayerId, ResourceType, ScoreType, StringId,
    SwitchId, UnitId,
};

/// Action discriminant as stored at byte 26 of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
#[allow(missing_docs)] // names match the engine's action table one to one
pub enum ActionKind {
    NoAction = 0,
    Victory = 1,
    Defeat = 2,
    PreserveTrigger = 3,
    Wait = 4,
    PauseGame = 5,
    UnpauseGame = 6,
    Transmission = 7,
    PlayWav = 8,
    DisplayTextMessage = 9,
    CenterView = 10,
    CreateUnitWithProperties = 11,
    SetMissionObjectives = 12,
    SetSwitch = 13,
    SetCountdownTimer = 14,
    RunAiScript = 15,
    RunAiScriptAtLocation = 16,
    LeaderboardControl = 17,
    LeaderboardControlAtLocation = 18,
    LeaderboardResources = 19,
    LeaderboardKills = 20,
    LeaderboardPoints = 21,
    KillUnit = 22,
    KillUnitAtLocation = 23,
    RemoveUnit = 24,
    RemoveUnitAtLocation = 25,
    SetResources = 26,
    SetScore = 27,
    MinimapPing = 28,
    TalkingPortrait = 29,
    MuteUnitSpeech = 30,
    UnmuteUnitSpeech = 31,
    LeaderboardComputerPlayers = 32,
    LeaderboardGoalControl = 33,
    LeaderboardGoalControlAtLocation = 34,
    LeaderboardGoalResources = 35,
    LeaderboardGoalKills = 36,
    LeaderboardGoalPoints = 37,
    MoveLocation = 38,
    MoveUnit = 39,
    LeaderboardGreed = 40,
    SetNextScenario = 41,
    SetDoodadState = 42,
    SetInvincibility = 43,
    CreateUnit = 44,
    SetDeaths = 45,
    Order = 46,
    Comment = 47,
    GiveUnitsToPlayer = 48,
    ModifyUnitHitPoints = 49,
    ModifyUnitEnergy = 50,
    ModifyUnitShieldPoints = 51,
    ModifyUnitResourceAmount = 52,
    ModifyUnitHangarCount = 53,
    PauseTimer = 54,
    UnpauseTimer = 55,
    Draw = 56,
    SetAllianceStatus = 57,
}

impl_try_from_u8!(ActionKind, ActionKind, {
    NoAction = 0,
    Victory = 1,
    Defeat = 2,
    PreserveTrigger = 3,
    Wait = 4,
    PauseGame = 5,
    UnpauseGame = 6,
    Transmission = 7,
    PlayWav = 8,
    DisplayTextMessage = 9,
    CenterView = 10,
    CreateUnitWithProperties = 11,
    SetMissionObjectives = 12,
    SetSwitch = 13,
    SetCountdownTimer = 14,
    RunAiScript = 15,
    RunAiScriptAtLocation = 16,
    LeaderboardControl = 17,
    LeaderboardControlAtLocation = 18,
    LeaderboardResources = 19,
    LeaderboardKills = 20,
    LeaderboardPoints = 21,
    KillUnit = 22,
    KillUnitAtLocation = 23,
    RemoveUnit = 24,
    RemoveUnitAtLocation = 25,
    SetResources = 26,
    SetScore = 27,
    MinimapPing = 28,
    TalkingPortrait = 29,
    MuteUnitSpeech = 30,
    UnmuteUnitSpeech = 31,
    LeaderboardComputerPlayers = 32,
    LeaderboardGoalControl = 33,
    LeaderboardGoalControlAtLocation = 34,
    LeaderboardGoalResources = 35,
    LeaderboardGoalKills = 36,
    LeaderboardGoalPoints = 37,
    MoveLocation = 38,
    MoveUnit = 39,
    LeaderboardGreed = 40,
    SetNextScenario = 41,
    SetDoodadState = 42,
    SetInvincibility = 43,
    CreateUnit = 44,
    SetDeaths = 45,
    Order = 46,
    Comment = 47,
    GiveUnitsToPlayer = 48,
    ModifyUnitHitPoints = 49,
    ModifyUnitEnergy = 50,
    ModifyUnitShieldPoints = 51,
    ModifyUnitResourceAmount = 52,
    ModifyUnitHangarCount = 53,
    PauseTimer = 54,
    UnpauseTimer = 55,
    Draw = 56,
    SetAllianceStatus = 57,
});

/// Modifier byte for actions that rewrite a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum NumberModifier {
    /// Replace the value.
    SetTo = 7,
    /// Add to the value.
    Add = 8,
    /// Subtract from the value, saturating at zero.
    Subtract = 9,
}

/// Modifier byte for the set-switch action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SwitchState {
    /// Set the switch.
    Set = 4,
    /// Clear the switch.
    Clear = 5,
    /// Invert the switch.
    Toggle = 6,
    /// Set the switch to a random state.
    Randomize = 11,
}

/// Modifier byte for doodad-state and invincibility actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ToggleState {
    /// Enable the state.
    Enable = 4,
    /// Disable the state.
    Disable = 5,
    /// Invert the state.
    Toggle = 6,
}

/// Modifier byte for the order action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum UnitOrder {
    /// Move to the destination.
    Move = 0,
    /// Patrol to the destination.
    Patrol = 1,
    /// Attack-move to the destination.
    Attack = 2,
}

bitflags::bitflags! {
    /// Action flag byte at offset 28.
    pub struct ActionFlags: u8 {
        /// The action is disabled in the editor.
        const DISABLED = 0x02;
        /// Always-display marker on text-bearing actions.
        const ALWAYS_DISPLAY = 0x04;
        /// The unit-properties field is meaningful.
        const UNIT_PROPERTIES_USED = 0x08;
        /// The unit-type field is meaningful.
        const UNIT_TYPE_USED = 0x10;
    }
}

/// One action slot, as laid out on disk.
///
/// | offset | field          |
/// |--------|----------------|
/// | 0      | `location`     |
/// | 4      | `text`         |
/// | 8      | `wav`          |
/// | 12     | `milliseconds` |
/// | 16     | `player`       |
/// | 20     | `arg0`         |
/// | 24     | `arg1`         |
/// | 26     | `kind`         |
/// | 27     | `modifier`     |
/// | 28     | `flags`        |
/// | 29     | `pad`          |
/// | 30     | `mask`         |
///
/// Location and string references are stored one-based. `arg0` is the
/// kind-specific dword (destination location, jump address, switch id, CUWP
/// slot, amount); `arg1` is the kind-specific word (unit type, resource or
/// score selector, alliance status). `modifier` is kept raw because it
/// multiplexes four small enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Action {
    /// One-based source-location reference, 0 when unused.
    pub location: u32,
    /// One-based display-string reference, 0 when unused.
    pub text: u32,
    /// One-based sound-string reference, 0 when unused.
    pub wav: u32,
    /// Duration payload in milliseconds (seconds for the countdown timer).
    pub milliseconds: u32,
    /// Player group the action applies to.
    pub player: u32,
    /// Kind-specific dword.
    pub arg0: u32,
    /// Kind-specific word.
    pub arg1: u16,
    /// Action discriminant.
    pub kind: ActionKind,
    /// Raw modifier byte.
    pub modifier: u8,
    /// Flag byte.
    pub flags: u8,
    /// Reserved byte; always zero.
    pub pad: u8,
    /// Editor mask word; always zero in generated records.
    pub mask: u16,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            location: 0,
            text: 0,
            wav: 0,
            milliseconds: 0,
            player: 0,
            arg0: 0,
            arg1: 0,
            kind: ActionKind::NoAction,
            modifier: 0,
            flags: 0,
            pad: 0,
            mask: 0,
        }
    }
}

impl Action {
    /// Serialized size of one action slot.
    pub const LEN: usize = 32;

    fn of_kind(kind: ActionKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    fn displayed(kind: ActionKind) -> Self {
        Self {
            kind,
            flags: ActionFlags::ALWAYS_DISPLAY.bits(),
            ..Self::default()
        }
    }

    /// Re-arm the owning trigger for the next tick.
    pub fn preserve_trigger() -> Self {
        Self::of_kind(ActionKind::PreserveTrigger)
    }

    /// End the scenario in victory for the executing player.
    pub fn victory() -> Self {
        Self::displayed(ActionKind::Victory)
    }

    /// End the scenario in defeat for the executing player.
    pub fn defeat() -> Self {
        Self::displayed(ActionKind::Defeat)
    }

    /// End the scenario in a draw for the executing player.
    pub fn draw() -> Self {
        Self::displayed(ActionKind::Draw)
    }

    /// Suspend the executing player's trigger queue for `milliseconds`.
    pub fn wait(milliseconds: u32) -> Self {
        Self {
            milliseconds,
            ..Self::of_kind(ActionKind::Wait)
        }
    }

    /// Pause the game.
    pub fn pause_game() -> Self {
        Self::of_kind(ActionKind::PauseGame)
    }

    /// Resume the game.
    pub fn unpause_game() -> Self {
        Self::of_kind(ActionKind::UnpauseGame)
    }

    /// Write a death-counter cell `(player, unit)`.
    ///
    /// The only writable integer cell the engine offers; every virtual
    /// register mutation lowers to this.
    pub fn set_deaths(player: u32, unit: UnitId, modifier: NumberModifier, amount: u32) -> Self {
        Self {
            player,
            arg1: unit,
            arg0: amount,
            modifier: modifier as u8,
            ..Self::of_kind(ActionKind::SetDeaths)
        }
    }

    /// Show `text` in the executing player's message area.
    pub fn display_text(text: StringId) -> Self {
        Self {
            text: text + 1,
            ..Self::displayed(ActionKind::DisplayTextMessage)
        }
    }

    /// Attach `text` as an editor comment on the trigger.
    pub fn comment(text: StringId) -> Self {
        Self {
            text: text + 1,
            ..Self::displayed(ActionKind::Comment)
        }
    }

    /// Drive a global switch into `state`.
    pub fn set_switch(switch: SwitchId, state: SwitchState) -> Self {
        Self {
            arg0: switch,
            modifier: state as u8,
            ..Self::displayed(ActionKind::SetSwitch)
        }
    }

    /// Create `count` of `unit` for `player` at `location`, optionally from a
    /// unit-properties slot (one-based in the record).
    pub fn create_unit(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        location: LocationId,
        properties: Option<u32>,
    ) -> Self {
        let (kind, arg0) = match properties {
            Some(slot) => (ActionKind::CreateUnitWithProperties, slot + 1),
            None => (ActionKind::CreateUnit, 0),
        };
        Self {
            location: location + 1,
            player: player as u32,
            arg0,
            arg1: unit,
            modifier: count,
            ..Self::displayed(kind)
        }
    }

    /// Kill `count` of `unit` owned by `player`, optionally at a location.
    pub fn kill_unit(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        location: Option<LocationId>,
    ) -> Self {
        let (kind, location) = match location {
            Some(id) => (ActionKind::KillUnitAtLocation, id + 1),
            None => (ActionKind::KillUnit, 0),
        };
        Self {
            location,
            player: player as u32,
            arg1: unit,
            modifier: count,
            ..Self::of_kind(kind)
        }
    }

    /// Remove `count` of `unit` owned by `player`, optionally at a location.
    pub fn remove_unit(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        location: Option<LocationId>,
    ) -> Self {
        let (kind, location) = match location {
            Some(id) => (ActionKind::RemoveUnitAtLocation, id + 1),
            None => (ActionKind::RemoveUnit, 0),
        };
        Self {
            location,
            player: player as u32,
            arg1: unit,
            modifier: count,
            ..Self::displayed(kind)
        }
    }

    /// Teleport `count` of `unit` owned by `player` from `src` to `dst`.
    pub fn move_unit(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        src: LocationId,
        dst: LocationId,
    ) -> Self {
        Self {
            location: src + 1,
            arg0: dst + 1,
            player: player as u32,
            arg1: unit,
            modifier: count,
            ..Self::displayed(ActionKind::MoveUnit)
        }
    }

    /// Issue `order` to `unit` owned by `player` at `src`, targeting `dst`.
    pub fn order(
        player: PlayerId,
        unit: UnitId,
        order: UnitOrder,
        src: LocationId,
        dst: LocationId,
    ) -> Self {
        Self {
            location: src + 1,
            arg0: dst + 1,
            player: player as u32,
            arg1: unit,
            modifier: order as u8,
            ..Self::displayed(ActionKind::Order)
        }
    }

    fn modify(
        kind: ActionKind,
        player: PlayerId,
        unit: UnitId,
        count: u8,
        amount: u32,
        location: LocationId,
    ) -> Self {
        Self {
            location: location + 1,
            player: player as u32,
            arg0: amount,
            arg1: unit,
            modifier: count,
            ..Self::displayed(kind)
        }
    }

    /// Set hit points of `count` matching units to `percent`.
    pub fn modify_hit_points(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        percent: u32,
        location: LocationId,
    ) -> Self {
        Self::modify(ActionKind::ModifyUnitHitPoints, player, unit, count, percent, location)
    }

    /// Set energy of `count` matching units to `percent`.
    pub fn modify_energy(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        percent: u32,
        location: LocationId,
    ) -> Self {
        Self::modify(ActionKind::ModifyUnitEnergy, player, unit, count, percent, location)
    }

    /// Set shield points of `count` matching units to `percent`.
    pub fn modify_shield_points(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        percent: u32,
        location: LocationId,
    ) -> Self {
        Self::modify(ActionKind::ModifyUnitShieldPoints, player, unit, count, percent, location)
    }

    /// Set hangar count of `count` matching units to `amount`.
    pub fn modify_hangar_count(
        player: PlayerId,
        unit: UnitId,
        count: u8,
        amount: u32,
        location: LocationId,
    ) -> Self {
        Self::modify(ActionKind::ModifyUnitHangarCount, player, unit, count, amount, location)
    }

    /// Hand `count` of `unit` owned by `src_player` at `location` to
    /// `dst_player`.
    pub fn give_units(
        src_player: PlayerId,
        dst_player: PlayerId,
        unit: UnitId,
        count: u8,
        location: LocationId,
    ) -> Self {
        Self {
            location: location + 1,
            player: src_player as u32,
            arg0: dst_player as u32,
            arg1: unit,
            modifier: count,
            ..Self::displayed(ActionKind::GiveUnitsToPlayer)
        }
    }

    /// Center location `dst` on a `unit` owned by `player` inside `src`.
    pub fn move_location(
        player: PlayerId,
        unit: UnitId,
        src: LocationId,
        dst: LocationId,
    ) -> Self {
        Self {
            location: src + 1,
            arg0: dst + 1,
            player: player as u32,
            arg1: unit,
            ..Self::displayed(ActionKind::MoveLocation)
        }
    }

    /// Scroll the executing player's view to `location`.
    pub fn center_view(location: LocationId) -> Self {
        Self {
            location: location + 1,
            ..Self::displayed(ActionKind::CenterView)
        }
    }

    /// Ping the executing player's minimap at `location`.
    pub fn minimap_ping(location: LocationId) -> Self {
        Self {
            location: location + 1,
            ..Self::displayed(ActionKind::MinimapPing)
        }
    }

    /// Rewrite `player`'s stock of `resource`.
    pub fn set_resources(
        player: PlayerId,
        modifier: NumberModifier,
        resource: ResourceType,
        amount: u32,
    ) -> Self {
        Self {
            player: player as u32,
            arg0: amount,
            arg1: resource as u16,
            modifier: modifier as u8,
            ..Self::of_kind(ActionKind::SetResources)
        }
    }

    /// Rewrite `player`'s score of `kind`.
    pub fn set_score(
        player: PlayerId,
        modifier: NumberModifier,
        score: ScoreType,
        amount: u32,
    ) -> Self {
        Self {
            player: player as u32,
            arg0: amount,
            arg1: score as u16,
            modifier: modifier as u8,
            ..Self::of_kind(ActionKind::SetScore)
        }
    }

    /// Rewrite the countdown timer (`seconds`, despite the field name).
    pub fn set_countdown_timer(modifier: NumberModifier, seconds: u32) -> Self {
        Self {
            milliseconds: seconds,
            modifier: modifier as u8,
            ..Self::of_kind(ActionKind::SetCountdownTimer)
        }
    }

    /// Pause the countdown timer.
    pub fn pause_timer() -> Self {
        Self::of_kind(ActionKind::PauseTimer)
    }

    /// Resume the countdown timer.
    pub fn unpause_timer() -> Self {
        Self::of_kind(ActionKind::UnpauseTimer)
    }

    /// Pause all unit speech.
    pub fn mute_unit_speech() -> Self {
        Self::of_kind(ActionKind::MuteUnitSpeech)
    }

    /// Resume unit speech.
    pub fn unmute_unit_speech() -> Self {
        Self::of_kind(ActionKind::UnmuteUnitSpeech)
    }

    /// Show `unit`'s portrait talking for `milliseconds`.
    pub fn talking_portrait(unit: UnitId, milliseconds: u32) -> Self {
        Self {
            arg1: unit,
            milliseconds,
            ..Self::of_kind(ActionKind::TalkingPortrait)
        }
    }

    /// Flip doodads of type `unit` owned by `player` at `location`.
    pub fn set_doodad_state(
        player: PlayerId,
        unit: UnitId,
        state: ToggleState,
        location: LocationId,
    ) -> Self {
        Self {
            location: location + 1,
            player: player as u32,
            arg1: unit,
            modifier: state as u8,
            ..Self::of_kind(ActionKind::SetDoodadState)
        }
    }

    /// Flip invincibility of `unit` owned by `player` at `location`.
    pub fn set_invincibility(
        player: PlayerId,
        unit: UnitId,
        state: ToggleState,
        location: LocationId,
    ) -> Self {
        Self {
            location: location + 1,
            player: player as u32,
            arg1: unit,
            modifier: state as u8,
            ..Self::of_kind(ActionKind::SetInvincibility)
        }
    }

    /// Start AI script `script` (a four-character code) for `player`,
    /// optionally bound to a location.
    pub fn run_ai_script(player: PlayerId, script: u32, location: Option<LocationId>) -> Self {
        let (kind, location) = match location {
            Some(id) => (ActionKind::RunAiScriptAtLocation, id + 1),
            None => (ActionKind::RunAiScript, 0),
        };
        Self {
            location,
            player: player as u32,
            arg0: script,
            ..Self::of_kind(kind)
        }
    }

    /// Set the executing player's diplomacy towards `target`.
    pub fn set_alliance_status(target: PlayerId, status: AllianceStatus) -> Self {
        Self {
            player: target as u32,
            arg1: status as u16,
            ..Self::of_kind(ActionKind::SetAllianceStatus)
        }
    }

    /// Replace the executing player's mission objectives with `text`.
    pub fn set_mission_objectives(text: StringId) -> Self {
        Self {
            text: text + 1,
            ..Self::displayed(ActionKind::SetMissionObjectives)
        }
    }

    /// Load the scenario named by `text` after this one ends.
    pub fn set_next_scenario(text: StringId) -> Self {
        Self {
            text: text + 1,
            ..Self::displayed(ActionKind::SetNextScenario)
        }
    }

    /// Play the sound referenced by `wav` for `milliseconds`.
    pub fn play_wav(wav: StringId, milliseconds: u32) -> Self {
        Self {
            wav: wav + 1,
            milliseconds,
            ..Self::displayed(ActionKind::PlayWav)
        }
    }

    /// Show a transmission: `text` and `wav` from `unit` at `location`,
    /// with the ping duration rewritten by `modifier`/`amount`.
    #[allow(clippy::too_many_arguments)]
    pub fn transmission(
        text: StringId,
        unit: UnitId,
        location: LocationId,
        amount: u32,
        modifier: NumberModifier,
        wav: StringId,
        wav_milliseconds: u32,
    ) -> Self {
        Self {
            location: location + 1,
            text: text + 1,
            wav: wav + 1,
            milliseconds: wav_milliseconds,
            arg0: amount,
            arg1: unit,
            modifier: modifier as u8,
            ..Self::displayed(ActionKind::Transmission)
        }
    }

    /// Show the control leaderboard for `unit`, captioned `text`.
    pub fn leaderboard_control(text: StringId, unit: UnitId) -> Self {
        Self {
            text: text + 1,
            arg1: unit,
            ..Self::displayed(ActionKind::LeaderboardControl)
        }
    }

    /// Show the control-at-location leaderboard for `unit`, captioned `text`.
    pub fn leaderboard_control_at(text: StringId, unit: UnitId, location: LocationId) -> Self {
        Self {
            location: location + 1,
            text: text + 1,
            arg1: unit,
            ..Self::displayed(ActionKind::LeaderboardControlAtLocation)
        }
    }

    /// Show the resource leaderboard, captioned `text`.
    pub fn leaderboard_resources(text: StringId, resource: ResourceType) -> Self {
        Self {
            text: text + 1,
            arg1: resource as u16,
            ..Self::displayed(ActionKind::LeaderboardResources)
        }
    }

    /// Show the kills leaderboard for `unit`, captioned `text`.
    pub fn leaderboard_kills(text: StringId, unit: UnitId) -> Self {
        Self {
            text: text + 1,
            arg1: unit,
            ..Self::displayed(ActionKind::LeaderboardKills)
        }
    }

    /// Show the points leaderboard for `score`, captioned `text`.
    pub fn leaderboard_points(text: StringId, score: ScoreType) -> Self {
        Self {
            text: text + 1,
            arg1: score as u16,
            ..Self::displayed(ActionKind::LeaderboardPoints)
        }
    }

    /// Show the greed leaderboard, captioned `text`.
    pub fn leaderboard_greed(text: StringId) -> Self {
        Self {
            text: text + 1,
            ..Self::displayed(ActionKind::LeaderboardGreed)
        }
    }

    /// Include or exclude computer players from leaderboards.
    pub fn leaderboard_computer_players(state: ToggleState) -> Self {
        Self {
            modifier: state as u8,
            ..Self::displayed(ActionKind::LeaderboardComputerPlayers)
        }
    }

    /// Whether this slot is unused.
    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, ActionKind::NoAction)
    }

    /// Serializes the slot to its on-disk layout.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.location.to_le_bytes());
        buf[4..8].copy_from_slice(&self.text.to_le_bytes());
        buf[8..12].copy_from_slice(&self.wav.to_le_bytes());
        buf[12..16].copy_from_slice(&self.milliseconds.to_le_bytes());
        buf[16..20].copy_from_slice(&self.player.to_le_bytes());
        buf[20..24].copy_from_slice(&self.arg0.to_le_bytes());
        buf[24..26].copy_from_slice(&self.arg1.to_le_bytes());
        buf[26] = self.kind as u8;
        buf[27] = self.modifier;
        buf[28] = self.flags;
        buf[29] = self.pad;
        buf[30..32].copy_from_slice(&self.mask.to_le_bytes());
        buf
    }

    /// Reads a slot back from its on-disk layout.
    pub fn from_bytes(buf: &[u8; Self::LEN]) -> Result<Self, DecodeError> {
        Ok(Self {
            location: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            text: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            wav: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            milliseconds: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            player: u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]),
            arg0: u32::from_le_bytes([buf[20], buf[21], buf[22], buf[23]]),
            arg1: u16::from_le_bytes([buf[24], buf[25]]),
            kind: ActionKind::try_from(buf[26])?,
            modifier: buf[27],
            flags: buf[28],
            pad: buf[29],
            mask: u16::from_le_bytes([buf[30], buf[31]]),
        })
    }
}
