//! The 2400-byte trigger record and whole-chunk serialization.

use crate::action::Action;
use crate::condition::Condition;
use crate::types::{DecodeError, PlayerId};

/// One trigger record: 16 condition slots, 64 action slots, execution flags
/// and the per-player execution mask, exactly as stored in a `TRIG` chunk.
///
/// The engine evaluates every record owned by a player once per tick, in
/// declaration order. Conditions are conjunctive; empty slots are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Condition slots; unused slots hold [`ConditionKind::NoCondition`].
    ///
    /// [`ConditionKind::NoCondition`]: crate::ConditionKind::NoCondition
    pub conditions: [Condition; Self::CONDITION_SLOTS],
    /// Action slots; unused slots hold [`ActionKind::NoAction`].
    ///
    /// [`ActionKind::NoAction`]: crate::ActionKind::NoAction
    pub actions: [Action; Self::ACTION_SLOTS],
    /// Execution flag word; zero in generated records.
    pub execution_flags: u32,
    /// One byte per player group; a non-zero byte at index `p` makes player
    /// `p` execute the record.
    pub execution_mask: [u8; Self::MASK_LEN],
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            conditions: [Condition::default(); Self::CONDITION_SLOTS],
            actions: [Action::default(); Self::ACTION_SLOTS],
            execution_flags: 0,
            execution_mask: [0; Self::MASK_LEN],
        }
    }
}

impl Trigger {
    /// Number of condition slots in a record.
    pub const CONDITION_SLOTS: usize = 16;
    /// Number of action slots in a record.
    pub const ACTION_SLOTS: usize = 64;
    /// Length of the execution mask in bytes.
    pub const MASK_LEN: usize = 28;
    /// Serialized size of one record.
    pub const LEN: usize = Self::CONDITION_SLOTS * Condition::LEN
        + Self::ACTION_SLOTS * Action::LEN
        + 4
        + Self::MASK_LEN;

    /// Marks `player` as an executor of this record.
    pub fn execute_for(&mut self, player: PlayerId) {
        self.execution_mask[player as usize] = 1;
    }

    /// Clears the mask, then marks `player` as the sole executor.
    pub fn set_sole_executor(&mut self, player: PlayerId) {
        self.execution_mask = [0; Self::MASK_LEN];
        self.execution_mask[player as usize] = 1;
    }

    /// Index of the first free action slot, if any.
    pub fn first_free_action(&self) -> Option<usize> {
        self.actions.iter().position(Action::is_empty)
    }

    /// Serializes the record to its on-disk layout.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        let mut at = 0;
        for condition in &self.conditions {
            buf[at..at + Condition::LEN].copy_from_slice(&condition.to_bytes());
            at += Condition::LEN;
        }
        for action in &self.actions {
            buf[at..at + Action::LEN].copy_from_slice(&action.to_bytes());
            at += Action::LEN;
        }
        buf[at..at + 4].copy_from_slice(&self.execution_flags.to_le_bytes());
        buf[at + 4..].copy_from_slice(&self.execution_mask);
        buf
    }

    /// Reads a record back from its on-disk layout.
    pub fn from_bytes(buf: &[u8; Self::LEN]) -> Result<Self, DecodeError> {
        let mut trigger = Self::default();
        let mut at = 0;
        for condition in trigger.conditions.iter_mut() {
            let chunk: &[u8; Condition::LEN] =
                buf[at..at + Condition::LEN].try_into().expect("slot width");
            *condition = Condition::from_bytes(chunk)?;
            at += Condition::LEN;
        }
        for action in trigger.actions.iter_mut() {
            let chunk: &[u8; Action::LEN] =
                buf[at..at + Action::LEN].try_into().expect("slot width");
            *action = Action::from_bytes(chunk)?;
            at += Action::LEN;
        }
        trigger.execution_flags = u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        trigger.execution_mask.copy_from_slice(&buf[at + 4..]);
        Ok(trigger)
    }
}

/// Serializes records back to back; the result is `triggers.len() * 2400`
/// bytes.
pub fn serialize_triggers(triggers: &[Trigger]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(triggers.len() * Trigger::LEN);
    for trigger in triggers {
        bytes.extend_from_slice(&trigger.to_bytes());
    }
    bytes
}

/// Parses a whole `TRIG` chunk back into records.
pub fn parse_triggers(bytes: &[u8]) -> Result<Vec<Trigger>, DecodeError> {
    if bytes.len() % Trigger::LEN != 0 {
        return Err(DecodeError::TruncatedChunk {
            len: bytes.len(),
            record: Trigger::LEN,
        });
    }
    bytes
        .chunks_exact(Trigger::LEN)
        .map(|chunk| {
            let chunk: &[u8; Trigger::LEN] = chunk.try_into().expect("chunk width");
            Trigger::from_bytes(chunk)
        })
        .collect()
}
