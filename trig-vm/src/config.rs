//! Compile-time configuration.

use crate::consts::{
    DEFAULT_COPY_BATCH_SIZE, DEFAULT_HYPER_TRIGGER_COUNT, DEFAULT_TRIGGERS_OWNER,
};

/// Options of one compilation. Construct with [`Config::default`] and
/// override fields as needed.
#[derive(Debug, Clone)]
pub struct Config {
    /// 1-based player that owns the executive trigger logic.
    pub triggers_owner: u8,
    /// Power-of-two upper bound of the drain fan-out. Smaller values emit
    /// fewer triggers but make runtime arithmetic slower.
    pub copy_batch_size: u32,
    /// Hyper-triggers appended after the program to keep the engine ticking
    /// at frame rate.
    pub hyper_trigger_count: usize,
    /// Concatenate the scenario's existing triggers after the generated
    /// ones.
    pub preserve_triggers: bool,
    /// Rewrite a human triggers-owner slot to computer control instead of
    /// just warning about it.
    pub force_computer_owner: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            triggers_owner: DEFAULT_TRIGGERS_OWNER,
            copy_batch_size: DEFAULT_COPY_BATCH_SIZE,
            hyper_trigger_count: DEFAULT_HYPER_TRIGGER_COUNT,
            preserve_triggers: false,
            force_computer_owner: false,
        }
    }
}
