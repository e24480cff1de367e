//! The scenario-map view the generator works against.
//!
//! The map-file layer owns parsing and persistence; the generator only needs
//! a handful of chunks: the string table, the location table, the
//! unit-property slots and their usage bitmap, the trigger chunk, and
//! (optionally) the player-slot controllers. [`MapData`] carries each as an
//! `Option`; compilation fails with [`CodegenError::MissingChunk`] for any
//! required chunk that is absent.
//!
//! [`CodegenError::MissingChunk`]: crate::CodegenError::MissingChunk

use trig_asm::{LocationId, StringId, UnitProperties};

/// The scenario's interned strings.
///
/// Ids are zero-based here; records reference them one-based.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Finds an already-interned string.
    pub fn find(&self, text: &str) -> Option<StringId> {
        self.strings
            .iter()
            .position(|s| s == text)
            .map(|at| at as StringId)
    }

    /// Interns a string, reusing the id of an equal one.
    pub fn intern(&mut self, text: &str) -> StringId {
        match self.find(text) {
            Some(id) => id,
            None => {
                self.strings.push(text.to_owned());
                (self.strings.len() - 1) as StringId
            }
        }
    }

    /// The string behind an id.
    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get(id as usize).map(String::as_str)
    }
}

/// The scenario's location table. Each slot holds the one-based string id of
/// the location's name, zero meaning the slot is unused.
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    name_strings: Vec<u32>,
}

impl LocationTable {
    /// Appends a location whose name is `string` (one-based), returning its
    /// id.
    pub fn push(&mut self, string: u32) -> LocationId {
        self.name_strings.push(string);
        (self.name_strings.len() - 1) as LocationId
    }

    /// Finds the location named by the one-based string id.
    pub fn find_by_string(&self, string: u32) -> Option<LocationId> {
        self.name_strings
            .iter()
            .position(|&s| s != 0 && s == string)
            .map(|at| at as LocationId)
    }
}

/// The 64 unit-property template slots of the scenario.
#[derive(Debug, Clone)]
pub struct CuwpSlots {
    slots: [UnitProperties; Self::COUNT],
}

impl CuwpSlots {
    /// Number of slots the engine provides.
    pub const COUNT: usize = 64;

    /// Overwrites a slot.
    pub fn set(&mut self, slot: usize, properties: UnitProperties) {
        self.slots[slot] = properties;
    }

    /// Reads a slot.
    pub fn get(&self, slot: usize) -> &UnitProperties {
        &self.slots[slot]
    }
}

impl Default for CuwpSlots {
    fn default() -> Self {
        Self {
            slots: [UnitProperties::default(); Self::COUNT],
        }
    }
}

/// The unit-property slot usage bitmap.
#[derive(Debug, Clone)]
pub struct CuwpUsedSlots {
    used: [bool; CuwpSlots::COUNT],
}

impl Default for CuwpUsedSlots {
    fn default() -> Self {
        Self {
            used: [false; CuwpSlots::COUNT],
        }
    }
}

impl CuwpUsedSlots {
    /// Index of the first free slot, if any.
    pub fn find_free(&self) -> Option<usize> {
        self.used.iter().position(|&used| !used)
    }

    /// Marks a slot used or free.
    pub fn set_used(&mut self, slot: usize, used: bool) {
        self.used[slot] = used;
    }

    /// Whether a slot is used.
    pub fn is_used(&self, slot: usize) -> bool {
        self.used[slot]
    }
}

/// The raw trigger chunk bytes.
#[derive(Debug, Clone, Default)]
pub struct TrigChunk {
    bytes: Vec<u8>,
}

impl TrigChunk {
    /// Wraps existing chunk bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The chunk bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of whole records in the chunk.
    pub fn trigger_count(&self) -> usize {
        self.bytes.len() / trig_asm::Trigger::LEN
    }

    /// Replaces the chunk bytes.
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }
}

/// Controller byte marking a player slot as computer-owned.
pub const CONTROLLER_COMPUTER: u8 = 5;
/// Controller byte marking a player slot as human-owned.
pub const CONTROLLER_HUMAN: u8 = 6;

/// The per-player controller bytes (the `OWNR` chunk).
#[derive(Debug, Clone, Default)]
pub struct PlayerSlots {
    controllers: [u8; 12],
}

impl PlayerSlots {
    /// Wraps existing controller bytes.
    pub fn new(controllers: [u8; 12]) -> Self {
        Self { controllers }
    }

    /// Whether the zero-based player slot is human-controlled.
    pub fn is_human(&self, player: u8) -> bool {
        self.controllers
            .get(player as usize)
            .map_or(false, |&c| c == CONTROLLER_HUMAN)
    }

    /// Rewrites the zero-based player slot to computer control.
    pub fn set_computer(&mut self, player: u8) {
        if let Some(slot) = self.controllers.get_mut(player as usize) {
            *slot = CONTROLLER_COMPUTER;
        }
    }
}

/// The chunks of one scenario, as handed over by the map-file layer.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    /// The string table; required.
    pub strings: Option<StringTable>,
    /// The location table; required.
    pub locations: Option<LocationTable>,
    /// The unit-property slots; required.
    pub unit_slots: Option<CuwpSlots>,
    /// The unit-property usage bitmap; required.
    pub used_unit_slots: Option<CuwpUsedSlots>,
    /// The trigger chunk; required.
    pub triggers: Option<TrigChunk>,
    /// The player-slot controllers; optional.
    pub player_slots: Option<PlayerSlots>,
}

impl MapData {
    /// An empty in-memory scenario with every chunk present. The integration
    /// tests compile against this.
    pub fn blank() -> Self {
        Self {
            strings: Some(StringTable::default()),
            locations: Some(LocationTable::default()),
            unit_slots: Some(CuwpSlots::default()),
            used_unit_slots: Some(CuwpUsedSlots::default()),
            triggers: Some(TrigChunk::default()),
            player_slots: Some(PlayerSlots::default()),
        }
    }

    /// Interns `name` and appends a location carrying it, returning the new
    /// location's id.
    ///
    /// # Panics
    ///
    /// Panics if the string or location chunk is absent.
    pub fn add_location(&mut self, name: &str) -> LocationId {
        let strings = self.strings.as_mut().expect("string chunk");
        let id = strings.intern(name);
        self.locations
            .as_mut()
            .expect("location chunk")
            .push(id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_reuses_ids() {
        let mut strings = StringTable::default();
        let a = strings.intern("hello");
        let b = strings.intern("world");
        let c = strings.intern("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(strings.get(b), Some("world"));
    }

    #[test]
    fn locations_resolve_by_name_string() {
        let mut map = MapData::blank();
        let id = map.add_location("Arena");
        let strings = map.strings.as_ref().unwrap();
        let string = strings.find("Arena").unwrap();
        let locations = map.locations.as_ref().unwrap();
        assert_eq!(locations.find_by_string(string + 1), Some(id));
        assert_eq!(locations.find_by_string(999), None);
    }

    #[test]
    fn free_unit_slots_are_scanned_in_order() {
        let mut used = CuwpUsedSlots::default();
        assert_eq!(used.find_free(), Some(0));
        used.set_used(0, true);
        used.set_used(1, true);
        assert_eq!(used.find_free(), Some(2));
    }
}
