//! The register map: virtual registers pinned to death-counter cells.

use tracing::warn;
use trig_asm::{PlayerId, UnitId, UNIT_TYPE_COUNT};

use crate::consts::{DEFAULT_REGISTER_POOL, MIN_USEFUL_REGISTERS, Register};
use crate::error::{CodegenError, CodegenResult};

/// One death-counter cell backing a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDef {
    /// Player row of the cell.
    pub player: PlayerId,
    /// Unit-type column of the cell.
    pub unit: UnitId,
}

/// The immutable handle → cell binding, built once per compile.
///
/// Handle 0 is the instruction counter, handles up to
/// [`RESERVED_REGISTERS`] serve the arithmetic macros, and the remainder is
/// the descending stack.
///
/// [`RESERVED_REGISTERS`]: crate::consts::RESERVED_REGISTERS
#[derive(Debug, Clone)]
pub struct RegisterMap {
    cells: Vec<RegisterDef>,
}

impl RegisterMap {
    /// Builds the map from an explicit cell list.
    pub fn from_defs(cells: Vec<RegisterDef>) -> Self {
        if cells.len() < MIN_USEFUL_REGISTERS {
            warn!(
                cells = cells.len(),
                "register map is small; programs will run out of stack quickly"
            );
        }
        Self { cells }
    }

    /// Builds the default map: the pool of unused unit types, sorted,
    /// repeated across players 0..8.
    pub fn with_default_pool() -> Self {
        let mut pool = DEFAULT_REGISTER_POOL.to_vec();
        pool.sort_unstable();

        let mut cells = Vec::with_capacity(pool.len() * 8);
        for player in 0..8 {
            for &unit in &pool {
                cells.push(RegisterDef { player, unit });
            }
        }
        Self::from_defs(cells)
    }

    /// Number of cells in the map.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the map has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resolves a handle to its cell.
    pub fn lookup(&self, register: Register) -> CodegenResult<RegisterDef> {
        self.cells
            .get(register)
            .copied()
            .ok_or(CodegenError::OutOfRegisters {
                register,
                cells: self.cells.len(),
                ir: None,
            })
    }

    /// Parses a textual register map: one cell per line, `player, unit-id`,
    /// where the player is `Player N` (1-based) or a bare 0-based index and
    /// the unit id is numeric. Blank lines are skipped.
    pub fn parse_defs(text: &str) -> Result<Vec<RegisterDef>, ParseRegisterMapError> {
        let mut defs = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (player, unit) =
                trimmed
                    .split_once(',')
                    .ok_or(ParseRegisterMapError::MissingComma { line })?;

            let player = parse_player(player.trim())
                .ok_or_else(|| ParseRegisterMapError::BadPlayer {
                    line,
                    text: player.trim().to_owned(),
                })?;

            let unit: UnitId = unit
                .trim()
                .parse()
                .ok()
                .filter(|&id| (id as usize) < UNIT_TYPE_COUNT)
                .ok_or_else(|| ParseRegisterMapError::BadUnit {
                    line,
                    text: unit.trim().to_owned(),
                })?;

            defs.push(RegisterDef { player, unit });
        }
        Ok(defs)
    }
}

fn parse_player(text: &str) -> Option<PlayerId> {
    if let Some(rest) = text
        .strip_prefix("Player ")
        .or_else(|| text.strip_prefix("player "))
    {
        let n: u8 = rest.trim().parse().ok()?;
        (1..=12).contains(&n).then(|| n - 1)
    } else {
        let n: u8 = text.parse().ok()?;
        (n < 12).then_some(n)
    }
}

/// Failure while parsing a textual register map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRegisterMapError {
    /// The line has no `player, unit` separator.
    #[error("malformed line {line} in register map: expected `player, unit-id`")]
    MissingComma {
        /// 1-based line number.
        line: usize,
    },
    /// The player half does not name a player.
    #[error("invalid player {text:?} on line {line} in register map")]
    BadPlayer {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
    /// The unit half is not a unit id.
    #[error("invalid unit id {text:?} on line {line} in register map")]
    BadUnit {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_pool_cells_do_not_alias() {
        let map = RegisterMap::with_default_pool();
        let distinct: HashSet<_> = (0..map.len())
            .map(|handle| map.lookup(handle).unwrap())
            .map(|cell| (cell.player, cell.unit))
            .collect();
        assert_eq!(distinct.len(), map.len());
        assert!(map.len() >= MIN_USEFUL_REGISTERS);
    }

    #[test]
    fn lookup_past_the_map_fails() {
        let map = RegisterMap::with_default_pool();
        let err = map.lookup(map.len()).unwrap_err();
        assert!(matches!(err, CodegenError::OutOfRegisters { .. }));
    }

    #[test]
    fn parses_textual_definitions() {
        let defs = RegisterMap::parse_defs("Player 8, 203\n\n3, 91\n").unwrap();
        assert_eq!(
            defs,
            vec![
                RegisterDef { player: 7, unit: 203 },
                RegisterDef { player: 3, unit: 91 },
            ]
        );
    }

    #[test]
    fn rejects_malformed_definitions() {
        assert_eq!(
            RegisterMap::parse_defs("Player 8 203"),
            Err(ParseRegisterMapError::MissingComma { line: 1 })
        );
        assert!(matches!(
            RegisterMap::parse_defs("Player 13, 203"),
            Err(ParseRegisterMapError::BadPlayer { line: 1, .. })
        ));
        assert!(matches!(
            RegisterMap::parse_defs("Player 2, 228"),
            Err(ParseRegisterMapError::BadUnit { line: 1, .. })
        ));
    }
}
