use serde::{Deserialize, Serialize};

/// Size of every per-slot table, including the reserved slot 0.
pub const MAX_PLAYERS: usize = 2048;

/// A player's slot in the shared player table. Always in `1..MAX_PLAYERS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PlayerIndex(u16);

impl PlayerIndex {
    /// Returns `None` for the reserved slot 0 and anything past the table.
    pub fn new(index: u16) -> Option<Self> {
        if index == 0 || index as usize >= MAX_PLAYERS {
            None
        } else {
            Some(Self(index))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Every valid slot in ascending order.
    pub fn all() -> impl Iterator<Item = PlayerIndex> {
        (1..MAX_PLAYERS as u16).map(PlayerIndex)
    }
}

impl std::fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P#{}", self.0)
    }
}
