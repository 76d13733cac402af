//! The shared player registry.
//!
//! Only the tick thread mutates it, through `register` and `unregister`.
//! Per-tick readers work from a [`TileSnapshot`] taken after every
//! registration for the tick has landed.

use std::collections::HashMap;

use gpi::TileView;
use session::SessionId;
use slots::{PlayerIndex, SlotAllocator, SlotError, MAX_PLAYERS};
use space::Tile;

use crate::player::Player;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("world is full")]
    Full,

    #[error("session {0} already has a player")]
    SessionTaken(SessionId),

    #[error("{0} is already logged in")]
    AlreadyOnline(String),

    #[error(transparent)]
    Slot(#[from] SlotError),
}

/// Positions of every registered player at one instant.
#[derive(Debug, Clone)]
pub struct TileSnapshot {
    tiles: Vec<Option<Tile>>,
}

impl TileView for TileSnapshot {
    fn tile(&self, index: PlayerIndex) -> Option<Tile> {
        self.tiles[index.as_usize()]
    }
}

#[derive(Debug)]
pub struct World {
    players: Vec<Option<Player>>,
    slots: SlotAllocator,
    by_session: HashMap<SessionId, PlayerIndex>,
    by_name: HashMap<String, PlayerIndex>,
    // Previous slot per username, offered back on the next login.
    last_slots: HashMap<String, PlayerIndex>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            players: (0..MAX_PLAYERS).map(|_| None).collect(),
            slots: SlotAllocator::new(),
            by_session: HashMap::new(),
            by_name: HashMap::new(),
            last_slots: HashMap::new(),
        }
    }

    pub fn population(&self) -> usize {
        self.slots.allocated_count()
    }

    pub fn is_full(&self) -> bool {
        self.population() >= MAX_PLAYERS - 1
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.by_name.contains_key(username)
    }

    /// Slot the player held last time, if it is free again.
    pub fn preferred_slot(&self, username: &str) -> Option<PlayerIndex> {
        self.last_slots
            .get(username)
            .copied()
            .filter(|&idx| !self.slots.is_allocated(idx))
    }

    /// Claims a slot (the preferred one when free) and stores the player
    /// `build` makes for it.
    pub fn register(
        &mut self,
        session_id: SessionId,
        username: &str,
        preferred: Option<PlayerIndex>,
        build: impl FnOnce(PlayerIndex) -> Player,
    ) -> Result<PlayerIndex, RegistryError> {
        if self.by_session.contains_key(&session_id) {
            return Err(RegistryError::SessionTaken(session_id));
        }
        if self.is_online(username) {
            return Err(RegistryError::AlreadyOnline(username.to_string()));
        }
        let index = match preferred {
            Some(idx) if !self.slots.is_allocated(idx) => self.slots.reserve(idx.get())?,
            _ => self.slots.allocate().map_err(|e| match e {
                SlotError::Full => RegistryError::Full,
                other => other.into(),
            })?,
        };

        // A slot is remembered for at most one name, so this stays bounded
        // by the slot count.
        self.last_slots.retain(|_, idx| *idx != index);
        self.players[index.as_usize()] = Some(build(index));
        self.by_session.insert(session_id, index);
        self.by_name.insert(username.to_string(), index);
        tracing::debug!(%index, %session_id, username, "registered");
        Ok(index)
    }

    /// Removes a player, scrubbing its slot from everyone else's view before
    /// the slot can be handed out again. Idempotent.
    pub fn unregister(&mut self, index: PlayerIndex) -> Option<Player> {
        let mut player = self.players[index.as_usize()].take()?;
        self.by_session.retain(|_, idx| *idx != index);
        self.by_name.remove(&player.profile.username);

        for other in self.players.iter_mut().flatten() {
            other.gpi_mut().evict(index);
        }
        player.on_unregister();
        self.last_slots
            .insert(player.profile.username.clone(), index);
        if let Err(e) = self.slots.release(index) {
            tracing::warn!(%index, error = %e, "slot already free");
        }
        tracing::info!(%index, username = %player.profile.username, "player unregistered");
        Some(player)
    }

    pub fn unregister_session(&mut self, session_id: SessionId) -> Option<Player> {
        let index = self.by_session.get(&session_id).copied()?;
        self.unregister(index)
    }

    pub fn index_of(&self, session_id: SessionId) -> Option<PlayerIndex> {
        self.by_session.get(&session_id).copied()
    }

    pub fn get(&self, index: PlayerIndex) -> Option<&Player> {
        self.players[index.as_usize()].as_ref()
    }

    pub fn get_mut(&mut self, index: PlayerIndex) -> Option<&mut Player> {
        self.players[index.as_usize()].as_mut()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().flatten()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut().flatten()
    }

    pub fn snapshot(&self) -> TileSnapshot {
        TileSnapshot {
            tiles: self
                .players
                .iter()
                .map(|slot| slot.as_ref().map(Player::tile))
                .collect(),
        }
    }

    /// Unregisters players whose connection has gone away.
    pub fn reap_inactive(&mut self) -> usize {
        let stale: Vec<PlayerIndex> = self
            .players()
            .filter(|p| !p.is_active())
            .map(Player::index)
            .collect();
        for &index in &stale {
            self.unregister(index);
        }
        stale.len()
    }
}
