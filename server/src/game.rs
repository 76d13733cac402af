use accounts::Profile;
use engine_core::{FlushStats, TickTarget};
use net::{LoginReply, NetToTick, PlayerRx};
use protocol::login::LoginResponseEncoder;
use protocol::{Encoder, GamePacketEncoder, LoginResponse, LoginStatus};
use session::{ConnectionHandle, Session};
use space::{RegionKeyStore, Tile};

use crate::login;
use crate::player::Player;
use crate::world::{RegistryError, World};

/// Values the tick thread needs from configuration.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub revision: u32,
    pub queue_capacity: usize,
    pub spawn: Tile,
    pub view_distance: u16,
}

/// Everything the tick thread owns.
pub struct Game {
    pub world: World,
    settings: GameSettings,
    region_keys: Box<dyn RegionKeyStore>,
    player_rx: PlayerRx,
}

impl Game {
    pub fn new(
        settings: GameSettings,
        region_keys: Box<dyn RegionKeyStore>,
        player_rx: PlayerRx,
    ) -> Self {
        Self {
            world: World::new(),
            settings,
            region_keys,
            player_rx,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    fn handle_login(
        &mut self,
        profile: Profile,
        handle: ConnectionHandle,
        encoder: GamePacketEncoder,
        reply: LoginReply,
    ) {
        let session_id = handle.session_id();
        let username = profile.username.clone();
        let response = match login::admit(&profile, &self.world) {
            Err(status) => LoginResponse::Rejected(status),
            Ok(()) => {
                let privilege = profile.privilege;
                let preferred = self.world.preferred_slot(&username);
                let spawn = self.settings.spawn;
                let session = Session::new(handle.clone(), encoder, self.settings.queue_capacity);
                match self.world.register(session_id, &username, preferred, |index| {
                    Player::new(profile, index, spawn, session)
                }) {
                    Ok(index) => LoginResponse::Accepted {
                        privilege,
                        index: index.get(),
                    },
                    Err(RegistryError::Full) => LoginResponse::Rejected(LoginStatus::WorldFull),
                    Err(RegistryError::AlreadyOnline(_)) => {
                        LoginResponse::Rejected(LoginStatus::AlreadyOnline)
                    }
                    Err(e) => {
                        tracing::warn!(%session_id, error = %e, "registration failed");
                        LoginResponse::Rejected(LoginStatus::CouldNotComplete)
                    }
                }
            }
        };

        // The response goes out ahead of anything the player queues.
        let mut buf = bytes::BytesMut::new();
        if let Err(e) = LoginResponseEncoder.encode(response, &mut buf) {
            tracing::warn!(%session_id, error = %e, "could not encode login response");
        }
        handle.send(buf.freeze());

        match response {
            LoginResponse::Accepted { index, .. } => {
                let snapshot = self.world.snapshot();
                if let Some(player) = slots::PlayerIndex::new(index).and_then(|i| self.world.get_mut(i)) {
                    player.login(&snapshot, &*self.region_keys);
                }
            }
            LoginResponse::Rejected(status) => {
                tracing::info!(%session_id, %username, ?status, "login rejected");
                handle.close();
            }
        }

        if reply.send(response).is_err() {
            // Connection task is gone; reaping will pick the player up.
            tracing::debug!(%session_id, "login reply dropped");
            handle.close();
        }
    }

    /// Sends every player a logout, flushes it, then empties the world.
    pub fn shutdown(&mut self) {
        let mut indexes = Vec::new();
        for player in self.world.players_mut() {
            player.send_logout();
            indexes.push(player.index());
        }
        tracing::info!(players = indexes.len(), "logged out all players");
        for index in indexes {
            self.world.unregister(index);
        }
    }
}

impl TickTarget for Game {
    fn process_inbound(&mut self, _tick: u64) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.player_rx.try_recv() {
            handled += 1;
            match event {
                NetToTick::Login {
                    profile,
                    handle,
                    encoder,
                    reply,
                } => self.handle_login(profile, handle, encoder, reply),
                NetToTick::Message {
                    session_id,
                    message,
                } => {
                    let player = self
                        .world
                        .index_of(session_id)
                        .and_then(|index| self.world.get_mut(index));
                    match player {
                        Some(player) => player.deliver(message),
                        None => tracing::debug!(%session_id, "message for unknown session"),
                    }
                }
                NetToTick::Disconnected { session_id } => {
                    self.world.unregister_session(session_id);
                }
            }
        }
        handled
    }

    fn pre_pulse(&mut self, _tick: u64) {
        for player in self.world.players_mut() {
            player.pre_pulse();
        }
    }

    fn pulse(&mut self, _tick: u64) -> FlushStats {
        let snapshot = self.world.snapshot();
        let view_distance = self.settings.view_distance;
        let mut stats = FlushStats::default();
        for player in self.world.players_mut() {
            stats += player.pulse(&snapshot, view_distance);
        }
        stats
    }

    fn post_pulse(&mut self, _tick: u64) {
        for player in self.world.players_mut() {
            player.post_pulse();
        }
        let reaped = self.world.reap_inactive();
        if reaped > 0 {
            tracing::debug!(reaped, "reaped inactive sessions");
        }
    }

    fn population(&self) -> usize {
        self.world.population()
    }
}
