use engine_core::FlushStats;
use gpi::{GpiTable, TileView};
use protocol::message::logout;
use protocol::{ClientMessage, Packet};
use session::{Session, SessionError};
use slots::PlayerIndex;
use space::{RegionKeyStore, Tile};

use accounts::Profile;

/// A logged-in player. Only ever built once login has succeeded, so every
/// field is populated from the start.
#[derive(Debug)]
pub struct Player {
    pub profile: Profile,
    index: PlayerIndex,
    last_index: Option<PlayerIndex>,
    tile: Tile,
    initiated: bool,
    logout_requested: bool,
    session: Session,
    gpi: GpiTable,
    inbox: Vec<ClientMessage>,
}

impl Player {
    pub fn new(profile: Profile, index: PlayerIndex, tile: Tile, session: Session) -> Self {
        Self {
            profile,
            index,
            last_index: None,
            tile,
            initiated: false,
            logout_requested: false,
            session,
            gpi: GpiTable::new(),
            inbox: Vec::new(),
        }
    }

    pub fn index(&self) -> PlayerIndex {
        self.index
    }

    /// Slot held before the most recent unregister.
    pub fn last_index(&self) -> Option<PlayerIndex> {
        self.last_index
    }

    pub fn tile(&self) -> Tile {
        self.tile
    }

    pub fn set_tile(&mut self, tile: Tile) {
        self.tile = tile;
    }

    pub fn is_initiated(&self) -> bool {
        self.initiated
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn gpi(&self) -> &GpiTable {
        &self.gpi
    }

    pub(crate) fn gpi_mut(&mut self) -> &mut GpiTable {
        &mut self.gpi
    }

    /// Queues a packet for the next pulse. A full queue drops the packet.
    pub fn write(&mut self, packet: Packet) -> bool {
        let opcode = packet.opcode();
        match self.session.write(packet) {
            Ok(()) => true,
            Err(SessionError::QueueFull { capacity }) => {
                tracing::warn!(index = %self.index, opcode, capacity, "outbound queue full, dropping packet");
                false
            }
            Err(e) => {
                tracing::debug!(index = %self.index, opcode, error = %e, "write to closed session");
                false
            }
        }
    }

    /// First-tick setup: seed the GPI table and send the region baseline.
    pub fn login(&mut self, view: &impl TileView, keys: &dyn RegionKeyStore) {
        self.gpi.login(self.index, view);
        match self.gpi.region_load(self.tile, keys).to_packet() {
            Ok(packet) => {
                self.write(packet);
            }
            Err(e) => tracing::warn!(index = %self.index, error = %e, "could not build region load"),
        }
        self.initiated = true;
        tracing::info!(
            index = %self.index,
            username = %self.profile.username,
            tile = %self.tile,
            "player logged in"
        );
    }

    pub fn deliver(&mut self, message: ClientMessage) {
        self.inbox.push(message);
    }

    /// Applies queued client messages.
    pub fn pre_pulse(&mut self) {
        for message in std::mem::take(&mut self.inbox) {
            match message {
                ClientMessage::KeepAlive => {}
                ClientMessage::MoveTo { x, z, height } => match Tile::new(x, z, height) {
                    Ok(tile) => self.tile = tile,
                    Err(e) => tracing::debug!(index = %self.index, error = %e, "ignoring move"),
                },
                ClientMessage::Logout => {
                    if !self.logout_requested {
                        self.write(logout());
                        self.logout_requested = true;
                    }
                }
                ClientMessage::Unknown { opcode } => {
                    tracing::trace!(index = %self.index, opcode, "ignoring unknown message");
                }
            }
        }
    }

    /// Sends this tick's visibility delta, then drains the queue.
    ///
    /// `synchronize` commits the table, so it only runs when the resulting
    /// packet has room. Otherwise the delta carries over to the next tick.
    pub fn pulse(&mut self, view: &impl TileView, view_distance: u16) -> FlushStats {
        if self.initiated && self.session.is_full() {
            tracing::debug!(index = %self.index, "queue full, deferring player info");
        } else if self.initiated {
            let update = self.gpi.synchronize(view, view_distance);
            if !update.is_empty() {
                match update.to_message().to_packet() {
                    Ok(packet) => {
                        self.write(packet);
                    }
                    Err(e) => tracing::warn!(index = %self.index, error = %e, "could not build player info"),
                }
            }
        }
        self.session.pulse()
    }

    /// Drains what is queued, then sends a logout on its own so a full queue
    /// cannot swallow it.
    pub fn send_logout(&mut self) -> FlushStats {
        let mut stats = self.session.pulse();
        self.write(logout());
        stats += self.session.pulse();
        stats
    }

    pub fn post_pulse(&mut self) {
        if self.logout_requested {
            self.session.close();
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    /// Called once the player leaves the registry.
    pub(crate) fn on_unregister(&mut self) {
        self.last_index = Some(self.index);
        self.initiated = false;
        self.session.close();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cipher::CipherPair;
    use protocol::{GamePacketEncoder, PlayerInfo};
    use ::session::{ConnectionHandle, Outbound, OutboundRx, SessionId};
    use std::collections::HashMap;
    use uuid::Uuid;

    pub(crate) fn profile(name: &str) -> Profile {
        Profile {
            username: name.to_string(),
            password_hash: String::new(),
            uuid: Uuid::new_v4(),
            display_name: name.to_string(),
            privilege: 0,
            banned: false,
        }
    }

    pub(crate) fn session(id: u64, capacity: usize) -> (Session, OutboundRx) {
        let (handle, rx) = ConnectionHandle::new(SessionId(id));
        let encoder = GamePacketEncoder::new(CipherPair::server([0; 4]).encoder);
        (Session::new(handle, encoder, capacity), rx)
    }

    struct Map(HashMap<PlayerIndex, Tile>);

    impl TileView for Map {
        fn tile(&self, index: PlayerIndex) -> Option<Tile> {
            self.0.get(&index).copied()
        }
    }

    fn player(raw: u16, capacity: usize) -> (Player, OutboundRx) {
        let (session, rx) = session(raw as u64, capacity);
        let tile = Tile::new(3200, 3200, 0).unwrap();
        let index = PlayerIndex::new(raw).unwrap();
        (Player::new(profile("p"), index, tile, session), rx)
    }

    #[test]
    fn login_queues_region_load() {
        let (mut p, _rx) = player(3, 8);
        let map = Map(HashMap::from([(p.index(), p.tile())]));
        p.login(&map, &space::ZeroRegionKeys);
        assert!(p.is_initiated());
        assert_eq!(p.session().queued(), 1);
        assert_eq!(p.gpi().local_count(), 1);
    }

    #[test]
    fn full_queue_drops() {
        let (mut p, _rx) = player(3, 1);
        assert!(p.write(Packet::empty(1)));
        assert!(!p.write(Packet::empty(2)));
        assert_eq!(p.session().queued(), 1);
    }

    #[test]
    fn moves_apply_in_pre_pulse() {
        let (mut p, _rx) = player(3, 8);
        p.deliver(ClientMessage::MoveTo {
            x: 3201,
            z: 3202,
            height: 1,
        });
        assert_eq!(p.tile().x(), 3200);
        p.pre_pulse();
        assert_eq!(p.tile(), Tile::new(3201, 3202, 1).unwrap());

        p.deliver(ClientMessage::MoveTo {
            x: 3201,
            z: 3202,
            height: 7,
        });
        p.pre_pulse();
        assert_eq!(p.tile().height(), 1, "out of bounds move ignored");
    }

    #[test]
    fn pulse_sends_own_movement() {
        let (mut p, mut rx) = player(3, 8);
        let mut map = Map(HashMap::from([(p.index(), p.tile())]));
        p.login(&map, &space::ZeroRegionKeys);
        p.pulse(&map, 15);
        assert!(matches!(rx.try_recv(), Ok(Outbound::Frame(_))));

        // Quiet tick: nothing to send.
        assert_eq!(p.pulse(&map, 15), FlushStats::default());

        let moved = Tile::new(3201, 3200, 0).unwrap();
        p.set_tile(moved);
        map.0.insert(p.index(), moved);
        let stats = p.pulse(&map, 15);
        assert_eq!(stats.packets, 1);

        let expected = PlayerInfo {
            moved: vec![(3, moved.as_tile_hash())],
            ..PlayerInfo::default()
        };
        let Ok(Outbound::Frame(frame)) = rx.try_recv() else {
            panic!("expected player info frame");
        };
        // opcode + u16 length, then the body
        assert_eq!(&frame[3..], &expected.to_packet().unwrap().payload()[..]);
    }

    #[test]
    fn full_queue_defers_player_info() {
        let (mut p, mut rx) = player(3, 1);
        let other = PlayerIndex::new(4).unwrap();
        let map = Map(HashMap::from([(p.index(), p.tile()), (other, p.tile())]));
        p.login(&map, &space::ZeroRegionKeys);
        assert!(p.session().is_full());

        // Region load fills the queue; the add must not be lost.
        assert_eq!(p.pulse(&map, 15).packets, 1);
        assert!(!p.gpi().is_local(other));
        assert!(matches!(rx.try_recv(), Ok(Outbound::Frame(_))));

        assert_eq!(p.pulse(&map, 15).packets, 1);
        assert!(p.gpi().is_local(other));
        let Ok(Outbound::Frame(frame)) = rx.try_recv() else {
            panic!("expected player info frame");
        };
        let expected = PlayerInfo {
            added: vec![(4, p.tile().as_tile_hash())],
            ..PlayerInfo::default()
        };
        assert_eq!(&frame[3..], &expected.to_packet().unwrap().payload()[..]);
    }

    #[test]
    fn logout_flushes_then_closes() {
        let (mut p, mut rx) = player(3, 8);
        let map = Map(HashMap::new());
        p.deliver(ClientMessage::Logout);
        p.deliver(ClientMessage::Logout);
        p.pre_pulse();
        assert_eq!(p.session().queued(), 1);
        p.pulse(&map, 15);
        p.post_pulse();
        assert!(!p.is_active());
        assert!(matches!(rx.try_recv(), Ok(Outbound::Frame(_))));
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close);
    }
}
