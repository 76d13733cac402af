//! Server to client messages.

use bytes::{Buf, BufMut, BytesMut};

use crate::buffer::require;
use crate::error::ProtocolError;
use crate::game::{Packet, PacketSize};

pub mod opcodes {
    pub const LOGOUT: u8 = 5;
    pub const REGION_LOAD: u8 = 42;
    pub const PLAYER_INFO: u8 = 79;
}

/// Size classes of every outbound opcode, for client-side decoding.
pub const OUTBOUND_SIZES: &[(u8, PacketSize)] = &[
    (opcodes::LOGOUT, PacketSize::Fixed(0)),
    (opcodes::REGION_LOAD, PacketSize::VarShort),
    (opcodes::PLAYER_INFO, PacketSize::VarShort),
];

pub fn logout() -> Packet {
    Packet::empty(opcodes::LOGOUT)
}

/// Per-region XTEA keys.
pub type RegionKeys = [i32; 4];

/// Sent once, right after login: the map around the player plus the
/// coarse position of every other slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLoad {
    pub index: u16,
    pub tile_hash: u32,
    /// One entry per player slot, indexed by slot number.
    pub tile_hash_multipliers: Vec<u32>,
    pub chunk_x: u16,
    pub chunk_z: u16,
    pub regions: Vec<(u16, RegionKeys)>,
}

impl RegionLoad {
    pub const SLOTS: usize = 2048;

    pub fn to_packet(&self) -> Result<Packet, ProtocolError> {
        if self.tile_hash_multipliers.len() != Self::SLOTS {
            return Err(ProtocolError::malformed(
                "region load",
                format!("{} multipliers", self.tile_hash_multipliers.len()),
            ));
        }
        let mut buf = BytesMut::with_capacity(2 + 4 + Self::SLOTS * 4 + 6 + self.regions.len() * 18);
        buf.put_u16(self.index);
        buf.put_u32(self.tile_hash);
        for &m in &self.tile_hash_multipliers {
            buf.put_u32(m);
        }
        buf.put_u16(self.chunk_x);
        buf.put_u16(self.chunk_z);
        put_count(&mut buf, self.regions.len(), "region load")?;
        for (region, keys) in &self.regions {
            buf.put_u16(*region);
            for key in keys {
                buf.put_i32(*key);
            }
        }
        Packet::var_short(opcodes::REGION_LOAD, buf.freeze())
    }

    pub fn parse(mut payload: &[u8]) -> Result<Self, ProtocolError> {
        require(&payload, 6 + Self::SLOTS * 4 + 6, "region load")?;
        let index = payload.get_u16();
        let tile_hash = payload.get_u32();
        let tile_hash_multipliers = (0..Self::SLOTS).map(|_| payload.get_u32()).collect();
        let chunk_x = payload.get_u16();
        let chunk_z = payload.get_u16();
        let count = payload.get_u16() as usize;
        require(&payload, count * 18, "region load")?;
        let regions = (0..count)
            .map(|_| {
                let region = payload.get_u16();
                let keys = [
                    payload.get_i32(),
                    payload.get_i32(),
                    payload.get_i32(),
                    payload.get_i32(),
                ];
                (region, keys)
            })
            .collect();
        Ok(Self {
            index,
            tile_hash,
            tile_hash_multipliers,
            chunk_x,
            chunk_z,
            regions,
        })
    }
}

/// Per-tick visibility delta for one observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerInfo {
    /// Slots that left the local set.
    pub removed: Vec<u16>,
    /// Slots that entered the local set, with their tile hash.
    pub added: Vec<(u16, u32)>,
    /// Local slots whose tile changed.
    pub moved: Vec<(u16, u32)>,
    /// External slots whose coarse multiplier changed.
    pub region: Vec<(u16, u32)>,
}

impl PlayerInfo {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.moved.is_empty()
            && self.region.is_empty()
    }

    pub fn to_packet(&self) -> Result<Packet, ProtocolError> {
        let mut buf = BytesMut::new();
        put_count(&mut buf, self.removed.len(), "player info")?;
        for &index in &self.removed {
            buf.put_u16(index);
        }
        for list in [&self.added, &self.moved, &self.region] {
            put_count(&mut buf, list.len(), "player info")?;
            for &(index, value) in list {
                buf.put_u16(index);
                buf.put_u32(value);
            }
        }
        Packet::var_short(opcodes::PLAYER_INFO, buf.freeze())
    }

    pub fn parse(mut payload: &[u8]) -> Result<Self, ProtocolError> {
        require(&payload, 2, "player info")?;
        let count = payload.get_u16() as usize;
        require(&payload, count * 2, "player info")?;
        let removed = (0..count).map(|_| payload.get_u16()).collect();

        let mut pairs = || -> Result<Vec<(u16, u32)>, ProtocolError> {
            require(&payload, 2, "player info")?;
            let count = payload.get_u16() as usize;
            require(&payload, count * 6, "player info")?;
            Ok((0..count)
                .map(|_| (payload.get_u16(), payload.get_u32()))
                .collect())
        };
        let added = pairs()?;
        let moved = pairs()?;
        let region = pairs()?;
        Ok(Self {
            removed,
            added,
            moved,
            region,
        })
    }
}

fn put_count(buf: &mut BytesMut, count: usize, what: &'static str) -> Result<(), ProtocolError> {
    let count = u16::try_from(count)
        .map_err(|_| ProtocolError::malformed(what, format!("{count} entries")))?;
    buf.put_u16(count);
    Ok(())
}
