//! Authenticated game traffic.
//!
//! Every opcode byte in either direction is offset by the session's
//! keystream. Inbound frames always carry a u16 length; outbound frames use
//! the size class registered for their opcode.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use cipher::{IsaacRandom, StreamCipher};

use crate::buffer::require;
use crate::codec::{Decoder, Encoder};
use crate::error::ProtocolError;

/// Upper bound on an inbound payload.
pub const MAX_INBOUND_PAYLOAD: usize = 5000;

pub mod inbound {
    pub const KEEP_ALIVE: u8 = 0;
    pub const MOVE_TO: u8 = 1;
    pub const LOGOUT: u8 = 2;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSize {
    Fixed(u16),
    VarByte,
    VarShort,
}

impl PacketSize {
    fn max_len(self) -> usize {
        match self {
            Self::Fixed(n) => n as usize,
            Self::VarByte => u8::MAX as usize,
            Self::VarShort => u16::MAX as usize,
        }
    }

    fn header_len(self) -> usize {
        match self {
            Self::Fixed(_) => 0,
            Self::VarByte => 1,
            Self::VarShort => 2,
        }
    }
}

impl fmt::Display for PacketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "fixed({n})"),
            Self::VarByte => f.write_str("var-byte"),
            Self::VarShort => f.write_str("var-short"),
        }
    }
}

/// One outbound message, ready to frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: u8,
    size: PacketSize,
    payload: Bytes,
}

impl Packet {
    pub fn fixed(opcode: u8, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        let payload = payload.into();
        let len = u16::try_from(payload.len()).map_err(|_| ProtocolError::SizeMismatch {
            opcode,
            size: PacketSize::Fixed(u16::MAX),
            len: payload.len(),
        })?;
        Ok(Self {
            opcode,
            size: PacketSize::Fixed(len),
            payload,
        })
    }

    pub fn empty(opcode: u8) -> Self {
        Self {
            opcode,
            size: PacketSize::Fixed(0),
            payload: Bytes::new(),
        }
    }

    pub fn var_byte(opcode: u8, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        Self::checked(opcode, PacketSize::VarByte, payload.into())
    }

    pub fn var_short(opcode: u8, payload: impl Into<Bytes>) -> Result<Self, ProtocolError> {
        Self::checked(opcode, PacketSize::VarShort, payload.into())
    }

    fn checked(opcode: u8, size: PacketSize, payload: Bytes) -> Result<Self, ProtocolError> {
        let len = payload.len();
        let fits = match size {
            PacketSize::Fixed(n) => len == n as usize,
            _ => len <= size.max_len(),
        };
        if !fits {
            return Err(ProtocolError::SizeMismatch { opcode, size, len });
        }
        Ok(Self {
            opcode,
            size,
            payload,
        })
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn size(&self) -> PacketSize {
        self.size
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Bytes this packet occupies once framed.
    pub fn wire_len(&self) -> usize {
        1 + self.size.header_len() + self.payload.len()
    }
}

/// Frames outbound packets, consuming one keystream word per packet.
#[derive(Debug)]
pub struct GamePacketEncoder {
    cipher: IsaacRandom,
}

impl GamePacketEncoder {
    pub fn new(cipher: IsaacRandom) -> Self {
        Self { cipher }
    }
}

impl Encoder<Packet> for GamePacketEncoder {
    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        // Packet constructors already checked the size, so nothing below can
        // fail after the keystream advances.
        dst.reserve(item.wire_len());
        dst.put_u8(self.cipher.encode_opcode(item.opcode));
        match item.size {
            PacketSize::Fixed(_) => {}
            PacketSize::VarByte => dst.put_u8(item.payload.len() as u8),
            PacketSize::VarShort => dst.put_u16(item.payload.len() as u16),
        }
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}

/// A decoded inbound frame, opcode already deciphered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMessage {
    pub opcode: u8,
    pub payload: Bytes,
}

/// Server side inbound framing.
#[derive(Debug)]
pub struct GamePacketDecoder {
    cipher: IsaacRandom,
    // Deciphered opcode of a frame whose length has not fully arrived.
    pending: Option<u8>,
}

impl GamePacketDecoder {
    pub fn new(cipher: IsaacRandom) -> Self {
        Self {
            cipher,
            pending: None,
        }
    }
}

impl Decoder for GamePacketDecoder {
    type Item = GameMessage;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<GameMessage>, ProtocolError> {
        let opcode = match self.pending {
            Some(opcode) => opcode,
            None => {
                if src.is_empty() {
                    return Ok(None);
                }
                let opcode = self.cipher.decode_opcode(src.get_u8());
                self.pending = Some(opcode);
                opcode
            }
        };
        if src.len() < 2 {
            return Ok(None);
        }
        let len = u16::from_be_bytes([src[0], src[1]]) as usize;
        if len > MAX_INBOUND_PAYLOAD {
            return Err(ProtocolError::PacketTooLarge {
                size: len,
                max: MAX_INBOUND_PAYLOAD,
            });
        }
        if src.len() < 2 + len {
            return Ok(None);
        }
        src.advance(2);
        let payload = src.split_to(len).freeze();
        self.pending = None;
        Ok(Some(GameMessage { opcode, payload }))
    }
}

/// Client side inbound framing.
#[derive(Debug)]
pub struct GameMessageEncoder {
    cipher: IsaacRandom,
}

impl GameMessageEncoder {
    pub fn new(cipher: IsaacRandom) -> Self {
        Self { cipher }
    }
}

impl Encoder<&GameMessage> for GameMessageEncoder {
    fn encode(&mut self, item: &GameMessage, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if item.payload.len() > MAX_INBOUND_PAYLOAD {
            return Err(ProtocolError::PacketTooLarge {
                size: item.payload.len(),
                max: MAX_INBOUND_PAYLOAD,
            });
        }
        dst.put_u8(self.cipher.encode_opcode(item.opcode));
        dst.put_u16(item.payload.len() as u16);
        dst.extend_from_slice(&item.payload);
        Ok(())
    }
}

/// Client side outbound framing, driven by a table of known opcode sizes.
#[derive(Debug)]
pub struct PacketDecoder {
    cipher: IsaacRandom,
    sizes: [Option<PacketSize>; 256],
    pending: Option<(u8, PacketSize)>,
}

impl PacketDecoder {
    pub fn new(cipher: IsaacRandom, sizes: &[(u8, PacketSize)]) -> Self {
        let mut table = [None; 256];
        for &(opcode, size) in sizes {
            table[opcode as usize] = Some(size);
        }
        Self {
            cipher,
            sizes: table,
            pending: None,
        }
    }
}

impl Decoder for PacketDecoder {
    type Item = Packet;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Packet>, ProtocolError> {
        let (opcode, size) = match self.pending {
            Some(entry) => entry,
            None => {
                if src.is_empty() {
                    return Ok(None);
                }
                let opcode = self.cipher.decode_opcode(src.get_u8());
                let size = self.sizes[opcode as usize].ok_or(ProtocolError::UnknownOpcode(opcode))?;
                self.pending = Some((opcode, size));
                (opcode, size)
            }
        };
        let header = size.header_len();
        if src.len() < header {
            return Ok(None);
        }
        let len = match size {
            PacketSize::Fixed(n) => n as usize,
            PacketSize::VarByte => src[0] as usize,
            PacketSize::VarShort => u16::from_be_bytes([src[0], src[1]]) as usize,
        };
        if src.len() < header + len {
            return Ok(None);
        }
        src.advance(header);
        let payload = src.split_to(len).freeze();
        self.pending = None;
        Ok(Some(Packet {
            opcode,
            size,
            payload,
        }))
    }
}

/// Inbound messages the world acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    KeepAlive,
    MoveTo { x: u16, z: u16, height: u8 },
    Logout,
    /// Anything unrecognised. Logged and otherwise ignored.
    Unknown { opcode: u8 },
}

impl ClientMessage {
    pub fn decode(msg: &GameMessage) -> Result<Self, ProtocolError> {
        let mut payload = msg.payload.clone();
        Ok(match msg.opcode {
            inbound::KEEP_ALIVE => Self::KeepAlive,
            inbound::LOGOUT => Self::Logout,
            inbound::MOVE_TO => {
                require(&payload, 5, "move-to")?;
                Self::MoveTo {
                    x: payload.get_u16(),
                    z: payload.get_u16(),
                    height: payload.get_u8(),
                }
            }
            opcode => Self::Unknown { opcode },
        })
    }

    pub fn to_message(self) -> GameMessage {
        let mut payload = BytesMut::new();
        let opcode = match self {
            Self::KeepAlive => inbound::KEEP_ALIVE,
            Self::Logout => inbound::LOGOUT,
            Self::MoveTo { x, z, height } => {
                payload.put_u16(x);
                payload.put_u16(z);
                payload.put_u8(height);
                inbound::MOVE_TO
            }
            Self::Unknown { opcode } => opcode,
        };
        GameMessage {
            opcode,
            payload: payload.freeze(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::CipherPair;

    const SEED: [u32; 4] = [11, 22, 33, 44];

    #[test]
    fn fixed_packet_rejects_wrong_length() {
        let err = Packet::checked(3, PacketSize::Fixed(2), Bytes::from_static(&[1]));
        assert_eq!(
            err,
            Err(ProtocolError::SizeMismatch {
                opcode: 3,
                size: PacketSize::Fixed(2),
                len: 1
            })
        );
    }

    #[test]
    fn var_byte_limit() {
        assert!(Packet::var_byte(1, vec![0u8; 255]).is_ok());
        assert!(Packet::var_byte(1, vec![0u8; 256]).is_err());
    }

    #[test]
    fn outbound_frames_decode_with_client_cipher() {
        let server = CipherPair::server(SEED);
        let client = CipherPair::client(SEED);
        let mut encoder = GamePacketEncoder::new(server.encoder);
        let mut decoder = PacketDecoder::new(
            client.decoder,
            &[
                (4, PacketSize::Fixed(3)),
                (9, PacketSize::VarByte),
                (200, PacketSize::VarShort),
            ],
        );

        let packets = vec![
            Packet::fixed(4, vec![1, 2, 3]).unwrap(),
            Packet::var_byte(9, vec![7; 40]).unwrap(),
            Packet::var_short(200, vec![8; 1000]).unwrap(),
            Packet::fixed(4, vec![4, 5, 6]).unwrap(),
        ];
        let mut wire = BytesMut::new();
        for p in packets.clone() {
            encoder.encode(p, &mut wire).unwrap();
        }
        let expected_len: usize = packets.iter().map(Packet::wire_len).sum();
        assert_eq!(wire.len(), expected_len);

        for p in packets {
            assert_eq!(decoder.decode(&mut wire).unwrap(), Some(p));
        }
        assert!(wire.is_empty());
    }

    #[test]
    fn inbound_frames_arrive_in_pieces() {
        let server = CipherPair::server(SEED);
        let client = CipherPair::client(SEED);
        let mut encoder = GameMessageEncoder::new(client.encoder);
        let mut decoder = GamePacketDecoder::new(server.decoder);

        let first = ClientMessage::MoveTo {
            x: 3200,
            z: 3200,
            height: 0,
        }
        .to_message();
        let second = ClientMessage::KeepAlive.to_message();
        let mut wire = BytesMut::new();
        encoder.encode(&first, &mut wire).unwrap();
        encoder.encode(&second, &mut wire).unwrap();

        // Feed one byte at a time; the keystream must advance once per frame.
        let mut src = BytesMut::new();
        let mut out = Vec::new();
        for byte in wire {
            src.put_u8(byte);
            while let Some(msg) = decoder.decode(&mut src).unwrap() {
                out.push(msg);
            }
        }
        assert_eq!(out, vec![first, second]);
    }

    #[test]
    fn oversized_inbound_frame() {
        let mut decoder = GamePacketDecoder::new(CipherPair::server(SEED).decoder);
        let mut src = BytesMut::new();
        src.put_u8(0);
        src.put_u16(5001);
        assert_eq!(
            decoder.decode(&mut src),
            Err(ProtocolError::PacketTooLarge {
                size: 5001,
                max: MAX_INBOUND_PAYLOAD
            })
        );
    }

    #[test]
    fn client_messages() {
        let unknown = GameMessage {
            opcode: 77,
            payload: Bytes::from_static(&[1, 2, 3]),
        };
        assert_eq!(
            ClientMessage::decode(&unknown).unwrap(),
            ClientMessage::Unknown { opcode: 77 }
        );

        let short_move = GameMessage {
            opcode: inbound::MOVE_TO,
            payload: Bytes::from_static(&[0, 1]),
        };
        assert!(ClientMessage::decode(&short_move).is_err());

        let msg = ClientMessage::MoveTo {
            x: 1,
            z: 2,
            height: 3,
        };
        assert_eq!(ClientMessage::decode(&msg.to_message()).unwrap(), msg);
    }

    #[test]
    fn unregistered_opcode_on_client() {
        let mut encoder = GamePacketEncoder::new(CipherPair::server(SEED).encoder);
        let mut decoder = PacketDecoder::new(CipherPair::client(SEED).decoder, &[]);
        let mut wire = BytesMut::new();
        encoder
            .encode(Packet::fixed(12, Bytes::new()).unwrap(), &mut wire)
            .unwrap();
        assert_eq!(
            decoder.decode(&mut wire),
            Err(ProtocolError::UnknownOpcode(12))
        );
    }
}
