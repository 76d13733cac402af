//! Asset streaming. Requests are fixed 4 byte records; responses are the
//! stored container split into 512 byte blocks.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{Decoder, Encoder};
use crate::error::ProtocolError;

pub const REQUEST_LEN: usize = 4;
pub const BLOCK_LEN: usize = 512;
pub const BLOCK_MARKER: u8 = 0xFF;
const PRIORITY_FLAG: u8 = 0x80;
const HEADER_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Js5Request {
    File {
        index: u8,
        archive: u16,
        priority: bool,
    },
    LoggedIn,
    LoggedOut,
    EncryptionKey(u8),
    Init,
    Close,
    /// Opcodes this server does not act on. They are consumed and ignored.
    Unknown(u8),
}

#[derive(Debug, Default)]
pub struct Js5Decoder;

impl Decoder for Js5Decoder {
    type Item = Js5Request;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Js5Request>, ProtocolError> {
        if src.len() < REQUEST_LEN {
            return Ok(None);
        }
        let opcode = src.get_u8();
        let a = src.get_u8();
        let b = src.get_u16();
        let req = match opcode {
            0 | 1 => Js5Request::File {
                index: a,
                archive: b,
                priority: opcode == 1,
            },
            2 => Js5Request::LoggedIn,
            3 => Js5Request::LoggedOut,
            4 => Js5Request::EncryptionKey(a),
            6 => Js5Request::Init,
            7 => Js5Request::Close,
            other => Js5Request::Unknown(other),
        };
        Ok(Some(req))
    }
}

#[derive(Debug, Default)]
pub struct Js5RequestEncoder;

impl Encoder<Js5Request> for Js5RequestEncoder {
    fn encode(&mut self, item: Js5Request, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let (opcode, a, b) = match item {
            Js5Request::File {
                index,
                archive,
                priority,
            } => (u8::from(priority), index, archive),
            Js5Request::LoggedIn => (2, 0, 0),
            Js5Request::LoggedOut => (3, 0, 0),
            Js5Request::EncryptionKey(key) => (4, key, 0),
            Js5Request::Init => (6, 0, 0),
            Js5Request::Close => (7, 0, 0),
            Js5Request::Unknown(op) => (op, 0, 0),
        };
        dst.put_u8(opcode);
        dst.put_u8(a);
        dst.put_u16(b);
        Ok(())
    }
}

/// A stored container as served to the client.
///
/// The container starts with a compression byte and a u32 length, followed
/// by the data and, when compressed, a u32 uncompressed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Js5Response {
    pub index: u8,
    pub archive: u16,
    pub priority: bool,
    pub container: Bytes,
}

#[derive(Debug, Default)]
pub struct Js5ResponseEncoder;

impl Encoder<Js5Response> for Js5ResponseEncoder {
    fn encode(&mut self, item: Js5Response, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let Some((&compression, rest)) = item.container.split_first() else {
            return Err(ProtocolError::malformed("js5 container", "empty"));
        };
        dst.reserve(HEADER_LEN + item.container.len() + item.container.len() / BLOCK_LEN + 1);
        dst.put_u8(item.index);
        dst.put_u16(item.archive);

        let first = if item.priority {
            compression | PRIORITY_FLAG
        } else {
            compression
        };
        dst.put_u8(first);

        let mut in_block = HEADER_LEN + 1;
        for &byte in rest {
            if in_block == BLOCK_LEN {
                dst.put_u8(BLOCK_MARKER);
                in_block = 1;
            }
            dst.put_u8(byte);
            in_block += 1;
        }
        Ok(())
    }
}

/// Client side: reassembles a response by stripping block markers.
#[derive(Debug, Default)]
pub struct Js5ResponseDecoder;

impl Decoder for Js5ResponseDecoder {
    type Item = Js5Response;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Js5Response>, ProtocolError> {
        // index, archive, compression, length
        if src.len() < HEADER_LEN + 5 {
            return Ok(None);
        }
        let flagged = src[HEADER_LEN];
        let compression = flagged & !PRIORITY_FLAG;
        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        let container_len = 5 + len + if compression == 0 { 0 } else { 4 };

        // Walk the wire bytes, skipping a marker at the start of every block
        // after the first, until the whole container has been seen.
        let mut container = BytesMut::with_capacity(container_len);
        let mut pos = HEADER_LEN;
        let mut in_block = HEADER_LEN;
        while container.len() < container_len {
            if in_block == BLOCK_LEN {
                match src.get(pos) {
                    None => return Ok(None),
                    Some(&BLOCK_MARKER) => {}
                    Some(other) => {
                        return Err(ProtocolError::malformed(
                            "js5 response",
                            format!("expected block marker, found {other:#04x}"),
                        ))
                    }
                }
                pos += 1;
                in_block = 1;
            }
            let Some(&byte) = src.get(pos) else {
                return Ok(None);
            };
            container.put_u8(byte);
            pos += 1;
            in_block += 1;
        }

        let index = src[0];
        let archive = u16::from_be_bytes([src[1], src[2]]);
        src.advance(pos);
        container[0] = compression;
        Ok(Some(Js5Response {
            index,
            archive,
            priority: flagged & PRIORITY_FLAG != 0,
            container: container.freeze(),
        }))
    }
}
