//! The login block and the status byte sent back for it.

use bytes::{Buf, BufMut, BytesMut};

use crate::buffer::{get_cstring, put_cstring, require};
use crate::codec::{Decoder, Encoder};
use crate::error::ProtocolError;

pub const LOGIN_NEW: u8 = 16;
pub const LOGIN_RECONNECT: u8 = 18;
pub const MAX_LOGIN_PAYLOAD: usize = 512;

// revision + seed + server key
const FIXED_PART: usize = 4 + 16 + 8;

#[derive(Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub reconnecting: bool,
    pub revision: u32,
    pub seed: [u32; 4],
    pub server_key: u64,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("reconnecting", &self.reconnecting)
            .field("revision", &self.revision)
            .field("server_key", &self.server_key)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct LoginDecoder;

impl Decoder for LoginDecoder {
    type Item = LoginRequest;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LoginRequest>, ProtocolError> {
        if src.len() < 3 {
            return Ok(None);
        }
        let reconnecting = match src[0] {
            LOGIN_NEW => false,
            LOGIN_RECONNECT => true,
            other => return Err(ProtocolError::UnknownLoginType(other)),
        };
        let size = u16::from_be_bytes([src[1], src[2]]) as usize;
        if size > MAX_LOGIN_PAYLOAD {
            return Err(ProtocolError::PacketTooLarge {
                size,
                max: MAX_LOGIN_PAYLOAD,
            });
        }
        if src.len() < 3 + size {
            return Ok(None);
        }
        src.advance(3);
        let mut payload = src.split_to(size).freeze();

        require(&payload, FIXED_PART, "login block")?;
        let revision = payload.get_u32();
        let seed = [
            payload.get_u32(),
            payload.get_u32(),
            payload.get_u32(),
            payload.get_u32(),
        ];
        let server_key = payload.get_u64();
        let username = get_cstring(&mut payload, "username")?;
        let password = get_cstring(&mut payload, "password")?;
        if payload.has_remaining() {
            tracing::trace!(extra = payload.remaining(), "ignoring trailing login bytes");
        }

        Ok(Some(LoginRequest {
            reconnecting,
            revision,
            seed,
            server_key,
            username,
            password,
        }))
    }
}

/// Client side of the login exchange.
#[derive(Debug, Default)]
pub struct LoginRequestEncoder;

impl Encoder<&LoginRequest> for LoginRequestEncoder {
    fn encode(&mut self, item: &LoginRequest, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let mut payload = BytesMut::with_capacity(FIXED_PART + 32);
        payload.put_u32(item.revision);
        for word in item.seed {
            payload.put_u32(word);
        }
        payload.put_u64(item.server_key);
        put_cstring(&mut payload, &item.username);
        put_cstring(&mut payload, &item.password);
        if payload.len() > MAX_LOGIN_PAYLOAD {
            return Err(ProtocolError::PacketTooLarge {
                size: payload.len(),
                max: MAX_LOGIN_PAYLOAD,
            });
        }

        dst.put_u8(if item.reconnecting {
            LOGIN_RECONNECT
        } else {
            LOGIN_NEW
        });
        dst.put_u16(payload.len() as u16);
        dst.extend_from_slice(&payload);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoginStatus {
    Ok = 2,
    InvalidCredentials = 3,
    Banned = 4,
    AlreadyOnline = 5,
    GameUpdated = 6,
    WorldFull = 7,
    BadSessionId = 10,
    CouldNotComplete = 13,
}

impl LoginStatus {
    pub fn from_u8(code: u8) -> Option<Self> {
        Some(match code {
            2 => Self::Ok,
            3 => Self::InvalidCredentials,
            4 => Self::Banned,
            5 => Self::AlreadyOnline,
            6 => Self::GameUpdated,
            7 => Self::WorldFull,
            10 => Self::BadSessionId,
            13 => Self::CouldNotComplete,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResponse {
    Accepted { privilege: u8, index: u16 },
    Rejected(LoginStatus),
}

impl LoginResponse {
    pub fn status(&self) -> LoginStatus {
        match self {
            Self::Accepted { .. } => LoginStatus::Ok,
            Self::Rejected(status) => *status,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoginResponseEncoder;

impl Encoder<LoginResponse> for LoginResponseEncoder {
    fn encode(&mut self, item: LoginResponse, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match item {
            LoginResponse::Accepted { privilege, index } => {
                dst.put_u8(LoginStatus::Ok as u8);
                dst.put_u8(privilege);
                dst.put_u16(index);
            }
            LoginResponse::Rejected(LoginStatus::Ok) => {
                return Err(ProtocolError::malformed(
                    "login response",
                    "rejection with an ok status",
                ))
            }
            LoginResponse::Rejected(status) => dst.put_u8(status as u8),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LoginResponseDecoder;

impl Decoder for LoginResponseDecoder {
    type Item = LoginResponse;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LoginResponse>, ProtocolError> {
        let Some(&code) = src.first() else {
            return Ok(None);
        };
        let status = LoginStatus::from_u8(code).ok_or_else(|| {
            ProtocolError::malformed("login response", format!("unknown status {code}"))
        })?;
        if status != LoginStatus::Ok {
            src.advance(1);
            return Ok(Some(LoginResponse::Rejected(status)));
        }
        if src.len() < 4 {
            return Ok(None);
        }
        src.advance(1);
        let privilege = src.get_u8();
        let index = src.get_u16();
        Ok(Some(LoginResponse::Accepted { privilege, index }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LoginRequest {
        LoginRequest {
            reconnecting: false,
            revision: 530,
            seed: [1, 2, 3, 4],
            server_key: 0xDEAD_BEEF,
            username: "alice".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn request_survives_the_wire() {
        let mut buf = BytesMut::new();
        LoginRequestEncoder.encode(&request(), &mut buf).unwrap();
        assert_eq!(buf[0], LOGIN_NEW);
        assert_eq!(LoginDecoder.decode(&mut buf).unwrap(), Some(request()));
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_block_waits() {
        let mut full = BytesMut::new();
        LoginRequestEncoder.encode(&request(), &mut full).unwrap();
        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert_eq!(LoginDecoder.decode(&mut partial).unwrap(), None);
        assert_eq!(partial.len(), full.len() - 1);
    }

    #[test]
    fn oversized_block_is_a_violation() {
        let mut buf = BytesMut::new();
        buf.put_u8(LOGIN_NEW);
        buf.put_u16(513);
        assert_eq!(
            LoginDecoder.decode(&mut buf),
            Err(ProtocolError::PacketTooLarge {
                size: 513,
                max: MAX_LOGIN_PAYLOAD
            })
        );
    }

    #[test]
    fn unknown_login_type() {
        let mut buf = BytesMut::from(&[99, 0, 0][..]);
        assert_eq!(
            LoginDecoder.decode(&mut buf),
            Err(ProtocolError::UnknownLoginType(99))
        );
    }

    #[test]
    fn short_block_is_malformed() {
        let mut buf = BytesMut::new();
        buf.put_u8(LOGIN_RECONNECT);
        buf.put_u16(4);
        buf.put_u32(530);
        assert!(matches!(
            LoginDecoder.decode(&mut buf),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn accepted_response_layout() {
        let mut buf = BytesMut::new();
        LoginResponseEncoder
            .encode(
                LoginResponse::Accepted {
                    privilege: 2,
                    index: 5,
                },
                &mut buf,
            )
            .unwrap();
        assert_eq!(&buf[..], &[2, 2, 0, 5]);
        assert_eq!(
            LoginResponseDecoder.decode(&mut buf).unwrap(),
            Some(LoginResponse::Accepted {
                privilege: 2,
                index: 5
            })
        );
    }

    #[test]
    fn rejection_is_single_byte() {
        let mut buf = BytesMut::new();
        LoginResponseEncoder
            .encode(LoginResponse::Rejected(LoginStatus::WorldFull), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[7]);
    }

    #[test]
    fn debug_hides_password() {
        let shown = format!("{:?}", request());
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("alice"));
    }
}
