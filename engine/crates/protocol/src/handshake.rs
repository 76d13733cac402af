//! The first byte a client sends selects the service it wants.

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{Decoder, Encoder};
use crate::error::ProtocolError;

pub const SELECT_LOGIN: u8 = 14;
pub const SELECT_JS5: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeRequest {
    /// Asset streaming, tagged with the client build.
    Js5 { revision: u32 },
    Login,
}

/// Response to a JS5 handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Js5Status {
    Ok = 0,
    OutOfDate = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeResponse {
    Js5(Js5Status),
    /// Login may proceed; the client must echo `server_key` in its login block.
    Login { server_key: u64 },
}

#[derive(Debug, Default)]
pub struct HandshakeDecoder;

impl Decoder for HandshakeDecoder {
    type Item = HandshakeRequest;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<HandshakeRequest>, ProtocolError> {
        let Some(&selector) = src.first() else {
            return Ok(None);
        };
        match selector {
            SELECT_LOGIN => {
                src.advance(1);
                Ok(Some(HandshakeRequest::Login))
            }
            SELECT_JS5 => {
                if src.len() < 5 {
                    return Ok(None);
                }
                src.advance(1);
                Ok(Some(HandshakeRequest::Js5 {
                    revision: src.get_u32(),
                }))
            }
            other => Err(ProtocolError::UnknownHandshake(other)),
        }
    }
}

#[derive(Debug, Default)]
pub struct HandshakeResponseEncoder;

impl Encoder<HandshakeResponse> for HandshakeResponseEncoder {
    fn encode(&mut self, item: HandshakeResponse, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match item {
            HandshakeResponse::Js5(status) => dst.put_u8(status as u8),
            HandshakeResponse::Login { server_key } => {
                dst.put_u8(0);
                dst.put_u64(server_key);
            }
        }
        Ok(())
    }
}

/// Client side of the handshake.
#[derive(Debug, Default)]
pub struct HandshakeRequestEncoder;

impl Encoder<HandshakeRequest> for HandshakeRequestEncoder {
    fn encode(&mut self, item: HandshakeRequest, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        match item {
            HandshakeRequest::Js5 { revision } => {
                dst.put_u8(SELECT_JS5);
                dst.put_u32(revision);
            }
            HandshakeRequest::Login => dst.put_u8(SELECT_LOGIN),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_selector_is_one_byte() {
        let mut buf = BytesMut::from(&[SELECT_LOGIN, 0xAA][..]);
        let req = HandshakeDecoder.decode(&mut buf).unwrap();
        assert_eq!(req, Some(HandshakeRequest::Login));
        assert_eq!(&buf[..], &[0xAA]);
    }

    #[test]
    fn js5_waits_for_revision() {
        let mut buf = BytesMut::from(&[SELECT_JS5, 0, 0][..]);
        assert_eq!(HandshakeDecoder.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 3, "partial input must not be consumed");

        buf.extend_from_slice(&[0x01, 0xD9]);
        assert_eq!(
            HandshakeDecoder.decode(&mut buf).unwrap(),
            Some(HandshakeRequest::Js5 { revision: 473 })
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let mut buf = BytesMut::from(&[0x7F][..]);
        assert_eq!(
            HandshakeDecoder.decode(&mut buf),
            Err(ProtocolError::UnknownHandshake(0x7F))
        );
    }

    #[test]
    fn request_encoder_matches_decoder() {
        let mut buf = BytesMut::new();
        let req = HandshakeRequest::Js5 { revision: 530 };
        HandshakeRequestEncoder.encode(req, &mut buf).unwrap();
        assert_eq!(HandshakeDecoder.decode(&mut buf).unwrap(), Some(req));
    }

    #[test]
    fn login_response_carries_server_key() {
        let mut buf = BytesMut::new();
        HandshakeResponseEncoder
            .encode(HandshakeResponse::Login { server_key: 0x0102_0304_0506_0708 }, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
