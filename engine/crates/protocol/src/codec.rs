use bytes::BytesMut;

use crate::error::ProtocolError;

/// Pulls one complete item off the front of `src`.
///
/// Returns `Ok(None)` without consuming anything when more bytes are needed.
/// An `Err` means the peer broke the protocol and the connection should be
/// dropped.
pub trait Decoder {
    type Item;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, ProtocolError>;
}

/// Appends the wire form of `item` to `dst`.
pub trait Encoder<Item> {
    fn encode(&mut self, item: Item, dst: &mut BytesMut) -> Result<(), ProtocolError>;
}
