//! Wire formats for every connection phase.
//!
//! Each phase has its own decoder (client to server) and encoder (server to
//! client). The client-side counterparts live next to them so both halves
//! of an exchange can be exercised in tests.

pub mod buffer;
pub mod codec;
pub mod error;
pub mod game;
pub mod handshake;
pub mod js5;
pub mod login;
pub mod message;

pub use codec::{Decoder, Encoder};
pub use error::ProtocolError;
pub use game::{
    ClientMessage, GameMessage, GameMessageEncoder, GamePacketDecoder, GamePacketEncoder, Packet,
    PacketDecoder, PacketSize,
};
pub use handshake::{HandshakeRequest, HandshakeResponse, Js5Status};
pub use js5::{Js5Request, Js5Response};
pub use login::{LoginRequest, LoginResponse, LoginStatus};
pub use message::{PlayerInfo, RegionKeys, RegionLoad};

/// Anything a client can send, tagged by the phase that decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Handshake(HandshakeRequest),
    Js5(Js5Request),
    Login(LoginRequest),
    Game(GameMessage),
}
