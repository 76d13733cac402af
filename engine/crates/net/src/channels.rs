use accounts::Profile;
use protocol::{ClientMessage, GamePacketEncoder, LoginResponse};
use session::{ConnectionHandle, SessionId};
use tokio::sync::{mpsc, oneshot};

/// Tells the connection task how login went.
pub type LoginReply = oneshot::Sender<LoginResponse>;

/// Messages from the network layer to the tick thread.
#[derive(Debug)]
pub enum NetToTick {
    /// Credentials already checked. The tick thread decides whether the
    /// world admits `profile`, writes the response through `handle` and then
    /// answers on `reply`.
    Login {
        profile: Profile,
        handle: ConnectionHandle,
        encoder: GamePacketEncoder,
        reply: LoginReply,
    },
    /// An authenticated client sent a message.
    Message {
        session_id: SessionId,
        message: ClientMessage,
    },
    /// An authenticated connection went away.
    Disconnected { session_id: SessionId },
}

/// Sender from network tasks to the tick thread.
pub type PlayerTx = mpsc::UnboundedSender<NetToTick>;
/// Receiver in the tick thread for player events.
pub type PlayerRx = mpsc::UnboundedReceiver<NetToTick>;
