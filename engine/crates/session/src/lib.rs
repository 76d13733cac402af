pub mod error;
pub mod handle;
pub mod phase;
pub mod queue;
pub mod session;

pub use error::SessionError;
pub use handle::{ConnectionHandle, Outbound, OutboundRx};
pub use phase::{Phase, PhaseError};
pub use queue::OutboundQueue;
pub use session::Session;

/// Random 63-bit identity handed out at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn random() -> Self {
        Self(rand::random::<u64>() >> 1)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
