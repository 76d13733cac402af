use crate::game::PacketSize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown handshake selector {0}")]
    UnknownHandshake(u8),

    #[error("unknown login type {0}")]
    UnknownLoginType(u8),

    #[error("no size registered for opcode {0}")]
    UnknownOpcode(u8),

    #[error("packet too large: {size} bytes (max {max})")]
    PacketTooLarge { size: usize, max: usize },

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("opcode {opcode}: {len} byte payload does not fit {size}")]
    SizeMismatch {
        opcode: u8,
        size: PacketSize,
        len: usize,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}
