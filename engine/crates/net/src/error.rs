use protocol::ProtocolError;
use session::PhaseError;

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error("tick thread is not accepting logins")]
    TickUnavailable,
}

impl NetError {
    /// Peer hung up mid-read or mid-write; expected during normal teardown.
    pub fn is_benign(&self) -> bool {
        use std::io::ErrorKind::*;
        match self {
            NetError::Io(e) => matches!(
                e.kind(),
                ConnectionReset | ConnectionAborted | BrokenPipe | UnexpectedEof | NotConnected
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn reset_is_benign() {
        let err = NetError::from(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(err.is_benign());
        let err = NetError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_benign());
        assert!(!NetError::Protocol(ProtocolError::UnknownHandshake(1)).is_benign());
    }
}
