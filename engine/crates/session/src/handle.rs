use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::SessionId;

/// Instructions for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Frame(Bytes),
    /// Flush what came before, then shut the socket.
    Close,
}

pub type OutboundTx = mpsc::UnboundedSender<Outbound>;
pub type OutboundRx = mpsc::UnboundedReceiver<Outbound>;

/// Cheap, clonable write side of one connection.
///
/// Sends never block, so the tick thread can hand bytes over without
/// waiting on the socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    session_id: SessionId,
    tx: OutboundTx,
    closing: Arc<AtomicBool>,
}

impl ConnectionHandle {
    pub fn new(session_id: SessionId) -> (Self, OutboundRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            session_id,
            tx,
            closing: Arc::new(AtomicBool::new(false)),
        };
        (handle, rx)
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// False once `close` has been called or the writer has gone away.
    pub fn is_active(&self) -> bool {
        !self.closing.load(Ordering::Acquire) && !self.tx.is_closed()
    }

    /// Queues bytes for the socket. Returns false if the connection is gone.
    pub fn send(&self, frame: Bytes) -> bool {
        if !self.is_active() {
            return false;
        }
        self.tx.send(Outbound::Frame(frame)).is_ok()
    }

    /// Idempotent. Frames sent before the first call still reach the wire.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(session_id = %self.session_id, "closing connection");
        let _ = self.tx.send(Outbound::Close);
    }
}
