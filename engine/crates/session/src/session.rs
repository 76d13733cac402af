use bytes::BytesMut;
use engine_core::FlushStats;
use protocol::{Encoder, GamePacketEncoder, Packet};

use crate::error::SessionError;
use crate::handle::ConnectionHandle;
use crate::queue::OutboundQueue;
use crate::SessionId;

/// Tick-side half of an authenticated connection.
///
/// Game logic writes packets at any point during a tick; they leave the
/// process only when [`Session::pulse`] runs, as a single frame.
pub struct Session {
    id: SessionId,
    queue: OutboundQueue,
    encoder: GamePacketEncoder,
    pending: BytesMut,
    handle: ConnectionHandle,
}

impl Session {
    pub fn new(handle: ConnectionHandle, encoder: GamePacketEncoder, capacity: usize) -> Self {
        Self {
            id: handle.session_id(),
            queue: OutboundQueue::new(capacity),
            encoder,
            pending: BytesMut::new(),
            handle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// True when the next `write` would be dropped.
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    /// Enqueues a packet for the next pulse. Never blocks.
    pub fn write(&mut self, packet: Packet) -> Result<(), SessionError> {
        if !self.handle.is_active() {
            return Err(SessionError::Closed);
        }
        self.queue.push(packet)
    }

    /// Hands any encoded bytes to the connection. No-op once closed.
    pub fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let frame = self.pending.split().freeze();
        let len = frame.len();
        if self.handle.send(frame) {
            len
        } else {
            0
        }
    }

    pub fn close(&self) {
        self.handle.close();
    }

    /// Drains the whole queue in order, then flushes.
    pub fn pulse(&mut self) -> FlushStats {
        let mut stats = FlushStats::default();
        for packet in self.queue.drain() {
            let opcode = packet.opcode();
            match self.encoder.encode(packet, &mut self.pending) {
                Ok(()) => stats.packets += 1,
                Err(e) => {
                    tracing::warn!(session_id = %self.id, opcode, error = %e, "dropping unencodable packet");
                }
            }
        }
        stats.bytes = self.flush();
        if stats.bytes == 0 {
            stats.packets = 0;
        }
        stats
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("queued", &self.queue.len())
            .field("active", &self.handle.is_active())
            .finish()
    }
}
