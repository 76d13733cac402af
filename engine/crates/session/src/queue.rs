use std::collections::VecDeque;

use protocol::Packet;

use crate::error::SessionError;

/// Fixed-capacity FIFO of packets waiting for the next pulse.
#[derive(Debug)]
pub struct OutboundQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `packet`, or hands back `QueueFull` leaving the queue as it was.
    pub fn push(&mut self, packet: Packet) -> Result<(), SessionError> {
        if self.packets.len() >= self.capacity {
            return Err(SessionError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.packets.push_back(packet);
        Ok(())
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Packet> + '_ {
        self.packets.drain(..)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.packets.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(n: u8) -> Packet {
        Packet::fixed(n, vec![n]).unwrap()
    }

    #[test]
    fn fifo_order() {
        let mut queue = OutboundQueue::new(8);
        for n in 0..5 {
            queue.push(packet(n)).unwrap();
        }
        let opcodes: Vec<u8> = queue.drain().map(|p| p.opcode()).collect();
        assert_eq!(opcodes, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_rejects_without_disturbing_order() {
        let mut queue = OutboundQueue::new(2);
        queue.push(packet(1)).unwrap();
        queue.push(packet(2)).unwrap();
        assert!(queue.is_full());
        assert_eq!(
            queue.push(packet(3)),
            Err(SessionError::QueueFull { capacity: 2 })
        );
        let opcodes: Vec<u8> = queue.drain().map(|p| p.opcode()).collect();
        assert_eq!(opcodes, vec![1, 2]);

        queue.push(packet(4)).unwrap();
        assert_eq!(queue.len(), 1);
    }
}
