use std::collections::BTreeSet;

use crate::types::{PlayerIndex, MAX_PLAYERS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("all {} player slots are in use", MAX_PLAYERS - 1)]
    Full,

    #[error("slot {0} is outside 1..{max}", max = MAX_PLAYERS)]
    OutOfRange(u16),

    #[error("slot {0} is already in use")]
    InUse(PlayerIndex),

    #[error("slot {0} is not allocated")]
    NotAllocated(PlayerIndex),
}

/// Hands out player slots, lowest free slot first.
///
/// A slot only becomes reusable after [`SlotAllocator::release`]; callers are
/// expected to finish all per-slot cleanup before releasing.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    in_use: Vec<bool>,
    free: BTreeSet<u16>,
}

impl SlotAllocator {
    pub fn new() -> Self {
        Self {
            in_use: vec![false; MAX_PLAYERS],
            free: (1..MAX_PLAYERS as u16).collect(),
        }
    }

    pub fn allocate(&mut self) -> Result<PlayerIndex, SlotError> {
        let raw = self.free.pop_first().ok_or(SlotError::Full)?;
        self.in_use[raw as usize] = true;
        tracing::trace!(slot = raw, "slot allocated");
        PlayerIndex::new(raw).ok_or(SlotError::OutOfRange(raw))
    }

    /// Claim a specific slot.
    pub fn reserve(&mut self, raw: u16) -> Result<PlayerIndex, SlotError> {
        let index = PlayerIndex::new(raw).ok_or(SlotError::OutOfRange(raw))?;
        if !self.free.remove(&raw) {
            return Err(SlotError::InUse(index));
        }
        self.in_use[raw as usize] = true;
        Ok(index)
    }

    pub fn release(&mut self, index: PlayerIndex) -> Result<(), SlotError> {
        let idx = index.as_usize();
        if !self.in_use[idx] {
            return Err(SlotError::NotAllocated(index));
        }
        self.in_use[idx] = false;
        self.free.insert(index.get());
        tracing::trace!(slot = index.get(), "slot released");
        Ok(())
    }

    pub fn is_allocated(&self, index: PlayerIndex) -> bool {
        self.in_use[index.as_usize()]
    }

    pub fn allocated_count(&self) -> usize {
        MAX_PLAYERS - 1 - self.free.len()
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_lowest_free_slot() {
        let mut alloc = SlotAllocator::new();
        assert_eq!(alloc.allocate().unwrap().get(), 1);
        assert_eq!(alloc.allocate().unwrap().get(), 2);
        assert_eq!(alloc.allocated_count(), 2);
    }

    #[test]
    fn released_slot_is_reused_first() {
        let mut alloc = SlotAllocator::new();
        let a = alloc.allocate().unwrap();
        let _b = alloc.allocate().unwrap();
        alloc.release(a).unwrap();
        assert!(!alloc.is_allocated(a));
        assert_eq!(alloc.allocate().unwrap(), a);
    }

    #[test]
    fn double_release_is_rejected() {
        let mut alloc = SlotAllocator::new();
        let a = alloc.allocate().unwrap();
        assert!(alloc.release(a).is_ok());
        assert_eq!(alloc.release(a), Err(SlotError::NotAllocated(a)));
    }

    #[test]
    fn reserve_specific_slot() {
        let mut alloc = SlotAllocator::new();
        let five = alloc.reserve(5).unwrap();
        assert!(alloc.is_allocated(five));
        assert_eq!(alloc.reserve(5), Err(SlotError::InUse(five)));
        assert_eq!(alloc.reserve(0), Err(SlotError::OutOfRange(0)));
        // Slot 5 is skipped by sequential allocation.
        for expected in 1..=4 {
            assert_eq!(alloc.allocate().unwrap().get(), expected);
        }
        assert_eq!(alloc.allocate().unwrap().get(), 6);
    }

    #[test]
    fn exhausting_the_table() {
        let mut alloc = SlotAllocator::new();
        for _ in 1..MAX_PLAYERS {
            alloc.allocate().unwrap();
        }
        assert_eq!(alloc.allocated_count(), 2047);
        assert_eq!(alloc.allocate(), Err(SlotError::Full));
    }
}
