//! Fixed-capacity player slot numbering.
//!
//! Every connected player occupies one slot in `1..=2047`. Slot `0` is
//! reserved and never handed out, so a zeroed index on the wire always means
//! "no player".

pub mod allocator;
pub mod types;

pub use allocator::{SlotAllocator, SlotError};
pub use types::{PlayerIndex, MAX_PLAYERS};
