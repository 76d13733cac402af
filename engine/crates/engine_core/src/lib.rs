pub mod tick;

pub use tick::{FlushStats, TickConfig, TickLoop, TickTarget};
