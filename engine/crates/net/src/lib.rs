pub mod assets;
pub mod channels;
pub mod connection;
pub mod error;
pub mod server;

pub use assets::{AssetStore, MemoryAssetStore};
pub use channels::{LoginReply, NetToTick, PlayerRx, PlayerTx};
pub use error::NetError;
pub use server::{serve, NetContext};
