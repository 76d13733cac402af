pub mod region;
pub mod tile;

pub use region::{RegionKeyStore, RegionKeys, StaticRegionKeys, ZeroRegionKeys};
pub use tile::{Tile, TileError};
