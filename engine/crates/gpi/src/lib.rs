//! Global player info: which other players each client is rendering.

mod table;
mod update;

pub use table::{GpiTable, TileView, MAX_LOCAL_PLAYERS};
pub use update::GpiUpdate;
