pub mod config;
pub mod game;
pub mod login;
pub mod player;
pub mod shutdown;
pub mod world;

use std::sync::Arc;

use accounts::Authenticator;
use engine_core::{TickConfig, TickLoop};
use net::{AssetStore, NetContext};
use space::ZeroRegionKeys;

use crate::config::{ConfigError, ServerConfig};
use crate::game::Game;
use crate::shutdown::StopListener;

/// Builds the tick-side game and the context the connection tasks share.
/// The two halves are joined by the player channel.
pub fn build(
    config: &ServerConfig,
    accounts: Arc<dyn Authenticator>,
    assets: Arc<dyn AssetStore>,
) -> Result<(Game, Arc<NetContext>), ConfigError> {
    let settings = config.to_game_settings()?;
    let (player_tx, player_rx) = tokio::sync::mpsc::unbounded_channel();

    let ctx = Arc::new(NetContext {
        revision: settings.revision,
        assets,
        accounts,
        player_tx,
    });
    let game = Game::new(settings, Box::new(ZeroRegionKeys), player_rx);
    Ok((game, ctx))
}

/// Drives the game until told to stop, then logs every player out.
/// Blocks the calling thread.
pub fn run_tick_thread(game: Game, config: TickConfig, stop: StopListener) -> Game {
    tracing::info!(tick_ms = config.tick_ms, "tick loop running");
    let mut tick_loop = TickLoop::new(config, game);
    tick_loop.run_until(|| stop.is_stopping(), |_| {});
    if let Some(reason) = stop.reason() {
        tracing::info!(%reason, "tick loop stopping");
    }
    tick_loop.target.shutdown();
    tick_loop.target
}
