use std::sync::Arc;
use std::time::Duration;

use accounts::InMemoryAccounts;
use game_server::config::{parse_cli_args, ServerConfig};
use game_server::shutdown::{self, stop_channel, StopListener, StopReason};
use net::MemoryAssetStore;

#[tokio::main]
async fn main() {
    observability::init_logging();

    let config = parse_cli_args();
    tracing::info!(revision = config.net.revision, "Game server starting...");

    let (stopper, stop) = stop_channel();
    let mut server = tokio::spawn(run_server(config, stop));

    let reason = tokio::select! {
        signal = shutdown::wait_for_signal() => match signal {
            Ok(reason) => reason,
            Err(e) => {
                tracing::error!("Cannot listen for signals: {}", e);
                StopReason::Requested
            }
        },
        _ = &mut server => {
            tracing::info!("Server stopped.");
            return;
        }
    };

    tracing::info!(%reason, "Stopping server, logging players out...");
    stopper.stop(reason);
    if let Err(e) = server.await {
        tracing::error!("Server task failed: {}", e);
    }
    // Writer tasks still hold the logout frames.
    tokio::time::sleep(Duration::from_millis(500)).await;
    tracing::info!("Server stopped.");
}

async fn run_server(config: ServerConfig, stop: StopListener) {
    let (game, ctx) = match game_server::build(
        &config,
        Arc::new(InMemoryAccounts::new()),
        Arc::new(MemoryAssetStore::new()),
    ) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("Invalid config: {}", e);
            return;
        }
    };

    let listener = match tokio::net::TcpListener::bind(&config.net.addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.net.addr, "Failed to bind: {}", e);
            return;
        }
    };
    tracing::info!("TCP server listening on {}", config.net.addr);

    let mut accept_stop = stop.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = net::serve(listener, ctx) => {
                if let Err(e) = result {
                    tracing::error!("TCP server error: {}", e);
                }
            }
            _ = accept_stop.stopped() => {
                tracing::info!("No longer accepting connections");
            }
        }
    });

    // Tick thread (blocking)
    let tick_config = config.to_tick_config();
    let tick_handle = std::thread::spawn(move || {
        game_server::run_tick_thread(game, tick_config, stop);
    });

    let joined = tokio::task::spawn_blocking(move || tick_handle.join()).await;
    if !matches!(joined, Ok(Ok(()))) {
        tracing::error!("Tick thread panicked");
    }
}
