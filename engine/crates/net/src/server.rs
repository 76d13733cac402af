use std::sync::Arc;

use accounts::Authenticator;
use bytes::BytesMut;
use session::{ConnectionHandle, Outbound, OutboundRx, SessionId};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};

use crate::assets::AssetStore;
use crate::channels::PlayerTx;
use crate::connection::{Connection, Flow};

/// Shared by every connection task.
pub struct NetContext {
    /// Client build this server speaks.
    pub revision: u32,
    pub assets: Arc<dyn AssetStore>,
    /// Checked on the blocking pool before a login reaches the tick thread.
    pub accounts: Arc<dyn Authenticator>,
    pub player_tx: PlayerTx,
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, ctx: Arc<NetContext>) -> Result<(), std::io::Error> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let session_id = SessionId::random();
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%session_id, error = %e, "could not disable nagle");
        }

        tracing::info!(%session_id, %peer_addr, "New connection");

        let ctx = ctx.clone();
        tokio::spawn(async move {
            handle_session(stream, session_id, ctx).await;
        });
    }
}

async fn handle_session(stream: TcpStream, session_id: SessionId, ctx: Arc<NetContext>) {
    let (mut reader, writer) = stream.into_split();
    let (handle, write_rx) = ConnectionHandle::new(session_id);

    // Spawn writer task
    let mut writer_task = tokio::spawn(write_loop(writer, write_rx, session_id));
    let mut writer_done = false;

    let mut conn = Connection::new(handle.clone(), ctx);
    conn.on_connect();

    // Reader loop
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        tokio::select! {
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => break, // Connection closed
                Ok(_) => match conn.on_bytes(&mut buf).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Close) => break,
                    Err(e) => {
                        conn.on_error(&e);
                        break;
                    }
                },
                Err(e) => {
                    conn.on_error(&e.into());
                    break;
                }
            },
            _ = &mut writer_task => {
                writer_done = true;
                break;
            }
        }
    }

    handle.close();
    conn.on_disconnect();
    if !writer_done {
        let _ = writer_task.await;
    }
    tracing::info!(%session_id, "Session ended");
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: OutboundRx, session_id: SessionId) {
    while let Some(out) = rx.recv().await {
        match out {
            Outbound::Frame(bytes) => {
                if let Err(e) = writer.write_all(&bytes).await {
                    tracing::debug!(%session_id, error = %e, "write failed");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}
