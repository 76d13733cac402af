//! Stopping the server. The first stop request wins and its reason is kept,
//! so the tick thread can log why it is logging everyone out.

use std::fmt;

use tokio::sync::watch;

/// Why the server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An OS signal, by name.
    Signal(&'static str),
    /// Asked for in-process.
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Signal(name) => write!(f, "{name}"),
            StopReason::Requested => f.write_str("requested"),
        }
    }
}

/// Owned by whoever may stop the server.
#[derive(Debug)]
pub struct Stopper(watch::Sender<Option<StopReason>>);

/// Handed to every part of the server that has to notice a stop.
#[derive(Debug, Clone)]
pub struct StopListener(watch::Receiver<Option<StopReason>>);

pub fn stop_channel() -> (Stopper, StopListener) {
    let (tx, rx) = watch::channel(None);
    (Stopper(tx), StopListener(rx))
}

impl Stopper {
    /// Returns false if the server was already stopping; the earlier reason
    /// is kept.
    pub fn stop(&self, reason: StopReason) -> bool {
        self.0.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }
}

impl StopListener {
    pub fn reason(&self) -> Option<StopReason> {
        *self.0.borrow()
    }

    /// Polled by the tick loop between ticks.
    pub fn is_stopping(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves with the reason, or `None` if the stopper went away without
    /// ever stopping.
    pub async fn stopped(&mut self) -> Option<StopReason> {
        self.0.wait_for(Option::is_some).await.ok().and_then(|r| *r)
    }
}

/// Resolves on SIGINT or SIGTERM (Ctrl+C off Unix).
pub async fn wait_for_signal() -> std::io::Result<StopReason> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        };
        Ok(StopReason::Signal(name))
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok(StopReason::Signal("Ctrl+C"))
    }
}
