// src/serve/reload.rs

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Broadcast side of the reload channel.
///
/// Cheap to clone; `notify` fans a reload signal out to every connected
/// observer. With no observers connected the signal is dropped silently.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<()>,
}

impl ReloadHub {
    pub fn notify(&self) {
        let receivers = self.tx.receiver_count();
        debug!(receivers, "broadcasting reload notification");
        let _ = self.tx.send(());
    }
}

/// The accept loop behind a [`ReloadHub`]. Stopping it closes the listen
/// socket; already-connected observers are dropped once the hub goes away.
#[derive(Debug)]
pub struct ReloadListener {
    local_addr: SocketAddr,
    accept_loop: JoinHandle<()>,
}

impl ReloadListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting observers.
    pub fn stop(self) {
        self.accept_loop.abort();
    }
}

/// Bind the reload notification channel on `addr`.
///
/// Each observer connection gets its own forwarding task: every hub
/// notification is written out as a `reload\n` line; a write failure drops
/// the observer.
pub async fn bind(addr: &str) -> Result<(ReloadHub, ReloadListener)> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding reload listener on {addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("resolving reload listener address")?;

    info!(%local_addr, "reload notification channel listening");

    let (tx, _rx) = broadcast::channel::<()>(16);
    let accept_tx = tx.clone();

    let accept_loop = tokio::spawn(async move {
        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("reload listener accept error: {err}");
                    continue;
                }
            };

            debug!(%peer, "reload observer connected");
            let mut rx = accept_tx.subscribe();

            tokio::spawn(async move {
                let mut stream = stream;
                loop {
                    match rx.recv().await {
                        Ok(()) => {
                            if let Err(err) = stream.write_all(b"reload\n").await {
                                debug!(%peer, "dropping reload observer: {err}");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            // Collapsed notifications still mean "reload once".
                            debug!(%peer, missed, "observer lagged; sending one reload");
                            if stream.write_all(b"reload\n").await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }
    });

    Ok((
        ReloadHub { tx },
        ReloadListener {
            local_addr,
            accept_loop,
        },
    ))
}
