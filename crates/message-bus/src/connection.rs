//! Durable, auto-reconnecting connection to the broker.
//!
//! Wraps a single `lapin::Connection` behind a reconnect loop: connection
//! errors are logged and followed by a bounded exponential backoff
//! reconnect, mirroring the scheduler's own poll/backoff/retry style
//! elsewhere in the workspace. Queue declarations are idempotent, so callers
//! simply re-declare after fetching a fresh channel.

use std::sync::Arc;
use std::time::Duration;

use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::BusError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// A durable connection handle. Cloning is cheap; all clones share the same
/// underlying connection and observe the same reconnects.
#[derive(Clone)]
pub struct BusConnection {
    inner: Arc<RwLock<Connection>>,
    url: String,
}

impl BusConnection {
    pub async fn connect(url: impl Into<String>) -> Result<Self, BusError> {
        let url = url.into();
        let conn = Self::dial(&url).await?;
        let this = Self {
            inner: Arc::new(RwLock::new(conn)),
            url,
        };
        this.spawn_watchdog();
        Ok(this)
    }

    async fn dial(url: &str) -> Result<Connection, BusError> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        info!(url, "connected to broker");
        Ok(conn)
    }

    /// Watches the active connection for errors and reconnects with backoff.
    /// `lapin::Connection::on_error` fires once per connection instance, so
    /// this installs a fresh hook after every successful reconnect.
    fn spawn_watchdog(&self) {
        let inner = self.inner.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            loop {
                let (tx, rx) = tokio::sync::oneshot::channel();
                {
                    let guard = inner.read().await;
                    let tx = std::sync::Mutex::new(Some(tx));
                    guard.on_error(move |err| {
                        if let Some(tx) = tx.lock().unwrap().take() {
                            let _ = tx.send(err);
                        }
                    });
                }
                let err = match rx.await {
                    Ok(err) => err,
                    // Connection was dropped (e.g. process shutting down).
                    Err(_) => return,
                };
                warn!(%err, "broker connection error, reconnecting");

                let mut backoff = INITIAL_BACKOFF;
                loop {
                    match Self::dial(&url).await {
                        Ok(conn) => {
                            *inner.write().await = conn;
                            break;
                        }
                        Err(err) => {
                            error!(%err, backoff_ms = backoff.as_millis() as u64, "reconnect failed");
                            tokio::time::sleep(backoff).await;
                            backoff = (backoff * 2).min(MAX_BACKOFF);
                        }
                    }
                }
            }
        });
    }

    /// Open a fresh channel on the current connection. Callers should
    /// re-declare any queues they need immediately after, since a reconnect
    /// invalidates previously declared exclusive/auto-delete queues.
    pub async fn channel(&self) -> Result<Channel, BusError> {
        let conn = self.inner.read().await;
        Ok(conn.create_channel().await?)
    }

    /// Close the underlying connection. Intended for a process that is
    /// shutting down for good; the watchdog sees this as a dropped
    /// connection and stops reconnecting, since its error channel closes
    /// without ever firing.
    pub async fn close(&self) -> Result<(), BusError> {
        let conn = self.inner.read().await;
        conn.close(0, "shutting down").await?;
        Ok(())
    }
}
