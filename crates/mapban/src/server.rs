//! `MapBanServer` builder and server loop.
//!
//! Ties the layers together: transport → protocol → engine. Each accepted
//! connection runs in its own task, upgrade included; the tasks share one
//! [`MapBan`] engine.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mapban_protocol::JsonCodec;
use mapban_transport::{Transport, WebSocketTransport};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::handler::serve_connection;
use crate::{MapBan, MapbanError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) engine: Arc<MapBan>,
    pub(crate) codec: JsonCodec,
    pub(crate) idle_timeout: Duration,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a mapban server.
///
/// # Example
///
/// ```rust,ignore
/// use mapban::prelude::*;
///
/// let server = MapBanServer::builder()
///     .bind("0.0.0.0:4000")
///     .build(MapBan::new(registry, catalog))
///     .await?;
/// let engine = server.run_until(shutdown_signal()).await?;
/// ```
pub struct MapBanServerBuilder {
    config: ServerConfig,
}

impl MapBanServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.config.drain_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener and wraps `engine` for serving.
    pub async fn build(self, engine: MapBan) -> Result<MapBanServer, MapbanError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            engine: Arc::new(engine),
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
            handshake_timeout: self.config.handshake_timeout,
        });

        Ok(MapBanServer {
            transport,
            state,
            config: self.config,
        })
    }
}

impl Default for MapBanServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound mapban server.
///
/// Call [`run_until()`](Self::run_until) to start accepting connections.
pub struct MapBanServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl MapBanServer {
    /// Creates a new builder.
    pub fn builder() -> MapBanServerBuilder {
        MapBanServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, MapbanError> {
        Ok(self.transport.local_addr()?)
    }

    /// The engine this server feeds.
    pub fn engine(&self) -> Arc<MapBan> {
        Arc::clone(&self.state.engine)
    }

    /// Serves until `shutdown` resolves, then shuts down gracefully:
    ///
    /// 1. The listener is closed; no new connections are accepted.
    /// 2. Every connection finishes the request it is serving, then
    ///    closes. Connections still busy after the drain timeout are
    ///    aborted.
    /// 3. The engine is handed back. Nothing mutates it any more, so the
    ///    caller can snapshot it.
    pub async fn run_until<F>(self, shutdown: F) -> Result<Arc<MapBan>, MapbanError>
    where
        F: Future<Output = ()>,
    {
        let Self {
            mut transport,
            state,
            config,
        } = self;
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        tracing::info!(addr = %config.bind_addr, "mapban server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                // TCP accept only; the upgrade runs in the spawned task.
                accepted = transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&state);
                        let stop = stop_rx.clone();
                        connections.spawn(serve_connection(pending, state, stop));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                }
            }
        }

        drop(transport);
        let _ = stop_tx.send(true);
        tracing::info!(
            in_flight = connections.len(),
            "shutting down, draining connections"
        );

        let drain = async {
            while let Some(joined) = connections.join_next().await {
                log_join(joined);
            }
        };
        if tokio::time::timeout(config.drain_timeout, drain).await.is_err() {
            tracing::warn!(
                remaining = connections.len(),
                "drain timed out, aborting connections"
            );
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }

        tracing::info!("mapban server stopped");
        Ok(Arc::clone(&state.engine))
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<Arc<MapBan>, MapbanError> {
        self.run_until(std::future::pending()).await
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            tracing::error!(error = %e, "connection task panicked");
        }
    }
}
