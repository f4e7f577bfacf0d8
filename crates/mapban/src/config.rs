//! Server configuration.

use std::time::Duration;

/// Settings for [`MapBanServer`](crate::MapBanServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// A peer must finish its WebSocket upgrade within this long.
    pub handshake_timeout: Duration,

    /// After shutdown is signalled, how long to wait for connections to
    /// finish the request they are serving before aborting them.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4000".to_string(),
            idle_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
        }
    }
}
