//! mapban server.
//!
//! Restores the last snapshot, serves until Ctrl+C or SIGTERM, then
//! drains connections and writes a fresh snapshot.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use mapban::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 4000)]
    port: u16,

    /// Snapshot file, read at startup and written at shutdown
    #[arg(long, default_value = "mapban-data.json")]
    data: PathBuf,

    /// Close connections idle for this many seconds
    #[arg(long, default_value_t = 60)]
    idle_timeout_secs: u64,

    /// Drop peers that have not finished the WebSocket upgrade after this
    /// many seconds
    #[arg(long, default_value_t = 5)]
    handshake_timeout_secs: u64,

    /// On shutdown, wait this many seconds for in-flight requests
    #[arg(long, default_value_t = 10)]
    drain_timeout_secs: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "mapban server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(true).init();
}

async fn run(args: Args) -> Result<(), MapbanError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data = %args.data.display(),
        "starting mapban"
    );

    // A corrupt snapshot stops startup here; the operator has to deal
    // with the file before sessions can be served again.
    let store = SnapshotStore::new(FileStorage::new(&args.data));
    let (registry, catalog) = store.restore()?;

    let server = MapBanServer::builder()
        .config(args.server_config())
        .build(MapBan::new(registry, catalog))
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    let engine = server.run_until(shutdown_signal()).await?;

    // Write failures surface as a failed exit, never silently.
    store.save(engine.registry(), engine.catalog()).await?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["mapban-server"]);
        let config = args.server_config();

        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(args.data, PathBuf::from("mapban-data.json"));
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "mapban-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9100",
            "--data",
            "/var/lib/mapban/state.json",
            "--idle-timeout-secs",
            "5",
            "--handshake-timeout-secs",
            "2",
        ]);
        let config = args.server_config();

        assert_eq!(config.bind_addr, "127.0.0.1:9100");
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.handshake_timeout, Duration::from_secs(2));
        assert_eq!(args.data, PathBuf::from("/var/lib/mapban/state.json"));
    }

    #[test]
    fn test_args_port_must_be_number() {
        assert!(Args::try_parse_from(["mapban-server", "--port", "http"]).is_err());
    }
}
