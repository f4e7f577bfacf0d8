//! Per-connection handler: read a request frame, answer it, repeat.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! A connection may carry any number of requests, from any role and for
//! any session; the token in each request is the only identity that
//! counts.

use std::sync::Arc;

use mapban_protocol::{Codec, RawRequest, Response, status};
use mapban_transport::{
    Connection, Handshake, PendingConnection, WebSocketConnection,
};
use tokio::sync::watch;

use crate::MapbanError;
use crate::server::ServerState;

/// Upgrades an accepted peer, then serves it until it goes away.
///
/// The upgrade is bounded by the handshake timeout and abandoned if
/// shutdown starts first.
pub(crate) async fn serve_connection(
    pending: PendingConnection,
    state: Arc<ServerState>,
    mut stop: watch::Receiver<bool>,
) {
    let peer = pending.peer_addr();
    let upgraded = tokio::select! {
        biased;
        _ = stop.changed() => return,
        upgraded = tokio::time::timeout(state.handshake_timeout, pending.complete()) => upgraded,
    };

    let conn = match upgraded {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(%peer, "handshake timed out, dropping peer");
            return;
        }
    };

    if let Err(e) = handle_connection(conn, state, stop).await {
        tracing::debug!(%peer, error = %e, "connection ended with error");
    }
}

/// Handles a single connection from upgrade to close.
///
/// Ends when the peer hangs up, goes quiet for the idle timeout, or the
/// server starts shutting down. A request already being served when
/// shutdown begins is answered first.
async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
    mut stop: watch::Receiver<bool>,
) -> Result<(), MapbanError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    loop {
        let data = tokio::select! {
            biased;
            _ = stop.changed() => {
                tracing::debug!(%conn_id, "server shutting down, closing connection");
                break;
            }
            received = tokio::time::timeout(state.idle_timeout, conn.recv()) => {
                match received {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        tracing::debug!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::debug!(%conn_id, "connection idle, closing");
                        break;
                    }
                }
            }
        };

        let response = respond(&state, &data).await;
        let bytes = state.codec.encode(&response)?;
        conn.send(&bytes).await?;
    }

    let _ = conn.close().await;
    Ok(())
}

/// Decodes one frame and runs it through the engine.
///
/// A frame that isn't a request at all still gets an answer, with
/// `seq` 0 since the real one couldn't be read.
async fn respond(state: &ServerState, data: &[u8]) -> Response {
    match state.codec.decode::<RawRequest>(data) {
        Ok(raw) => state.engine.handle(raw).await,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode request");
            Response::error(
                0,
                status::BAD_REQUEST,
                format!("malformed request: {e}"),
                Vec::new(),
            )
        }
    }
}
