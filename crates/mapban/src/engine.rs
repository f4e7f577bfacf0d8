//! The request engine: one validated request in, one response out.
//!
//! Transport-agnostic. The connection handler feeds it decoded frames;
//! tests can call it directly.

use mapban_phase::Applied;
use mapban_protocol::{
    CreateSession, MapChoice, ProtocolError, RawRequest, Request, Response,
    ResponseBody, SessionStatus, SessionView, Token, status,
};
use mapban_session::{MapCatalog, SessionError, SessionRegistry};

use crate::MapbanError;

/// The map-ban service: live sessions plus the catalog they draw from.
#[derive(Debug)]
pub struct MapBan {
    registry: SessionRegistry,
    catalog: MapCatalog,
}

impl MapBan {
    pub fn new(registry: SessionRegistry, catalog: MapCatalog) -> Self {
        Self { registry, catalog }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &MapCatalog {
        &self.catalog
    }

    /// Validates and serves one request. Never fails: every error becomes
    /// a response with a non-200 status.
    pub async fn handle(&self, raw: RawRequest) -> Response {
        let seq = raw.seq;
        let result = match raw.validate() {
            Ok(request) => self.dispatch(request).await,
            Err(errors) => Err(ProtocolError::InvalidRequest(errors).into()),
        };
        match result {
            Ok(body) => Response::ok(seq, body),
            Err(e) => reject(seq, &e),
        }
    }

    /// Serves an already validated request.
    pub async fn dispatch(
        &self,
        request: Request,
    ) -> Result<ResponseBody, MapbanError> {
        match request {
            Request::Create(create) => {
                self.create(create).await.map(ResponseBody::Created)
            }
            Request::Choose(choice) => {
                Ok(match self.choose(choice).await? {
                    Applied::Progress(maps_chosen) => {
                        ResponseBody::MapsChosen { maps_chosen }
                    }
                    Applied::Finished(maps) => ResponseBody::Result { maps },
                })
            }
            Request::Status { token } => {
                self.status(&token).await.map(ResponseBody::Status)
            }
        }
    }

    /// Phase 0: opens a session and returns its view, tokens included.
    pub async fn create(
        &self,
        request: CreateSession,
    ) -> Result<SessionView, MapbanError> {
        let session = self.registry.create(&self.catalog, request).await?;
        Ok(session.view())
    }

    /// Phases 1 to 7: validates and applies one choice under the session
    /// lock.
    pub async fn choose(
        &self,
        request: MapChoice,
    ) -> Result<Applied, MapbanError> {
        let token = request.token.clone();
        let applied = self
            .registry
            .with_session(&token, |entry| mapban_phase::choose(entry, request))
            .await??;

        if let Applied::Finished(maps) = &applied {
            tracing::info!(
                token = %token.fingerprint(),
                orange_pick = %maps[0],
                blue_pick = %maps[1],
                decider = %maps[2],
                "map-ban finished"
            );
        }
        Ok(applied)
    }

    /// Read-only poll of the session behind `token`.
    pub async fn status(
        &self,
        token: &Token,
    ) -> Result<SessionStatus, MapbanError> {
        let (role, session) = self.registry.resolve(token).await?;
        Ok(mapban_phase::status(&session, role))
    }
}

/// Turns an error into a response, logging by severity.
fn reject(seq: u64, error: &MapbanError) -> Response {
    let code = error.status();
    match error {
        MapbanError::Session(SessionError::NotFound(token)) => {
            tracing::warn!(%token, "request names no live session");
        }
        _ if code >= status::INTERNAL_SERVER_ERROR => {
            tracing::error!(error = %error, "request failed");
        }
        _ => {
            tracing::debug!(status = code, error = %error, "request rejected");
        }
    }
    Response::error(seq, code, error.to_string(), error.field_errors())
}
