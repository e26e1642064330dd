//! REST routes over the same command processor and broadcast.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use podium_core::{Identity, LiveError, LiveEvent};
use podium_live::Command;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::auth::{AuthError, authenticate_headers};
use crate::rpc::errors::RpcError;
use crate::rpc::handlers::live::{change_page_command, change_song_command};
use crate::rpc::validation::sanitize_error_message;
use crate::server::AppState;

/// Failure of an HTTP request, rendered as `{error: {code, message}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid bearer credential.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Rejected command or malformed body.
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// Server cannot take the request right now.
    #[error("{0}")]
    Unavailable(String),
}

impl From<LiveError> for ApiError {
    fn from(err: LiveError) -> Self {
        Self::Rpc(RpcError::Live(err))
    }
}

impl ApiError {
    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Rpc(RpcError::Live(live)) => match live {
                LiveError::Forbidden { .. } => StatusCode::FORBIDDEN,
                LiveError::InvalidState(_) => StatusCode::CONFLICT,
                LiveError::SongNotFound(_) => StatusCode::NOT_FOUND,
                LiveError::InvalidParams(_) => StatusCode::BAD_REQUEST,
                LiveError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Rpc(RpcError::InvalidParams { .. }) => StatusCode::BAD_REQUEST,
            Self::Rpc(RpcError::MethodNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Rpc(RpcError::Internal { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.code(),
            Self::Rpc(e) => e.code(),
            Self::Unavailable(_) => "SERVER_UNAVAILABLE",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Rpc(e) => sanitize_error_message(e),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.client_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

fn parse_body(body: &Bytes) -> Result<Option<Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| RpcError::invalid_params(format!("Invalid JSON body: {e}")).into())
}

fn caller(state: &AppState, headers: &HeaderMap) -> Result<Identity, ApiError> {
    Ok(authenticate_headers(state.verifier.as_ref(), headers)?)
}

fn mutation_response(event: &LiveEvent) -> Json<Value> {
    Json(json!({
        "event": event.event_type(),
        "version": event.version(),
        "session": event.session(),
    }))
}

async fn execute(state: &AppState, caller: &Identity, command: Command) -> Result<Json<Value>, ApiError> {
    let event = state.ctx.processor.execute(caller, command).await?;
    Ok(mutation_response(&event))
}

/// GET /api/live/current: catch-up for any authenticated role.
pub async fn current(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let _caller = caller(&state, &headers)?;
    let session = state.ctx.processor.snapshot();
    Ok(Json(json!({ "active": session.is_live(), "session": session })))
}

/// GET /api/live/session: the caller's own live session, if they conduct it.
pub async fn own_session(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let caller = caller(&state, &headers)?;
    if !caller.role.can_conduct() {
        return Err(LiveError::Forbidden {
            role: caller.role,
            command: "view the conducted session",
        }
        .into());
    }
    let session = state.ctx.processor.owned_session(&caller);
    Ok(Json(json!({ "session": session })))
}

/// POST /api/live/start
pub async fn start(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let caller = caller(&state, &headers)?;
    execute(&state, &caller, Command::Start).await
}

/// POST /api/live/stop
pub async fn stop(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let caller = caller(&state, &headers)?;
    execute(&state, &caller, Command::Stop).await
}

/// POST /api/live/change-song `{songRef, pageNumber?}`
pub async fn change_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let caller = caller(&state, &headers)?;
    let params = parse_body(&body)?;
    let command = change_song_command(&caller, params.as_ref())?;
    execute(&state, &caller, command).await
}

/// POST /api/live/change-page `{pageNumber, songRef?}`
pub async fn change_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let caller = caller(&state, &headers)?;
    let params = parse_body(&body)?;
    let command = change_page_command(&caller, params.as_ref())?;
    execute(&state, &caller, command).await
}
