//! HTTP binding with session affinity.
//!
//! `POST /mcp` carries one JSON-RPC request per call. The optional
//! `mcp-session-id` header selects the dispatcher; a fresh UUID is issued
//! when it is missing and always echoed back. `DELETE /mcp` closes a session
//! and `GET /health` reports liveness.
//!
//! CORS allows any origin and exposes `mcp-session-id`, so browser clients
//! can read a server-issued session id.

use super::session::SessionStore;
use crate::server::McpServer;
use crate::types::{McpError, McpRequest, McpResponse, RequestId};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Header carrying the session id in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Builds a dispatcher for a newly seen session.
pub trait DispatcherFactory: Send + Sync {
    fn create(&self) -> Arc<McpServer>;
}

impl<F> DispatcherFactory for F
where
    F: Fn() -> Arc<McpServer> + Send + Sync,
{
    fn create(&self) -> Arc<McpServer> {
        self()
    }
}

/// Shared state for the HTTP handlers.
struct HttpState {
    sessions: Arc<SessionStore>,
    factory: Arc<dyn DispatcherFactory>,
}

/// Build the router for the HTTP binding.
pub fn router(sessions: Arc<SessionStore>, factory: Arc<dyn DispatcherFactory>) -> Router {
    let state = Arc::new(HttpState { sessions, factory });
    Router::new()
        .route("/mcp", post(handle_mcp).delete(close_session))
        .route("/health", get(health))
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    let session = HeaderName::from_static(SESSION_HEADER);
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, session.clone()])
        .expose_headers([session])
}

/// Serve on an already bound listener until the server fails.
///
/// Expired sessions are swept in the background for as long as this runs.
pub async fn serve_on(
    listener: TcpListener,
    sessions: Arc<SessionStore>,
    factory: Arc<dyn DispatcherFactory>,
) -> io::Result<()> {
    let sweeper = sessions.spawn_sweeper();
    info!(
        "MCP HTTP server listening on http://{}/mcp (session ttl {}s, capacity {})",
        listener.local_addr()?,
        sessions.ttl().as_secs(),
        sessions.capacity()
    );

    let result = axum::serve(listener, router(sessions, factory)).await;
    sweeper.abort();
    result
}

async fn handle_mcp(
    State(state): State<Arc<HttpState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let session_id = session_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());

    let request: McpRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(session_id, "Malformed request body: {e}");
            let response = McpResponse::error(RequestId::Null, McpError::parse_error(e));
            return with_session(&session_id, (StatusCode::BAD_REQUEST, Json(response)));
        }
    };

    let (dispatcher, created) = state
        .sessions
        .get_or_create(&session_id, || state.factory.create())
        .await;
    if created {
        info!(session_id, "Session created");
    }

    debug!(session_id, method = %request.method, "Dispatching request");
    match dispatcher.handle_request(request).await {
        Some(response) => with_session(&session_id, (StatusCode::OK, Json(response))),
        None => with_session(&session_id, StatusCode::ACCEPTED),
    }
}

async fn close_session(State(state): State<Arc<HttpState>>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing mcp-session-id header").into_response();
    };

    if state.sessions.remove(&session_id).await {
        with_session(&session_id, StatusCode::NO_CONTENT)
    } else {
        with_session(&session_id, StatusCode::NOT_FOUND)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn with_session(session_id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
