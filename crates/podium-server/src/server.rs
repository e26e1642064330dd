//! `PodiumServer`: Axum HTTP + `WebSocket` server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use podium_core::ConnectionId;
use podium_live::{CommandProcessor, LivePublisher, LiveSessionStore, SongCatalog};
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{IdentityVerifier, bearer_token};
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::http::{self as live_http, ApiError};
use crate::rpc::context::RpcContext;
use crate::rpc::handlers::register_all;
use crate::rpc::registry::MethodRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::session::{SessionOptions, reject_unauthenticated, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Method registry for `WebSocket` commands.
    pub registry: Arc<MethodRegistry>,
    /// Handler dependencies.
    pub ctx: Arc<RpcContext>,
    /// Live-session group.
    pub broadcast: Arc<BroadcastManager>,
    /// One permit per open socket, `max_connections` in total.
    pub connection_slots: Arc<Semaphore>,
    /// Credential verifier.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Shutdown signal.
    pub shutdown: ShutdownCoordinator,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The podium server.
pub struct PodiumServer {
    state: AppState,
}

impl PodiumServer {
    /// Wire the processor, broadcast group and registry together.
    pub fn new(
        config: ServerConfig,
        catalog: Arc<dyn SongCatalog>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let broadcast = Arc::new(BroadcastManager::new());
        let publisher: Arc<dyn LivePublisher> = Arc::clone(&broadcast) as Arc<dyn LivePublisher>;
        let processor = CommandProcessor::new(Arc::new(LiveSessionStore::new()), catalog, publisher)
            .with_lookup_timeout(config.catalog_lookup_timeout);

        let mut registry = MethodRegistry::new().with_timeout(config.dispatch_timeout);
        register_all(&mut registry);

        let connection_slots = Arc::new(Semaphore::new(
            config.max_connections.min(Semaphore::MAX_PERMITS),
        ));
        Self {
            state: AppState {
                config: Arc::new(config),
                registry: Arc::new(registry),
                ctx: Arc::new(RpcContext::new(Arc::new(processor))),
                broadcast,
                connection_slots,
                verifier,
                shutdown: ShutdownCoordinator::new(),
                start_time: Instant::now(),
                metrics: None,
            },
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .route("/api/live/current", get(live_http::current))
            .route("/api/live/session", get(live_http::own_session))
            .route("/api/live/start", post(live_http::start))
            .route("/api/live/stop", post(live_http::stop))
            .route("/api/live/change-song", post(live_http::change_song))
            .route("/api/live/change-page", post(live_http::change_page))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Live-session group.
    pub fn broadcast(&self) -> &Arc<BroadcastManager> {
        &self.state.broadcast
    }

    /// Command processor.
    pub fn processor(&self) -> &Arc<CommandProcessor> {
        &self.state.ctx.processor
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.state.registry
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn listen(self) -> std::io::Result<RunningServer> {
        let listener = TcpListener::bind(self.config().bind_addr()).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                warn!(error = %e, "server terminated with error");
            }
        });
        info!(%local_addr, "podium server listening");

        Ok(RunningServer {
            local_addr,
            handle,
            state: self.state,
        })
    }
}

/// A bound, serving server.
pub struct RunningServer {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
    state: AppState,
}

impl RunningServer {
    /// Address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Signal every session, stop accepting and drain for up to `timeout`.
    pub async fn shutdown(self, timeout: Option<Duration>) -> bool {
        self.state.shutdown.drain(vec![self.handle], timeout).await
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let roles = state.broadcast.role_counts().await;
    Json(health::health_check(
        state.start_time,
        roles,
        state.ctx.processor.store().version(),
        state.shutdown.is_shutting_down(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

impl AppState {
    /// Claim a socket slot; released when the permit drops.
    ///
    /// Reservation happens before the upgrade, so concurrent handshakes
    /// cannot push the group past `max_connections`.
    pub fn try_reserve_slot(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.connection_slots).try_acquire_owned().ok()
    }
}

/// GET /ws: authenticate, then upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    if state.shutdown.is_shutting_down() {
        return ApiError::Unavailable("server shutting down".into()).into_response();
    }
    let Some(slot) = state.try_reserve_slot() else {
        warn!(max = state.config.max_connections, "connection limit reached");
        return ApiError::Unavailable("connection limit reached".into()).into_response();
    };

    let credential = bearer_token(&headers).or_else(|| query.get("token").cloned());
    let verified = match credential {
        Some(token) => state.verifier.verify(&token),
        None => Err(crate::auth::AuthError::MissingCredential),
    };

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _slot = slot;
            match verified {
                Ok(identity) => {
                    let options = SessionOptions {
                        send_queue_capacity: state.config.send_queue_capacity,
                        heartbeat_interval: state.config.heartbeat_interval,
                        heartbeat_timeout: state.config.heartbeat_timeout,
                        shutdown: state.shutdown.token(),
                    };
                    run_ws_session(
                        socket,
                        ConnectionId::new(),
                        identity,
                        state.registry,
                        state.ctx,
                        state.broadcast,
                        options,
                    )
                    .await;
                }
                Err(err) => reject_unauthenticated(socket, &err).await,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use podium_core::{FileKind, Identity, SongInfo};
    use podium_live::InMemoryCatalog;
    use tower::ServiceExt;

    use crate::auth::{Claims, JwtVerifier};

    const SECRET: &str = "router-secret";

    fn make_server() -> PodiumServer {
        let catalog = InMemoryCatalog::new().with_song(
            "S1",
            SongInfo {
                title: "Amazing Grace".into(),
                file_ref: "uploads/songs/grace.pdf".into(),
                file_kind: FileKind::Pdf,
            },
        );
        PodiumServer::new(
            ServerConfig::default(),
            Arc::new(catalog),
            Arc::new(JwtVerifier::new(SECRET, 0)),
        )
    }

    fn token(identity: &Identity) -> String {
        JwtVerifier::new(SECRET, 0)
            .sign(&Claims::for_identity(identity, 600))
            .unwrap()
    }

    fn get_req(uri: &str, identity: Option<&Identity>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = identity {
            builder = builder.header("authorization", format!("Bearer {}", token(id)));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, identity: &Identity, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {}", token(identity)))
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn registers_live_methods() {
        let server = make_server();
        assert_eq!(server.registry().methods().len(), 5);
        assert!(server.registry().has_method("requestSnapshot"));
        assert!(!server.shutdown().is_shutting_down());
        assert_eq!(server.broadcast().connection_count(), 0);
    }

    #[test]
    fn slots_are_reserved_before_joining() {
        let server = PodiumServer::new(
            ServerConfig {
                max_connections: 2,
                ..ServerConfig::default()
            },
            Arc::new(InMemoryCatalog::new()),
            Arc::new(JwtVerifier::new(SECRET, 0)),
        );
        let state = server.state();
        let first = state.try_reserve_slot();
        let second = state.try_reserve_slot();
        assert!(first.is_some() && second.is_some());
        // Nobody has joined the group yet, but both slots are taken.
        assert_eq!(server.broadcast().connection_count(), 0);
        assert!(state.try_reserve_slot().is_none());

        drop(first);
        assert!(state.try_reserve_slot().is_some());
    }

    #[tokio::test]
    async fn health_reports_counts_and_version() {
        let app = make_server().router();
        let resp = app.oneshot(get_req("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["status"], "ok");
        assert_eq!(v["connections"], 0);
        assert_eq!(v["liveVersion"], 0);
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_404() {
        let app = make_server().router();
        let resp = app.oneshot(get_req("/metrics", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_with_handle_renders_text() {
        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();
        let app = make_server().with_metrics(handle).router();
        let resp = app.oneshot(get_req("/metrics", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn current_requires_credential() {
        let app = make_server().router();
        let resp = app.oneshot(get_req("/api/live/current", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let v = json_body(resp).await;
        assert_eq!(v["error"]["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn current_for_musician_when_inactive() {
        let app = make_server().router();
        let resp = app
            .oneshot(get_req("/api/live/current", Some(&Identity::musician("m"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["active"], false);
        assert_eq!(v["session"]["status"], "INACTIVE");
    }

    #[tokio::test]
    async fn rest_conducting_flow() {
        let server = make_server();
        let admin = Identity::admin("a").with_display_name("Ana");

        let resp = server
            .router()
            .oneshot(post_req("/api/live/start", &admin, ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["version"], 1);

        let resp = server
            .router()
            .oneshot(post_req(
                "/api/live/change-song",
                &admin,
                r#"{"songRef":"S1","pageNumber":3}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = json_body(resp).await;
        assert_eq!(v["event"], "songChanged");
        assert_eq!(v["session"]["currentPageNumber"], 3);

        let resp = server
            .router()
            .oneshot(post_req("/api/live/change-page", &admin, r#"{"pageNumber":4}"#))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["version"], 3);

        let resp = server
            .router()
            .oneshot(get_req("/api/live/session", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["session"]["ownerId"], "a");

        let other = Identity::admin("b");
        let resp = server
            .router()
            .oneshot(get_req("/api/live/session", Some(&other)))
            .await
            .unwrap();
        assert!(json_body(resp).await["session"].is_null());

        let resp = server
            .router()
            .oneshot(post_req("/api/live/stop", &admin, ""))
            .await
            .unwrap();
        assert_eq!(json_body(resp).await["session"]["status"], "INACTIVE");
    }

    #[tokio::test]
    async fn rest_error_statuses() {
        let server = make_server();
        let admin = Identity::admin("a");
        let musician = Identity::musician("m");

        let resp = server
            .router()
            .oneshot(post_req("/api/live/start", &musician, ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = server
            .router()
            .oneshot(get_req("/api/live/session", Some(&musician)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = server
            .router()
            .oneshot(post_req("/api/live/change-song", &admin, r#"{"songRef":"S1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["error"]["code"], "SESSION_NOT_LIVE");

        let _ = server
            .router()
            .oneshot(post_req("/api/live/start", &admin, ""))
            .await
            .unwrap();
        let resp = server
            .router()
            .oneshot(post_req("/api/live/change-song", &admin, r#"{"songRef":"S404"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = server
            .router()
            .oneshot(post_req("/api/live/change-page", &admin, r#"{"songRef":"S1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ws_without_upgrade_headers_is_rejected() {
        let app = make_server().router();
        let resp = app.oneshot(get_req("/ws", None)).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = make_server().router();
        let resp = app.oneshot(get_req("/nonexistent", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
