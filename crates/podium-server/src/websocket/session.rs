//! `WebSocket` session lifecycle: one authenticated client from upgrade
//! through disconnect.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use podium_core::{ConnectionId, EventEnvelope, Identity};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::broadcast::BroadcastManager;
use super::connection::ClientConnection;
use super::handler::handle_message;
use super::heartbeat::{self, HeartbeatResult, run_heartbeat};
use super::{CLOSE_AUTH_FAILED, CLOSE_SLOW_CONSUMER};
use crate::auth::AuthError;
use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;

/// How long the writer gets to flush the close frame.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-session tunables.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// Outbound queue depth.
    pub send_queue_capacity: usize,
    /// Server ping interval.
    pub heartbeat_interval: Duration,
    /// Silence after which the client is dropped.
    pub heartbeat_timeout: Duration,
    /// Cancelled on server shutdown.
    pub shutdown: CancellationToken,
}

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EndReason {
    ClientClosed,
    StreamEnded,
    Evicted,
    HeartbeatTimeout,
    Shutdown,
}

impl EndReason {
    fn close_frame(self) -> Option<CloseFrame> {
        let (code, reason) = match self {
            Self::Evicted => (CLOSE_SLOW_CONSUMER, "too many dropped events"),
            Self::Shutdown => (1001, "server shutting down"),
            Self::HeartbeatTimeout => (1011, "heartbeat timeout"),
            Self::ClientClosed | Self::StreamEnded => return None,
        };
        Some(CloseFrame {
            code,
            reason: Utf8Bytes::from_static(reason),
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::StreamEnded => "stream_ended",
            Self::Evicted => "evicted",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Send the terminal `authError` event and close with 4401.
pub async fn reject_unauthenticated(mut ws: WebSocket, err: &AuthError) {
    counter!("ws_auth_failures_total").increment(1);
    warn!(error = %err, "rejecting unauthenticated connection");
    let envelope = EventEnvelope::auth_error(err.code(), &err.to_string());
    if let Ok(json) = serde_json::to_string(&envelope) {
        let _ = ws.send(Message::Text(json.into())).await;
    }
    let _ = ws
        .send(Message::Close(Some(CloseFrame {
            code: CLOSE_AUTH_FAILED,
            reason: Utf8Bytes::from_static("authentication failed"),
        })))
        .await;
}

/// Run a session for an authenticated client.
///
/// 1. Enqueues `connected` before joining the group, so it is the first frame
/// 2. Dispatches inbound text/binary frames as commands
/// 3. Forwards queued events and periodic pings to the socket
/// 4. Ends on client close, eviction, heartbeat timeout or shutdown
/// 5. Leaves the group and closes the socket
#[instrument(skip_all, fields(client_id = %connection_id, user_id = %identity.user_id, role = %identity.role))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    identity: Identity,
    registry: Arc<MethodRegistry>,
    ctx: Arc<RpcContext>,
    broadcast: Arc<BroadcastManager>,
    options: SessionOptions,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(options.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), identity, send_tx));

    let started = Instant::now();
    info!("client connected");
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);

    let _ = connection.send_envelope(&EventEnvelope::connected(&connection.id, &connection.identity));
    broadcast.add(Arc::clone(&connection)).await;

    let (close_tx, mut close_rx) = oneshot::channel::<Option<CloseFrame>>();
    let ping_every = options.heartbeat_interval.max(heartbeat::MIN_INTERVAL);
    let mut outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_every);
        let _ = ping.tick().await;
        loop {
            tokio::select! {
                biased;
                frame = &mut close_rx => {
                    if let Ok(Some(frame)) = frame {
                        let _ = ws_tx.send(Message::Close(Some(frame))).await;
                    }
                    let _ = ws_tx.close().await;
                    break;
                }
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let heartbeat_cancel = CancellationToken::new();
    let mut heartbeat = tokio::spawn(run_heartbeat(
        Arc::clone(&connection),
        options.heartbeat_interval,
        options.heartbeat_timeout,
        heartbeat_cancel.clone(),
    ));
    let evicted = connection.close_token();

    let reason = loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let Some(Ok(msg)) = frame else { break EndReason::StreamEnded };
                connection.mark_alive();
                let text = match msg {
                    Message::Text(t) => t.to_string(),
                    Message::Binary(data) => match std::str::from_utf8(&data) {
                        Ok(s) => s.to_string(),
                        Err(_) => {
                            debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                            continue;
                        }
                    },
                    Message::Close(_) => break EndReason::ClientClosed,
                    Message::Ping(_) | Message::Pong(_) => continue,
                };
                if let Some(reply) = handle_message(&text, &registry, &ctx, &connection.identity).await {
                    if !broadcast.send_to(&connection.id, &reply).await {
                        warn!("failed to enqueue reply (queue full or left the group)");
                    }
                }
            }
            () = evicted.cancelled() => break EndReason::Evicted,
            () = options.shutdown.cancelled() => break EndReason::Shutdown,
            result = &mut heartbeat => {
                if matches!(result, Ok(HeartbeatResult::TimedOut)) {
                    warn!(silent_for = ?connection.last_pong_elapsed(), "client unresponsive");
                    break EndReason::HeartbeatTimeout;
                }
                break EndReason::StreamEnded;
            }
        }
    };

    heartbeat_cancel.cancel();
    let _ = broadcast.remove(&connection_id).await;
    let _ = close_tx.send(reason.close_frame());
    if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut outbound).await.is_err() {
        debug!("writer did not finish in time");
        outbound.abort();
    }

    info!(
        reason = reason.as_str(),
        dropped = connection.drop_count(),
        "client disconnected"
    );
    counter!("ws_disconnections_total", "reason" => reason.as_str()).increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds").record(started.elapsed().as_secs_f64());
}
