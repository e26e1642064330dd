//! Per-client `WebSocket` connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use podium_core::{ConnectionId, EventEnvelope, Identity};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// An authenticated client in the live-session group.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Verified identity of the caller.
    pub identity: Identity,
    /// Outbound frames, drained by the socket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection joined the group.
    pub connected_at: Instant,
    /// Whether the client has shown activity since the last heartbeat tick.
    pub is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    /// Frames dropped because the outbound queue was full.
    pub dropped_messages: AtomicU64,
    closed: CancellationToken,
}

impl ClientConnection {
    /// Create a connection for an authenticated identity.
    pub fn new(id: ConnectionId, identity: Identity, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            identity,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
            closed: CancellationToken::new(),
        }
    }

    /// Enqueue a pre-serialized frame without blocking.
    ///
    /// Returns `false` if the queue is full or closed, and bumps the drop
    /// counter.
    pub fn send(&self, message: Arc<String>) -> bool {
        if self.tx.try_send(message).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize an envelope and enqueue it.
    pub fn send_envelope(&self, envelope: &EventEnvelope) -> bool {
        match serde_json::to_string(envelope) {
            Ok(json) => self.send(Arc::new(json)),
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "failed to serialize envelope");
                false
            }
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record client activity (pong, ping or any inbound frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Read and reset the alive flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Ask the session task to close the socket.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether [`close`](Self::close) has been requested.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled by [`close`](Self::close).
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
