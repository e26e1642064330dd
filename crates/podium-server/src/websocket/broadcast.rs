//! Live-session group membership and event fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use metrics::counter;
use podium_core::{ConnectionId, EventEnvelope, LiveEvent, Role};
use podium_live::LivePublisher;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::connection::ClientConnection;

/// Lifetime drops after which a slow member is evicted.
pub const MAX_TOTAL_DROPS: u64 = 100;

/// Members of the single live-session group.
pub struct BroadcastManager {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
    active_count: AtomicUsize,
}

/// Connected members per role.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleCounts {
    /// Admin connections.
    pub admins: usize,
    /// Musician connections.
    pub musicians: usize,
}

impl BroadcastManager {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Join a connection to the group.
    pub async fn add(&self, connection: Arc<ClientConnection>) {
        let mut conns = self.connections.write().await;
        if conns.insert(connection.id.clone(), connection).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Leave the group. Returns whether the connection was a member.
    pub async fn remove(&self, connection_id: &ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(connection_id).is_some();
        if removed {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Unicast an envelope to one member.
    pub async fn send_to(&self, connection_id: &ConnectionId, envelope: &EventEnvelope) -> bool {
        let conns = self.connections.read().await;
        conns
            .get(connection_id)
            .is_some_and(|conn| conn.send_envelope(envelope))
    }

    /// Serialize once and enqueue to every member; evict members past
    /// [`MAX_TOTAL_DROPS`].
    pub async fn broadcast(&self, envelope: &EventEnvelope) -> usize {
        let json = match serde_json::to_string(envelope) {
            Ok(j) => Arc::new(j),
            Err(e) => {
                warn!(event_type = %envelope.event_type, error = %e, "failed to serialize event");
                return 0;
            }
        };
        let mut evicted = Vec::new();
        let mut delivered = 0usize;
        {
            let conns = self.connections.read().await;
            for conn in conns.values() {
                if conn.send(Arc::clone(&json)) {
                    delivered += 1;
                    continue;
                }
                counter!("ws_broadcast_drops_total").increment(1);
                let drops = conn.drop_count();
                if drops >= MAX_TOTAL_DROPS {
                    warn!(conn_id = %conn.id, drops, "evicting slow client");
                    evicted.push(Arc::clone(conn));
                } else {
                    warn!(conn_id = %conn.id, total_drops = drops, "dropped event for client (queue full)");
                }
            }
            debug!(
                event_type = %envelope.event_type,
                recipients = conns.len(),
                delivered,
                "broadcast event"
            );
        }
        if !evicted.is_empty() {
            let mut conns = self.connections.write().await;
            for conn in evicted {
                if conns.remove(&conn.id).is_some() {
                    let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
                }
                conn.close();
            }
        }
        delivered
    }

    /// Number of members.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Members per role.
    pub async fn role_counts(&self) -> RoleCounts {
        let conns = self.connections.read().await;
        conns
            .values()
            .fold(RoleCounts::default(), |mut acc, conn| {
                match conn.identity.role {
                    Role::Admin => acc.admins += 1,
                    Role::Musician => acc.musicians += 1,
                }
                acc
            })
    }
}

impl Default for BroadcastManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LivePublisher for BroadcastManager {
    async fn publish(&self, event: &LiveEvent) -> usize {
        self.broadcast(&event.to_envelope()).await
    }
}
