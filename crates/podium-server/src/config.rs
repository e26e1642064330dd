//! Server configuration.

use std::time::Duration;

use podium_settings::PodiumSettings;

/// Runtime configuration for the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent `WebSocket` connections.
    pub max_connections: usize,
    /// Interval between server pings.
    pub heartbeat_interval: Duration,
    /// Silence after which a connection is dropped.
    pub heartbeat_timeout: Duration,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Upper bound on one command dispatch.
    pub dispatch_timeout: Duration,
    /// Upper bound on one song catalog lookup.
    pub catalog_lookup_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 50,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            max_message_size: 64 * 1024,
            send_queue_capacity: 64,
            dispatch_timeout: Duration::from_secs(10),
            catalog_lookup_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&PodiumSettings> for ServerConfig {
    fn from(settings: &PodiumSettings) -> Self {
        let s = &settings.server;
        Self {
            host: s.host.clone(),
            port: s.port,
            max_connections: s.max_connections,
            heartbeat_interval: Duration::from_millis(s.heartbeat_interval_ms),
            heartbeat_timeout: Duration::from_millis(s.heartbeat_timeout_ms),
            max_message_size: s.max_message_size,
            send_queue_capacity: s.send_queue_capacity,
            dispatch_timeout: Duration::from_millis(s.dispatch_timeout_ms),
            catalog_lookup_timeout: Duration::from_millis(settings.catalog.lookup_timeout_ms),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
