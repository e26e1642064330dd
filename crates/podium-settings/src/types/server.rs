//! Server, auth, catalog and logging settings.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket listener and connection limits.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port (0 picks an ephemeral port).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Interval between server pings in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Silence after which a connection is considered dead, in milliseconds.
    pub heartbeat_timeout_ms: u64,
    /// Maximum inbound frame size in bytes.
    pub max_message_size: usize,
    /// Per-connection outbound queue depth.
    pub send_queue_capacity: usize,
    /// Upper bound on a single command dispatch in milliseconds.
    pub dispatch_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_connections: 500,
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 90_000,
            max_message_size: 64 * 1024,
            send_queue_capacity: 64,
            dispatch_timeout_ms: 10_000,
        }
    }
}

/// Credential verification settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthSettings {
    /// HS256 secret shared with the identity provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,
}

/// Song catalog access.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogSettings {
    /// Path to the catalog SQLite database. Unset means an empty in-memory catalog.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    /// Upper bound on one song or page-label lookup in milliseconds.
    pub lookup_timeout_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            lookup_timeout_ms: 2_000,
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable compact lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
