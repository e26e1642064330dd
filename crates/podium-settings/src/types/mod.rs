//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a settings file only needs the keys it changes.

mod server;

pub use server::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the podium server.
///
/// ```json
/// {
///   "server": { "port": 8080 },
///   "auth": { "jwtSecret": "..." },
///   "catalog": { "dbPath": "/srv/podium/songs.db" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PodiumSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Listener and connection settings.
    pub server: ServerSettings,
    /// Credential verification.
    pub auth: AuthSettings,
    /// Song catalog access.
    pub catalog: CatalogSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for PodiumSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "podium".to_string(),
            server: ServerSettings::default(),
            auth: AuthSettings::default(),
            catalog: CatalogSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Accepted `server.heartbeatIntervalMs` range.
pub const HEARTBEAT_INTERVAL_MS: (u64, u64) = (1_000, 600_000);
/// Accepted `catalog.lookupTimeoutMs` range.
pub const LOOKUP_TIMEOUT_MS: (u64, u64) = (10, 60_000);
/// Accepted `server.maxConnections` range.
pub const MAX_CONNECTIONS: (usize, usize) = (1, 100_000);

impl PodiumSettings {
    /// Check ranges and cross-field constraints the type system cannot express.
    ///
    /// File values get the same bounds as environment overrides.
    pub fn validate(&self) -> Result<()> {
        match self.auth.jwt_secret.as_deref() {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(SettingsError::MissingSecret),
        }
        let server = &self.server;
        between("server.maxConnections", server.max_connections, MAX_CONNECTIONS)?;
        at_least("server.sendQueueCapacity", server.send_queue_capacity, 1)?;
        at_least("server.maxMessageSize", server.max_message_size, 1)?;
        between(
            "server.heartbeatIntervalMs",
            server.heartbeat_interval_ms,
            HEARTBEAT_INTERVAL_MS,
        )?;
        at_least("server.dispatchTimeoutMs", server.dispatch_timeout_ms, 1)?;
        between(
            "catalog.lookupTimeoutMs",
            self.catalog.lookup_timeout_ms,
            LOOKUP_TIMEOUT_MS,
        )?;
        if server.heartbeat_timeout_ms <= server.heartbeat_interval_ms {
            return Err(SettingsError::OutOfRange {
                field: "server.heartbeatTimeoutMs",
                reason: format!(
                    "{} must exceed heartbeatIntervalMs ({})",
                    server.heartbeat_timeout_ms, server.heartbeat_interval_ms
                ),
            });
        }
        Ok(())
    }
}

fn at_least<T>(field: &'static str, value: T, min: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min {
        return Err(SettingsError::OutOfRange {
            field,
            reason: format!("{value} must be at least {min}"),
        });
    }
    Ok(())
}

fn between<T>(field: &'static str, value: T, (min, max): (T, T)) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(SettingsError::OutOfRange {
            field,
            reason: format!("{value} must be between {min} and {max}"),
        });
    }
    Ok(())
}
