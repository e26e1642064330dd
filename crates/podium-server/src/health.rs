//! `/health` endpoint body.

use serde::Serialize;
use std::time::Instant;

use crate::websocket::broadcast::RoleCounts;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` while serving, `"draining"` during shutdown.
    pub status: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Connected members of the live-session group.
    pub connections: usize,
    /// Connected admins.
    pub admins: usize,
    /// Connected musicians.
    pub musicians: usize,
    /// Current live-session version.
    pub live_version: u64,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    roles: RoleCounts,
    live_version: u64,
    draining: bool,
) -> HealthResponse {
    HealthResponse {
        status: if draining { "draining" } else { "ok" },
        uptime_secs: start_time.elapsed().as_secs(),
        connections: roles.admins + roles.musicians,
        admins: roles.admins,
        musicians: roles.musicians,
        live_version,
    }
}
