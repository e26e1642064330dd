//! Prometheus exposition for `/metrics`.
//!
//! Counters are recorded through the `metrics` facade wherever the event
//! happens; this module only owns the recorder and the shared names.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Frames dispatched to a method handler, by `method`.
pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
/// Dispatches that produced a `commandError`, by `method` and `error_type`.
pub const RPC_ERRORS_TOTAL: &str = "rpc_errors_total";
/// Handler latency, by `method`.
pub const RPC_REQUEST_DURATION_SECONDS: &str = "rpc_request_duration_seconds";
/// Sockets that joined the live-session group.
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Sockets that left the group, for any reason.
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Current group size.
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Upgrades closed with 4401.
pub const WS_AUTH_FAILURES_TOTAL: &str = "ws_auth_failures_total";
/// Events a member missed because its send queue was full.
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Accepted mutations, by `command`.
pub const LIVE_MUTATIONS_TOTAL: &str = "live_mutations_total";
/// Version of the session as last committed.
pub const LIVE_SESSION_VERSION: &str = "live_session_version";

/// Install the process-wide recorder and register help text.
///
/// Fails if another recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_all();
    info!("prometheus recorder installed");
    Ok(handle)
}

/// Current exposition text.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

fn describe_all() {
    describe_counter!(RPC_REQUESTS_TOTAL, "Client frames dispatched");
    describe_counter!(RPC_ERRORS_TOTAL, "Client frames answered with commandError");
    describe_histogram!(
        RPC_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Handler latency"
    );
    describe_counter!(WS_CONNECTIONS_TOTAL, "Sockets joined to the live group");
    describe_counter!(WS_DISCONNECTIONS_TOTAL, "Sockets removed from the live group");
    describe_gauge!(WS_CONNECTIONS_ACTIVE, "Live group size");
    describe_counter!(WS_AUTH_FAILURES_TOTAL, "Upgrades rejected for bad credentials");
    describe_counter!(WS_BROADCAST_DROPS_TOTAL, "Events dropped on full send queues");
    describe_counter!(LIVE_MUTATIONS_TOTAL, "Accepted live-session commands");
    describe_gauge!(LIVE_SESSION_VERSION, "Current live-session version");
}
