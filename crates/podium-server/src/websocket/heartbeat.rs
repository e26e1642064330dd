//! Ping/pong liveness monitoring.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Shortest tick accepted; `tokio::time::interval` panics on zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Watch a connection's alive flag.
///
/// Each `interval` tick consumes the flag. After `timeout / interval`
/// consecutive silent ticks (at least 1) the client is considered dead.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let interval = interval.max(MIN_INTERVAL);
    let mut ticker = time::interval(interval);
    // First tick fires immediately.
    let _ = ticker.tick().await;
    let interval_ms = interval.as_millis().max(1);
    let max_missed = u32::try_from(timeout.as_millis() / interval_ms)
        .unwrap_or(u32::MAX)
        .max(1);
    let mut missed: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if connection.check_alive() {
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => return HeartbeatResult::Cancelled,
        }
    }
}
