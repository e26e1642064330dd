//! Graceful shutdown coordination via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default drain budget before remaining tasks are abandoned.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared shutdown signal for the listener and every `WebSocket` session.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator that has not fired.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Clone of the shutdown token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Fire the shutdown signal. Idempotent.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("shutdown requested");
        }
        self.token.cancel();
    }

    /// Whether shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fire the signal and wait up to `timeout` for `handles`.
    ///
    /// Returns `true` when every task finished in time.
    pub async fn drain(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        self.shutdown();
        info!(
            task_count = handles.len(),
            timeout_secs = timeout.as_secs(),
            "draining tasks"
        );
        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_err()
        {
            warn!(?timeout, "drain timed out; abandoning remaining tasks");
            return false;
        }
        true
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
