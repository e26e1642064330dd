//! Fan-out seam between the command processor and the transport.

use async_trait::async_trait;
use podium_core::LiveEvent;

/// Delivers an accepted mutation to every member of the live-session group.
///
/// Delivery is best-effort: a member whose queue is full simply misses the
/// event and recovers through catch-up.
#[async_trait]
pub trait LivePublisher: Send + Sync {
    /// Publish `event`; returns how many members it was enqueued to.
    async fn publish(&self, event: &LiveEvent) -> usize;
}

/// Publisher with no subscribers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPublisher;

#[async_trait]
impl LivePublisher for NullPublisher {
    async fn publish(&self, _event: &LiveEvent) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::LiveSession;

    #[tokio::test]
    async fn null_publisher_reaches_nobody() {
        let event = LiveEvent::Stopped {
            session: LiveSession::inactive(),
        };
        assert_eq!(NullPublisher.publish(&event).await, 0);
    }
}
