//! `WebSocket` gateway: connection state, heartbeat, dispatch and fan-out.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod session;

/// Close code sent after a rejected credential.
pub const CLOSE_AUTH_FAILED: u16 = 4401;
/// Close code sent when a slow consumer is evicted.
pub const CLOSE_SLOW_CONSUMER: u16 = 4408;
