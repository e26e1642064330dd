//! # podium-server
//!
//! Axum HTTP + `WebSocket` gateway in front of the live-session engine.
//!
//! - `WebSocket` gateway: credential check, group membership, heartbeat, command dispatch
//! - Broadcast fan-out of live events to every connected client
//! - REST routes for the same commands plus catch-up
//! - Health check and Prometheus metrics
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod health;
pub mod http;
pub mod metrics;
pub mod rpc;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use auth::{AuthError, IdentityVerifier, JwtVerifier};
pub use config::ServerConfig;
pub use server::{AppState, PodiumServer};
pub use shutdown::ShutdownCoordinator;
