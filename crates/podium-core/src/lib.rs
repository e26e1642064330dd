//! # podium-core
//!
//! Shared vocabulary for the podium live-session server.
//!
//! - **Branded IDs**: `ConnectionId`, `UserId`, `SongRef` as newtypes for type safety
//! - **Identity**: the `{userId, role}` pair produced by credential verification
//! - **Session model**: the singleton `LiveSession` record and resolved song details
//! - **Events**: `LiveEvent` variants and the JSON envelope pushed to clients
//! - **Errors**: `LiveError` command taxonomy with stable wire codes

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod identity;
pub mod ids;
pub mod session;

pub use errors::{InvalidState, LiveError};
pub use events::{EventEnvelope, LiveEvent};
pub use identity::{Identity, Role};
pub use ids::{ConnectionId, SongRef, UserId};
pub use session::{FileKind, LiveSession, LiveStatus, SongInfo};
