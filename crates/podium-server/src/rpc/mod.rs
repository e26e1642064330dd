//! Method dispatch for inbound `WebSocket` commands.

pub mod context;
pub mod errors;
pub mod handlers;
pub mod registry;
pub mod types;
pub mod validation;
