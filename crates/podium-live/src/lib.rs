//! # podium-live
//!
//! The live-session engine: a single authoritative [`LiveSessionStore`],
//! the [`CommandProcessor`] state machine that mutates it, and the
//! collaborator seams it depends on.
//!
//! - [`SongCatalog`]: read-only song and page-label lookups
//!   ([`InMemoryCatalog`], [`SqliteCatalog`])
//! - [`LivePublisher`]: fan-out of accepted mutations to every subscriber
//!
//! All mutations are serialized through the processor; the store only hands
//! out consistent snapshots.

#![deny(unsafe_code)]

pub mod catalog;
pub mod command;
pub mod processor;
pub mod publisher;
pub mod store;

pub use catalog::{CatalogError, InMemoryCatalog, SongCatalog, SqliteCatalog};
pub use command::Command;
pub use processor::CommandProcessor;
pub use publisher::{LivePublisher, NullPublisher};
pub use store::LiveSessionStore;
