//! Live-session error taxonomy.
//!
//! Every command failure maps to one [`LiveError`] variant. The variant
//! decides the stable wire code sent back to the issuer; none of these are
//! ever broadcast and none of them mutate the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Role;
use crate::ids::SongRef;

/// Which precondition of the live state machine was violated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidState {
    /// The command requires a live session.
    SessionNotLive,
    /// `changePage` without a song on display.
    NoSongSelected,
    /// Another admin holds control.
    NotSessionOwner,
    /// The page change names a song other than the one on display.
    SongMismatch,
}

impl InvalidState {
    /// Wire code for this violation.
    pub fn code(self) -> &'static str {
        match self {
            Self::SessionNotLive => "SESSION_NOT_LIVE",
            Self::NoSongSelected => "NO_SONG_SELECTED",
            Self::NotSessionOwner => "NOT_SESSION_OWNER",
            Self::SongMismatch => "SONG_MISMATCH",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::SessionNotLive => "no live session is running",
            Self::NoSongSelected => "no song is selected",
            Self::NotSessionOwner => "another admin is conducting; start to take over",
            Self::SongMismatch => "page change does not match the current song",
        }
    }
}

/// A rejected live-session command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LiveError {
    /// The caller's role may not issue this command.
    #[error("role '{role}' may not {command}")]
    Forbidden {
        /// Caller role.
        role: Role,
        /// Rejected command name.
        command: &'static str,
    },

    /// A state-machine precondition failed.
    #[error("{}", .0.describe())]
    InvalidState(InvalidState),

    /// The catalog has no such song.
    #[error("song not found: {0}")]
    SongNotFound(SongRef),

    /// Malformed command input.
    #[error("{0}")]
    InvalidParams(String),

    /// The catalog could not confirm the song exists.
    #[error("song catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

impl LiveError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InvalidState(s) => s.code(),
            Self::SongNotFound(_) => "SONG_NOT_FOUND",
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::CatalogUnavailable(_) => "CATALOG_UNAVAILABLE",
        }
    }

    /// Shorthand for [`InvalidState::SessionNotLive`].
    pub fn not_live() -> Self {
        Self::InvalidState(InvalidState::SessionNotLive)
    }

    /// Shorthand for [`InvalidState::NotSessionOwner`].
    pub fn not_owner() -> Self {
        Self::InvalidState(InvalidState::NotSessionOwner)
    }

    /// Shorthand for an input validation failure.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }
}
