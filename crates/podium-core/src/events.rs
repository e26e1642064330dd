//! Live events and the JSON envelope pushed to clients.
//!
//! [`LiveEvent`] is produced by the command processor, one per accepted
//! mutation, and always carries the full post-mutation [`LiveSession`].
//! [`EventEnvelope`] is the wire frame: every server-to-client message,
//! broadcast or unicast, is one envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::identity::Identity;
use crate::ids::{ConnectionId, SongRef, UserId};
use crate::session::{FileKind, LiveSession};

/// Wire names of every event type.
pub mod event_types {
    /// Unicast join acknowledgement.
    pub const CONNECTED: &str = "connected";
    /// Session taken over / started.
    pub const STARTED: &str = "started";
    /// New song on display.
    pub const SONG_CHANGED: &str = "songChanged";
    /// New page of the current song.
    pub const PAGE_CHANGED: &str = "pageChanged";
    /// Session ended.
    pub const STOPPED: &str = "stopped";
    /// Unicast catch-up reply.
    pub const SNAPSHOT: &str = "snapshot";
    /// Unicast command rejection.
    pub const COMMAND_ERROR: &str = "commandError";
    /// Terminal authentication failure.
    pub const AUTH_ERROR: &str = "authError";
}

// ─────────────────────────────────────────────────────────────────────────────
// LiveEvent
// ─────────────────────────────────────────────────────────────────────────────

/// A state change broadcast to the whole live-session group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveEvent {
    /// An admin started (or took over) the session.
    Started {
        /// New owner.
        owner_id: UserId,
        /// Post-mutation snapshot.
        session: LiveSession,
    },
    /// The song on display changed.
    SongChanged {
        /// Catalog reference.
        song_ref: SongRef,
        /// Song title.
        title: String,
        /// Sheet-music file location.
        file_ref: String,
        /// Sheet-music format.
        file_kind: FileKind,
        /// Page on display.
        page_number: u32,
        /// Label of that page, if any.
        page_label: Option<String>,
        /// Display name of the admin who made the change.
        changed_by: String,
        /// Post-mutation snapshot.
        session: LiveSession,
    },
    /// The page of the current song changed.
    PageChanged {
        /// Current song.
        song_ref: SongRef,
        /// Page on display.
        page_number: u32,
        /// Label of that page, if any.
        page_label: Option<String>,
        /// Post-mutation snapshot.
        session: LiveSession,
    },
    /// The session ended.
    Stopped {
        /// Post-mutation snapshot.
        session: LiveSession,
    },
}

impl LiveEvent {
    /// Wire type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => event_types::STARTED,
            Self::SongChanged { .. } => event_types::SONG_CHANGED,
            Self::PageChanged { .. } => event_types::PAGE_CHANGED,
            Self::Stopped { .. } => event_types::STOPPED,
        }
    }

    /// Snapshot attached to the event.
    pub fn session(&self) -> &LiveSession {
        match self {
            Self::Started { session, .. }
            | Self::SongChanged { session, .. }
            | Self::PageChanged { session, .. }
            | Self::Stopped { session } => session,
        }
    }

    /// Session version this event produced.
    pub fn version(&self) -> u64 {
        self.session().version
    }

    /// JSON payload placed in the envelope's `data` field.
    pub fn data(&self) -> Value {
        let session = serde_json::to_value(self.session()).unwrap_or(Value::Null);
        match self {
            Self::Started { owner_id, .. } => json!({
                "ownerId": owner_id,
                "version": self.version(),
                "session": session,
            }),
            Self::SongChanged {
                song_ref,
                title,
                file_ref,
                file_kind,
                page_number,
                page_label,
                changed_by,
                ..
            } => json!({
                "songRef": song_ref,
                "title": title,
                "fileRef": file_ref,
                "fileKind": file_kind,
                "pageNumber": page_number,
                "pageLabel": page_label,
                "changedBy": changed_by,
                "version": self.version(),
                "session": session,
            }),
            Self::PageChanged {
                song_ref,
                page_number,
                page_label,
                ..
            } => json!({
                "songRef": song_ref,
                "pageNumber": page_number,
                "pageLabel": page_label,
                "version": self.version(),
                "session": session,
            }),
            Self::Stopped { .. } => json!({
                "version": self.version(),
                "session": session,
            }),
        }
    }

    /// Wrap in a wire envelope stamped with the current time.
    pub fn to_envelope(&self) -> EventEnvelope {
        EventEnvelope::new(self.event_type(), Some(self.data()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventEnvelope
// ─────────────────────────────────────────────────────────────────────────────

/// Server-pushed frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Event type (see [`event_types`]).
    #[serde(rename = "type")]
    pub event_type: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Echoed request ID for unicast replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventEnvelope {
    /// Create an envelope with the current UTC timestamp.
    pub fn new(event_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            request_id: None,
            data,
        }
    }

    /// Attach the ID of the request this envelope answers.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Join acknowledgement for a freshly authenticated connection.
    pub fn connected(connection_id: &ConnectionId, identity: &Identity) -> Self {
        Self::new(
            event_types::CONNECTED,
            Some(json!({
                "connectionId": connection_id,
                "userId": identity.user_id,
                "role": identity.role,
            })),
        )
    }

    /// Catch-up reply carrying the current session.
    pub fn snapshot(session: &LiveSession) -> Self {
        Self::new(
            event_types::SNAPSHOT,
            Some(json!({
                "active": session.is_live(),
                "session": session,
            })),
        )
    }

    /// Private command rejection.
    pub fn command_error(code: &str, message: &str) -> Self {
        Self::new(
            event_types::COMMAND_ERROR,
            Some(json!({ "code": code, "message": message })),
        )
    }

    /// Terminal authentication failure.
    pub fn auth_error(code: &str, message: &str) -> Self {
        Self::new(
            event_types::AUTH_ERROR,
            Some(json!({ "code": code, "message": message })),
        )
    }
}

impl From<&LiveEvent> for EventEnvelope {
    fn from(event: &LiveEvent) -> Self {
        event.to_envelope()
    }
}
