//! The singleton live-session record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{SongRef, UserId};

/// Whether a performance is currently being conducted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveStatus {
    /// No performance in progress.
    #[default]
    Inactive,
    /// An admin holds control and musicians follow along.
    Live,
}

/// How the song's sheet music is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Multi-page PDF document.
    Pdf,
    /// Single raster image.
    Image,
}

impl FileKind {
    /// Classify a catalog file-type string. Anything that is not a PDF is
    /// displayed as an image.
    pub fn from_catalog(kind: &str) -> Self {
        if kind.to_ascii_lowercase().contains("pdf") {
            Self::Pdf
        } else {
            Self::Image
        }
    }
}

/// Song details resolved from the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    /// Display title.
    pub title: String,
    /// Location of the sheet-music file, as understood by clients.
    pub file_ref: String,
    /// File format.
    pub file_kind: FileKind,
}

/// Current value of the one live session. There is no history; `version`
/// orders every accepted mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    /// Live or inactive.
    pub status: LiveStatus,
    /// Admin holding control. `None` unless live.
    pub owner_id: Option<UserId>,
    /// Song on display.
    pub current_song_ref: Option<SongRef>,
    /// Page on display, >= 1. `None` unless a song is set.
    pub current_page_number: Option<u32>,
    /// Optional label for the current page.
    pub current_page_label: Option<String>,
    /// Catalog details of the current song.
    pub song: Option<SongInfo>,
    /// Incremented on every accepted mutation.
    pub version: u64,
    /// Time of the last mutation (process start before the first one).
    pub updated_at: DateTime<Utc>,
}

impl LiveSession {
    /// The state every process starts in.
    pub fn inactive() -> Self {
        Self {
            status: LiveStatus::Inactive,
            owner_id: None,
            current_song_ref: None,
            current_page_number: None,
            current_page_label: None,
            song: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether a performance is in progress.
    pub fn is_live(&self) -> bool {
        self.status == LiveStatus::Live
    }

    /// Whether a song is on display.
    pub fn has_song(&self) -> bool {
        self.current_song_ref.is_some()
    }

    /// Whether `user` currently holds control.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.is_live() && self.owner_id.as_ref() == Some(user)
    }

    /// Drop the song, page and label.
    pub fn clear_song(&mut self) {
        self.current_song_ref = None;
        self.current_page_number = None;
        self.current_page_label = None;
        self.song = None;
    }
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::inactive()
    }
}
