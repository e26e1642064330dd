//! Admin commands accepted by the processor.

use podium_core::SongRef;

/// Longest accepted song reference, in bytes.
pub const MAX_SONG_REF_LEN: usize = 256;

/// A live-session mutation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Take over (or begin) the session.
    Start,
    /// Put a song on display.
    ChangeSong {
        /// Catalog reference.
        song_ref: SongRef,
        /// Requested page; defaults to 1, clamped to at least 1.
        page_number: Option<i64>,
    },
    /// Turn to another page of the current song.
    ChangePage {
        /// Requested page, clamped to at least 1.
        page_number: i64,
        /// When given, must match the song on display.
        song_ref: Option<SongRef>,
    },
    /// End the session.
    Stop,
}

impl Command {
    /// Wire method name, also used as the metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ChangeSong { .. } => "changeSong",
            Self::ChangePage { .. } => "changePage",
            Self::Stop => "stop",
        }
    }
}

/// Clamp a requested page to the valid range `1..=u32::MAX`.
pub fn clamp_page(requested: i64) -> u32 {
    u32::try_from(requested.max(1)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_wire_methods() {
        assert_eq!(Command::Start.name(), "start");
        assert_eq!(Command::Stop.name(), "stop");
        assert_eq!(
            Command::ChangeSong {
                song_ref: "S1".into(),
                page_number: None
            }
            .name(),
            "changeSong"
        );
        assert_eq!(
            Command::ChangePage {
                page_number: 2,
                song_ref: None
            }
            .name(),
            "changePage"
        );
    }

    #[test]
    fn pages_clamp_to_one() {
        assert_eq!(clamp_page(0), 1);
        assert_eq!(clamp_page(-7), 1);
        assert_eq!(clamp_page(1), 1);
        assert_eq!(clamp_page(42), 42);
    }

    #[test]
    fn pages_have_no_practical_upper_bound() {
        assert_eq!(clamp_page(10_000), 10_000);
        assert_eq!(clamp_page(i64::MAX), u32::MAX);
    }
}
