//! Read-only song catalog collaborator.
//!
//! The live engine never writes songs; it only confirms a song exists and
//! looks up optional page labels. Adapters:
//!
//! - [`InMemoryCatalog`]: process-local map, for tests and catalog-less deployments
//! - [`SqliteCatalog`]: an existing catalog database (`songs`, `song_pages`)

mod memory;
mod sqlite;

pub use memory::InMemoryCatalog;
pub use sqlite::SqliteCatalog;

use std::time::Duration;

use async_trait::async_trait;
use podium_core::{SongInfo, SongRef};
use thiserror::Error;

/// Transient lookup failure. Never means "not found".
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The lookup did not finish in time.
    #[error("catalog lookup timed out after {0:?}")]
    Timeout(Duration),
    /// The backing store failed.
    #[error("catalog backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Song metadata and page-label lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SongCatalog: Send + Sync {
    /// Resolve a song. `Ok(None)` means the catalog has no such song.
    async fn resolve_song(&self, song_ref: &SongRef) -> Result<Option<SongInfo>, CatalogError>;

    /// Label of one page, if the catalog names it.
    async fn resolve_page_label(
        &self,
        song_ref: &SongRef,
        page_number: u32,
    ) -> Result<Option<String>, CatalogError>;
}
