use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use podium_core::{SongInfo, SongRef};

use super::{CatalogError, SongCatalog};

#[derive(Clone, Debug)]
struct StoredSong {
    info: SongInfo,
    pages: BTreeMap<u32, String>,
}

/// Songs and page labels held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    songs: RwLock<HashMap<SongRef, StoredSong>>,
}

impl InMemoryCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert_song`](Self::insert_song).
    #[must_use]
    pub fn with_song(self, song_ref: impl Into<SongRef>, info: SongInfo) -> Self {
        self.insert_song(song_ref, info);
        self
    }

    /// Builder-style [`set_page_label`](Self::set_page_label).
    #[must_use]
    pub fn with_page_label(
        self,
        song_ref: impl Into<SongRef>,
        page_number: u32,
        label: impl Into<String>,
    ) -> Self {
        let _ = self.set_page_label(song_ref, page_number, label);
        self
    }

    /// Add or replace a song. Existing page labels are kept.
    pub fn insert_song(&self, song_ref: impl Into<SongRef>, info: SongInfo) {
        match self.songs.write().entry(song_ref.into()) {
            Entry::Occupied(mut stored) => stored.get_mut().info = info,
            Entry::Vacant(slot) => {
                let _ = slot.insert(StoredSong {
                    info,
                    pages: BTreeMap::new(),
                });
            }
        }
    }

    /// Name a page of a known song. Returns `false` if the song is unknown.
    pub fn set_page_label(
        &self,
        song_ref: impl Into<SongRef>,
        page_number: u32,
        label: impl Into<String>,
    ) -> bool {
        let mut songs = self.songs.write();
        match songs.get_mut(&song_ref.into()) {
            Some(entry) => {
                let _ = entry.pages.insert(page_number, label.into());
                true
            }
            None => false,
        }
    }

    /// Number of songs.
    pub fn len(&self) -> usize {
        self.songs.read().len()
    }

    /// Whether the catalog holds no songs.
    pub fn is_empty(&self) -> bool {
        self.songs.read().is_empty()
    }
}

#[async_trait]
impl SongCatalog for InMemoryCatalog {
    async fn resolve_song(&self, song_ref: &SongRef) -> Result<Option<SongInfo>, CatalogError> {
        Ok(self.songs.read().get(song_ref).map(|e| e.info.clone()))
    }

    async fn resolve_page_label(
        &self,
        song_ref: &SongRef,
        page_number: u32,
    ) -> Result<Option<String>, CatalogError> {
        Ok(self
            .songs
            .read()
            .get(song_ref)
            .and_then(|e| e.pages.get(&page_number).cloned()))
    }
}
