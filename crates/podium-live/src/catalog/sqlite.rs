use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use podium_core::{FileKind, SongInfo, SongRef};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::info;

use super::{CatalogError, SongCatalog};

/// Catalog backed by an existing `SQLite` database.
///
/// Expected tables:
///
/// ```sql
/// songs(id, title, file_path, file_type)          -- file_type: 'pdf' | 'image'
/// song_pages(song_id, page_number, page_name)
/// ```
///
/// Song IDs are compared as text so integer primary keys work with string refs.
#[derive(Debug)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Open `path` read-only and check the `songs` table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let catalog = Self::from_connection(conn)?;
        info!(path = %path.display(), "opened song catalog");
        Ok(catalog)
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        let has_songs: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'songs')",
            [],
            |row| row.get(0),
        )?;
        if !has_songs {
            return Err(CatalogError::Backend("catalog database has no songs table".into()));
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, query: F) -> Result<T, CatalogError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || query(&conn.lock()).map_err(CatalogError::from))
            .await
            .map_err(|e| CatalogError::Backend(format!("catalog task failed: {e}")))?
    }
}

#[async_trait]
impl SongCatalog for SqliteCatalog {
    async fn resolve_song(&self, song_ref: &SongRef) -> Result<Option<SongInfo>, CatalogError> {
        let id = song_ref.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT title, file_path, file_type FROM songs WHERE CAST(id AS TEXT) = ?1",
                params![id],
                |row| {
                    let file_type: String = row.get(2)?;
                    Ok(SongInfo {
                        title: row.get(0)?,
                        file_ref: row.get(1)?,
                        file_kind: FileKind::from_catalog(&file_type),
                    })
                },
            )
            .optional()
        })
        .await
    }

    async fn resolve_page_label(
        &self,
        song_ref: &SongRef,
        page_number: u32,
    ) -> Result<Option<String>, CatalogError> {
        let id = song_ref.to_string();
        let label: Option<Option<String>> = self
            .run(move |conn| {
                conn.query_row(
                    "SELECT page_name FROM song_pages \
                     WHERE CAST(song_id AS TEXT) = ?1 AND page_number = ?2",
                    params![id, page_number],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;
        Ok(label.flatten().filter(|l| !l.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn seeded(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("catalog.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE songs (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_type TEXT NOT NULL
             );
             CREATE TABLE song_pages (
                song_id INTEGER NOT NULL,
                page_number INTEGER NOT NULL,
                page_name TEXT
             );
             INSERT INTO songs VALUES (7, 'Amazing Grace', 'uploads/songs/grace.pdf', 'pdf');
             INSERT INTO songs VALUES (8, 'Doxology', 'uploads/songs/doxology.png', 'image');
             INSERT INTO song_pages VALUES (7, 1, 'Intro');
             INSERT INTO song_pages VALUES (7, 2, NULL);",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn resolves_integer_ids_as_refs() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(seeded(&dir)).unwrap();

        let info = catalog.resolve_song(&SongRef::from("7")).await.unwrap().unwrap();
        assert_eq!(info.title, "Amazing Grace");
        assert_eq!(info.file_ref, "uploads/songs/grace.pdf");
        assert_eq!(info.file_kind, FileKind::Pdf);

        let info = catalog.resolve_song(&SongRef::from("8")).await.unwrap().unwrap();
        assert_eq!(info.file_kind, FileKind::Image);
    }

    #[tokio::test]
    async fn unknown_song_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(seeded(&dir)).unwrap();
        assert!(catalog.resolve_song(&SongRef::from("99")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn page_labels_null_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SqliteCatalog::open(seeded(&dir)).unwrap();
        let s7 = SongRef::from("7");

        assert_eq!(
            catalog.resolve_page_label(&s7, 1).await.unwrap().as_deref(),
            Some("Intro")
        );
        assert!(catalog.resolve_page_label(&s7, 2).await.unwrap().is_none());
        assert!(catalog.resolve_page_label(&s7, 5).await.unwrap().is_none());
    }

    #[test]
    fn database_without_songs_table_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteCatalog::from_connection(conn);
        assert_matches!(result, Err(CatalogError::Backend(_)));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteCatalog::open(dir.path().join("absent.db"));
        assert!(result.is_err());
    }
}
