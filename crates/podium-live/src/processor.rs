//! Live-session state machine.
//!
//! ```text
//! INACTIVE --start--> LIVE --changeSong/changePage--> LIVE --stop--> INACTIVE
//!             ^                                         |
//!             +------------- start (takeover) ----------+
//! ```
//!
//! Every command runs under one async mutex held across catalog lookup,
//! mutation and publish. That makes the session a single-writer value and
//! makes every member's queue order equal version order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use podium_core::{
    Identity, InvalidState, LiveError, LiveEvent, LiveSession, LiveStatus, SongInfo, SongRef,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, SongCatalog};
use crate::command::{Command, MAX_SONG_REF_LEN, clamp_page};
use crate::publisher::LivePublisher;
use crate::store::LiveSessionStore;

/// Default bound on a single catalog lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Validates, applies and publishes admin commands.
pub struct CommandProcessor {
    store: Arc<LiveSessionStore>,
    catalog: Arc<dyn SongCatalog>,
    publisher: Arc<dyn LivePublisher>,
    lookup_timeout: Duration,
    write_lock: Mutex<()>,
}

impl CommandProcessor {
    /// Create a processor over `store`.
    pub fn new(
        store: Arc<LiveSessionStore>,
        catalog: Arc<dyn SongCatalog>,
        publisher: Arc<dyn LivePublisher>,
    ) -> Self {
        Self {
            store,
            catalog,
            publisher,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            write_lock: Mutex::new(()),
        }
    }

    /// Override the catalog lookup bound.
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The store this processor mutates.
    pub fn store(&self) -> &Arc<LiveSessionStore> {
        &self.store
    }

    /// Catch-up: the current session, for any authenticated caller.
    pub fn snapshot(&self) -> LiveSession {
        self.store.snapshot()
    }

    /// The session `caller` currently conducts, if any.
    pub fn owned_session(&self, caller: &Identity) -> Option<LiveSession> {
        let session = self.store.snapshot();
        session.is_owned_by(&caller.user_id).then_some(session)
    }

    /// Run one command on behalf of `caller`.
    ///
    /// On success the returned event has already been published. On failure
    /// nothing was mutated or published.
    pub async fn execute(&self, caller: &Identity, command: Command) -> Result<LiveEvent, LiveError> {
        let name = command.name();
        if !caller.role.can_conduct() {
            debug!(user_id = %caller.user_id, role = %caller.role, command = name, "command forbidden");
            return Err(LiveError::Forbidden {
                role: caller.role,
                command: name,
            });
        }
        validate(&command)?;

        let _guard = self.write_lock.lock().await;
        let event = match command {
            Command::Start => Ok(self.apply_start(caller)),
            Command::ChangeSong {
                song_ref,
                page_number,
            } => {
                self.apply_change_song(caller, song_ref, clamp_page(page_number.unwrap_or(1)))
                    .await
            }
            Command::ChangePage {
                page_number,
                song_ref,
            } => {
                self.apply_change_page(caller, clamp_page(page_number), song_ref)
                    .await
            }
            Command::Stop => self.apply_stop(caller),
        }?;

        let delivered = self.publisher.publish(&event).await;
        counter!("live_mutations_total", "command" => name).increment(1);
        info!(
            command = name,
            user_id = %caller.user_id,
            version = event.version(),
            delivered,
            "live session updated"
        );
        Ok(event)
    }

    /// Begin or take over the session.
    pub async fn start(&self, caller: &Identity) -> Result<LiveEvent, LiveError> {
        self.execute(caller, Command::Start).await
    }

    /// Put `song_ref` on display at `page_number` (default 1).
    pub async fn change_song(
        &self,
        caller: &Identity,
        song_ref: SongRef,
        page_number: Option<i64>,
    ) -> Result<LiveEvent, LiveError> {
        self.execute(
            caller,
            Command::ChangeSong {
                song_ref,
                page_number,
            },
        )
        .await
    }

    /// Turn to `page_number` of the current song.
    pub async fn change_page(
        &self,
        caller: &Identity,
        page_number: i64,
        song_ref: Option<SongRef>,
    ) -> Result<LiveEvent, LiveError> {
        self.execute(
            caller,
            Command::ChangePage {
                page_number,
                song_ref,
            },
        )
        .await
    }

    /// End the session.
    pub async fn stop(&self, caller: &Identity) -> Result<LiveEvent, LiveError> {
        self.execute(caller, Command::Stop).await
    }

    // ── Transitions (write lock held) ───────────────────────────────

    fn apply_start(&self, caller: &Identity) -> LiveEvent {
        let previous = self.store.snapshot().owner_id;
        let session = self.store.commit(|s| {
            s.status = LiveStatus::Live;
            s.owner_id = Some(caller.user_id.clone());
            s.clear_song();
        });
        if let Some(prev) = previous.filter(|p| *p != caller.user_id) {
            info!(previous_owner = %prev, new_owner = %caller.user_id, "live session taken over");
        }
        LiveEvent::Started {
            owner_id: caller.user_id.clone(),
            session,
        }
    }

    async fn apply_change_song(
        &self,
        caller: &Identity,
        song_ref: SongRef,
        page_number: u32,
    ) -> Result<LiveEvent, LiveError> {
        self.ensure_owner(caller)?;

        let info = match self.bounded(self.catalog.resolve_song(&song_ref)).await {
            Ok(Some(info)) => info,
            Ok(None) => return Err(LiveError::SongNotFound(song_ref)),
            Err(e) => {
                warn!(song_ref = %song_ref, error = %e, "song lookup failed");
                return Err(LiveError::CatalogUnavailable(e.to_string()));
            }
        };
        let page_label = self.page_label(&song_ref, page_number).await;

        let SongInfo {
            title,
            file_ref,
            file_kind,
        } = info.clone();
        let session = self.store.commit(|s| {
            s.current_song_ref = Some(song_ref.clone());
            s.current_page_number = Some(page_number);
            s.current_page_label.clone_from(&page_label);
            s.song = Some(info);
        });
        Ok(LiveEvent::SongChanged {
            song_ref,
            title,
            file_ref,
            file_kind,
            page_number,
            page_label,
            changed_by: caller.label().to_string(),
            session,
        })
    }

    async fn apply_change_page(
        &self,
        caller: &Identity,
        page_number: u32,
        expected_song: Option<SongRef>,
    ) -> Result<LiveEvent, LiveError> {
        self.ensure_owner(caller)?;

        let current = self
            .store
            .snapshot()
            .current_song_ref
            .ok_or(LiveError::InvalidState(InvalidState::NoSongSelected))?;
        if expected_song.is_some_and(|expected| expected != current) {
            return Err(LiveError::InvalidState(InvalidState::SongMismatch));
        }
        let page_label = self.page_label(&current, page_number).await;

        let session = self.store.commit(|s| {
            s.current_page_number = Some(page_number);
            s.current_page_label.clone_from(&page_label);
        });
        Ok(LiveEvent::PageChanged {
            song_ref: current,
            page_number,
            page_label,
            session,
        })
    }

    fn apply_stop(&self, caller: &Identity) -> Result<LiveEvent, LiveError> {
        self.ensure_owner(caller)?;
        let session = self.store.commit(|s| {
            s.status = LiveStatus::Inactive;
            s.owner_id = None;
            s.clear_song();
        });
        Ok(LiveEvent::Stopped { session })
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn ensure_owner(&self, caller: &Identity) -> Result<(), LiveError> {
        let session = self.store.snapshot();
        if !session.is_live() {
            return Err(LiveError::not_live());
        }
        if !session.is_owned_by(&caller.user_id) {
            return Err(LiveError::not_owner());
        }
        Ok(())
    }

    /// Page labels are optional: any failure degrades to no label.
    async fn page_label(&self, song_ref: &SongRef, page_number: u32) -> Option<String> {
        match self
            .bounded(self.catalog.resolve_page_label(song_ref, page_number))
            .await
        {
            Ok(label) => label,
            Err(e) => {
                warn!(song_ref = %song_ref, page_number, error = %e, "page label lookup failed");
                None
            }
        }
    }

    async fn bounded<T>(
        &self,
        lookup: impl Future<Output = Result<T, CatalogError>>,
    ) -> Result<T, CatalogError> {
        tokio::time::timeout(self.lookup_timeout, lookup)
            .await
            .unwrap_or(Err(CatalogError::Timeout(self.lookup_timeout)))
    }
}

fn validate(command: &Command) -> Result<(), LiveError> {
    let song_ref = match command {
        Command::ChangeSong { song_ref, .. } => Some(song_ref),
        Command::ChangePage { song_ref, .. } => song_ref.as_ref(),
        Command::Start | Command::Stop => None,
    };
    if let Some(song_ref) = song_ref {
        if song_ref.trim().is_empty() {
            return Err(LiveError::invalid_params("songRef must not be empty"));
        }
        if song_ref.len() > MAX_SONG_REF_LEN {
            return Err(LiveError::invalid_params(format!(
                "songRef exceeds {MAX_SONG_REF_LEN} bytes"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InMemoryCatalog, MockSongCatalog};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use podium_core::FileKind;

    #[derive(Default)]
    struct RecordingPublisher {
        events: parking_lot::Mutex<Vec<LiveEvent>>,
    }

    impl RecordingPublisher {
        fn events(&self) -> Vec<LiveEvent> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl LivePublisher for RecordingPublisher {
        async fn publish(&self, event: &LiveEvent) -> usize {
            self.events.lock().push(event.clone());
            1
        }
    }

    fn grace() -> SongInfo {
        SongInfo {
            title: "Amazing Grace".into(),
            file_ref: "uploads/songs/grace.pdf".into(),
            file_kind: FileKind::Pdf,
        }
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(
            InMemoryCatalog::new()
                .with_song("S1", grace())
                .with_song(
                    "S2",
                    SongInfo {
                        title: "Doxology".into(),
                        file_ref: "uploads/songs/doxology.png".into(),
                        file_kind: FileKind::Image,
                    },
                )
                .with_page_label("S1", 3, "Chorus"),
        )
    }

    fn setup_with(
        catalog: Arc<dyn SongCatalog>,
    ) -> (CommandProcessor, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let processor = CommandProcessor::new(
            Arc::new(LiveSessionStore::new()),
            catalog,
            Arc::clone(&publisher) as Arc<dyn LivePublisher>,
        );
        (processor, publisher)
    }

    fn setup() -> (CommandProcessor, Arc<RecordingPublisher>) {
        setup_with(catalog())
    }

    fn admin(id: &str) -> Identity {
        Identity::admin(id)
    }

    // ── start ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_goes_live_at_version_one() {
        let (p, publisher) = setup();
        let event = p.start(&admin("a")).await.unwrap();
        assert_matches!(&event, LiveEvent::Started { owner_id, .. } if owner_id.as_str() == "a");
        let s = p.snapshot();
        assert_eq!(s.status, LiveStatus::Live);
        assert_eq!(s.version, 1);
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn start_takes_over_and_clears_song() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S1".into(), Some(3)).await.unwrap();

        let event = p.start(&admin("b")).await.unwrap();
        let s = event.session();
        assert_eq!(s.owner_id.as_ref().map(|u| u.as_str()), Some("b"));
        assert!(s.current_song_ref.is_none());
        assert!(s.current_page_number.is_none());
        assert!(s.song.is_none());
        assert_eq!(s.version, 3);
    }

    #[tokio::test]
    async fn restart_by_owner_is_accepted() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let event = p.start(&admin("a")).await.unwrap();
        assert_eq!(event.version(), 2);
    }

    // ── role gate ───────────────────────────────────────────────────

    #[tokio::test]
    async fn musician_commands_are_forbidden_and_silent() {
        let (p, publisher) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let m = Identity::musician("m");

        for command in [
            Command::Start,
            Command::ChangeSong {
                song_ref: "S1".into(),
                page_number: None,
            },
            Command::ChangePage {
                page_number: 2,
                song_ref: None,
            },
            Command::Stop,
        ] {
            let err = p.execute(&m, command).await.unwrap_err();
            assert_eq!(err.code(), "FORBIDDEN");
        }
        assert_eq!(p.snapshot().version, 1);
        assert_eq!(publisher.events().len(), 1);
    }

    // ── changeSong ──────────────────────────────────────────────────

    #[tokio::test]
    async fn change_song_sets_page_and_label() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let caller = admin("a").with_display_name("ana@choir.org");
        let event = p.change_song(&caller, "S1".into(), Some(3)).await.unwrap();

        assert_matches!(
            &event,
            LiveEvent::SongChanged { page_number: 3, page_label: Some(l), changed_by, title, .. }
                if l == "Chorus" && changed_by == "ana@choir.org" && title == "Amazing Grace"
        );
        let s = p.snapshot();
        assert_eq!(s.current_song_ref.as_ref().map(|r| r.as_str()), Some("S1"));
        assert_eq!(s.current_page_number, Some(3));
        assert_eq!(s.current_page_label.as_deref(), Some("Chorus"));
        assert_eq!(s.song, Some(grace()));
        assert_eq!(s.version, 2);
    }

    #[tokio::test]
    async fn change_song_defaults_and_clamps_page() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S2".into(), None).await.unwrap();
        assert_eq!(p.snapshot().current_page_number, Some(1));

        let _ = p.change_song(&admin("a"), "S2".into(), Some(-4)).await.unwrap();
        assert_eq!(p.snapshot().current_page_number, Some(1));
    }

    #[tokio::test]
    async fn change_song_while_inactive_is_rejected() {
        let (p, publisher) = setup();
        let err = p
            .change_song(&admin("a"), "S1".into(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_LIVE");
        assert_eq!(p.snapshot().version, 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn unknown_song_is_not_found() {
        let (p, publisher) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let err = p
            .change_song(&admin("a"), "S404".into(), None)
            .await
            .unwrap_err();
        assert_matches!(err, LiveError::SongNotFound(r) if r.as_str() == "S404");
        assert_eq!(p.snapshot().version, 1);
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn non_owner_admin_cannot_change_song() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let err = p
            .change_song(&admin("b"), "S1".into(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_SESSION_OWNER");
    }

    #[tokio::test]
    async fn song_ref_is_validated() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let err = p.change_song(&admin("a"), "  ".into(), None).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");

        let long = SongRef::from("x".repeat(MAX_SONG_REF_LEN + 1));
        let err = p.change_song(&admin("a"), long, None).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }

    // ── catalog failures ────────────────────────────────────────────

    #[tokio::test]
    async fn song_lookup_failure_rejects_without_mutation() {
        let mut mock = MockSongCatalog::new();
        let _ = mock
            .expect_resolve_song()
            .returning(|_| Err(CatalogError::Backend("connection refused".into())));
        let (p, publisher) = setup_with(Arc::new(mock));
        let _ = p.start(&admin("a")).await.unwrap();

        let err = p
            .change_song(&admin("a"), "S1".into(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CATALOG_UNAVAILABLE");
        assert_eq!(p.snapshot().version, 1);
        assert_eq!(publisher.events().len(), 1);
    }

    #[tokio::test]
    async fn label_failure_degrades_to_none() {
        let mut mock = MockSongCatalog::new();
        let _ = mock.expect_resolve_song().returning(|_| Ok(Some(grace())));
        let _ = mock
            .expect_resolve_page_label()
            .returning(|_, _| Err(CatalogError::Backend("disk I/O error".into())));
        let (p, _) = setup_with(Arc::new(mock));
        let _ = p.start(&admin("a")).await.unwrap();

        let event = p.change_song(&admin("a"), "S1".into(), Some(2)).await.unwrap();
        assert_matches!(event, LiveEvent::SongChanged { page_label: None, page_number: 2, .. });

        let event = p.change_page(&admin("a"), 4, None).await.unwrap();
        assert_matches!(event, LiveEvent::PageChanged { page_label: None, page_number: 4, .. });
        assert_eq!(p.snapshot().version, 3);
    }

    struct StalledCatalog;

    #[async_trait]
    impl SongCatalog for StalledCatalog {
        async fn resolve_song(
            &self,
            _song_ref: &SongRef,
        ) -> Result<Option<SongInfo>, CatalogError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Some(grace()))
        }

        async fn resolve_page_label(
            &self,
            _song_ref: &SongRef,
            _page_number: u32,
        ) -> Result<Option<String>, CatalogError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn song_lookup_timeout_is_catalog_unavailable() {
        let (p, _) = setup_with(Arc::new(StalledCatalog));
        let p = p.with_lookup_timeout(Duration::from_millis(500));
        let _ = p.start(&admin("a")).await.unwrap();

        let err = p
            .change_song(&admin("a"), "S1".into(), None)
            .await
            .unwrap_err();
        assert_matches!(err, LiveError::CatalogUnavailable(msg) if msg.contains("timed out"));
        assert_eq!(p.snapshot().version, 1);
    }

    // ── changePage ──────────────────────────────────────────────────

    #[tokio::test]
    async fn change_page_updates_page_and_label() {
        let (p, publisher) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S1".into(), None).await.unwrap();
        let event = p.change_page(&admin("a"), 3, None).await.unwrap();

        assert_matches!(
            &event,
            LiveEvent::PageChanged { song_ref, page_number: 3, page_label: Some(l), .. }
                if song_ref.as_str() == "S1" && l == "Chorus"
        );
        let s = p.snapshot();
        assert_eq!(s.current_page_number, Some(3));
        assert_eq!(s.song, Some(grace()));
        assert_eq!(publisher.events().len(), 3);
    }

    #[tokio::test]
    async fn change_page_without_song_is_rejected() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let err = p.change_page(&admin("a"), 2, None).await.unwrap_err();
        assert_eq!(err.code(), "NO_SONG_SELECTED");
    }

    #[tokio::test]
    async fn change_page_for_other_song_is_rejected() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S1".into(), None).await.unwrap();
        let err = p
            .change_page(&admin("a"), 2, Some("S2".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SONG_MISMATCH");

        let ok = p.change_page(&admin("a"), 2, Some("S1".into())).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn change_page_while_inactive_is_rejected() {
        let (p, _) = setup();
        let err = p.change_page(&admin("a"), 2, None).await.unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_LIVE");
    }

    // ── stop ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn stop_clears_everything() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S1".into(), Some(3)).await.unwrap();
        let event = p.stop(&admin("a")).await.unwrap();

        let s = event.session();
        assert_eq!(s.status, LiveStatus::Inactive);
        assert!(s.owner_id.is_none());
        assert!(s.current_song_ref.is_none());
        assert!(s.current_page_number.is_none());
        assert!(s.current_page_label.is_none());
        assert_eq!(s.version, 3);

        let err = p
            .change_song(&admin("a"), "S1".into(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_LIVE");
    }

    #[tokio::test]
    async fn stop_while_inactive_is_rejected() {
        let (p, _) = setup();
        let err = p.stop(&admin("a")).await.unwrap_err();
        assert_eq!(err.code(), "SESSION_NOT_LIVE");
    }

    #[tokio::test]
    async fn stop_by_non_owner_is_rejected() {
        let (p, _) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let err = p.stop(&admin("b")).await.unwrap_err();
        assert_eq!(err.code(), "NOT_SESSION_OWNER");
        assert!(p.snapshot().is_live());
    }

    // ── catch-up ────────────────────────────────────────────────────

    #[tokio::test]
    async fn snapshot_matches_last_broadcast() {
        let (p, publisher) = setup();
        let _ = p.start(&admin("a")).await.unwrap();
        let _ = p.change_song(&admin("a"), "S1".into(), Some(3)).await.unwrap();
        let last = publisher.events().pop().unwrap();
        assert_eq!(&p.snapshot(), last.session());
    }

    #[tokio::test]
    async fn owned_session_only_for_owner() {
        let (p, _) = setup();
        assert!(p.owned_session(&admin("a")).is_none());
        let _ = p.start(&admin("a")).await.unwrap();
        assert!(p.owned_session(&admin("a")).is_some());
        assert!(p.owned_session(&admin("b")).is_none());
    }

    #[tokio::test]
    async fn end_to_end_scenario() {
        let (p, publisher) = setup();
        let a = admin("a");

        let e = p.start(&a).await.unwrap();
        assert_eq!((e.session().status, e.version()), (LiveStatus::Live, 1));

        let e = p.change_song(&a, "S1".into(), Some(3)).await.unwrap();
        assert_eq!(e.event_type(), "songChanged");
        assert_eq!(e.version(), 2);

        let s = p.snapshot();
        assert_eq!(s.status, LiveStatus::Live);
        assert_eq!(s.current_song_ref.as_ref().map(|r| r.as_str()), Some("S1"));
        assert_eq!(s.current_page_number, Some(3));
        assert_eq!(s.version, 2);

        let e = p.stop(&a).await.unwrap();
        assert_eq!(e.version(), 3);

        let late = p.snapshot();
        assert_eq!(late.status, LiveStatus::Inactive);
        assert_eq!(late.version, 3);

        let versions: Vec<u64> = publisher.events().iter().map(LiveEvent::version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    // ── concurrency ─────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_leave_one_owner() {
        let (p, publisher) = setup();
        let p = Arc::new(p);

        let mut handles = Vec::new();
        for i in 0..16 {
            let p = Arc::clone(&p);
            handles.push(tokio::spawn(async move {
                p.start(&Identity::admin(format!("admin-{i}"))).await
            }));
        }
        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }

        let s = p.snapshot();
        assert_eq!(s.version, 16);
        let events = publisher.events();
        let last_owner = match events.last().unwrap() {
            LiveEvent::Started { owner_id, .. } => owner_id.clone(),
            other => panic!("unexpected event {other:?}"),
        };
        assert_eq!(s.owner_id, Some(last_owner));

        let versions: Vec<u64> = events.iter().map(LiveEvent::version).collect();
        assert_eq!(versions, (1..=16).collect::<Vec<_>>());
    }
}
