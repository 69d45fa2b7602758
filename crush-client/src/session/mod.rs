//! Session store
//!
//! Holds the current session (token + identity) in memory and in durable
//! client storage. A session is either absent or complete: the type has no
//! way to carry one field without the other, and half-present input (from
//! storage or from callers) is normalised to absent.
//!
//! The store is an explicit handle passed to every component that needs it.
//! All mutation goes through [`SessionStore::set`] and [`SessionStore::clear`].
//! Both bump an epoch counter so views can tell that a result they are about
//! to apply was requested under a different session.

pub mod storage;

use crush_common::{ClientEvent, EventBus, Route};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use storage::{SessionStorage, IDENTITY_KEY, TOKEN_KEY};

/// Token and identity of a logged-in user
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    identity: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            identity: identity.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

// Tokens stay out of logs and panic messages
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Current authentication session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Absent,
    Present(Credentials),
}

impl Session {
    /// Build a session from optional parts; anything but both-present is absent
    pub fn from_parts(token: Option<String>, identity: Option<String>) -> Self {
        match (token, identity) {
            (Some(token), Some(identity)) => Session::Present(Credentials { token, identity }),
            _ => Session::Absent,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Session::Present(c) => Some(c),
            Session::Absent => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials().map(Credentials::token)
    }

    pub fn identity(&self) -> Option<&str> {
        self.credentials().map(Credentials::identity)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Session::Present(_))
    }
}

struct SessionState {
    session: Session,
    epoch: u64,
}

struct StoreInner {
    state: RwLock<SessionState>,
    storage: Box<dyn SessionStorage>,
    events: EventBus,
}

/// Shared session store handle
///
/// Clones refer to the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Open the store, rehydrating once from durable storage
    ///
    /// If only one of the two entries exists the session is absent and the
    /// stray entry is removed. Unreadable storage is logged and treated as
    /// absent.
    pub fn open(storage: impl SessionStorage + 'static, events: EventBus) -> Self {
        let session = rehydrate(&storage);

        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(SessionState { session, epoch: 0 }),
                storage: Box::new(storage),
                events,
            }),
        }
    }

    /// Current session; absent if nothing is stored
    pub fn get(&self) -> Session {
        self.read_state().session.clone()
    }

    /// Counter bumped by every `set` and `clear`
    pub fn epoch(&self) -> u64 {
        self.read_state().epoch
    }

    /// Event bus the store publishes on
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Replace the session with `token` + `identity`
    ///
    /// Both durable entries are written in one batch before memory is
    /// updated. If the write fails the previous session stays in place.
    pub fn set(
        &self,
        token: impl Into<String>,
        identity: impl Into<String>,
    ) -> crush_common::Result<Session> {
        let credentials = Credentials::new(token, identity);

        let session = {
            let mut state = self.write_state();
            self.inner.storage.write_all(&[
                (TOKEN_KEY, credentials.token()),
                (IDENTITY_KEY, credentials.identity()),
            ])?;

            state.session = Session::Present(credentials.clone());
            state.epoch += 1;
            state.session.clone()
        };

        info!(identity = %credentials.identity(), "Session established");
        self.inner
            .events
            .emit_lossy(ClientEvent::session_started(credentials.identity()));

        Ok(session)
    }

    /// End the session
    ///
    /// Memory is cleared even if durable storage cannot be; the failure is
    /// logged. Emits `SessionEnded` then `Navigate` to the entry point.
    pub fn clear(&self) {
        {
            let mut state = self.write_state();
            if let Err(e) = self.inner.storage.remove_all(&[TOKEN_KEY, IDENTITY_KEY]) {
                warn!("Failed to erase stored session: {}", e);
            }
            state.session = Session::Absent;
            state.epoch += 1;
        }

        info!("Session cleared");
        self.inner.events.emit_lossy(ClientEvent::session_ended());
        self.inner.events.emit_lossy(ClientEvent::navigate(Route::Start));
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rehydrate(storage: &dyn SessionStorage) -> Session {
    let read = |key: &str| match storage.read(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Stored session entry {} unreadable: {}", key, e);
            None
        }
    };

    let token = read(TOKEN_KEY);
    let identity = read(IDENTITY_KEY);
    let stray = token.is_some() != identity.is_some();

    let session = Session::from_parts(token, identity);
    if stray {
        warn!("Stored session is incomplete, discarding it");
        if let Err(e) = storage.remove_all(&[TOKEN_KEY, IDENTITY_KEY]) {
            warn!("Failed to remove stray session entry: {}", e);
        }
    }
    if let Some(identity) = session.identity() {
        info!(identity = %identity, "Session restored from storage");
    }
    session
}

#[cfg(test)]
mod tests {
    use super::storage::{FileStorage, MemoryStorage};
    use super::*;
    use crush_common::Error;
    use tempfile::TempDir;

    /// Storage that refuses all writes
    struct ReadOnlyStorage;

    impl SessionStorage for ReadOnlyStorage {
        fn read(&self, _key: &str) -> crush_common::Result<Option<String>> {
            Ok(None)
        }
        fn write_all(&self, _entries: &[(&str, &str)]) -> crush_common::Result<()> {
            Err(Error::Storage("read-only".to_string()))
        }
        fn remove_all(&self, _keys: &[&str]) -> crush_common::Result<()> {
            Err(Error::Storage("read-only".to_string()))
        }
    }

    fn assert_paired(session: &Session) {
        assert_eq!(session.token().is_some(), session.identity().is_some());
    }

    #[test]
    fn empty_storage_gives_absent_session() {
        let store = SessionStore::open(MemoryStorage::new(), EventBus::new(8));
        assert_eq!(store.get(), Session::Absent);
        assert_eq!(store.epoch(), 0);
    }

    #[test]
    fn complete_storage_rehydrates() {
        let storage = MemoryStorage::with_entries([(TOKEN_KEY, "tok"), (IDENTITY_KEY, "a@x.edu")]);
        let store = SessionStore::open(storage, EventBus::new(8));
        assert_eq!(store.get().token(), Some("tok"));
        assert_eq!(store.get().identity(), Some("a@x.edu"));
    }

    #[test]
    fn half_session_is_absent_and_stray_removed() {
        for (key, value) in [(TOKEN_KEY, "tok"), (IDENTITY_KEY, "a@x.edu")] {
            let storage = Arc::new(MemoryStorage::with_entries([(key, value)]));
            let store = SessionStore::open(storage.clone(), EventBus::new(8));
            assert_eq!(store.get(), Session::Absent);
            assert!(storage.entries().is_empty(), "stray {} left behind", key);
        }
    }

    #[test]
    fn set_then_clear_keeps_pairing_and_storage_in_sync() {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::open(storage.clone(), EventBus::new(8));

        let session = store.set("tok", "a@x.edu").unwrap();
        assert_paired(&session);
        assert_eq!(storage.entries().len(), 2);
        assert_eq!(store.epoch(), 1);

        store.clear();
        assert_eq!(store.get(), Session::Absent);
        assert!(storage.entries().is_empty());
        assert_eq!(store.epoch(), 2);
    }

    #[test]
    fn any_sequence_of_mutations_stays_paired() {
        let store = SessionStore::open(MemoryStorage::new(), EventBus::new(64));
        let ops = [true, true, false, true, false, false, true];
        for (i, set) in ops.iter().enumerate() {
            if *set {
                store.set(format!("tok-{}", i), format!("user{}@x.edu", i)).unwrap();
            } else {
                store.clear();
            }
            assert_paired(&store.get());
            assert_eq!(store.get().is_present(), *set);
        }
    }

    #[test]
    fn failed_write_leaves_previous_session() {
        let store = SessionStore::open(ReadOnlyStorage, EventBus::new(8));
        assert!(store.set("tok", "a@x.edu").is_err());
        assert_eq!(store.get(), Session::Absent);
        assert_eq!(store.epoch(), 0);
    }

    #[test]
    fn clear_succeeds_in_memory_even_if_storage_fails() {
        let store = SessionStore::open(ReadOnlyStorage, EventBus::new(8));
        store.clear();
        assert_eq!(store.get(), Session::Absent);
        assert_eq!(store.epoch(), 1);
    }

    #[test]
    fn clear_emits_session_ended_then_navigation() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let store = SessionStore::open(MemoryStorage::new(), bus);

        store.set("tok", "a@x.edu").unwrap();
        store.clear();

        assert_eq!(rx.try_recv().unwrap().event_type(), "SessionStarted");
        assert_eq!(rx.try_recv().unwrap().event_type(), "SessionEnded");
        match rx.try_recv().unwrap() {
            ClientEvent::Navigate { route, .. } => assert_eq!(route, Route::Start),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::open(MemoryStorage::new(), EventBus::new(8));
        let other = store.clone();
        store.set("tok", "a@x.edu").unwrap();
        assert!(other.get().is_present());
        other.clear();
        assert!(!store.get().is_present());
    }

    #[test]
    fn debug_output_hides_token() {
        let rendered = format!("{:?}", Session::Present(Credentials::new("secret-token", "a@x.edu")));
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("a@x.edu"));
    }

    #[test]
    fn from_parts_normalises_half_sessions() {
        assert_eq!(Session::from_parts(Some("t".into()), None), Session::Absent);
        assert_eq!(Session::from_parts(None, Some("a@x.edu".into())), Session::Absent);
        assert!(Session::from_parts(Some(String::new()), Some(String::new())).is_present());
    }

    #[test]
    fn file_backed_session_survives_reopen() {
        // Given: a session written through file storage
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        let store = SessionStore::open(FileStorage::new(&path), EventBus::new(8));
        store.set("tok", "a@x.edu").unwrap();

        // When: a fresh store opens the same file
        let reopened = SessionStore::open(FileStorage::new(&path), EventBus::new(8));

        // Then: the session is restored as written
        assert_eq!(reopened.get().token(), Some("tok"));
        assert_eq!(reopened.get().identity(), Some("a@x.edu"));
        assert_eq!(reopened.epoch(), 0);
    }

    #[test]
    fn stray_entry_in_file_is_removed_on_open() {
        // Given: a session file holding only the token
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "session_token = \"tok\"\n").unwrap();

        // When
        let store = SessionStore::open(FileStorage::new(&path), EventBus::new(8));

        // Then: no session, and the leftover entry is gone from disk
        assert_eq!(store.get(), Session::Absent);
        assert!(!path.exists());
    }
}
