use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use quiz_core::model::{QuestionSequence, QuizId, UserId};

use crate::names::SESSION_COOKIE_NAME;

/// Per-visitor state kept on the server and keyed by the session cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Option<UserId>,
    /// Running totals for visitors without an account.
    pub score: Option<u32>,
    pub possible: Option<u32>,
    /// In-progress anonymous attempts, one per quiz.
    pub sequences: HashMap<QuizId, QuestionSequence>,
}

impl SessionData {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Counts one anonymous answer towards the session totals.
    pub fn record_answer(&mut self, correct: bool) {
        self.score = Some(self.score.unwrap_or(0).saturating_add(u32::from(correct)));
        self.possible = Some(self.possible.unwrap_or(0).saturating_add(1));
    }
}

/// A request's view of its session: the cookie token, if any, and a copy of
/// the stored data to modify and commit back.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
    pub data: SessionData,
}

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    data: SessionData,
    last_seen: Instant,
}

type Entries = HashMap<String, Entry>;

/// In-process session storage with idle expiry.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Entries>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) < self.idle_timeout
    }

    /// Drops every session that has been idle past the timeout.
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|_, entry| self.is_live(entry, now));
        let evicted = before - guard.len();
        if evicted > 0 {
            tracing::debug!(evicted, live = guard.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Number of sessions currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens the session named by a cookie token. Unknown or expired tokens
    /// start empty and are replaced on the next commit.
    #[must_use]
    pub fn open(&self, token: Option<String>) -> Session {
        let now = Instant::now();
        let guard = self.lock();
        let live = token.and_then(|t| {
            let entry = guard.get(&t).filter(|e| self.is_live(e, now))?;
            Some((t, entry.data.clone()))
        });
        match live {
            Some((token, data)) => Session {
                token: Some(token),
                data,
            },
            None => Session::default(),
        }
    }

    /// Stores new session data under a fresh token. Idle sessions are swept
    /// first so abandoned visitors do not accumulate.
    pub fn create(&self, data: SessionData) -> String {
        self.evict_idle();
        let token = uuid::Uuid::new_v4().to_string();
        self.insert(token.clone(), data);
        token
    }

    fn insert(&self, token: String, data: SessionData) {
        let entry = Entry {
            data,
            last_seen: Instant::now(),
        };
        self.lock().insert(token, entry);
    }

    /// Writes the session back. Returns a `Set-Cookie` value when the
    /// visitor needs a new token.
    pub fn commit(&self, session: Session) -> Option<String> {
        match session.token {
            Some(token) => {
                self.insert(token, session.data);
                None
            }
            None if session.data.is_empty() => None,
            None => Some(session_cookie(&self.create(session.data))),
        }
    }

    /// Moves the session to a fresh token, dropping the old one. Used when
    /// the signed-in user changes.
    pub fn renew(&self, session: Session) -> String {
        if let Some(token) = &session.token {
            self.lock().remove(token);
        }
        session_cookie(&self.create(session.data))
    }

    /// Forgets the session and returns a cookie value that clears it.
    pub fn destroy(&self, session: &Session) -> String {
        if let Some(token) = &session.token {
            self.lock().remove(token);
        }
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }
}

#[must_use]
pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sessions_are_not_stored() {
        let store = SessionStore::new();
        let session = store.open(None);
        assert!(store.commit(session).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn new_sessions_get_a_cookie_and_persist() {
        let store = SessionStore::new();
        let mut session = store.open(Some("stale".into()));
        session.data.record_answer(true);
        session.data.record_answer(false);

        let cookie = store.commit(session).unwrap();
        let token = cookie
            .strip_prefix("quiz_session=")
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string();

        let reopened = store.open(Some(token));
        assert_eq!(reopened.data.score, Some(1));
        assert_eq!(reopened.data.possible, Some(2));

        let clear = store.destroy(&reopened);
        assert!(clear.contains("Max-Age=0"));
        assert!(store.is_empty());
    }

    fn answered() -> SessionData {
        let mut data = SessionData::default();
        data.record_answer(true);
        data
    }

    #[test]
    fn idle_sessions_expire_and_are_swept() {
        let store = SessionStore::with_idle_timeout(Duration::ZERO);
        let stale = store.create(answered());
        assert_eq!(store.len(), 1);

        // expired entries read as a fresh visitor
        let reopened = store.open(Some(stale));
        assert_eq!(reopened.data, SessionData::default());

        store.create(answered());
        store.create(answered());
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_idle(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn active_sessions_survive_sweeps() {
        let store = SessionStore::new();
        let token = store.create(answered());
        store.create(SessionData::default());
        assert_eq!(store.evict_idle(), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.open(Some(token)).data.score, Some(1));
    }
}
