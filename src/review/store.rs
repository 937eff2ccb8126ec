use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use super::{ReviewError, ReviewSession};

/// Shared handle to one user's session. Holding the lock serializes that
/// user's operations; other users are unaffected.
pub type SessionHandle = Arc<Mutex<ReviewSession>>;

/// All live review sessions, keyed by user id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: &str) -> Result<Option<SessionHandle>, ReviewError> {
        let sessions = self.sessions.read().map_err(|_| ReviewError::LockPoisoned)?;
        Ok(sessions.get(user_id).cloned())
    }

    /// Store `session` under its user id, replacing any previous one.
    pub fn insert(&self, session: ReviewSession) -> Result<SessionHandle, ReviewError> {
        let user_id = session.user_id().to_string();
        let handle = Arc::new(Mutex::new(session));
        let mut sessions = self.sessions.write().map_err(|_| ReviewError::LockPoisoned)?;
        if sessions.insert(user_id.clone(), handle.clone()).is_some() {
            tracing::debug!(user_id = %user_id, "Replaced existing review session");
        }
        Ok(handle)
    }

    /// Whether `handle` is still the session stored for `user_id`. A handle
    /// taken before an expiry or replacement no longer is.
    pub fn holds(&self, user_id: &str, handle: &SessionHandle) -> Result<bool, ReviewError> {
        let sessions = self.sessions.read().map_err(|_| ReviewError::LockPoisoned)?;
        Ok(sessions.get(user_id).is_some_and(|current| Arc::ptr_eq(current, handle)))
    }

    /// Returns false when the user had no session.
    pub fn remove(&self, user_id: &str) -> Result<bool, ReviewError> {
        let mut sessions = self.sessions.write().map_err(|_| ReviewError::LockPoisoned)?;
        Ok(sessions.remove(user_id).is_some())
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than `timeout` and return their user
    /// ids. A session whose lock is currently held is in use and kept.
    pub fn expire_idle(&self, timeout: Duration) -> Result<Vec<String>, ReviewError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().map_err(|_| ReviewError::LockPoisoned)?;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, handle)| {
                handle
                    .try_lock()
                    .map(|s| s.is_idle(now, timeout))
                    .unwrap_or(false)
            })
            .map(|(user_id, _)| user_id.clone())
            .collect();

        for user_id in &expired {
            sessions.remove(user_id);
            tracing::info!(user_id = %user_id, "Review session expired");
        }
        Ok(expired)
    }
}
