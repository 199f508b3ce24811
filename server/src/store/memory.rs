use super::{LeaderboardStore, RateLimitStore, SessionStore};
use crate::error::StoreError;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::session::Session;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Session>,
    attempts: HashMap<String, Vec<DateTime<Utc>>>,
    entries: Vec<LeaderboardEntry>,
}

/// Process-local store. Everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl SessionStore for MemoryStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.lock()?
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.sessions.get(token).cloned())
    }

    fn claim_session(&self, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        match inner.sessions.get_mut(token) {
            Some(session) if !session.used => {
                session.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn release_session(&self, token: &str) -> Result<(), StoreError> {
        if let Some(session) = self.lock()?.sessions.get_mut(token) {
            session.used = false;
        }
        Ok(())
    }

    fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.created_at >= cutoff);
        Ok(before - inner.sessions.len())
    }
}

impl RateLimitStore for MemoryStore {
    fn count_attempts_since(
        &self,
        identity_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let inner = self.lock()?;
        let count = inner
            .attempts
            .get(identity_hash)
            .map(|times| times.iter().filter(|t| **t > since).count())
            .unwrap_or(0);
        Ok(count as u32)
    }

    fn record_attempt(&self, identity_hash: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.lock()?
            .attempts
            .entry(identity_hash.to_string())
            .or_default()
            .push(at);
        Ok(())
    }

    fn delete_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut removed = 0;
        inner.attempts.retain(|_, times| {
            let before = times.len();
            times.retain(|t| *t >= cutoff);
            removed += before - times.len();
            !times.is_empty()
        });
        Ok(removed)
    }
}

impl LeaderboardStore for MemoryStore {
    fn insert_entry(&self, entry: &LeaderboardEntry) -> Result<(), StoreError> {
        self.lock()?.entries.push(entry.clone());
        Ok(())
    }

    fn has_recent_entry(
        &self,
        identity_hash: &str,
        survival_time: i64,
        since: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.lock()?.entries.iter().any(|e| {
            e.identity_hash == identity_hash && e.survival_time == survival_time && e.created_at > since
        }))
    }

    fn count_better(&self, survival_time: f64) -> Result<i64, StoreError> {
        let inner = self.lock()?;
        let count = inner
            .entries
            .iter()
            .filter(|e| e.survival_time as f64 > survival_time)
            .count();
        Ok(count as i64)
    }

    fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut entries = self.lock()?.entries.clone();
        entries.sort_by(|a, b| {
            b.survival_time
                .cmp(&a.survival_time)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        entries.truncate(limit as usize);
        Ok(entries)
    }
}
