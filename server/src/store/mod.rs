//! Persistence seams for sessions, rate-limit records and scores.
//!
//! Services only talk to these traits. `SqliteStore` backs them with a
//! shared database, `MemoryStore` with in-process maps.

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::session::Session;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait SessionStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError>;

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Flips `used` from false to true in one step. Returns false when the
    /// session is unknown or was already used.
    fn claim_session(&self, token: &str) -> Result<bool, StoreError>;

    /// Undoes a claim whose follow-up write failed.
    fn release_session(&self, token: &str) -> Result<(), StoreError>;

    fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

pub trait RateLimitStore {
    fn count_attempts_since(
        &self,
        identity_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError>;

    fn record_attempt(&self, identity_hash: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    fn delete_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

pub trait LeaderboardStore {
    fn insert_entry(&self, entry: &LeaderboardEntry) -> Result<(), StoreError>;

    fn has_recent_entry(
        &self,
        identity_hash: &str,
        survival_time: i64,
        since: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Number of entries whose survival time is strictly greater.
    fn count_better(&self, survival_time: f64) -> Result<i64, StoreError>;

    /// Best entries: survival time descending, earlier entries first on ties.
    fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

pub trait Store: SessionStore + RateLimitStore + LeaderboardStore + Send + Sync {}

impl<T> Store for T where T: SessionStore + RateLimitStore + LeaderboardStore + Send + Sync {}
