use super::window_start;
use crate::error::StoreError;
use crate::models::leaderboard::{LeaderboardEntry, PublicEntry};
use crate::store::LeaderboardStore;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

pub fn insert<S>(
    store: &S,
    initials: &str,
    survival_time: i64,
    identity_hash: &str,
    now: DateTime<Utc>,
) -> Result<LeaderboardEntry, StoreError>
where
    S: LeaderboardStore + ?Sized,
{
    let entry = LeaderboardEntry {
        id: Uuid::new_v4().to_string(),
        initials: initials.to_string(),
        survival_time,
        identity_hash: identity_hash.to_string(),
        created_at: now,
    };
    store.insert_entry(&entry)?;
    Ok(entry)
}

/// Same identity, same time, within `within` of `now`.
pub fn is_duplicate<S>(
    store: &S,
    identity_hash: &str,
    survival_time: i64,
    within: Duration,
    now: DateTime<Utc>,
) -> Result<bool, StoreError>
where
    S: LeaderboardStore + ?Sized,
{
    store.has_recent_entry(identity_hash, survival_time, window_start(now, within))
}

/// Competition rank: entries with an equal time share a place.
pub fn rank<S>(store: &S, survival_time: f64) -> Result<i64, StoreError>
where
    S: LeaderboardStore + ?Sized,
{
    Ok(store.count_better(survival_time)? + 1)
}

pub fn top<S>(store: &S, n: u32) -> Result<Vec<PublicEntry>, StoreError>
where
    S: LeaderboardStore + ?Sized,
{
    Ok(store
        .top_entries(n)?
        .into_iter()
        .map(PublicEntry::from)
        .collect())
}
