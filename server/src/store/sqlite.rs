use super::{LeaderboardStore, RateLimitStore, SessionStore};
use crate::db::Db;
use crate::error::StoreError;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::session::Session;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

/// Timestamps are stored as unix milliseconds.
fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        token: row.get(0)?,
        client_id: row.get(1)?,
        created_at: from_millis(row.get(2)?),
        used: row.get::<_, i64>(3)? != 0,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        id: row.get(0)?,
        initials: row.get(1)?,
        survival_time: row.get(2)?,
        identity_hash: row.get(3)?,
        created_at: from_millis(row.get(4)?),
    })
}

pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub fn new(db: Db) -> Self {
        SqliteStore { db }
    }
}

impl SessionStore for SqliteStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, client_id, created_at, used) VALUES (?1, ?2, ?3, ?4)",
                params![
                    session.token,
                    session.client_id,
                    session.created_at.timestamp_millis(),
                    session.used as i64,
                ],
            )?;
            Ok(())
        })
    }

    fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT token, client_id, created_at, used FROM sessions WHERE token = ?1",
                params![token],
                session_from_row,
            )
            .optional()
        })
    }

    fn claim_session(&self, token: &str) -> Result<bool, StoreError> {
        let changed = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET used = 1 WHERE token = ?1 AND used = 0",
                params![token],
            )
        })?;
        Ok(changed == 1)
    }

    fn release_session(&self, token: &str) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("UPDATE sessions SET used = 0 WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    fn delete_sessions_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions WHERE created_at < ?1",
                params![cutoff.timestamp_millis()],
            )
        })
    }
}

impl RateLimitStore for SqliteStore {
    fn count_attempts_since(
        &self,
        identity_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM rate_limits WHERE ip_hash = ?1 AND timestamp > ?2",
                params![identity_hash, since.timestamp_millis()],
                |row| row.get(0),
            )
        })
    }

    fn record_attempt(&self, identity_hash: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO rate_limits (ip_hash, timestamp) VALUES (?1, ?2)",
                params![identity_hash, at.timestamp_millis()],
            )?;
            Ok(())
        })
    }

    fn delete_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM rate_limits WHERE timestamp < ?1",
                params![cutoff.timestamp_millis()],
            )
        })
    }
}

impl LeaderboardStore for SqliteStore {
    fn insert_entry(&self, entry: &LeaderboardEntry) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO leaderboard (id, initials, survival_time, ip_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id,
                    entry.initials,
                    entry.survival_time,
                    entry.identity_hash,
                    entry.created_at.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
    }

    fn has_recent_entry(
        &self,
        identity_hash: &str,
        survival_time: i64,
        since: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM leaderboard
                     WHERE ip_hash = ?1 AND survival_time = ?2 AND created_at > ?3
                 )",
                params![identity_hash, survival_time, since.timestamp_millis()],
                |row| row.get(0),
            )
        })
    }

    fn count_better(&self, survival_time: f64) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM leaderboard WHERE survival_time > ?1",
                params![survival_time],
                |row| row.get(0),
            )
        })
    }

    fn top_entries(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, initials, survival_time, ip_hash, created_at
                 FROM leaderboard
                 ORDER BY survival_time DESC, created_at ASC, id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], entry_from_row)?;

            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
    }
}
