use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored score. Never modified after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub id: String,
    pub initials: String,
    pub survival_time: i64,
    pub identity_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicEntry {
    pub initials: String,
    pub survival_time: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LeaderboardEntry> for PublicEntry {
    fn from(entry: LeaderboardEntry) -> Self {
        PublicEntry {
            initials: entry.initials,
            survival_time: entry.survival_time,
            created_at: entry.created_at,
        }
    }
}

/// Raw submit-score body. Every field is an untyped JSON value so that
/// missing or mistyped values surface as validation errors instead of
/// deserializer failures.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub initials: Option<serde_json::Value>,
    #[serde(alias = "time")]
    pub survival_time: Option<serde_json::Value>,
    #[serde(alias = "token")]
    pub session_token: Option<serde_json::Value>,
    pub client_id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ScoreSubmissionResult {
    pub success: bool,
    pub rank: i64,
}

#[derive(Debug, Serialize)]
pub struct UserRank {
    pub rank: i64,
}
