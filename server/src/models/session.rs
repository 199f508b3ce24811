use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    pub used: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub client_id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct StartGameResult {
    pub success: bool,
    pub token: String,
}
