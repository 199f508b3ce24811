use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};
use thiserror::Error;

/// Failures of the backing datastore. Never shown to clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store call timed out")]
    Timeout,
    #[error("store task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid session token")]
    NotFound,
    #[error("Client ID mismatch")]
    Mismatch,
    #[error("Session token already used")]
    AlreadyUsed,
    #[error("Session token expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Auth(#[from] SessionError),
    #[error("Too many submissions. Please wait a minute.")]
    RateLimited,
    #[error("Duplicate submission detected")]
    Conflict,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl WebResponseError for AppError {
    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let message = match self {
            AppError::Storage(e) => {
                tracing::error!("storage failure: {}", e);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status()).json(&serde_json::json!({
            "success": false,
            "error": message,
        }))
    }
}
