use crate::error::{AppError, SessionError, StoreError};
use crate::models::session::Session;
use crate::store::SessionStore;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use std::time::Duration;

const TOKEN_BYTES: usize = 24;

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn create_session<S>(store: &S, client_id: &str, now: DateTime<Utc>) -> Result<String, StoreError>
where
    S: SessionStore + ?Sized,
{
    let session = Session {
        token: generate_token(),
        client_id: client_id.to_string(),
        created_at: now,
        used: false,
    };
    store.insert_session(&session)?;
    tracing::debug!("session created for client {}", client_id);
    Ok(session.token)
}

/// Decides whether a looked-up session may be spent by `client_id`.
pub fn check_session(
    session: Option<Session>,
    client_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session, SessionError> {
    let session = session.ok_or(SessionError::NotFound)?;
    if session.client_id != client_id {
        return Err(SessionError::Mismatch);
    }
    let age_ms = (now - session.created_at).num_milliseconds();
    if age_ms > i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX) {
        return Err(SessionError::Expired);
    }
    if session.used {
        return Err(SessionError::AlreadyUsed);
    }
    Ok(session)
}

/// Read-only validation, no state change.
pub fn validate_session<S>(
    store: &S,
    token: &str,
    client_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session, AppError>
where
    S: SessionStore + ?Sized,
{
    let session = store.get_session(token)?;
    Ok(check_session(session, client_id, ttl, now)?)
}

/// Validates and marks the session used. Only one caller can win for a
/// given token; the rest see `AlreadyUsed`.
pub fn consume_session<S>(
    store: &S,
    token: &str,
    client_id: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session, AppError>
where
    S: SessionStore + ?Sized,
{
    let mut session = validate_session(store, token, client_id, ttl, now)?;
    if !store.claim_session(token)? {
        return Err(SessionError::AlreadyUsed.into());
    }
    session.used = true;
    Ok(session)
}
