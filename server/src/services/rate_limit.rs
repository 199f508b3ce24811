use super::window_start;
use crate::error::{AppError, StoreError};
use crate::store::RateLimitStore;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Sliding-window submission cap per identity hash.
///
/// Checking and recording are separate steps: a submission is checked
/// before anything is written and only recorded once its score is stored,
/// so rejected requests never count against the caller.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        RateLimiter { max, window }
    }

    pub fn check<S>(&self, store: &S, identity_hash: &str, now: DateTime<Utc>) -> Result<(), AppError>
    where
        S: RateLimitStore + ?Sized,
    {
        let recent = store.count_attempts_since(identity_hash, window_start(now, self.window))?;
        if recent >= self.max {
            tracing::debug!("rate limited: {} submissions in window", recent);
            return Err(AppError::RateLimited);
        }
        Ok(())
    }

    pub fn record<S>(&self, store: &S, identity_hash: &str, now: DateTime<Utc>) -> Result<(), StoreError>
    where
        S: RateLimitStore + ?Sized,
    {
        store.record_attempt(identity_hash, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Checks, then records on success, the way an accepted submission does.
    fn admit(
        limiter: &RateLimiter,
        store: &MemoryStore,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        limiter.check(store, id, now)?;
        Ok(limiter.record(store, id, now)?)
    }

    #[test]
    fn test_sixth_in_window_is_denied() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Utc::now();

        for i in 0..5 {
            let now = start + chrono::Duration::seconds(i);
            admit(&limiter, &store, "id", now).unwrap();
        }
        let sixth = start + chrono::Duration::seconds(10);
        assert!(matches!(
            admit(&limiter, &store, "id", sixth),
            Err(AppError::RateLimited)
        ));
        // other identities are unaffected
        admit(&limiter, &store, "other", sixth).unwrap();
    }

    #[test]
    fn test_window_slides() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let start = Utc::now();

        for _ in 0..5 {
            admit(&limiter, &store, "id", start).unwrap();
        }
        assert!(limiter.check(&store, "id", start + chrono::Duration::seconds(59)).is_err());
        admit(&limiter, &store, "id", start + chrono::Duration::seconds(60)).unwrap();
    }

    #[test]
    fn test_denied_attempts_are_not_recorded() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Utc::now();

        admit(&limiter, &store, "id", now).unwrap();
        assert!(admit(&limiter, &store, "id", now).is_err());
        assert_eq!(
            store
                .count_attempts_since("id", now - chrono::Duration::seconds(1))
                .unwrap(),
            1
        );
    }
}
