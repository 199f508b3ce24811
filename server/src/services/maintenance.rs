use super::window_start;
use crate::error::StoreError;
use crate::store::Store;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub sessions: usize,
    pub rate_limits: usize,
}

/// Drops sessions past their TTL and rate-limit records past retention.
pub fn prune<S>(
    store: &S,
    now: DateTime<Utc>,
    session_ttl: Duration,
    rate_limit_retention: Duration,
) -> Result<PruneReport, StoreError>
where
    S: Store + ?Sized,
{
    let sessions = store.delete_sessions_before(window_start(now, session_ttl))?;
    let rate_limits = store.delete_attempts_before(window_start(now, rate_limit_retention))?;
    Ok(PruneReport {
        sessions,
        rate_limits,
    })
}

/// Best-effort variant for the background task. Errors are logged only.
pub fn run_cleanup<S>(store: &S, now: DateTime<Utc>, session_ttl: Duration, retention: Duration)
where
    S: Store + ?Sized,
{
    match prune(store, now, session_ttl, retention) {
        Ok(report) if report != PruneReport::default() => {
            tracing::debug!(
                "cleanup removed {} sessions, {} rate limit records",
                report.sessions,
                report.rate_limits
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("cleanup error: {}", e),
    }
}
