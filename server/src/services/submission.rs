use crate::config::SubmissionPolicy;
use crate::error::AppError;
use crate::models::leaderboard::{ScoreSubmission, ScoreSubmissionResult};
use crate::services::leaderboard;
use crate::services::rate_limit::RateLimiter;
use crate::services::session;
use crate::store::Store;
use crate::validation;
use chrono::{DateTime, Utc};

/// Runs one score submission through the anti-cheat chain.
///
/// Cheap checks go first: body shape, then the session, the rate limit and
/// the duplicate filter. Nothing is written until all of them pass. The
/// session is claimed right before the insert so two requests racing on
/// one token cannot both land a score; if the insert then fails the claim
/// is handed back.
pub fn submit_score<S>(
    store: &S,
    policy: &SubmissionPolicy,
    req: ScoreSubmission,
    identity_hash: &str,
    now: DateTime<Utc>,
) -> Result<ScoreSubmissionResult, AppError>
where
    S: Store + ?Sized,
{
    let sub = validation::validate_submission(req, &policy.initials)?;

    session::validate_session(
        store,
        &sub.session_token,
        &sub.client_id,
        policy.session_ttl,
        now,
    )?;

    let limiter = RateLimiter::new(policy.rate_limit_max, policy.rate_limit_window);
    limiter.check(store, identity_hash, now)?;

    if leaderboard::is_duplicate(
        store,
        identity_hash,
        sub.survival_time,
        policy.duplicate_window,
        now,
    )? {
        tracing::debug!("duplicate submission of {}s", sub.survival_time);
        return Err(AppError::Conflict);
    }

    session::consume_session(
        store,
        &sub.session_token,
        &sub.client_id,
        policy.session_ttl,
        now,
    )?;

    let entry = match leaderboard::insert(
        store,
        &sub.initials,
        sub.survival_time,
        identity_hash,
        now,
    ) {
        Ok(entry) => entry,
        Err(e) => {
            if let Err(release_err) = store.release_session(&sub.session_token) {
                tracing::warn!("could not release session after failed insert: {}", release_err);
            }
            return Err(e.into());
        }
    };

    if let Err(e) = limiter.record(store, identity_hash, now) {
        tracing::warn!("failed to record rate limit attempt: {}", e);
    }

    let rank = leaderboard::rank(store, entry.survival_time as f64)?;
    tracing::info!(
        "score accepted: {} survived {}s, rank {}",
        entry.initials,
        entry.survival_time,
        rank
    );

    Ok(ScoreSubmissionResult {
        success: true,
        rank,
    })
}
