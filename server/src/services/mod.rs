pub mod leaderboard;
pub mod maintenance;
pub mod rate_limit;
pub mod session;
pub mod submission;

use chrono::{DateTime, Utc};
use std::time::Duration;

/// The instant `window` before `now`.
pub(crate) fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    let millis = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    now.checked_sub_signed(chrono::Duration::milliseconds(millis))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
