pub mod game;
pub mod leaderboard;

use crate::error::{AppError, StoreError};
use crate::state::AppState;
use crate::store::Store;
use ntex::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(health))
        .route("/api/start-game", web::post().to(game::start_game))
        .route("/api/submit-score", web::post().to(game::submit_score))
        .route("/api/leaderboard", web::get().to(leaderboard::get_leaderboard))
        .route(
            "/api/user-rank/{gamertag}/{time}",
            web::get().to(leaderboard::get_user_rank),
        );
}

async fn health() -> web::HttpResponse {
    web::HttpResponse::Ok().json(&serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Runs store work on the blocking pool, bounded by the configured timeout.
///
/// A timeout only abandons the wait: the blocking task runs to completion,
/// so a submission answered with a 500 may still store its score and spend
/// its session.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&dyn Store) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    let task = tokio::task::spawn_blocking(move || f(store.as_ref()));
    match tokio::time::timeout(state.config.store_timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(StoreError::Task(e.to_string()).into()),
        Err(_) => Err(StoreError::Timeout.into()),
    }
}
