use super::run_blocking;
use crate::error::AppError;
use crate::models::leaderboard::UserRank;
use crate::services::leaderboard as service;
use crate::state::AppState;
use crate::validation;
use ntex::web::{self, HttpResponse};

pub async fn get_leaderboard(
    state: web::types::State<AppState>,
) -> Result<HttpResponse, AppError> {
    let size = state.config.leaderboard_size;
    let entries = run_blocking(&state, move |store| Ok(service::top(store, size)?)).await?;
    Ok(HttpResponse::Ok().json(&entries))
}

/// Ranks a time against the stored board. The gamertag only has to be
/// present; it does not affect the result.
pub async fn get_user_rank(
    state: web::types::State<AppState>,
    path: web::types::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (gamertag, time) = path.into_inner();
    let time = validation::validate_rank_query(&gamertag, &time)?;
    let rank = run_blocking(&state, move |store| Ok(service::rank(store, time)?)).await?;
    Ok(HttpResponse::Ok().json(&UserRank { rank }))
}
