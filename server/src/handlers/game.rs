use super::run_blocking;
use crate::error::AppError;
use crate::identity;
use crate::models::leaderboard::ScoreSubmission;
use crate::models::session::{StartGameRequest, StartGameResult};
use crate::services::{session, submission};
use crate::state::AppState;
use crate::validation;
use chrono::Utc;
use ntex::util::Bytes;
use ntex::web::{self, HttpRequest, HttpResponse};

pub async fn start_game(
    state: web::types::State<AppState>,
    body: Bytes,
) -> Result<HttpResponse, AppError> {
    let req: StartGameRequest = validation::parse_body(&body)?;
    let client_id = validation::validate_client_id(req.client_id)?;
    let token = run_blocking(&state, move |store| {
        Ok(session::create_session(store, &client_id, Utc::now())?)
    })
    .await?;
    Ok(HttpResponse::Ok().json(&StartGameResult {
        success: true,
        token,
    }))
}

pub async fn submit_score(
    req: HttpRequest,
    state: web::types::State<AppState>,
    body: Bytes,
) -> Result<HttpResponse, AppError> {
    let payload: ScoreSubmission = validation::parse_body(&body)?;
    let identity_hash = identity::identity_hash(&req, &state.salt);
    let policy = state.config.policy.clone();

    let result = run_blocking(&state, move |store| {
        submission::submit_score(store, &policy, payload, &identity_hash, Utc::now())
    })
    .await
    .inspect_err(|e| tracing::debug!("score rejected: {}", e))?;

    Ok(HttpResponse::Ok().json(&result))
}
