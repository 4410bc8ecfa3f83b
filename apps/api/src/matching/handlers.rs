use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::intelligence::classifier::ClassifierMode;
use crate::matching::engine::{match_skills, MatchResult};
use crate::matching::pipeline::{run_match, MatchOutcome, MatchRequest};
use crate::matching::store::clamp_page;
use crate::models::match_run::MatchRunRow;
use crate::skills::models::SkillMap;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ScoreRequest {
    pub jd_skills: SkillMap,
    pub cv_skills: SkillMap,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub user_id: Uuid,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchRunRow>,
    pub skip: i64,
    pub limit: i64,
}

/// POST /api/v1/matches/score
/// Scores caller-supplied skill maps. No classification, no persistence.
pub async fn handle_score(Json(req): Json<ScoreRequest>) -> Json<MatchResult> {
    Json(match_skills(&req.jd_skills, &req.cv_skills))
}

/// POST /api/v1/matches
pub async fn handle_run_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchOutcome>, AppError> {
    let extractor = match (req.mode, req.provider.as_deref()) {
        (ClassifierMode::Llm, Some(tag)) => Some(state.backends.resolve(tag)?),
        _ => None,
    };
    let outcome = run_match(req, extractor.as_ref(), state.store.as_ref(), &state.classifier).await?;
    info!(
        "Match run: success={}, score={:.2}, llm_used={}, match_id={:?}",
        outcome.result.success, outcome.result.score, outcome.llm_used, outcome.match_id
    );
    Ok(Json(outcome))
}

/// GET /api/v1/matches?user_id&skip&limit
pub async fn handle_list_matches(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<MatchListResponse>, AppError> {
    let (skip, limit) = clamp_page(params.skip, params.limit);
    let matches = state.store.list_matches(params.user_id, skip, limit).await?;
    Ok(Json(MatchListResponse {
        matches,
        skip,
        limit,
    }))
}

/// GET /api/v1/matches/:id?user_id
pub async fn handle_get_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<MatchRunRow>, AppError> {
    let row = state.store.get_match(params.user_id, id).await?;
    Ok(Json(row))
}
