use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::skills::heuristic::extract_skills;
use crate::skills::models::SkillMap;
use crate::skills::taxonomy::taxonomy;

#[derive(Debug, Deserialize)]
pub struct ExtractSkillsRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractSkillsResponse {
    pub skills: SkillMap,
    pub count: usize,
    pub catalog_size: usize,
}

/// POST /api/v1/skills/extract
/// Deterministic keyword extraction against the skill taxonomy. Never fails on content.
pub async fn handle_extract_skills(
    Json(req): Json<ExtractSkillsRequest>,
) -> Json<ExtractSkillsResponse> {
    let skills = extract_skills(&req.text);
    debug!("Heuristic extraction found {} skills", skills.len());
    Json(ExtractSkillsResponse {
        count: skills.len(),
        catalog_size: taxonomy().entry_count(),
        skills,
    })
}
