use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::matching::engine::MatchedSkill;

/// Match details and rationale stored alongside the skill lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub jd_total: usize,
    pub cv_total: usize,
    pub matched_count: usize,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MatchRunRow {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub jd_ref: String,
    pub cv_ref: String,
    pub score: f64,
    pub matched: Json<Vec<MatchedSkill>>,
    pub missing: Json<Vec<String>>,
    pub extra: Json<Vec<String>>,
    pub summary: Json<MatchSummary>,
    pub llm_used: bool,
    pub provider: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}
