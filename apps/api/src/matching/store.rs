//! Append-only log of match runs in PostgreSQL.
//!
//! Each run is one INSERT inside its own transaction. Reads are scoped to the owning
//! user and never see soft-deleted rows.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::matching::engine::MatchResult;
use crate::models::match_run::{MatchRunRow, MatchSummary};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Postgres SQLSTATE for unique violations.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("match {0} not found")]
    NotFound(Uuid),

    #[error("match belongs to another user")]
    Unauthorized,

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Everything needed to record one match run.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub user_id: Uuid,
    pub jd_ref: String,
    pub cv_ref: String,
    pub result: MatchResult,
    pub llm_used: bool,
    pub provider: Option<String>,
}

impl NewMatch {
    fn into_row(self, match_id: Uuid) -> MatchRunRow {
        let summary = MatchSummary {
            jd_total: self.result.details.jd_total,
            cv_total: self.result.details.cv_total,
            matched_count: self.result.details.matched_count,
            rationale: self.result.rationale,
        };
        MatchRunRow {
            match_id,
            user_id: self.user_id,
            jd_ref: self.jd_ref,
            cv_ref: self.cv_ref,
            score: self.result.score,
            matched: Json(self.result.matched),
            missing: Json(self.result.missing),
            extra: Json(self.result.extra),
            summary: Json(summary),
            llm_used: self.llm_used,
            provider: self.provider,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// Clamps pagination input: `skip ≥ 0`, `limit` in 1..=100, default 20.
pub fn clamp_page(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    (
        skip.unwrap_or(0).max(0),
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    )
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Persists a run and returns its fresh id.
    async fn save_match(&self, new_match: NewMatch) -> Result<Uuid, StoreError>;

    /// The user's runs, newest first.
    async fn list_matches(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<MatchRunRow>, StoreError>;

    async fn get_match(&self, user_id: Uuid, match_id: Uuid) -> Result<MatchRunRow, StoreError>;
}

pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn write_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            StoreError::Conflict(db.message().to_string())
        }
        _ => StoreError::Database(e),
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn save_match(&self, new_match: NewMatch) -> Result<Uuid, StoreError> {
        let row = new_match.into_row(Uuid::new_v4());

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO match_runs
                (match_id, user_id, jd_ref, cv_ref, score, matched, missing, extra,
                 summary, llm_used, provider, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.match_id)
        .bind(row.user_id)
        .bind(&row.jd_ref)
        .bind(&row.cv_ref)
        .bind(row.score)
        .bind(&row.matched)
        .bind(&row.missing)
        .bind(&row.extra)
        .bind(&row.summary)
        .bind(row.llm_used)
        .bind(&row.provider)
        .bind(row.created_at)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;
        tx.commit()
            .await
            .map_err(|e| StoreError::Conflict(format!("commit failed: {e}")))?;

        info!(
            "Saved match {} for user {} (score {:.2})",
            row.match_id, row.user_id, row.score
        );
        Ok(row.match_id)
    }

    async fn list_matches(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<MatchRunRow>, StoreError> {
        let rows = sqlx::query_as::<_, MatchRunRow>(
            r#"
            SELECT * FROM match_runs
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_match(&self, user_id: Uuid, match_id: Uuid) -> Result<MatchRunRow, StoreError> {
        let row: Option<MatchRunRow> = sqlx::query_as(
            "SELECT * FROM match_runs WHERE match_id = $1 AND deleted_at IS NULL",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(StoreError::NotFound(match_id))?;
        if row.user_id != user_id {
            return Err(StoreError::Unauthorized);
        }
        Ok(row)
    }
}
