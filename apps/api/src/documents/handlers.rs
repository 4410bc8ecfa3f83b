use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::documents::archive::archive_transformed;
use crate::documents::redaction::{redact_pii, RedactionResult};
use crate::documents::sections::{
    parse_cv_sections, rebuild_cv, summarize_sections, CvSection, RebuildConfig, SectionSummary,
};
use crate::documents::text::extract_text;
use crate::documents::transform::{transform_cv, TransformedCv};
use crate::errors::AppError;
use crate::skills::heuristic::extract_skills;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub filename: String,
    pub char_count: usize,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SectionsResponse {
    pub sections: Vec<CvSection>,
    pub summary: Vec<SectionSummary>,
}

#[derive(Debug, Deserialize)]
pub struct RebuildRequest {
    /// Raw CV text, parsed before rebuilding when `sections` is absent.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub sections: Option<Vec<CvSection>>,
    #[serde(default)]
    pub config: RebuildConfig,
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub cv_text: String,
    #[serde(default)]
    pub jd_skills: Vec<String>,
    /// Used to derive `jd_skills` when none are supplied.
    #[serde(default)]
    pub jd_text: Option<String>,
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    #[serde(flatten)]
    pub transformed: TransformedCv,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_key: Option<String>,
}

/// POST /api/v1/documents/extract
/// Multipart upload; the document is read from the `file` field.
pub async fn handle_extract(mut multipart: Multipart) -> Result<Json<ExtractResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("The 'file' field has no filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;

        let text = extract_text(&bytes, &filename)?;
        info!(
            "Extracted {} chars from {} byte upload",
            text.chars().count(),
            bytes.len()
        );
        return Ok(Json(ExtractResponse {
            filename,
            char_count: text.chars().count(),
            text,
        }));
    }

    Err(AppError::Validation(
        "Multipart field 'file' is required".to_string(),
    ))
}

/// POST /api/v1/documents/redact
pub async fn handle_redact(Json(req): Json<TextRequest>) -> Json<RedactionResult> {
    let result = redact_pii(&req.text);
    info!("Redacted document: {:?}", result.counts);
    Json(result)
}

/// POST /api/v1/documents/sections
pub async fn handle_sections(Json(req): Json<TextRequest>) -> Json<SectionsResponse> {
    let sections = parse_cv_sections(&req.text);
    let summary = summarize_sections(&sections);
    Json(SectionsResponse { sections, summary })
}

/// POST /api/v1/documents/sections/rebuild
pub async fn handle_rebuild(
    Json(req): Json<RebuildRequest>,
) -> Result<Json<RebuildResponse>, AppError> {
    let sections = match (req.sections, req.text) {
        (Some(sections), _) => sections,
        (None, Some(text)) => parse_cv_sections(&text),
        (None, None) => {
            return Err(AppError::Validation(
                "Either 'sections' or 'text' is required".to_string(),
            ))
        }
    };
    Ok(Json(RebuildResponse {
        text: rebuild_cv(&sections, &req.config),
    }))
}

/// POST /api/v1/documents/transform
pub async fn handle_transform(
    State(state): State<AppState>,
    Json(req): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, AppError> {
    if req.archive && req.user_id.is_none() {
        return Err(AppError::Validation(
            "'user_id' is required when 'archive' is set".to_string(),
        ));
    }

    let jd_skills = match (&req.jd_text, req.jd_skills.is_empty()) {
        (Some(jd_text), true) => extract_skills(jd_text).into_keys().collect(),
        _ => req.jd_skills,
    };

    let transformed = transform_cv(&req.cv_text, &jd_skills);

    let archive_key = match req.user_id.filter(|_| req.archive) {
        Some(user_id) => Some(
            archive_transformed(
                &state.s3,
                &state.config.s3_bucket,
                user_id,
                &transformed.filtered_text,
            )
            .await?,
        ),
        None => None,
    };

    Ok(Json(TransformResponse {
        transformed,
        archive_key,
    }))
}
