use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::intelligence::classifier::{classify_document, ClassifierMode};
use crate::intelligence::records::{Classification, CvRecord, JdRecord};
use crate::skills::models::SkillMap;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    /// `openai`, `anthropic`, `groq`, `ollama` or `ollama:<model>`.
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct CvExtractionResponse {
    pub record: CvRecord,
    pub skills: SkillMap,
}

#[derive(Debug, Serialize)]
pub struct JdExtractionResponse {
    pub record: JdRecord,
    pub skills: SkillMap,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    #[serde(default)]
    pub mode: ClassifierMode,
    #[serde(default)]
    pub provider: Option<String>,
}

/// POST /api/v1/intelligence/cv
pub async fn handle_extract_cv(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<CvExtractionResponse>, AppError> {
    let extractor = state.backends.resolve(&req.provider)?;
    let record = extractor.extract_cv(&req.text).await;
    info!(
        "CV extraction: provider={}, confidence={:.2}",
        record.provider, record.extraction_confidence
    );
    Ok(Json(CvExtractionResponse {
        skills: record.to_skill_map(),
        record,
    }))
}

/// POST /api/v1/intelligence/jd
pub async fn handle_extract_jd(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<JdExtractionResponse>, AppError> {
    let extractor = state.backends.resolve(&req.provider)?;
    let record = extractor.extract_jd(&req.text).await;
    info!(
        "JD extraction: provider={}, confidence={:.2}",
        record.provider, record.extraction_confidence
    );
    Ok(Json(JdExtractionResponse {
        skills: record.to_skill_map(),
        record,
    }))
}

/// POST /api/v1/intelligence/classify
pub async fn handle_classify(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<Classification>, AppError> {
    let extractor = match (req.mode, req.provider.as_deref()) {
        (ClassifierMode::Llm, Some(tag)) => Some(state.backends.resolve(tag)?),
        (ClassifierMode::Llm, None) => {
            return Err(AppError::Validation(
                "'provider' is required for llm classification".to_string(),
            ))
        }
        (ClassifierMode::Heuristic, _) => None,
    };
    let class = classify_document(&req.text, req.mode, extractor.as_ref(), &state.classifier).await;
    Ok(Json(class))
}
