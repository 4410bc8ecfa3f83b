//! Match pipeline: guard, extract, score and optionally persist one JD/CV pair.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intelligence::backends::LlmExtractor;
use crate::intelligence::cache::text_digest;
use crate::intelligence::classifier::{classify_document, pair_guard, ClassifierMode, ClassifierSettings};
use crate::matching::engine::{guard_result, match_skills, MatchResult, PairClassification};
use crate::matching::store::{MatchStore, NewMatch};
use crate::skills::heuristic::extract_skills;
use crate::skills::models::{merge_skills, SkillMap};

#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    pub jd_text: String,
    pub cv_text: String,
    #[serde(default)]
    pub mode: ClassifierMode,
    /// Backend tag; required when `mode` is `llm`.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Caller-side document references. Default to a digest of the text.
    #[serde(default)]
    pub jd_ref: Option<String>,
    #[serde(default)]
    pub cv_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    #[serde(flatten)]
    pub result: MatchResult,
    pub llm_used: bool,
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
}

/// Skill maps for one side of the pair, and the LLM provider that enriched them.
struct SideSkills {
    skills: SkillMap,
    enriched_by: Option<String>,
}

fn enrich(heuristic: SkillMap, llm: SkillMap, confidence: f64, provider: String) -> SideSkills {
    if confidence > 0.0 && !llm.is_empty() {
        SideSkills {
            skills: merge_skills(&heuristic, &llm),
            enriched_by: Some(provider),
        }
    } else {
        SideSkills {
            skills: heuristic,
            enriched_by: None,
        }
    }
}

pub async fn run_match(
    request: MatchRequest,
    extractor: Option<&LlmExtractor>,
    store: &dyn MatchStore,
    settings: &ClassifierSettings,
) -> Result<MatchOutcome, AppError> {
    if request.jd_text.trim().is_empty() || request.cv_text.trim().is_empty() {
        return Err(AppError::Validation(
            "Both 'jd_text' and 'cv_text' must be non-empty".to_string(),
        ));
    }
    if request.mode == ClassifierMode::Llm && extractor.is_none() {
        return Err(AppError::Validation(
            "'provider' is required in llm mode".to_string(),
        ));
    }
    let owner = match (request.persist, request.user_id) {
        (true, None) => {
            return Err(AppError::Validation(
                "'user_id' is required when 'persist' is true".to_string(),
            ))
        }
        (true, Some(id)) => Some(id),
        (false, _) => None,
    };

    let (jd_class, cv_class) = tokio::join!(
        classify_document(&request.jd_text, request.mode, extractor, settings),
        classify_document(&request.cv_text, request.mode, extractor, settings),
    );
    let classification = PairClassification {
        jd: jd_class,
        cv: cv_class,
    };
    if let Some(warning) = pair_guard(
        &request.jd_text,
        &request.cv_text,
        &classification.jd,
        &classification.cv,
        settings,
    ) {
        info!("Pair guard tripped; skipping extraction");
        return Ok(MatchOutcome {
            result: guard_result(warning, classification),
            llm_used: false,
            provider: None,
            match_id: None,
        });
    }

    let jd_heuristic = extract_skills(&request.jd_text);
    let cv_heuristic = extract_skills(&request.cv_text);

    let (jd, cv) = match (request.mode, extractor) {
        (ClassifierMode::Llm, Some(extractor)) => {
            let (jd_record, cv_record) = tokio::join!(
                extractor.extract_jd(&request.jd_text),
                extractor.extract_cv(&request.cv_text),
            );
            (
                enrich(
                    jd_heuristic,
                    jd_record.to_skill_map(),
                    jd_record.extraction_confidence,
                    jd_record.provider,
                ),
                enrich(
                    cv_heuristic,
                    cv_record.to_skill_map(),
                    cv_record.extraction_confidence,
                    cv_record.provider,
                ),
            )
        }
        _ => (
            SideSkills {
                skills: jd_heuristic,
                enriched_by: None,
            },
            SideSkills {
                skills: cv_heuristic,
                enriched_by: None,
            },
        ),
    };

    let mut result = match_skills(&jd.skills, &cv.skills);
    result.details.classification = Some(classification);

    let provider = jd.enriched_by.or(cv.enriched_by);
    let llm_used = provider.is_some();
    debug!(
        "Scored pair: score={:.2}, jd_skills={}, cv_skills={}, llm_used={llm_used}",
        result.score, result.details.jd_total, result.details.cv_total
    );

    let match_id = match owner {
        Some(user_id) => {
            let new_match = NewMatch {
                user_id,
                jd_ref: request
                    .jd_ref
                    .unwrap_or_else(|| format!("sha256:{}", text_digest(&request.jd_text))),
                cv_ref: request
                    .cv_ref
                    .unwrap_or_else(|| format!("sha256:{}", text_digest(&request.cv_text))),
                result: result.clone(),
                llm_used,
                provider: provider.clone(),
            };
            Some(store.save_match(new_match).await?)
        }
        None => None,
    };

    Ok(MatchOutcome {
        result,
        llm_used,
        provider,
        match_id,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::intelligence::backends::{ExtractionBackend, DEFAULT_MAX_INPUT_CHARS};
    use crate::intelligence::records::{Classification, CvRecord, JdRecord};
    use crate::llm_client::LlmError;
    use crate::matching::store::memory::InMemoryMatchStore;

    const JD: &str = "We are hiring a backend engineer comfortable with Rust and SQL for our platform team.";
    const CV: &str = "Database developer with eight years of SQL tuning experience at a logistics firm.";

    /// Claims the CV also lists Rust.
    struct RustSpotter {
        fail: bool,
    }

    #[async_trait]
    impl ExtractionBackend for RustSpotter {
        fn provider(&self) -> String {
            "spotter".to_string()
        }

        async fn extract_cv(&self, _text: &str) -> Result<CvRecord, LlmError> {
            if self.fail {
                return Err(LlmError::EmptyContent);
            }
            Ok(CvRecord {
                primary_skills: vec!["Rust".to_string()],
                extraction_confidence: 0.9,
                provider: self.provider(),
                ..CvRecord::default()
            })
        }

        async fn extract_jd(&self, _text: &str) -> Result<JdRecord, LlmError> {
            if self.fail {
                return Err(LlmError::EmptyContent);
            }
            Ok(JdRecord::empty(&self.provider()))
        }

        async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
            Ok(Classification::unknown(0.4, "mixed signals"))
        }
    }

    fn extractor(fail: bool) -> LlmExtractor {
        LlmExtractor::new(Arc::new(RustSpotter { fail }), DEFAULT_MAX_INPUT_CHARS)
    }

    fn request(mode: ClassifierMode) -> MatchRequest {
        MatchRequest {
            jd_text: JD.to_string(),
            cv_text: CV.to_string(),
            mode,
            provider: None,
            persist: false,
            user_id: None,
            jd_ref: None,
            cv_ref: None,
        }
    }

    #[tokio::test]
    async fn test_heuristic_mode_scores_without_llm() {
        let store = InMemoryMatchStore::default();
        let out = run_match(
            request(ClassifierMode::Heuristic),
            None,
            &store,
            &ClassifierSettings::default(),
        )
        .await
        .unwrap();
        assert!(out.result.success);
        assert!(!out.llm_used);
        assert!(out.provider.is_none());
        assert!(out.result.missing.contains(&"Rust".to_string()));
        assert!(out.match_id.is_none());
        assert!(out.result.details.classification.is_some());
    }

    #[tokio::test]
    async fn test_llm_skills_merge_over_heuristic() {
        let store = InMemoryMatchStore::default();
        let llm = extractor(false);
        let heuristic = run_match(
            request(ClassifierMode::Heuristic),
            None,
            &store,
            &ClassifierSettings::default(),
        )
        .await
        .unwrap();
        let out = run_match(
            request(ClassifierMode::Llm),
            Some(&llm),
            &store,
            &ClassifierSettings::default(),
        )
        .await
        .unwrap();

        assert!(out.llm_used);
        assert_eq!(out.provider.as_deref(), Some("spotter"));
        assert!(out.result.matched.iter().any(|m| m.name == "Rust"));
        assert!(!out.result.missing.contains(&"Rust".to_string()));
        assert!(out.result.score > heuristic.result.score);
    }

    #[tokio::test]
    async fn test_failed_backend_falls_back_to_heuristic() {
        let store = InMemoryMatchStore::default();
        let llm = extractor(true);
        let out = run_match(
            request(ClassifierMode::Llm),
            Some(&llm),
            &store,
            &ClassifierSettings::default(),
        )
        .await
        .unwrap();
        assert!(out.result.success);
        assert!(!out.llm_used);
        assert!(out.provider.is_none());
        assert!(out.result.missing.contains(&"Rust".to_string()));
    }

    #[tokio::test]
    async fn test_identical_texts_trip_guard_and_skip_persist() {
        let store = InMemoryMatchStore::default();
        let user = Uuid::new_v4();
        let mut req = request(ClassifierMode::Heuristic);
        req.jd_text = CV.to_string();
        req.persist = true;
        req.user_id = Some(user);

        let out = run_match(req, None, &store, &ClassifierSettings::default())
            .await
            .unwrap();
        assert!(!out.result.success);
        assert_eq!(out.result.score, 0.0);
        assert!(out.result.details.warning.is_some());
        assert!(out.match_id.is_none());
        assert!(store.list_matches(user, 0, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persist_records_run_for_user() {
        let store = InMemoryMatchStore::default();
        let user = Uuid::new_v4();
        let mut req = request(ClassifierMode::Heuristic);
        req.persist = true;
        req.user_id = Some(user);
        req.cv_ref = Some("cv-42".to_string());

        let out = run_match(req, None, &store, &ClassifierSettings::default())
            .await
            .unwrap();
        let id = out.match_id.expect("persisted");
        let row = store.get_match(user, id).await.unwrap();
        assert_eq!(row.score, out.result.score);
        assert_eq!(row.cv_ref, "cv-42");
        assert!(row.jd_ref.starts_with("sha256:"));
        assert!(!row.llm_used);
    }

    #[tokio::test]
    async fn test_request_validation() {
        let store = InMemoryMatchStore::default();
        let settings = ClassifierSettings::default();

        let mut req = request(ClassifierMode::Heuristic);
        req.persist = true;
        assert!(matches!(
            run_match(req, None, &store, &settings).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            run_match(request(ClassifierMode::Llm), None, &store, &settings).await,
            Err(AppError::Validation(_))
        ));

        let mut req = request(ClassifierMode::Heuristic);
        req.cv_text = "   ".to_string();
        assert!(matches!(
            run_match(req, None, &store, &settings).await,
            Err(AppError::Validation(_))
        ));
    }
}
