//! CV vs JD vs unknown classification, plus the pair-guard used before scoring.

use serde::{Deserialize, Serialize};

use crate::intelligence::backends::LlmExtractor;
use crate::intelligence::records::{Classification, DocumentType};

const CV_KEYWORDS: &[&str] = &[
    "objective",
    "curriculum vitae",
    "resume",
    "work experience",
    "education",
    "projects",
    "achievements",
];

const JD_KEYWORDS: &[&str] = &[
    "responsibilities",
    "we are looking for",
    "job description",
    "required skills",
    "must have",
];

/// Classifier and pair-guard thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Confidence reported when the keyword heuristic decides.
    pub heuristic_confidence: f64,
    /// Confidence reported when the keyword heuristic cannot decide.
    pub unknown_confidence: f64,
    /// Minimum confidence on both sides before two same-type documents trip the guard.
    pub pair_guard_confidence: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            heuristic_confidence: 0.6,
            unknown_confidence: 0.3,
            pair_guard_confidence: 0.75,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    #[default]
    Heuristic,
    Llm,
}

/// Classifies `text` with the requested mode.
/// LLM mode without an extractor, or with a failing backend, yields unknown@0.0.
pub async fn classify_document(
    text: &str,
    mode: ClassifierMode,
    extractor: Option<&LlmExtractor>,
    settings: &ClassifierSettings,
) -> Classification {
    match (mode, extractor) {
        (ClassifierMode::Heuristic, _) => classify_heuristic(text, settings),
        (ClassifierMode::Llm, Some(extractor)) => extractor.classify(text).await,
        (ClassifierMode::Llm, None) => Classification::unknown(0.0, "No LLM backend selected"),
    }
}

/// Keyword classifier. When both keyword sets hit, more distinct hits wins; a tie is unknown.
pub fn classify_heuristic(text: &str, settings: &ClassifierSettings) -> Classification {
    let lower = text.to_lowercase();
    let cv_hits: Vec<&str> = hits(&lower, CV_KEYWORDS);
    let jd_hits: Vec<&str> = hits(&lower, JD_KEYWORDS);

    let (document_type, matched) = match cv_hits.len().cmp(&jd_hits.len()) {
        std::cmp::Ordering::Greater => (DocumentType::Cv, &cv_hits),
        std::cmp::Ordering::Less => (DocumentType::Jd, &jd_hits),
        std::cmp::Ordering::Equal => {
            let reason = if cv_hits.is_empty() {
                "No CV or job description keywords found".to_string()
            } else {
                format!(
                    "Equal CV ({}) and job description ({}) keyword hits",
                    cv_hits.len(),
                    jd_hits.len()
                )
            };
            return Classification::unknown(settings.unknown_confidence, &reason);
        }
    };

    let label = match document_type {
        DocumentType::Cv => "CV",
        _ => "job description",
    };
    Classification {
        document_type,
        confidence: settings.heuristic_confidence,
        reason: format!("Matched {label} keywords: {}", matched.join(", ")),
        quick_hint: matched.first().map(|s| s.to_string()).unwrap_or_default(),
    }
}

fn hits(lower: &str, keywords: &[&'static str]) -> Vec<&'static str> {
    keywords
        .iter()
        .copied()
        .filter(|k| lower.contains(k))
        .collect()
}

/// Returns a warning when a JD/CV pair should not be scored: identical texts, or both
/// sides confidently classified as the same document type.
pub fn pair_guard(
    jd_text: &str,
    cv_text: &str,
    jd_class: &Classification,
    cv_class: &Classification,
    settings: &ClassifierSettings,
) -> Option<String> {
    if jd_text.trim() == cv_text.trim() {
        return Some("The job description and CV are the same document".to_string());
    }

    let same_type = jd_class.document_type == cv_class.document_type
        && jd_class.document_type != DocumentType::Unknown;
    let confident = jd_class.confidence >= settings.pair_guard_confidence
        && cv_class.confidence >= settings.pair_guard_confidence;

    if same_type && confident {
        let kind = match jd_class.document_type {
            DocumentType::Cv => "CVs",
            _ => "job descriptions",
        };
        return Some(format!(
            "Both documents look like {kind}; submit one job description and one CV"
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(document_type: DocumentType, confidence: f64) -> Classification {
        Classification {
            document_type,
            confidence,
            reason: String::new(),
            quick_hint: String::new(),
        }
    }

    #[test]
    fn test_heuristic_cv() {
        let c = classify_heuristic(
            "Career Objective\nWork Experience\nAcme\nEducation\nBSc",
            &ClassifierSettings::default(),
        );
        assert_eq!(c.document_type, DocumentType::Cv);
        assert_eq!(c.confidence, 0.6);
        assert_eq!(c.quick_hint, "objective");
    }

    #[test]
    fn test_heuristic_jd() {
        let c = classify_heuristic(
            "We are looking for a backend engineer.\nResponsibilities:\n- build APIs",
            &ClassifierSettings::default(),
        );
        assert_eq!(c.document_type, DocumentType::Jd);
    }

    #[test]
    fn test_heuristic_unknown_and_tie() {
        let settings = ClassifierSettings::default();
        let c = classify_heuristic("Grocery list: eggs, milk", &settings);
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.confidence, 0.3);

        let tie = classify_heuristic("Education required. Must have a degree.", &settings);
        assert_eq!(tie.document_type, DocumentType::Unknown);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let settings = ClassifierSettings {
            heuristic_confidence: 0.9,
            unknown_confidence: 0.1,
            pair_guard_confidence: 0.5,
        };
        assert_eq!(classify_heuristic("resume", &settings).confidence, 0.9);
        assert_eq!(classify_heuristic("", &settings).confidence, 0.1);
    }

    #[tokio::test]
    async fn test_llm_mode_without_backend_is_unknown() {
        let c = classify_document(
            "Responsibilities",
            ClassifierMode::Llm,
            None,
            &ClassifierSettings::default(),
        )
        .await;
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_pair_guard_identical_text() {
        let unknown = class(DocumentType::Unknown, 0.3);
        let warning = pair_guard(
            "same text\n",
            "  same text",
            &unknown,
            &unknown,
            &ClassifierSettings::default(),
        );
        assert!(warning.is_some());
    }

    #[test]
    fn test_pair_guard_same_type_needs_confidence() {
        let settings = ClassifierSettings::default();
        let strong = class(DocumentType::Cv, 0.9);
        let weak = class(DocumentType::Cv, 0.6);
        assert!(pair_guard("a", "b", &strong, &strong, &settings).is_some());
        assert!(pair_guard("a", "b", &strong, &weak, &settings).is_none());
        assert!(pair_guard("a", "b", &class(DocumentType::Jd, 0.9), &strong, &settings).is_none());
    }
}
