//! Weighted JD/CV skill overlap scoring.
//!
//! Scoring rules:
//! - Every JD skill contributes its proficiency weight to the total (floored at 1.0).
//! - A matched skill earns `min(jd weight, cv weight) × cv confidence`, where an
//!   unreported confidence counts as 0.6.
//! - `score = min(100, round2(matched / total × 100))`.
//!
//! Pure and deterministic; no I/O.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::intelligence::classifier::{pair_guard, ClassifierSettings};
use crate::intelligence::records::{clamp_confidence, Classification};
use crate::skills::models::{Proficiency, SkillMap};

/// Lower bound for the JD weight total so an empty JD never divides by zero.
const MIN_TOTAL_WEIGHT: f64 = 1.0;
const MAX_LISTED_MISSING: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSkill {
    pub name: String,
    pub jd_proficiency: Proficiency,
    pub cv_proficiency: Proficiency,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairClassification {
    pub jd: Classification,
    pub cv: Classification,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    pub jd_total: usize,
    pub cv_total: usize,
    pub matched_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<PairClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub success: bool,
    pub score: f64,
    pub matched: Vec<MatchedSkill>,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
    pub details: MatchDetails,
    pub rationale: String,
}

/// Scores `cv` against `jd`. Skill names are compared case-insensitively.
pub fn match_skills(jd: &SkillMap, cv: &SkillMap) -> MatchResult {
    let cv_by_name: HashMap<String, &str> = cv
        .keys()
        .map(|k| (k.to_lowercase(), k.as_str()))
        .collect();
    let jd_names: HashSet<String> = jd.keys().map(|k| k.to_lowercase()).collect();

    let total_weight = jd
        .values()
        .map(|d| d.proficiency.weight())
        .sum::<f64>()
        .max(MIN_TOTAL_WEIGHT);

    let mut matched_weight = 0.0;
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for (name, jd_skill) in jd {
        let Some(cv_skill) = cv_by_name
            .get(&name.to_lowercase())
            .and_then(|k| cv.get(*k))
        else {
            missing.push(name.clone());
            continue;
        };
        let weight = jd_skill.proficiency.weight().min(cv_skill.proficiency.weight());
        matched_weight += weight * cv_skill.effective_confidence();
        matched.push(MatchedSkill {
            name: name.clone(),
            jd_proficiency: jd_skill.proficiency,
            cv_proficiency: cv_skill.proficiency,
            confidence: clamp_confidence(cv_skill.confidence),
        });
    }

    let mut extra: Vec<String> = cv
        .keys()
        .filter(|k| !jd_names.contains(&k.to_lowercase()))
        .cloned()
        .collect();

    matched.sort_by(|a, b| a.name.cmp(&b.name));
    missing.sort();
    extra.sort();

    let score = round2(matched_weight / total_weight * 100.0).min(100.0);
    let rationale = rationale(score, matched.len(), jd.len(), &missing);

    MatchResult {
        success: true,
        score,
        details: MatchDetails {
            jd_total: jd.len(),
            cv_total: cv.len(),
            matched_count: matched.len(),
            classification: None,
            warning: None,
        },
        matched,
        missing,
        extra,
        rationale,
    }
}

/// Runs the pair-guard, then scores. A tripped guard yields an unsuccessful zero result.
#[allow(clippy::too_many_arguments)]
pub fn guarded_match(
    jd_text: &str,
    cv_text: &str,
    jd_class: &Classification,
    cv_class: &Classification,
    jd_skills: &SkillMap,
    cv_skills: &SkillMap,
    settings: &ClassifierSettings,
) -> MatchResult {
    let classification = PairClassification {
        jd: jd_class.clone(),
        cv: cv_class.clone(),
    };

    if let Some(warning) = pair_guard(jd_text, cv_text, jd_class, cv_class, settings) {
        return guard_result(warning, classification);
    }

    let mut result = match_skills(jd_skills, cv_skills);
    result.details.classification = Some(classification);
    result
}

/// The unsuccessful result returned when the pair-guard trips.
pub fn guard_result(warning: String, classification: PairClassification) -> MatchResult {
    MatchResult {
        success: false,
        score: 0.0,
        matched: Vec::new(),
        missing: Vec::new(),
        extra: Vec::new(),
        rationale: warning.clone(),
        details: MatchDetails {
            classification: Some(classification),
            warning: Some(warning),
            ..MatchDetails::default()
        },
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn rationale(score: f64, matched: usize, jd_total: usize, missing: &[String]) -> String {
    if score >= 80.0 {
        format!("Strong match: the CV covers {matched} of {jd_total} required skills.")
    } else if score >= 50.0 {
        let listed: Vec<&str> = missing
            .iter()
            .take(MAX_LISTED_MISSING)
            .map(String::as_str)
            .collect();
        if listed.is_empty() {
            "Moderate match: required skills are present at lower proficiency.".to_string()
        } else {
            format!("Moderate match: consider gaps in {}.", listed.join(", "))
        }
    } else {
        format!("Weak match: only {matched} of {jd_total} required skills found in the CV.")
    }
}
