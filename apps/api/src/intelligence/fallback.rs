//! Regex-only extractor used when a local model replies with something that is not JSON.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::intelligence::records::{CvRecord, JdRecord};
use crate::skills::heuristic::extract_skills;
use crate::skills::models::{SkillCategory, SkillMap};

pub const FALLBACK_PROVIDER: &str = "local-fallback";

/// Confidence reported for regex-only records.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\(?\d[\d \t().-]{5,}\d").unwrap());

static LINKEDIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:https?://)?(?:www\.)?linkedin\.com/[^\s,;)]+").unwrap());

static GITHUB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/[^\s,;)]+").unwrap());

static YEARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2})\+?\s*(?:-\s*\d{1,2}\s*)?years?").unwrap());

/// Best-effort CV record from regexes and the skill taxonomy.
pub fn fallback_cv(text: &str) -> CvRecord {
    let skills = extract_skills(text);
    CvRecord {
        candidate_name: guess_name(text),
        email: first_match(&EMAIL_RE, text),
        phone: PHONE_RE
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .find(|p| p.chars().filter(char::is_ascii_digit).count() >= 7)
            .unwrap_or_default(),
        experience_years: max_years(text),
        technical_skills: names_in(&skills, SkillCategory::Technical),
        soft_skills: names_in(&skills, SkillCategory::Soft),
        linkedin_url: first_match(&LINKEDIN_RE, text),
        github_url: first_match(&GITHUB_RE, text),
        extraction_confidence: FALLBACK_CONFIDENCE,
        provider: FALLBACK_PROVIDER.to_string(),
        ..CvRecord::default()
    }
}

/// Best-effort JD record from regexes and the skill taxonomy.
pub fn fallback_jd(text: &str) -> JdRecord {
    let skills = extract_skills(text);
    JdRecord {
        job_title: text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| l.chars().take(120).collect())
            .unwrap_or_default(),
        min_experience_years: min_years(text),
        technical_requirements: names_in(&skills, SkillCategory::Technical),
        soft_skills_required: names_in(&skills, SkillCategory::Soft),
        extraction_confidence: FALLBACK_CONFIDENCE,
        provider: FALLBACK_PROVIDER.to_string(),
        ..JdRecord::default()
    }
}

fn first_match(re: &Regex, text: &str) -> String {
    re.find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn names_in(skills: &SkillMap, category: SkillCategory) -> Vec<String> {
    skills
        .values()
        .filter(|d| d.category == category)
        .map(|d| d.name.clone())
        .collect()
}

fn year_mentions(text: &str) -> impl Iterator<Item = f64> + '_ {
    YEARS_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<f64>().ok())
}

fn max_years(text: &str) -> f64 {
    year_mentions(text).fold(0.0, f64::max)
}

fn min_years(text: &str) -> f64 {
    year_mentions(text).reduce(f64::min).unwrap_or(0.0)
}

/// A CV usually opens with the candidate's name: a short line with no digits or symbols.
fn guess_name(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| {
            let words = l.split_whitespace().count();
            (2..=4).contains(&words)
                && l.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'' || c == '.')
        })
        .map(str::to_string)
        .unwrap_or_default()
}
