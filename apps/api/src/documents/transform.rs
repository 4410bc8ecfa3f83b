//! Redacts a CV, then narrows it to the parts relevant to a JD.

use serde::{Deserialize, Serialize};

use crate::documents::redaction::{redact_pii, RedactionCounts};
use crate::documents::sections::detect_section_tag;

const MAX_HEADER_WORDS: usize = 6;

/// Headers that are kept whatever the JD asks for.
const ALWAYS_INCLUDE: &[&str] = &[
    "skills",
    "technical skills",
    "core competencies",
    "education",
    "academic",
    "certifications",
    "certificates",
    "summary",
    "objective",
    "profile",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedCv {
    pub redacted_text: String,
    pub filtered_text: String,
    pub counts: RedactionCounts,
    pub jd_skills: Vec<String>,
}

struct Block<'a> {
    header: Option<&'a str>,
    lines: Vec<&'a str>,
}

/// Redacts `cv_text` and keeps only sections that mention a JD skill or are always relevant.
pub fn transform_cv(cv_text: &str, jd_skills: &[String]) -> TransformedCv {
    let redaction = redact_pii(cv_text);
    let filtered = filter_by_skills(&redaction.text, jd_skills);

    let filtered_text = if filtered.trim().is_empty() {
        redaction.text.clone()
    } else {
        filtered
    };

    TransformedCv {
        redacted_text: redaction.text,
        filtered_text,
        counts: redaction.counts,
        jd_skills: jd_skills.to_vec(),
    }
}

fn filter_by_skills(text: &str, jd_skills: &[String]) -> String {
    let needles: Vec<String> = jd_skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    split_blocks(text)
        .into_iter()
        .filter(|block| keep_block(block, &needles))
        .flat_map(|block| block.header.into_iter().chain(block.lines))
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = vec![Block {
        header: None,
        lines: Vec::new(),
    }];
    for line in text.lines() {
        if is_header(line) {
            blocks.push(Block {
                header: Some(line),
                lines: Vec::new(),
            });
        } else if let Some(current) = blocks.last_mut() {
            current.lines.push(line);
        }
    }
    blocks
}

fn keep_block(block: &Block<'_>, needles: &[String]) -> bool {
    if let Some(header) = block.header {
        let normalized = header.trim().trim_end_matches(':').trim().to_lowercase();
        if ALWAYS_INCLUDE.iter().any(|tag| normalized.contains(tag))
            || normalized.contains("experience")
            || normalized.contains("work")
        {
            return true;
        }
    }
    block.header.into_iter().chain(block.lines.iter().copied()).any(|line| {
        let line = line.to_lowercase();
        needles.iter().any(|n| line.contains(n.as_str()))
    })
}

fn is_header(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty()
        || trimmed.contains("[REDACTED_")
        || trimmed.split_whitespace().count() > MAX_HEADER_WORDS
    {
        return false;
    }
    // An all-caps line with list punctuation is content ("AWS, GCP, SQL").
    let upper = trimmed.chars().any(char::is_alphabetic)
        && !trimmed.chars().any(char::is_lowercase)
        && !trimmed.contains([',', ';']);
    trimmed.ends_with(':') || upper || detect_section_tag(trimmed).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "Jane Doe
jane@doe.dev

SUMMARY
Data engineer.

Experience:
Acme Widgets Inc.
Built Spark pipelines.

Hobbies:
Chess and climbing.

Side Projects:
Rust CLI for log search.
Kotlin mobile app.";

    fn skills(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_redacts_before_filtering() {
        let out = transform_cv(CV, &skills(&["Rust"]));
        assert_eq!(out.counts.emails, 1);
        assert_eq!(out.counts.companies, 1);
        assert!(!out.redacted_text.contains("jane@doe.dev"));
        assert!(!out.filtered_text.contains("Acme"));
    }

    #[test]
    fn test_keeps_relevant_and_always_included_sections() {
        let out = transform_cv(CV, &skills(&["rust"]));
        assert!(out.filtered_text.contains("SUMMARY"));
        assert!(out.filtered_text.contains("Experience:"));
        assert!(out.filtered_text.contains("Side Projects:"));
        assert!(!out.filtered_text.contains("Hobbies"));
        assert!(!out.filtered_text.contains("Jane Doe"));
        assert_eq!(out.jd_skills, vec!["rust".to_string()]);
    }

    #[test]
    fn test_unrelated_section_dropped_without_skill_hit() {
        let out = transform_cv(CV, &skills(&["Go"]));
        assert!(!out.filtered_text.contains("Side Projects:"));
    }

    #[test]
    fn test_falls_back_to_redacted_text_when_nothing_survives() {
        let cv = "Hobbies:\nChess\nTravel:\nJapan";
        let out = transform_cv(cv, &skills(&["Python"]));
        assert_eq!(out.filtered_text, out.redacted_text);
        assert_eq!(out.filtered_text, cv);
    }

    #[test]
    fn test_redaction_tokens_are_not_headers() {
        assert!(!is_header("[REDACTED_EMAIL]"));
        assert!(is_header("WORK HISTORY"));
        assert!(is_header("Education"));
        assert!(!is_header("Built Spark pipelines."));
        assert!(!is_header("AWS, GCP, SQL"));
        assert!(!is_header("SQL; NOSQL"));
    }

    #[test]
    fn test_uppercase_skill_list_stays_in_its_section() {
        let cv = "Summary\nData engineer.\n\nTECHNICAL SKILLS\nPython, Django\nAWS, GCP, SQL\n\nHobbies:\nChess";
        let out = transform_cv(cv, &skills(&["python"]));
        assert!(out.filtered_text.contains("TECHNICAL SKILLS\nPython, Django\nAWS, GCP, SQL"));
        assert!(!out.filtered_text.contains("Chess"));
    }
}
