//! CV Section Parser: splits CV text into tagged sections with typed items,
//! and rebuilds a document from a user's section/item selection.
//!
//! Pass 1 finds header lines, pass 2 slices content between headers and runs the
//! per-section item extractor. Sections own their items; rebuild only reads them.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Header lines are short. Longer lines that merely mention "experience" are body text.
const MAX_HEADER_WORDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionTag {
    Summary,
    Contact,
    Experience,
    Education,
    Skills,
    Certifications,
    Projects,
    Languages,
}

impl SectionTag {
    /// Canonical rebuild order.
    pub const ORDER: [SectionTag; 8] = [
        SectionTag::Summary,
        SectionTag::Contact,
        SectionTag::Experience,
        SectionTag::Education,
        SectionTag::Skills,
        SectionTag::Certifications,
        SectionTag::Projects,
        SectionTag::Languages,
    ];
}

static SECTION_PATTERNS: Lazy<Vec<(SectionTag, Regex)>> = Lazy::new(|| {
    [
        (
            SectionTag::Summary,
            r"\b(?:summary|profile|objective|about\s+me)\b",
        ),
        (
            SectionTag::Contact,
            r"\b(?:contact|personal\s+(?:details|information))\b",
        ),
        (
            SectionTag::Experience,
            r"\b(?:work\s+experience|professional\s+experience|experience|employment(?:\s+history)?|work\s+history)\b",
        ),
        (SectionTag::Education, r"\b(?:education|academic)"),
        (
            SectionTag::Skills,
            r"\b(?:skills|technical\s+skills|core\s+competencies|competencies)\b",
        ),
        (
            SectionTag::Certifications,
            r"\b(?:certifications?|certificates?|licen[sc]es)\b",
        ),
        (SectionTag::Projects, r"\bprojects?\b"),
        (SectionTag::Languages, r"\blanguages?\b"),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, Regex::new(pattern).unwrap()))
    .collect()
});

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static ROLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:engineer|developer|manager|analyst|designer|consultant|architect|lead|intern|director|scientist|specialist|administrator|officer|head|associate|coordinator)\b",
    )
    .unwrap()
});

static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s\-\*•·▪]+").unwrap());

/// One extracted item. Shape depends on the owning section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionItem {
    Experience {
        company: String,
        role: String,
        dates: String,
        description: String,
    },
    Education {
        degree: String,
        institution: String,
        year: String,
    },
    Skill {
        skill: String,
    },
    Project {
        name: String,
        description: String,
    },
    Line {
        text: String,
    },
}

impl SectionItem {
    /// Renders the item back to document lines.
    pub fn render(&self) -> Vec<String> {
        let lines: Vec<&str> = match self {
            SectionItem::Experience {
                company,
                role,
                dates,
                description,
            } => vec![company, role, dates, description]
                .into_iter()
                .map(String::as_str)
                .collect(),
            SectionItem::Education {
                degree,
                institution,
                year,
            } => vec![degree.as_str(), institution.as_str(), year.as_str()],
            SectionItem::Skill { skill } => vec![skill.as_str()],
            SectionItem::Project { name, description } => vec![name.as_str(), description.as_str()],
            SectionItem::Line { text } => vec![text.as_str()],
        };
        lines
            .into_iter()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Short label for a selection UI.
    pub fn label(&self) -> String {
        match self {
            SectionItem::Experience {
                company,
                role,
                dates,
                ..
            } => {
                let mut label = if role.is_empty() {
                    company.clone()
                } else {
                    format!("{role} @ {company}")
                };
                if !dates.is_empty() {
                    label.push_str(&format!(" ({dates})"));
                }
                label
            }
            SectionItem::Education {
                degree,
                institution,
                ..
            } => {
                if institution.is_empty() {
                    degree.clone()
                } else {
                    format!("{degree}, {institution}")
                }
            }
            SectionItem::Skill { skill } => skill.clone(),
            SectionItem::Project { name, .. } => name.clone(),
            SectionItem::Line { text } => truncate_label(text, 60),
        }
    }

    fn matches_any(&self, fragments: &[String]) -> bool {
        if fragments.is_empty() {
            return false;
        }
        let haystack = self.render().join("\n").to_lowercase();
        fragments
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .any(|f| haystack.contains(&f))
    }

    /// Whether rendering this item needs a blank line after it to re-parse as a separate item.
    fn is_block(&self) -> bool {
        matches!(
            self,
            SectionItem::Experience { .. } | SectionItem::Education { .. } | SectionItem::Project { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSection {
    pub name: SectionTag,
    /// Header line as written in the source.
    pub title: String,
    pub content: String,
    pub items: Vec<SectionItem>,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

/// Per-section rebuild selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionSelection {
    #[serde(default = "default_include")]
    pub include: bool,
    #[serde(default)]
    pub exclude_items: Vec<String>,
}

pub type RebuildConfig = HashMap<SectionTag, SectionSelection>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLabel {
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSummary {
    pub name: SectionTag,
    pub title: String,
    pub item_count: usize,
    pub items: Vec<ItemLabel>,
}

/// Returns the section tag a header-like line announces, if any.
pub fn detect_section_tag(line: &str) -> Option<SectionTag> {
    let trimmed = line.trim().trim_end_matches(':').trim();
    if trimmed.is_empty() || trimmed.split_whitespace().count() > MAX_HEADER_WORDS {
        return None;
    }
    let lower = trimmed.to_lowercase();
    SECTION_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lower))
        .map(|(tag, _)| *tag)
}

/// Parses `text` into sections in order of appearance.
/// Lines before the first recognised header are not part of any section.
pub fn parse_cv_sections(text: &str) -> Vec<CvSection> {
    let lines: Vec<&str> = text.lines().collect();

    // Pass 1: header starts, first occurrence per tag.
    let mut starts: Vec<(usize, SectionTag)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if let Some(tag) = detect_section_tag(line) {
            if !starts.iter().any(|(_, t)| *t == tag) {
                starts.push((idx, tag));
            }
        }
    }
    starts.sort_by_key(|(idx, _)| *idx);

    // Pass 2: slice to the next start, extract items.
    starts
        .iter()
        .enumerate()
        .map(|(i, &(start, tag))| {
            let end = starts.get(i + 1).map(|(s, _)| *s).unwrap_or(lines.len());
            let body = &lines[start + 1..end];
            CvSection {
                name: tag,
                title: lines[start].trim().to_string(),
                content: body.join("\n").trim().to_string(),
                items: extract_items(tag, body),
                include: true,
            }
        })
        .collect()
}

fn extract_items(tag: SectionTag, body: &[&str]) -> Vec<SectionItem> {
    match tag {
        SectionTag::Experience => blocks(body).into_iter().map(experience_item).collect(),
        SectionTag::Education => blocks(body).into_iter().map(education_item).collect(),
        SectionTag::Projects => blocks(body).into_iter().map(project_item).collect(),
        SectionTag::Skills => body
            .iter()
            .flat_map(|line| line.split([',', ';']))
            .map(clean_line)
            .filter(|s| !s.is_empty())
            .map(|skill| SectionItem::Skill { skill })
            .collect(),
        _ => body
            .iter()
            .map(|line| clean_line(line))
            .filter(|s| !s.is_empty())
            .map(|text| SectionItem::Line { text })
            .collect(),
    }
}

/// Groups consecutive non-blank lines into blocks.
fn blocks<'a>(body: &[&'a str]) -> Vec<Vec<&'a str>> {
    let mut out: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in body {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn experience_item(block: Vec<&str>) -> SectionItem {
    let mut lines = block.into_iter().map(clean_line);
    let company = lines.next().unwrap_or_default();
    let mut role = String::new();
    let mut dates = String::new();
    let mut description: Vec<String> = Vec::new();

    for line in lines {
        if role.is_empty() && ROLE_RE.is_match(&line) && !YEAR_RE.is_match(&line) {
            role = line;
        } else if dates.is_empty() && YEAR_RE.is_match(&line) {
            dates = line;
        } else {
            description.push(line);
        }
    }

    SectionItem::Experience {
        company,
        role,
        dates,
        description: description.join(" "),
    }
}

fn education_item(block: Vec<&str>) -> SectionItem {
    let mut lines = block.into_iter().map(clean_line);
    let degree = lines.next().unwrap_or_default();
    let mut institution = String::new();
    let mut year = String::new();

    for line in lines {
        if year.is_empty() && YEAR_RE.is_match(&line) {
            year = line;
        } else if institution.is_empty() {
            institution = line;
        } else {
            institution = format!("{institution} {line}");
        }
    }

    SectionItem::Education {
        degree,
        institution,
        year,
    }
}

fn project_item(block: Vec<&str>) -> SectionItem {
    let mut lines = block.into_iter().map(clean_line);
    let name = lines.next().unwrap_or_default();
    SectionItem::Project {
        name,
        description: lines.collect::<Vec<_>>().join(" "),
    }
}

fn clean_line(line: &str) -> String {
    BULLET_RE.replace(line, "").trim().to_string()
}

fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// Rebuilds a document from parsed sections.
///
/// Sections are emitted in canonical tag order. A section listed in `config` uses that
/// selection; otherwise its own `include` flag decides. Items whose rendered text contains
/// any `exclude_items` fragment (case-insensitive) are dropped.
pub fn rebuild_cv(sections: &[CvSection], config: &RebuildConfig) -> String {
    let mut blocks_out: Vec<String> = Vec::new();

    for tag in SectionTag::ORDER {
        for section in sections.iter().filter(|s| s.name == tag) {
            let (include, excludes) = match config.get(&tag) {
                Some(sel) => (sel.include, sel.exclude_items.as_slice()),
                None => (section.include, &[][..]),
            };
            if !include {
                continue;
            }

            let mut out = vec![section.title.clone()];
            let kept: Vec<&SectionItem> = section
                .items
                .iter()
                .filter(|item| !item.matches_any(excludes))
                .collect();
            let count = kept.len();
            for (i, item) in kept.into_iter().enumerate() {
                out.extend(item.render());
                if item.is_block() && i + 1 < count {
                    out.push(String::new());
                }
            }
            blocks_out.push(out.join("\n"));
        }
    }

    blocks_out.join("\n\n")
}

/// Per-section item labels for a selection UI.
pub fn summarize_sections(sections: &[CvSection]) -> Vec<SectionSummary> {
    sections
        .iter()
        .map(|s| SectionSummary {
            name: s.name,
            title: s.title.clone(),
            item_count: s.items.len(),
            items: s
                .items
                .iter()
                .enumerate()
                .map(|(index, item)| ItemLabel {
                    index,
                    label: item.label(),
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV: &str = "Jane Doe
jane@example.com

Professional Summary
Backend engineer with 8 years of experience building data platforms.

Work Experience
Acme Analytics
Senior Software Engineer
2020 - Present
Led migration of ingestion pipeline to Rust.

Globex Systems
Backend Developer
2017 - 2020
Built billing APIs in Python.

Initech
Junior Developer
2015 - 2017
Maintained internal tools.

Skills
Python, Rust, SQL; Docker
Kubernetes
";

    fn section(sections: &[CvSection], tag: SectionTag) -> &CvSection {
        sections.iter().find(|s| s.name == tag).unwrap()
    }

    #[test]
    fn test_detects_sections_in_order() {
        let sections = parse_cv_sections(CV);
        let tags: Vec<SectionTag> = sections.iter().map(|s| s.name).collect();
        assert_eq!(
            tags,
            vec![SectionTag::Summary, SectionTag::Experience, SectionTag::Skills]
        );
        assert_eq!(sections[1].title, "Work Experience");
    }

    #[test]
    fn test_long_lines_are_not_headers() {
        assert_eq!(
            detect_section_tag("Backend engineer with 8 years of experience building data platforms."),
            None
        );
        assert_eq!(detect_section_tag("EDUCATION:"), Some(SectionTag::Education));
        assert_eq!(detect_section_tag("Technical Skills"), Some(SectionTag::Skills));
    }

    #[test]
    fn test_experience_items() {
        let sections = parse_cv_sections(CV);
        let exp = section(&sections, SectionTag::Experience);
        assert_eq!(exp.items.len(), 3);
        assert_eq!(
            exp.items[0],
            SectionItem::Experience {
                company: "Acme Analytics".to_string(),
                role: "Senior Software Engineer".to_string(),
                dates: "2020 - Present".to_string(),
                description: "Led migration of ingestion pipeline to Rust.".to_string(),
            }
        );
    }

    #[test]
    fn test_skill_items_split_on_separators() {
        let sections = parse_cv_sections(CV);
        let skills = section(&sections, SectionTag::Skills);
        let names: Vec<String> = skills.items.iter().map(|i| i.label()).collect();
        assert_eq!(names, vec!["Python", "Rust", "SQL", "Docker", "Kubernetes"]);
    }

    #[test]
    fn test_education_items() {
        let text = "Education\nB.Sc. Computer Science\nState University\n2014\n\nMBA\n2019\nBusiness School";
        let sections = parse_cv_sections(text);
        let edu = section(&sections, SectionTag::Education);
        assert_eq!(edu.items.len(), 2);
        assert_eq!(
            edu.items[1],
            SectionItem::Education {
                degree: "MBA".to_string(),
                institution: "Business School".to_string(),
                year: "2019".to_string(),
            }
        );
    }

    #[test]
    fn test_project_items() {
        let text = "Projects\n- Ledger\nDouble-entry bookkeeping CLI.\nWritten in Rust.\n\n- Tracker\nHabit app.";
        let sections = parse_cv_sections(text);
        let projects = section(&sections, SectionTag::Projects);
        assert_eq!(
            projects.items[0],
            SectionItem::Project {
                name: "Ledger".to_string(),
                description: "Double-entry bookkeeping CLI. Written in Rust.".to_string(),
            }
        );
        assert_eq!(projects.items[1].label(), "Tracker");
    }

    #[test]
    fn test_rebuild_identity_keeps_headers_and_items() {
        let sections = parse_cv_sections(CV);
        let rebuilt = rebuild_cv(&sections, &RebuildConfig::new());
        for s in &sections {
            assert!(rebuilt.contains(&s.title), "missing header {}", s.title);
            for item in &s.items {
                for line in item.render() {
                    assert!(rebuilt.contains(&line), "missing item line {line}");
                }
            }
        }
        let reparsed = parse_cv_sections(&rebuilt);
        assert_eq!(reparsed.len(), sections.len());
        for (a, b) in reparsed.iter().zip(&sections) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.title, b.title);
            assert_eq!(a.items, b.items);
        }
    }

    #[test]
    fn test_rebuild_excludes_one_job() {
        let sections = parse_cv_sections(CV);
        let mut config = RebuildConfig::new();
        config.insert(
            SectionTag::Experience,
            SectionSelection {
                include: true,
                exclude_items: vec!["globex".to_string()],
            },
        );
        let rebuilt = rebuild_cv(&sections, &config);
        let reparsed = parse_cv_sections(&rebuilt);
        assert_eq!(section(&reparsed, SectionTag::Experience).items.len(), 2);
        assert!(!rebuilt.contains("Globex"));
        assert_eq!(
            section(&reparsed, SectionTag::Skills).items,
            section(&sections, SectionTag::Skills).items
        );
    }

    #[test]
    fn test_rebuild_drops_excluded_section_and_orders_canonically() {
        let text = "Skills\nRust\n\nSummary\nEngineer.";
        let sections = parse_cv_sections(text);
        let mut config = RebuildConfig::new();
        config.insert(
            SectionTag::Skills,
            SectionSelection {
                include: false,
                exclude_items: vec![],
            },
        );
        assert_eq!(rebuild_cv(&sections, &config), "Summary\nEngineer.");
        assert_eq!(
            rebuild_cv(&sections, &RebuildConfig::new()),
            "Summary\nEngineer.\n\nSkills\nRust"
        );
    }

    #[test]
    fn test_summary_labels() {
        let sections = parse_cv_sections(CV);
        let summary = summarize_sections(&sections);
        let exp = summary
            .iter()
            .find(|s| s.name == SectionTag::Experience)
            .unwrap();
        assert_eq!(exp.item_count, 3);
        assert_eq!(
            exp.items[0].label,
            "Senior Software Engineer @ Acme Analytics (2020 - Present)"
        );
    }

    #[test]
    fn test_no_headers_no_sections() {
        assert!(parse_cv_sections("just a paragraph of text").is_empty());
        assert_eq!(rebuild_cv(&[], &RebuildConfig::new()), "");
    }

    #[test]
    fn test_tags_serialize_as_snake_case_names() {
        let names: Vec<serde_json::Value> = SectionTag::ORDER
            .iter()
            .map(|tag| serde_json::to_value(tag).unwrap())
            .collect();
        assert_eq!(names[0], "summary");
        assert_eq!(names[5], "certifications");
        let config: RebuildConfig =
            serde_json::from_str(r#"{"experience": {"include": false}}"#).unwrap();
        assert!(!config[&SectionTag::Experience].include);
    }
}
