//! The static, process-wide skill catalog every extractor reads.
//!
//! Entries are declared once in `CATALOG`; their match patterns are compiled lazily on
//! first use and shared read-only across requests. Append new entries at design time,
//! never at runtime.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::skills::models::{Proficiency, SkillCategory};

/// A single catalog entry.
#[derive(Debug)]
pub struct TaxonomyEntry {
    /// Canonical display name.
    pub name: &'static str,
    /// Extra spellings matched as the same skill.
    pub aliases: &'static [&'static str],
    pub proficiency: Proficiency,
    pub category: SkillCategory,
    /// Base extractor trust for a hit on this entry.
    pub confidence: f64,
}

const fn tech(name: &'static str, aliases: &'static [&'static str]) -> TaxonomyEntry {
    entry(name, aliases, Proficiency::Intermediate, SkillCategory::Technical)
}

const fn soft(name: &'static str, aliases: &'static [&'static str]) -> TaxonomyEntry {
    entry(name, aliases, Proficiency::Intermediate, SkillCategory::Soft)
}

const fn lang(name: &'static str) -> TaxonomyEntry {
    entry(name, &[], Proficiency::Intermediate, SkillCategory::Language)
}

const fn entry(
    name: &'static str,
    aliases: &'static [&'static str],
    proficiency: Proficiency,
    category: SkillCategory,
) -> TaxonomyEntry {
    TaxonomyEntry {
        name,
        aliases,
        proficiency,
        category,
        confidence: 1.0,
    }
}

static CATALOG: &[TaxonomyEntry] = &[
    // Languages
    tech("Python", &[]),
    tech("Java", &[]),
    tech("JavaScript", &["ecmascript"]),
    tech("TypeScript", &[]),
    tech("C++", &["cpp"]),
    tech("C#", &["csharp"]),
    tech("Rust", &[]),
    tech("Golang", &[]),
    tech("Ruby", &[]),
    tech("PHP", &[]),
    tech("Swift", &[]),
    tech("Kotlin", &[]),
    tech("Scala", &[]),
    tech("SQL", &[]),
    tech("HTML", &["html5"]),
    tech("CSS", &["css3"]),
    // Frameworks
    tech("React", &["react.js", "reactjs"]),
    tech("Angular", &["angularjs"]),
    tech("Vue", &["vue.js", "vuejs"]),
    tech("Node.js", &["nodejs"]),
    tech("Express.js", &["expressjs"]),
    tech("Django", &[]),
    tech("Flask", &[]),
    tech("FastAPI", &[]),
    tech("Spring Boot", &["springboot"]),
    tech(".NET", &["dotnet", "asp.net"]),
    tech("Ruby on Rails", &["ror"]),
    tech("TensorFlow", &[]),
    tech("PyTorch", &[]),
    tech("Scikit-learn", &["sklearn", "scikit learn"]),
    tech("Pandas", &[]),
    tech("NumPy", &[]),
    // Data stores
    tech("PostgreSQL", &["postgres"]),
    tech("MySQL", &[]),
    tech("MongoDB", &["mongo"]),
    tech("Redis", &[]),
    tech("Elasticsearch", &["elastic search"]),
    tech("NoSQL", &[]),
    // Cloud / infra
    tech("Docker", &[]),
    tech("Kubernetes", &["k8s"]),
    tech("AWS", &["amazon web services"]),
    tech("Azure", &["microsoft azure"]),
    tech("GCP", &["google cloud", "google cloud platform"]),
    tech("Terraform", &[]),
    tech("Ansible", &[]),
    tech("Jenkins", &[]),
    tech("CI/CD", &["ci cd", "continuous integration"]),
    tech("Linux", &[]),
    tech("Kafka", &["apache kafka"]),
    tech("Spark", &["apache spark", "pyspark"]),
    tech("Hadoop", &[]),
    tech("Airflow", &["apache airflow"]),
    tech("GraphQL", &[]),
    tech("REST APIs", &["rest api", "restful", "restful apis"]),
    tech("Tableau", &[]),
    tech("Power BI", &["powerbi"]),
    tech("Figma", &[]),
    tech("Selenium", &[]),
    // Disciplines
    tech("Machine Learning", &["ml"]),
    tech("Data Analysis", &["data analytics"]),
    tech("Data Science", &[]),
    tech("Statistics", &[]),
    entry(
        "Deep Learning",
        &[],
        Proficiency::Advanced,
        SkillCategory::Technical,
    ),
    entry(
        "NLP",
        &["natural language processing"],
        Proficiency::Advanced,
        SkillCategory::Technical,
    ),
    entry(
        "Computer Vision",
        &[],
        Proficiency::Advanced,
        SkillCategory::Technical,
    ),
    entry(
        "Microservices",
        &["microservice architecture"],
        Proficiency::Advanced,
        SkillCategory::Technical,
    ),
    entry("Git", &["github", "gitlab"], Proficiency::Beginner, SkillCategory::Technical),
    entry("Jira", &[], Proficiency::Beginner, SkillCategory::Technical),
    tech("Agile", &[]),
    tech("Scrum", &[]),
    // Soft skills
    soft("Communication", &["communication skills"]),
    soft("Leadership", &["team leadership"]),
    soft("Teamwork", &["team player"]),
    soft("Collaboration", &["cross-functional collaboration"]),
    soft("Problem Solving", &["problem-solving"]),
    soft("Critical Thinking", &[]),
    soft("Time Management", &[]),
    soft("Adaptability", &[]),
    soft("Creativity", &[]),
    soft("Mentoring", &["mentorship", "coaching"]),
    soft("Stakeholder Management", &[]),
    soft("Negotiation", &[]),
    soft("Public Speaking", &["presentation skills"]),
    soft("Attention to Detail", &["detail-oriented", "detail oriented"]),
    // Spoken languages
    lang("English"),
    lang("Spanish"),
    lang("French"),
    lang("German"),
    lang("Mandarin"),
    lang("Hindi"),
    lang("Japanese"),
    lang("Portuguese"),
    lang("Arabic"),
    lang("Italian"),
    lang("Korean"),
    lang("Russian"),
];

/// A catalog entry with its compiled, case-insensitive pattern.
pub struct CompiledEntry {
    pub entry: &'static TaxonomyEntry,
    pattern: Regex,
}

impl CompiledEntry {
    /// Byte ranges of every word-bounded occurrence in `text`.
    pub fn find_all(&self, text: &str) -> Vec<(usize, usize)> {
        self.pattern
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .filter(|&(start, end)| is_bounded(text, start, end))
            .collect()
    }
}

/// The read-only skill catalog.
pub struct SkillTaxonomy {
    entries: Vec<CompiledEntry>,
}

static TAXONOMY: Lazy<SkillTaxonomy> = Lazy::new(|| SkillTaxonomy {
    entries: CATALOG.iter().map(compile_entry).collect(),
});

/// Returns the process-wide taxonomy handle.
pub fn taxonomy() -> &'static SkillTaxonomy {
    &TAXONOMY
}

impl SkillTaxonomy {
    pub fn entries(&self) -> &[CompiledEntry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Looks up an entry by canonical name or alias, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&'static TaxonomyEntry> {
        let needle = name.trim();
        self.entries
            .iter()
            .map(|c| c.entry)
            .find(|e| {
                e.name.eq_ignore_ascii_case(needle)
                    || e.aliases.iter().any(|a| a.eq_ignore_ascii_case(needle))
            })
    }
}

fn compile_entry(entry: &'static TaxonomyEntry) -> CompiledEntry {
    let mut terms: Vec<&str> = std::iter::once(entry.name)
        .chain(entry.aliases.iter().copied())
        .collect();
    // Longest spelling first so "apache kafka" wins over "kafka" at the same offset.
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = Regex::new(&format!("(?i)(?:{alternation})"))
        .unwrap_or_else(|e| panic!("invalid taxonomy pattern for {}: {e}", entry.name));
    CompiledEntry { entry, pattern }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '+' || c == '#'
}

/// Word-boundary check that treats `+`, `#` and dotted suffixes as part of a word,
/// so "C" never matches inside "C++" and "js" never matches inside "Node.js".
fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let matched = &text[start..end];
    let before = text[..start].chars().next_back();
    let mut after = text[end..].chars();
    let next = after.next();

    if let Some(b) = before {
        if is_word_char(b) || (b == '.' && !matched.starts_with('.')) {
            return false;
        }
    }
    match next {
        Some(n) if is_word_char(n) => false,
        Some('.') => !after.next().map(char::is_alphanumeric).unwrap_or(false),
        _ => true,
    }
}
