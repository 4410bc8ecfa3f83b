//! Structured extraction records returned by the LLM extractor.
//!
//! Backends reply with loosely-typed JSON: fields go missing, come back `null`, or
//! arrive as `"5+"` where a number was asked for. Every field here decodes leniently
//! to its zero value so a record is always fully populated.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::skills::models::{
    insert_skill, title_case, Proficiency, SkillCategory, SkillDescriptor, SkillMap,
};
use crate::skills::taxonomy::taxonomy;

// ────────────────────────────────────────────────────────────────────────────
// CV record
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    #[serde(deserialize_with = "text")]
    pub degree: String,
    #[serde(deserialize_with = "text")]
    pub field: String,
    #[serde(deserialize_with = "text")]
    pub institution: String,
    #[serde(deserialize_with = "text")]
    pub graduation_year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(deserialize_with = "text")]
    pub name: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
    #[serde(deserialize_with = "text_list")]
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    #[serde(deserialize_with = "text")]
    pub company: String,
    #[serde(deserialize_with = "text")]
    pub role: String,
    #[serde(deserialize_with = "text")]
    pub duration: String,
    #[serde(deserialize_with = "text")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvRecord {
    #[serde(deserialize_with = "text")]
    pub candidate_name: String,
    #[serde(deserialize_with = "text")]
    pub email: String,
    #[serde(deserialize_with = "text")]
    pub phone: String,
    #[serde(deserialize_with = "text")]
    pub location: String,
    #[serde(deserialize_with = "number")]
    pub experience_years: f64,
    #[serde(deserialize_with = "text")]
    pub current_role: String,
    #[serde(deserialize_with = "text")]
    pub current_company: String,
    #[serde(deserialize_with = "nullable")]
    pub education: Education,
    #[serde(deserialize_with = "text_list")]
    pub primary_skills: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub secondary_skills: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub technical_skills: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub soft_skills: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub projects: Vec<Project>,
    #[serde(deserialize_with = "nullable")]
    pub work_experience: Vec<WorkExperience>,
    #[serde(deserialize_with = "text_list")]
    pub certifications: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub achievements: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub linkedin_url: String,
    #[serde(deserialize_with = "text")]
    pub github_url: String,
    #[serde(deserialize_with = "text")]
    pub portfolio_url: String,
    #[serde(deserialize_with = "text_list")]
    pub red_flags: Vec<String>,
    #[serde(deserialize_with = "number")]
    pub extraction_confidence: f64,
    #[serde(deserialize_with = "text")]
    pub provider: String,
}

impl CvRecord {
    /// The zero-value record, tagged with the backend that produced it.
    pub fn empty(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    /// Skill map derived from the record's skill lists.
    pub fn to_skill_map(&self) -> SkillMap {
        let mut map = SkillMap::new();
        let groups: [(&[String], Proficiency, SkillCategory); 4] = [
            (&self.primary_skills, Proficiency::Advanced, SkillCategory::Technical),
            (&self.secondary_skills, Proficiency::Intermediate, SkillCategory::Technical),
            (&self.technical_skills, Proficiency::Intermediate, SkillCategory::Technical),
            (&self.soft_skills, Proficiency::Intermediate, SkillCategory::Soft),
        ];
        for (names, proficiency, category) in groups {
            for name in names {
                if let Some(d) = canonical_descriptor(name, proficiency, category) {
                    insert_skill(&mut map, d);
                }
            }
        }
        map
    }
}

// ────────────────────────────────────────────────────────────────────────────
// JD record
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalaryRange {
    #[serde(deserialize_with = "number")]
    pub min: f64,
    #[serde(deserialize_with = "number")]
    pub max: f64,
    #[serde(deserialize_with = "text")]
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JdRecord {
    #[serde(deserialize_with = "text")]
    pub job_title: String,
    #[serde(deserialize_with = "text")]
    pub company: String,
    #[serde(deserialize_with = "text")]
    pub location: String,
    #[serde(deserialize_with = "text")]
    pub job_type: String,
    #[serde(deserialize_with = "text")]
    pub seniority_level: String,
    #[serde(deserialize_with = "number")]
    pub min_experience_years: f64,
    #[serde(deserialize_with = "number")]
    pub max_experience_years: f64,
    #[serde(deserialize_with = "nullable")]
    pub salary_range: SalaryRange,
    #[serde(deserialize_with = "text_list")]
    pub must_have_skills: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub nice_to_have_skills: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub technical_requirements: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub soft_skills_required: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub responsibilities: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub education_required: String,
    #[serde(deserialize_with = "text_list")]
    pub certifications_required: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub domains: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub industries: Vec<String>,
    #[serde(deserialize_with = "number")]
    pub extraction_confidence: f64,
    #[serde(deserialize_with = "text")]
    pub provider: String,
}

impl JdRecord {
    pub fn empty(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    /// Skill map derived from the record's requirement lists.
    pub fn to_skill_map(&self) -> SkillMap {
        let mut map = SkillMap::new();
        let groups: [(&[String], Proficiency, SkillCategory); 4] = [
            (&self.must_have_skills, Proficiency::Advanced, SkillCategory::Technical),
            (&self.technical_requirements, Proficiency::Intermediate, SkillCategory::Technical),
            (&self.nice_to_have_skills, Proficiency::Beginner, SkillCategory::Technical),
            (&self.soft_skills_required, Proficiency::Intermediate, SkillCategory::Soft),
        ];
        for (names, proficiency, category) in groups {
            for name in names {
                if let Some(d) = canonical_descriptor(name, proficiency, category) {
                    insert_skill(&mut map, d);
                }
            }
        }
        map
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Cv,
    Jd,
    #[default]
    Unknown,
}

impl DocumentType {
    /// Maps free-form model output ("CV", "resume", "job description") onto a type.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "cv" | "resume" | "résumé" | "curriculum vitae" => DocumentType::Cv,
            "jd" | "job description" | "job_description" | "job posting" => DocumentType::Jd,
            _ => DocumentType::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for DocumentType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let label: Option<String> = Option::deserialize(d)?;
        Ok(label.map(|l| Self::from_label(&l)).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub document_type: DocumentType,
    #[serde(deserialize_with = "number")]
    pub confidence: f64,
    #[serde(deserialize_with = "text")]
    pub reason: String,
    #[serde(deserialize_with = "text")]
    pub quick_hint: String,
}

impl Classification {
    pub fn unknown(confidence: f64, reason: &str) -> Self {
        Self {
            document_type: DocumentType::Unknown,
            confidence,
            reason: reason.to_string(),
            quick_hint: String::new(),
        }
    }
}

/// Clamps a reported confidence into [0, 1]; NaN becomes 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn canonical_descriptor(
    raw: &str,
    proficiency: Proficiency,
    category: SkillCategory,
) -> Option<SkillDescriptor> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (name, category) = match taxonomy().lookup(raw) {
        Some(entry) => (entry.name.to_string(), entry.category),
        None => (title_case(raw), category),
    };
    Some(SkillDescriptor {
        name,
        proficiency,
        category,
        confidence: 0.0,
        frequency: 1,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient decoding
// ────────────────────────────────────────────────────────────────────────────

fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(d)?))
}

fn number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(value_to_number(&Value::deserialize(d)?))
}

fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        Value::Null => Vec::new(),
        other => vec![value_to_text(other)],
    };
    Ok(items.into_iter().filter(|s| !s.trim().is_empty()).collect())
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default(),
        Value::Array(_) => String::new(),
    }
}

fn value_to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}
