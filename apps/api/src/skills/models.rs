use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Score used in place of a descriptor confidence the extractor did not report.
pub const DEFAULT_SKILL_CONFIDENCE: f64 = 0.6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    /// Multiplier applied by the match engine.
    pub fn weight(self) -> f64 {
        match self {
            Proficiency::Beginner => 0.6,
            Proficiency::Intermediate => 1.0,
            Proficiency::Advanced => 1.2,
            Proficiency::Expert => 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    #[default]
    Technical,
    Soft,
    Language,
}

/// A canonical skill name plus what the extractor believes about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub name: String,
    #[serde(default)]
    pub proficiency: Proficiency,
    #[serde(default)]
    pub category: SkillCategory,
    /// Extractor trust in [0, 1]. 0.0 means the extractor did not report one.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

fn default_frequency() -> u32 {
    1
}

impl SkillDescriptor {
    /// Confidence used for scoring: the reported value, or the default when absent.
    pub fn effective_confidence(&self) -> f64 {
        if self.confidence.is_finite() && self.confidence > 0.0 {
            self.confidence.min(1.0)
        } else {
            DEFAULT_SKILL_CONFIDENCE
        }
    }
}

/// Skill name → descriptor. Keys are canonical names; uniqueness is case-insensitive,
/// enforced by [`insert_skill`].
pub type SkillMap = BTreeMap<String, SkillDescriptor>;

/// Inserts `descriptor` unless a case-insensitive duplicate already exists.
/// On collision the existing entry's frequency absorbs the new one.
pub fn insert_skill(map: &mut SkillMap, descriptor: SkillDescriptor) {
    if let Some(existing) = find_key(map, &descriptor.name).and_then(|k| map.get_mut(&k)) {
        existing.frequency = existing.frequency.saturating_add(descriptor.frequency);
        return;
    }
    map.insert(descriptor.name.clone(), descriptor);
}

/// Union of two skill maps. On a case-insensitive collision the `preferred` descriptor
/// replaces the `base` one and the two frequencies are summed.
pub fn merge_skills(base: &SkillMap, preferred: &SkillMap) -> SkillMap {
    let mut merged = base.clone();
    for descriptor in preferred.values() {
        let mut descriptor = descriptor.clone();
        if let Some(previous) = find_key(&merged, &descriptor.name).and_then(|k| merged.remove(&k)) {
            descriptor.frequency = descriptor.frequency.saturating_add(previous.frequency);
        }
        merged.insert(descriptor.name.clone(), descriptor);
    }
    merged
}

/// Returns the stored key matching `name` case-insensitively.
pub fn find_key(map: &SkillMap, name: &str) -> Option<String> {
    map.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// Title-cases a free-form skill string: "machine   learning" → "Machine Learning".
/// Words that are already all upper-case (acronyms) are kept as-is.
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| {
            if w.len() > 1 && w.chars().all(|c| !c.is_lowercase()) {
                return w.to_string();
            }
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().collect::<String>() + &c.as_str().to_lowercase(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(name: &str) -> SkillDescriptor {
        SkillDescriptor {
            name: name.to_string(),
            proficiency: Proficiency::Intermediate,
            category: SkillCategory::Technical,
            confidence: 1.0,
            frequency: 1,
        }
    }

    #[test]
    fn test_proficiency_weights() {
        assert_eq!(Proficiency::Beginner.weight(), 0.6);
        assert_eq!(Proficiency::Intermediate.weight(), 1.0);
        assert_eq!(Proficiency::Advanced.weight(), 1.2);
        assert_eq!(Proficiency::Expert.weight(), 1.3);
    }

    #[test]
    fn test_insert_skill_is_case_insensitive() {
        let mut map = SkillMap::new();
        insert_skill(&mut map, skill("Python"));
        insert_skill(&mut map, skill("python"));
        assert_eq!(map.len(), 1);
        assert_eq!(map["Python"].frequency, 2);
    }

    #[test]
    fn test_merge_prefers_second_map_and_sums_frequency() {
        let mut heuristic = SkillMap::new();
        insert_skill(&mut heuristic, skill("Python"));
        insert_skill(&mut heuristic, skill("Docker"));

        let mut llm = SkillMap::new();
        let mut python = skill("python");
        python.proficiency = Proficiency::Advanced;
        python.confidence = 0.0;
        insert_skill(&mut llm, python);

        let merged = merge_skills(&heuristic, &llm);
        assert_eq!(merged.len(), 2);
        assert!(!merged.contains_key("Python"));
        assert_eq!(merged["python"].proficiency, Proficiency::Advanced);
        assert_eq!(merged["python"].frequency, 2);
        assert_eq!(merged["Docker"].frequency, 1);
    }

    #[test]
    fn test_missing_confidence_defaults() {
        let mut s = skill("Rust");
        s.confidence = 0.0;
        assert_eq!(s.effective_confidence(), DEFAULT_SKILL_CONFIDENCE);
        s.confidence = f64::NAN;
        assert_eq!(s.effective_confidence(), DEFAULT_SKILL_CONFIDENCE);
        s.confidence = 0.9;
        assert_eq!(s.effective_confidence(), 0.9);
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let d: SkillDescriptor = serde_json::from_str(r#"{"name": "Docker"}"#).unwrap();
        assert_eq!(d.proficiency, Proficiency::Intermediate);
        assert_eq!(d.category, SkillCategory::Technical);
        assert_eq!(d.frequency, 1);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("machine   learning"), "Machine Learning");
        assert_eq!(title_case("AWS lambda"), "AWS Lambda");
        assert_eq!(title_case("pYTHON"), "Python");
    }
}
