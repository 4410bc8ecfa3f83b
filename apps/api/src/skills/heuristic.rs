//! Keyword skill extraction against the taxonomy.
//!
//! Pure, stateless, deterministic. Linear in (text length × catalog size).

use crate::skills::models::{insert_skill, Proficiency, SkillDescriptor, SkillMap};
use crate::skills::taxonomy::taxonomy;

/// Proficiency cues, checked against the text leading up to a skill's first hit.
/// Order matters: the first cue found wins.
const PROFICIENCY_CUES: &[(&str, Proficiency)] = &[
    ("expert", Proficiency::Expert),
    ("mastery", Proficiency::Expert),
    ("advanced", Proficiency::Advanced),
    ("extensive", Proficiency::Advanced),
    ("strong", Proficiency::Advanced),
    ("proficient", Proficiency::Intermediate),
    ("intermediate", Proficiency::Intermediate),
    ("working knowledge", Proficiency::Intermediate),
    ("basic", Proficiency::Beginner),
    ("beginner", Proficiency::Beginner),
    ("familiar", Proficiency::Beginner),
    ("exposure to", Proficiency::Beginner),
];

/// Extracts every catalog skill mentioned in `text`.
///
/// The first occurrence of a skill decides its proficiency (catalog default unless
/// a cue precedes it in the same clause); `frequency` counts every occurrence.
pub fn extract_skills(text: &str) -> SkillMap {
    let mut skills = SkillMap::new();

    for compiled in taxonomy().entries() {
        let hits = compiled.find_all(text);
        let Some(&(first_start, _)) = hits.first() else {
            continue;
        };
        let entry = compiled.entry;
        let proficiency = proficiency_cue(clause_before(text, first_start)).unwrap_or(entry.proficiency);

        insert_skill(
            &mut skills,
            SkillDescriptor {
                name: entry.name.to_string(),
                proficiency,
                category: entry.category,
                confidence: entry.confidence,
                frequency: hits.len() as u32,
            },
        );
    }

    skills
}

/// The text between the last clause separator (or line start) and `pos`.
fn clause_before(text: &str, pos: usize) -> &str {
    let head = &text[..pos];
    let start = head
        .rfind(|c: char| matches!(c, '\n' | ',' | ';' | '|' | '•' | '/'))
        .map(|i| i + head[i..].chars().next().map(char::len_utf8).unwrap_or(1))
        .unwrap_or(0);
    &head[start..]
}

fn proficiency_cue(clause: &str) -> Option<Proficiency> {
    let clause = clause.to_lowercase();
    PROFICIENCY_CUES
        .iter()
        .find(|(cue, _)| clause.contains(cue))
        .map(|&(_, p)| p)
}
