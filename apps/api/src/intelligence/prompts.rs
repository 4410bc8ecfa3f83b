// Prompt templates for CV/JD extraction and document classification.
// Placeholders: `{document_text}`, `{no_invention}`. Filled with llm_client::prompts::fill.

/// CV extraction prompt.
pub const CV_EXTRACTION_PROMPT: &str = r#"Extract structured information from the following CV.

Return a JSON object with this EXACT schema (no extra fields):
{
  "candidate_name": "",
  "email": "",
  "phone": "",
  "location": "",
  "experience_years": 0,
  "current_role": "",
  "current_company": "",
  "education": {"degree": "", "field": "", "institution": "", "graduation_year": ""},
  "primary_skills": [],
  "secondary_skills": [],
  "technical_skills": [],
  "soft_skills": [],
  "projects": [{"name": "", "description": "", "technologies": []}],
  "work_experience": [{"company": "", "role": "", "duration": "", "description": ""}],
  "certifications": [],
  "achievements": [],
  "linkedin_url": "",
  "github_url": "",
  "portfolio_url": "",
  "red_flags": [],
  "extraction_confidence": 0.0
}

Rules:
- primary_skills: the candidate's core skills, used repeatedly or recently.
- secondary_skills: skills mentioned in passing.
- technical_skills: tools, languages, platforms and frameworks.
- soft_skills: interpersonal skills such as communication or leadership.
- red_flags: unexplained employment gaps, very short tenures, inconsistent dates.
- experience_years: total professional experience as a number.
- extraction_confidence: 0.0 to 1.0, how complete and unambiguous the CV was.
- {no_invention}

CV:
{document_text}"#;

/// JD extraction prompt.
pub const JD_EXTRACTION_PROMPT: &str = r#"Extract structured information from the following job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "job_title": "",
  "company": "",
  "location": "",
  "job_type": "",
  "seniority_level": "",
  "min_experience_years": 0,
  "max_experience_years": 0,
  "salary_range": {"min": 0, "max": 0, "currency": ""},
  "must_have_skills": [],
  "nice_to_have_skills": [],
  "technical_requirements": [],
  "soft_skills_required": [],
  "responsibilities": [],
  "benefits": [],
  "education_required": "",
  "certifications_required": [],
  "domains": [],
  "industries": [],
  "extraction_confidence": 0.0
}

Rules:
- must_have_skills: phrases like "required", "must have", minimum years of a skill.
- nice_to_have_skills: phrases like "preferred", "bonus", "a plus".
- job_type: full-time, part-time, contract or internship.
- seniority_level: intern, junior, mid, senior, lead or principal.
- extraction_confidence: 0.0 to 1.0, how complete and unambiguous the posting was.
- {no_invention}

Job description:
{document_text}"#;

/// Document classification prompt.
pub const CLASSIFY_PROMPT: &str = r#"Decide whether the following document is a CV (résumé) or a job description.

Return a JSON object with this EXACT schema:
{
  "document_type": "cv" | "jd" | "unknown",
  "confidence": 0.0,
  "reason": "one sentence",
  "quick_hint": "a short phrase from the document that decided it"
}

Use "unknown" when the document is neither, or when you cannot tell.

Document:
{document_text}"#;
