//! PII Redactor: format-preserving masking of contact details in CV text.
//!
//! # Contract
//! - No pattern crosses a line break: line count, indentation and every `\n`
//!   survive untouched.
//! - Replacement tokens contain nothing any pattern can match, so redaction is
//!   idempotent: `redact_pii(redact_pii(t).text) == redact_pii(t)`.
//!
//! The phone pattern is permissive. Long numeric identifiers are an
//! accepted false-positive class. Digits inside year ranges ("2019 - 2021",
//! "(2018-2020)") never count towards a phone number.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

pub const EMAIL_TOKEN: &str = "[REDACTED_EMAIL]";
pub const PHONE_TOKEN: &str = "[REDACTED_PHONE]";
pub const URL_TOKEN: &str = "[REDACTED_URL]";
pub const COMPANY_TOKEN: &str = "[REDACTED_COMPANY]";

/// Minimum digits in a run before it is treated as a phone number.
const MIN_PHONE_DIGITS: usize = 7;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d \t().-]{5,}\d").unwrap());

static YEAR_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}[ \t]*[-.][ \t]*(?:19|20)\d{2}\b").unwrap());

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s]+").unwrap());

static COMPANY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b[A-Z][A-Za-z0-9&'-]*(?:[ \t]+[A-Z][A-Za-z0-9&'-]*){0,3}[ \t]+(?:(?:Inc|LLC|Ltd|Corporation|Corp|Company)\b\.?|Co\.)([ \t]*:)?",
    )
    .unwrap()
});

static LABELLED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^([ \t]*(?:phone|email|current company|linkedin|github|portfolio|website)[ \t]*:)([^\r\n]*)",
    )
    .unwrap()
});

/// Per-category replacement counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionCounts {
    pub emails: usize,
    pub phones: usize,
    pub urls: usize,
    pub companies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub text: String,
    pub counts: RedactionCounts,
}

/// Redacts emails, phones, URLs and company names, then masks labelled contact lines.
pub fn redact_pii(text: &str) -> RedactionResult {
    let mut counts = RedactionCounts::default();

    let text = EMAIL_RE.replace_all(text, |_: &Captures| {
        counts.emails += 1;
        EMAIL_TOKEN.to_string()
    });

    let text = PHONE_RE.replace_all(&text, |caps: &Captures| {
        let candidate = &caps[0];
        if is_phone(candidate) {
            counts.phones += 1;
            PHONE_TOKEN.to_string()
        } else {
            candidate.to_string()
        }
    });

    let text = URL_RE.replace_all(&text, |_: &Captures| {
        counts.urls += 1;
        URL_TOKEN.to_string()
    });

    let text = COMPANY_RE.replace_all(&text, |caps: &Captures| {
        let colon = caps.get(1).map_or("", |m| m.as_str());
        // "Current Company:" is a label, handled below.
        if !colon.is_empty() && is_company_label(&caps[0]) {
            return caps[0].to_string();
        }
        counts.companies += 1;
        format!("{COMPANY_TOKEN}{colon}")
    });

    let text = LABELLED_RE.replace_all(&text, |caps: &Captures| {
        let label = &caps[1];
        let rest = caps[2].trim();
        let token = label_token(label);
        if rest.is_empty() || rest == token {
            return caps[0].to_string();
        }
        match token {
            EMAIL_TOKEN => counts.emails += 1,
            PHONE_TOKEN => counts.phones += 1,
            COMPANY_TOKEN => counts.companies += 1,
            _ => counts.urls += 1,
        }
        format!("{label} {token}")
    });

    RedactionResult {
        text: text.into_owned(),
        counts,
    }
}

fn is_phone(candidate: &str) -> bool {
    let outside_years = YEAR_RANGE_RE.replace_all(candidate, "");
    outside_years.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS
}

fn is_company_label(matched: &str) -> bool {
    matched
        .trim_end_matches(|c: char| c == ':' || c.is_whitespace())
        .eq_ignore_ascii_case("current company")
}

fn label_token(label: &str) -> &'static str {
    let label = label.to_lowercase();
    if label.contains("phone") {
        PHONE_TOKEN
    } else if label.contains("email") {
        EMAIL_TOKEN
    } else if label.contains("company") {
        COMPANY_TOKEN
    } else {
        URL_TOKEN
    }
}
