// Document handling: text extraction, PII redaction, CV section parsing and
// JD-focused CV transformation.

pub mod archive;
pub mod handlers;
pub mod redaction;
pub mod sections;
pub mod text;
pub mod transform;
