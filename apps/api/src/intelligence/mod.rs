// Document intelligence: LLM-backed structured extraction with a regex fallback,
// CV/JD classification and the pair-guard, plus the Redis reply cache.

pub mod backends;
pub mod cache;
pub mod classifier;
pub mod fallback;
pub mod handlers;
pub mod prompts;
pub mod records;
