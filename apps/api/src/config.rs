use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::intelligence::backends::{BackendSettings, HostedSettings, DEFAULT_MAX_INPUT_CHARS};
use crate::intelligence::classifier::ClassifierSettings;
use crate::llm_client::HostedProvider;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmConfig,
    pub classifier: ClassifierSettings,
    pub extraction_cache_ttl_secs: u64,
}

/// Per-provider credentials and endpoints. Empty keys are allowed: that backend
/// then returns empty records.
#[derive(Clone)]
pub struct LlmConfig {
    pub openai_api_key: String,
    pub anthropic_api_key: String,
    pub groq_api_key: String,
    pub openai_api_url: Option<String>,
    pub anthropic_api_url: Option<String>,
    pub groq_api_url: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_model: Option<String>,
    pub groq_model: Option<String>,
    pub ollama_url: String,
    pub ollama_model: String,
    pub max_input_chars: usize,
    pub hosted_timeout_secs: u64,
    pub local_timeout_secs: u64,
}

// Keys stay out of Debug output.
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("openai_api_key", &!self.openai_api_key.is_empty())
            .field("anthropic_api_key", &!self.anthropic_api_key.is_empty())
            .field("groq_api_key", &!self.groq_api_key.is_empty())
            .field("ollama_url", &self.ollama_url)
            .field("ollama_model", &self.ollama_model)
            .field("max_input_chars", &self.max_input_chars)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = ClassifierSettings::default();

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm: LlmConfig {
                openai_api_key: optional_env("OPENAI_API_KEY").unwrap_or_default(),
                anthropic_api_key: optional_env("ANTHROPIC_API_KEY").unwrap_or_default(),
                groq_api_key: optional_env("GROQ_API_KEY").unwrap_or_default(),
                openai_api_url: optional_env("OPENAI_API_URL"),
                anthropic_api_url: optional_env("ANTHROPIC_API_URL"),
                groq_api_url: optional_env("GROQ_API_URL"),
                openai_model: optional_env("OPENAI_MODEL"),
                anthropic_model: optional_env("ANTHROPIC_MODEL"),
                groq_model: optional_env("GROQ_MODEL"),
                ollama_url: optional_env("OLLAMA_URL")
                    .unwrap_or_else(|| "http://localhost:11434".to_string()),
                ollama_model: optional_env("OLLAMA_MODEL").unwrap_or_else(|| "llama3".to_string()),
                max_input_chars: parse_env("LLM_MAX_INPUT_CHARS", DEFAULT_MAX_INPUT_CHARS)?,
                hosted_timeout_secs: parse_env("HOSTED_TIMEOUT_SECS", 60)?,
                local_timeout_secs: parse_env("LOCAL_TIMEOUT_SECS", 120)?,
            },
            classifier: ClassifierSettings {
                heuristic_confidence: parse_env(
                    "CLASSIFIER_HEURISTIC_CONFIDENCE",
                    defaults.heuristic_confidence,
                )?,
                unknown_confidence: parse_env(
                    "CLASSIFIER_UNKNOWN_CONFIDENCE",
                    defaults.unknown_confidence,
                )?,
                pair_guard_confidence: parse_env(
                    "PAIR_GUARD_CONFIDENCE",
                    defaults.pair_guard_confidence,
                )?,
            },
            extraction_cache_ttl_secs: parse_env("EXTRACTION_CACHE_TTL_SECS", 86_400)?,
        })
    }

    /// Backend settings, with provider defaults filled in for unset endpoints and models.
    pub fn backend_settings(&self) -> BackendSettings {
        let llm = self.llm.clone();
        BackendSettings {
            openai: HostedSettings::for_provider(
                HostedProvider::OpenAi,
                llm.openai_api_key,
                llm.openai_api_url,
                llm.openai_model,
            ),
            anthropic: HostedSettings::for_provider(
                HostedProvider::Anthropic,
                llm.anthropic_api_key,
                llm.anthropic_api_url,
                llm.anthropic_model,
            ),
            groq: HostedSettings::for_provider(
                HostedProvider::Groq,
                llm.groq_api_key,
                llm.groq_api_url,
                llm.groq_model,
            ),
            ollama_url: llm.ollama_url,
            ollama_model: llm.ollama_model,
            max_input_chars: llm.max_input_chars,
            hosted_timeout: Duration::from_secs(llm.hosted_timeout_secs),
            local_timeout: Duration::from_secs(llm.local_timeout_secs),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank both read as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}
