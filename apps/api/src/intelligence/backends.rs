//! LLM Extractor: structured CV/JD extraction and classification over pluggable backends.
//!
//! Backends return `Result`; [`LlmExtractor`] wraps one backend with the shared contract:
//! short inputs are skipped, long inputs are truncated, failures collapse to the
//! zero-value record and confidences are clamped. Callers never see an LLM error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::intelligence::cache::ExtractionCache;
use crate::intelligence::fallback::{fallback_cv, fallback_jd, FALLBACK_PROVIDER};
use crate::intelligence::prompts::{CLASSIFY_PROMPT, CV_EXTRACTION_PROMPT, JD_EXTRACTION_PROMPT};
use crate::intelligence::records::{clamp_confidence, Classification, CvRecord, JdRecord};
use crate::llm_client::prompts::{fill, JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};
use crate::llm_client::{parse_json_reply, HostedClient, HostedProvider, LlmError, OllamaClient};

/// Inputs shorter than this are not worth a model call.
pub const MIN_INPUT_CHARS: usize = 50;
pub const DEFAULT_MAX_INPUT_CHARS: usize = 6000;
const MAX_INPUT_CHARS_FLOOR: usize = 3000;
const HOSTED_TIMEOUT_FLOOR: Duration = Duration::from_secs(30);
const LOCAL_TIMEOUT_FLOOR: Duration = Duration::from_secs(60);

#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Stable tag stamped on every record this backend produces.
    fn provider(&self) -> String;
    async fn extract_cv(&self, text: &str) -> Result<CvRecord, LlmError>;
    async fn extract_jd(&self, text: &str) -> Result<JdRecord, LlmError>;
    async fn classify(&self, text: &str) -> Result<Classification, LlmError>;
}

fn prompt_for(template: &str, text: &str) -> String {
    fill(
        template,
        &[
            ("no_invention", NO_INVENTION_INSTRUCTION),
            ("document_text", text),
        ],
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Hosted backend
// ────────────────────────────────────────────────────────────────────────────

pub struct HostedBackend {
    client: HostedClient,
}

impl HostedBackend {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionBackend for HostedBackend {
    fn provider(&self) -> String {
        self.client.provider().tag().to_string()
    }

    async fn extract_cv(&self, text: &str) -> Result<CvRecord, LlmError> {
        let mut record: CvRecord = self
            .client
            .call_json(&prompt_for(CV_EXTRACTION_PROMPT, text), JSON_ONLY_SYSTEM)
            .await?;
        record.provider = self.provider();
        Ok(record)
    }

    async fn extract_jd(&self, text: &str) -> Result<JdRecord, LlmError> {
        let mut record: JdRecord = self
            .client
            .call_json(&prompt_for(JD_EXTRACTION_PROMPT, text), JSON_ONLY_SYSTEM)
            .await?;
        record.provider = self.provider();
        Ok(record)
    }

    async fn classify(&self, text: &str) -> Result<Classification, LlmError> {
        self.client
            .call_json(&prompt_for(CLASSIFY_PROMPT, text), JSON_ONLY_SYSTEM)
            .await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Local backend
// ────────────────────────────────────────────────────────────────────────────

/// Ollama-served model. Extraction replies that are not valid JSON fall back to
/// regex extraction; transport failures are still errors.
pub struct LocalBackend {
    client: OllamaClient,
}

impl LocalBackend {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    async fn generate(&self, template: &str, text: &str) -> Result<String, LlmError> {
        self.client
            .generate(&prompt_for(template, text), JSON_ONLY_SYSTEM)
            .await
    }
}

fn is_unusable_reply(e: &LlmError) -> bool {
    matches!(e, LlmError::Parse(_) | LlmError::EmptyContent)
}

/// CV record from a local model reply. Unusable replies fall back to regexes over `text`.
fn local_cv_record(
    reply: Result<String, LlmError>,
    text: &str,
    provider: String,
) -> Result<CvRecord, LlmError> {
    match reply.and_then(|raw| parse_json_reply::<CvRecord>(&raw)) {
        Ok(mut record) => {
            record.provider = provider;
            Ok(record)
        }
        Err(e) if is_unusable_reply(&e) => {
            warn!("{provider} reply unusable ({e}); using regex fallback");
            Ok(fallback_cv(text))
        }
        Err(e) => Err(e),
    }
}

/// JD counterpart of [`local_cv_record`].
fn local_jd_record(
    reply: Result<String, LlmError>,
    text: &str,
    provider: String,
) -> Result<JdRecord, LlmError> {
    match reply.and_then(|raw| parse_json_reply::<JdRecord>(&raw)) {
        Ok(mut record) => {
            record.provider = provider;
            Ok(record)
        }
        Err(e) if is_unusable_reply(&e) => {
            warn!("{provider} reply unusable ({e}); using regex fallback");
            Ok(fallback_jd(text))
        }
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ExtractionBackend for LocalBackend {
    fn provider(&self) -> String {
        format!("ollama:{}", self.client.model())
    }

    async fn extract_cv(&self, text: &str) -> Result<CvRecord, LlmError> {
        let reply = self.generate(CV_EXTRACTION_PROMPT, text).await;
        local_cv_record(reply, text, self.provider())
    }

    async fn extract_jd(&self, text: &str) -> Result<JdRecord, LlmError> {
        let reply = self.generate(JD_EXTRACTION_PROMPT, text).await;
        local_jd_record(reply, text, self.provider())
    }

    async fn classify(&self, text: &str) -> Result<Classification, LlmError> {
        let reply = self.generate(CLASSIFY_PROMPT, text).await?;
        parse_json_reply(&reply)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

/// One backend plus the common extraction contract and optional reply cache.
#[derive(Clone)]
pub struct LlmExtractor {
    backend: Arc<dyn ExtractionBackend>,
    max_input_chars: usize,
    cache: Option<ExtractionCache>,
}

impl LlmExtractor {
    pub fn new(backend: Arc<dyn ExtractionBackend>, max_input_chars: usize) -> Self {
        Self {
            backend,
            max_input_chars: max_input_chars.max(MAX_INPUT_CHARS_FLOOR),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Option<ExtractionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider(&self) -> String {
        self.backend.provider()
    }

    /// Trimmed and truncated input, or `None` when it is too short to send.
    fn prepare<'a>(&self, text: &'a str) -> Option<&'a str> {
        let text = text.trim();
        if text.chars().count() < MIN_INPUT_CHARS {
            return None;
        }
        Some(truncate_chars(text, self.max_input_chars))
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember<T: Serialize>(&self, key: &str, value: &T, confidence: f64, provider: &str) {
        if let (Some(cache), true) = (&self.cache, is_cacheable(confidence, provider)) {
            cache.put(key, value).await;
        }
    }

    pub async fn extract_cv(&self, text: &str) -> CvRecord {
        let provider = self.provider();
        let Some(input) = self.prepare(text) else {
            debug!("CV input too short for {provider}; returning empty record");
            return CvRecord::empty(&provider);
        };
        let key = ExtractionCache::key("cv", &provider, input);
        if let Some(hit) = self.cached::<CvRecord>(&key).await {
            return hit;
        }

        match self.backend.extract_cv(input).await {
            Ok(mut record) => {
                record.extraction_confidence = clamp_confidence(record.extraction_confidence);
                self.remember(&key, &record, record.extraction_confidence, &record.provider)
                    .await;
                record
            }
            Err(e) => {
                warn!("CV extraction via {provider} failed: {e}");
                CvRecord::empty(&provider)
            }
        }
    }

    pub async fn extract_jd(&self, text: &str) -> JdRecord {
        let provider = self.provider();
        let Some(input) = self.prepare(text) else {
            debug!("JD input too short for {provider}; returning empty record");
            return JdRecord::empty(&provider);
        };
        let key = ExtractionCache::key("jd", &provider, input);
        if let Some(hit) = self.cached::<JdRecord>(&key).await {
            return hit;
        }

        match self.backend.extract_jd(input).await {
            Ok(mut record) => {
                record.extraction_confidence = clamp_confidence(record.extraction_confidence);
                self.remember(&key, &record, record.extraction_confidence, &record.provider)
                    .await;
                record
            }
            Err(e) => {
                warn!("JD extraction via {provider} failed: {e}");
                JdRecord::empty(&provider)
            }
        }
    }

    pub async fn classify(&self, text: &str) -> Classification {
        let provider = self.provider();
        let Some(input) = self.prepare(text) else {
            return Classification::unknown(0.0, "Document too short to classify");
        };
        let key = ExtractionCache::key("classify", &provider, input);
        if let Some(hit) = self.cached::<Classification>(&key).await {
            return hit;
        }

        match self.backend.classify(input).await {
            Ok(mut class) => {
                class.confidence = clamp_confidence(class.confidence);
                self.remember(&key, &class, class.confidence, &provider).await;
                class
            }
            Err(e) => {
                warn!("Classification via {provider} failed: {e}");
                Classification::unknown(0.0, "LLM classification unavailable")
            }
        }
    }
}

/// Only confident model replies are cached. A regex fallback should be retried next time.
fn is_cacheable(confidence: f64, provider: &str) -> bool {
    confidence > 0.0 && provider != FALLBACK_PROVIDER
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Settings and registry
// ────────────────────────────────────────────────────────────────────────────

/// Credential, endpoint and model for one hosted provider.
#[derive(Clone)]
pub struct HostedSettings {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

impl HostedSettings {
    /// Provider defaults for whatever is not supplied.
    pub fn for_provider(
        provider: HostedProvider,
        api_key: String,
        endpoint: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            api_key,
            endpoint: endpoint.unwrap_or_else(|| provider.default_endpoint().to_string()),
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
        }
    }
}

/// Everything the backends need, injected at startup.
#[derive(Clone)]
pub struct BackendSettings {
    pub openai: HostedSettings,
    pub anthropic: HostedSettings,
    pub groq: HostedSettings,
    pub ollama_url: String,
    pub ollama_model: String,
    pub max_input_chars: usize,
    pub hosted_timeout: Duration,
    pub local_timeout: Duration,
}

/// Resolves provider tags (`openai`, `anthropic`, `groq`, `ollama`, `ollama:<model>`)
/// to ready extractors.
#[derive(Clone)]
pub struct BackendRegistry {
    openai: LlmExtractor,
    anthropic: LlmExtractor,
    groq: LlmExtractor,
    ollama: OllamaClient,
    max_input_chars: usize,
    cache: Option<ExtractionCache>,
}

impl BackendRegistry {
    pub fn new(settings: BackendSettings, cache: Option<ExtractionCache>) -> Result<Self, LlmError> {
        let hosted_timeout = settings.hosted_timeout.max(HOSTED_TIMEOUT_FLOOR);
        let local_timeout = settings.local_timeout.max(LOCAL_TIMEOUT_FLOOR);
        let max_input_chars = settings.max_input_chars;

        let hosted = |provider: HostedProvider, s: HostedSettings| -> Result<LlmExtractor, LlmError> {
            let client = HostedClient::new(provider, s.api_key, s.endpoint, s.model, hosted_timeout)?;
            if !client.has_credential() {
                warn!("No API key for {}; its extractions will be empty", provider.tag());
            }
            Ok(LlmExtractor::new(Arc::new(HostedBackend::new(client)), max_input_chars)
                .with_cache(cache.clone()))
        };

        Ok(Self {
            openai: hosted(HostedProvider::OpenAi, settings.openai)?,
            anthropic: hosted(HostedProvider::Anthropic, settings.anthropic)?,
            groq: hosted(HostedProvider::Groq, settings.groq)?,
            ollama: OllamaClient::new(settings.ollama_url, settings.ollama_model, local_timeout)?,
            max_input_chars,
            cache: cache.clone(),
        })
    }

    pub fn resolve(&self, tag: &str) -> Result<LlmExtractor, AppError> {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "openai" => Ok(self.openai.clone()),
            "anthropic" => Ok(self.anthropic.clone()),
            "groq" => Ok(self.groq.clone()),
            "ollama" => Ok(self.local(self.ollama.clone())),
            lower if lower.starts_with("ollama:") => {
                let model = tag["ollama:".len()..].trim();
                if model.is_empty() {
                    return Err(AppError::Validation(
                        "Provider 'ollama:' needs a model name".to_string(),
                    ));
                }
                Ok(self.local(self.ollama.with_model(model)))
            }
            _ => Err(AppError::Validation(format!(
                "Unknown provider '{tag}'. Expected openai, anthropic, groq, ollama or ollama:<model>"
            ))),
        }
    }

    fn local(&self, client: OllamaClient) -> LlmExtractor {
        LlmExtractor::new(Arc::new(LocalBackend::new(client)), self.max_input_chars)
            .with_cache(self.cache.clone())
    }
}
