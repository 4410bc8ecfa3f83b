//! Redis cache for LLM extraction replies, keyed by backend and a hash of the input text.
//!
//! Cache failures never fail a request: they are logged and treated as a miss.

use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// First 32 hex chars of the SHA-256 of `text`. Stable across processes.
pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    digest[..32].to_string()
}

#[derive(Clone)]
pub struct ExtractionCache {
    client: redis::Client,
    conn: Arc<OnceCell<MultiplexedConnection>>,
    ttl_secs: u64,
}

impl ExtractionCache {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self {
            client,
            conn: Arc::new(OnceCell::new()),
            ttl_secs,
        }
    }

    /// `intel:{kind}:{provider}:{digest}`. The text itself never reaches Redis keys.
    pub fn key(kind: &str, provider: &str, text: &str) -> String {
        format!("intel:{kind}:{provider}:{}", text_digest(text))
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        match self
            .conn
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await
        {
            Ok(conn) => Some(conn.clone()),
            Err(e) => {
                warn!("Extraction cache unavailable: {e}");
                None
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = match redis::cmd("GET").arg(key).query_async(&mut conn).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Extraction cache read failed: {e}");
                return None;
            }
        };
        let value = raw.and_then(|r| match serde_json::from_str(&r) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Discarding undecodable cache entry {key}: {e}");
                None
            }
        });
        if value.is_some() {
            debug!("Extraction cache hit: {key}");
        }
        value
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        let Some(mut conn) = self.connection().await else {
            return;
        };
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!("Could not encode cache entry {key}: {e}");
                return;
            }
        };
        let result: redis::RedisResult<()> = redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!("Extraction cache write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_and_scoped() {
        let a = ExtractionCache::key("cv", "openai", "some cv text");
        let b = ExtractionCache::key("cv", "openai", "some cv text");
        let c = ExtractionCache::key("jd", "openai", "some cv text");
        let d = ExtractionCache::key("cv", "groq", "some cv text");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(a.starts_with("intel:cv:openai:"));
        assert_eq!(a.len(), "intel:cv:openai:".len() + 32);
        assert!(!a.contains("some cv text"));
    }
}
