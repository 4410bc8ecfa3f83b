pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::intelligence::handlers as intelligence;
use crate::matching::handlers as matching;
use crate::skills::handlers as skills;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Documents
        .route("/api/v1/documents/extract", post(documents::handle_extract))
        .route("/api/v1/documents/redact", post(documents::handle_redact))
        .route("/api/v1/documents/sections", post(documents::handle_sections))
        .route(
            "/api/v1/documents/sections/rebuild",
            post(documents::handle_rebuild),
        )
        .route(
            "/api/v1/documents/transform",
            post(documents::handle_transform),
        )
        // Skills
        .route("/api/v1/skills/extract", post(skills::handle_extract_skills))
        // Intelligence
        .route("/api/v1/intelligence/cv", post(intelligence::handle_extract_cv))
        .route("/api/v1/intelligence/jd", post(intelligence::handle_extract_jd))
        .route(
            "/api/v1/intelligence/classify",
            post(intelligence::handle_classify),
        )
        // Matches
        .route("/api/v1/matches/score", post(matching::handle_score))
        .route(
            "/api/v1/matches",
            post(matching::handle_run_match).get(matching::handle_list_matches),
        )
        .route("/api/v1/matches/:id", get(matching::handle_get_match))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aws_sdk_s3::config::{BehaviorVersion, Region};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::{Config, LlmConfig};
    use crate::intelligence::backends::BackendRegistry;
    use crate::intelligence::classifier::ClassifierSettings;
    use crate::matching::store::memory::InMemoryMatchStore;

    fn test_config() -> Config {
        Config {
            database_url: "postgres://localhost/test".to_string(),
            redis_url: "redis://localhost".to_string(),
            s3_bucket: "test-bucket".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            llm: LlmConfig {
                openai_api_key: String::new(),
                anthropic_api_key: String::new(),
                groq_api_key: String::new(),
                openai_api_url: None,
                anthropic_api_url: None,
                groq_api_url: None,
                openai_model: None,
                anthropic_model: None,
                groq_model: None,
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llama3".to_string(),
                max_input_chars: 6000,
                hosted_timeout_secs: 60,
                local_timeout_secs: 120,
            },
            classifier: ClassifierSettings::default(),
            extraction_cache_ttl_secs: 60,
        }
    }

    fn test_router() -> Router {
        let config = test_config();
        let s3 = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );
        let backends = BackendRegistry::new(config.backend_settings(), None).unwrap();
        build_router(AppState {
            store: Arc::new(InMemoryMatchStore::default()),
            s3,
            backends,
            classifier: config.classifier,
            config,
        })
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router();
        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_redact_endpoint() {
        let app = test_router();
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/documents/redact",
                json!({ "text": "Contact: a@b.com / +1 (415) 555-1212\nhttps://foo" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["text"].as_str().unwrap().contains("a@b.com"));
    }

    #[tokio::test]
    async fn test_match_persist_list_and_get() {
        let app = test_router();
        let user = Uuid::new_v4();
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/matches",
                json!({
                    "jd_text": "Python, Kubernetes, AWS",
                    "cv_text": "Python, AWS",
                    "persist": true,
                    "user_id": user,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 66.67);
        assert_eq!(body["llm_used"], false);
        let id = body["match_id"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get(&format!("/api/v1/matches?user_id={user}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["matches"].as_array().unwrap().len(), 1);
        assert_eq!(body["limit"], 20);

        let (status, body) =
            send(&app, get(&format!("/api/v1/matches/{id}?user_id={user}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["missing"], json!(["Kubernetes"]));

        let stranger = Uuid::new_v4();
        let (status, body) =
            send(&app, get(&format!("/api/v1/matches/{id}?user_id={stranger}"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_unknown_match_is_404() {
        let app = test_router();
        let uri = format!(
            "/api/v1/matches/{}?user_id={}",
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_400() {
        let app = test_router();
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/intelligence/cv",
                json!({ "text": "anything", "provider": "mystery" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_hosted_without_key_returns_empty_record() {
        let app = test_router();
        let cv = "Jane Doe, senior backend engineer with ten years of Rust, Go and PostgreSQL.";
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/intelligence/cv",
                json!({ "text": cv, "provider": "openai" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"]["extraction_confidence"], 0.0);
        assert_eq!(body["record"]["candidate_name"], "");
        assert_eq!(body["record"]["provider"], "openai");
    }

    #[tokio::test]
    async fn test_score_endpoint() {
        let app = test_router();
        let skill = |name: &str| json!({ "name": name, "proficiency": "intermediate", "confidence": 1.0 });
        let (status, body) = send(
            &app,
            post_json(
                "/api/v1/matches/score",
                json!({
                    "jd_skills": { "Rust": skill("Rust"), "Go": skill("Go") },
                    "cv_skills": { "Rust": skill("Rust") },
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["score"], 50.0);
        assert_eq!(body["missing"], json!(["Go"]));
    }
}
