//! Test helpers shared by the relay-service integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use relay_service::config::{ArxivConfig, GeminiConfig, RelayConfig, SecurityConfig};
use relay_service::services::providers::mock::{MockPaperSource, MockTextProvider};
use relay_service::startup::{AppState, Application};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const TEST_API_KEY: &str = "test-gemini-key";
pub const TEST_ORIGIN: &str = "http://localhost:8000";
pub const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
pub const ARXIV_PATH: &str = "/api/query";

pub fn test_config(gemini_base: &str, arxiv_base: &str) -> RelayConfig {
    RelayConfig {
        common: CoreConfig {
            port: 0,
            log_level: "error".to_string(),
            otlp_endpoint: None,
        },
        gemini: GeminiConfig {
            api_key: TEST_API_KEY.to_string(),
            endpoint: format!("{}{}", gemini_base, GEMINI_PATH),
            timeout_secs: 5,
            default_max_tokens: 600,
        },
        arxiv: ArxivConfig {
            endpoint: format!("{}{}", arxiv_base, ARXIV_PATH),
            timeout_secs: 5,
            max_results: 10,
            start: 0,
        },
        security: SecurityConfig {
            allowed_origins: vec![
                TEST_ORIGIN.to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        },
    }
}

/// State backed by mocks; the returned handles expose call counters.
pub fn mock_state(
    text: MockTextProvider,
    papers: MockPaperSource,
) -> (AppState, Arc<MockTextProvider>, Arc<MockPaperSource>) {
    let text = Arc::new(text);
    let papers = Arc::new(papers);
    let state = AppState {
        config: test_config("http://unused.invalid", "http://unused.invalid"),
        text_provider: text.clone(),
        paper_source: papers.clone(),
    };
    (state, text, papers)
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// A relay listening on a random port.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(config: RelayConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }
}
