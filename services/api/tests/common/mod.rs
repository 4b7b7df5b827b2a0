//! Shared fixtures for the API integration tests: stub AI providers, an in-memory
//! application state and small helpers for driving the router.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::{
    adapters::{AudioStore, InMemoryStore, KeywordAnnotator},
    config::Config,
    web::{build_router, notifications::NotificationRegistry, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use dream_journal_core::{
    domain::{Dream, DreamAnalysis, DreamWithRelations, Insights, NewDream, NewUser},
    ports::{
        DreamInterpretationService, ImageGenerationService, PortError, PortResult,
        SpeechToTextService, Transcript,
    },
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

pub const BOUNDARY: &str = "dream-journal-test-boundary";

//=========================================================================================
// Stub providers
//=========================================================================================

pub struct StubTranscriber {
    pub outcome: Result<Transcript, String>,
}

impl StubTranscriber {
    pub fn ok(text: &str, duration_seconds: f32) -> Self {
        Self {
            outcome: Ok(Transcript {
                text: text.to_string(),
                duration_seconds,
            }),
        }
    }

    pub fn failing() -> Self {
        Self {
            outcome: Err("provider unavailable".to_string()),
        }
    }
}

#[async_trait]
impl SpeechToTextService for StubTranscriber {
    async fn transcribe(&self, _file_name: &str, _audio: Vec<u8>) -> PortResult<Transcript> {
        self.outcome.clone().map_err(PortError::Transcription)
    }
}

/// Returns a fixed analysis, or fails, optionally waiting on a gate first.
pub struct StubInterpreter {
    pub fail: bool,
    pub gate: Option<Arc<Notify>>,
}

impl StubInterpreter {
    pub fn ok() -> Self {
        Self { fail: false, gate: None }
    }

    pub fn failing() -> Self {
        Self { fail: true, gate: None }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            fail: false,
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl DreamInterpretationService for StubInterpreter {
    async fn interpret(&self, dream_text: &str) -> PortResult<DreamAnalysis> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(PortError::Interpretation("model refused".to_string()));
        }
        Ok(DreamAnalysis {
            interpretation: format!("A dream about: {}", dream_text),
            insights: Insights {
                symbols: vec!["sky".to_string()],
                emotions: vec!["freedom".to_string()],
                themes: vec!["escape".to_string()],
            },
        })
    }
}

/// Records every prompt it is asked to draw.
#[derive(Default)]
pub struct RecordingIllustrator {
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingIllustrator {
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerationService for RecordingIllustrator {
    async fn generate_image(&self, prompt: &str) -> PortResult<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("https://images.test/{}.png", prompts.len()))
    }
}

//=========================================================================================
// Application fixture
//=========================================================================================

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub illustrator: Arc<RecordingIllustrator>,
    pub user_id: Uuid,
    pub upload_dir: TempDir,
}

pub fn test_config(upload_dir: &TempDir) -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: None,
        log_level: tracing::Level::DEBUG,
        openai_api_key: None,
        transcription_model: "whisper-1".to_string(),
        interpretation_model: "gpt-4o".to_string(),
        image_model: "dall-e-3".to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        cors_origin: "http://localhost:5173".to_string(),
        heartbeat_interval: Duration::from_secs(30),
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_providers(StubTranscriber::ok("", 0.0), StubInterpreter::ok()).await
    }

    pub async fn with_providers(transcriber: StubTranscriber, interpreter: StubInterpreter) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let config = test_config(&upload_dir);
        let audio_store = AudioStore::new(config.upload_dir.clone());
        audio_store.initialize().await.unwrap();

        let illustrator = Arc::new(RecordingIllustrator::default());
        let state = Arc::new(AppState {
            db: Arc::new(InMemoryStore::new()),
            config: Arc::new(config),
            sst_adapter: Arc::new(transcriber),
            interpretation_adapter: Arc::new(interpreter),
            image_adapter: illustrator.clone(),
            annotator: Arc::new(KeywordAnnotator::new()),
            audio_store,
            notifications: NotificationRegistry::new(),
        });

        let user_id = state
            .db
            .create_user(NewUser {
                username: "dreamer".to_string(),
                email: "dreamer@example.com".to_string(),
                hashed_password: "not-a-real-hash".to_string(),
                name: None,
                avatar_url: None,
            })
            .await
            .unwrap()
            .id;

        Self {
            router: build_router(state.clone()),
            state,
            illustrator,
            user_id,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Stores a dream directly, bypassing ingestion.
    pub async fn insert_dream(&self, content: &str) -> Dream {
        self.state
            .db
            .create_dream(NewDream {
                user_id: self.user_id,
                title: "A dream".to_string(),
                content: content.to_string(),
                audio_url: None,
                audio_duration: None,
                tags: vec!["miscellaneous".to_string()],
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    /// Polls the store until the pipeline has stored the image, which is its last write.
    pub async fn wait_for_image(&self, dream_id: Uuid) -> DreamWithRelations {
        for _ in 0..200 {
            let current = self.state.db.get_dream_with_relations(dream_id).await.unwrap();
            if current.image_generation.is_some() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pipeline did not finish for dream {}", dream_id);
    }
}

//=========================================================================================
// Request helpers
//=========================================================================================

/// Builds a `multipart/form-data` body from text fields and an optional `audio` file.
pub fn multipart_body(fields: &[(&str, &str)], audio: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = audio {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn submit_dream(fields: &[(&str, &str)], audio: Option<(&str, &[u8])>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/dreams")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(fields, audio)))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn read_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn read_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
