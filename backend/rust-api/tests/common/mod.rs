#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use aprueba_api::config::{Config, RelayConfig};
use aprueba_api::create_router;
use aprueba_api::models::Question;
use aprueba_api::services::memory_repository::InMemoryQuizRepository;
use aprueba_api::services::session_store::InMemorySessionStore;
use aprueba_api::services::AppState;

/// Nothing listens here, so every relay call ends in a connection error.
pub const CLOSED_RELAY: &str = "http://127.0.0.1:1";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryQuizRepository>,
    pub sessions: Arc<InMemorySessionStore>,
}

pub fn test_config(relay_base: &str) -> Config {
    Config {
        relay: RelayConfig {
            chat_url: format!("{}/chat", relay_base),
            review_exercises_url: format!("{}/review", relay_base),
            failure_streak_url: format!("{}/streak", relay_base),
            timeout_seconds: Some(5),
        },
        metrics_auth: "metrics:secret".to_string(),
        ..Config::default()
    }
}

pub fn question(id: &str, area: &str, topic: &str, correct: &str) -> Question {
    let options = ["a", "b", "c", "d"]
        .iter()
        .map(|key| (key.to_string(), format!("Respuesta {}", key)))
        .collect::<BTreeMap<_, _>>();
    Question {
        id: id.to_string(),
        area: area.to_string(),
        topic: topic.to_string(),
        block: None,
        title: format!("Pregunta {}", id),
        prompt: format!("Enunciado de la pregunta {}", id),
        options,
        correct_option: correct.to_string(),
        justification: format!("Justificación de {}", id),
    }
}

/// Three questions: two in "Derecho Constitucional", one in "Derecho Penal".
pub fn question_bank() -> Vec<Question> {
    vec![
        question("q1", "Derecho Constitucional", "Título Preliminar", "a"),
        question("q2", "Derecho Constitucional", "Derechos Fundamentales", "b"),
        question("q3", "Derecho Penal", "Delitos", "c"),
    ]
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(CLOSED_RELAY, question_bank())
}

pub async fn create_test_app_with_relay(relay_base: &str) -> TestApp {
    create_test_app_with(relay_base, question_bank())
}

pub fn create_test_app_with(relay_base: &str, questions: Vec<Question>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let repo = Arc::new(InMemoryQuizRepository::with_questions(questions));
    let sessions = Arc::new(InMemorySessionStore::new());
    let state = AppState::with_stores(test_config(relay_base), repo.clone(), sessions.clone())
        .expect("Failed to build test app state");

    TestApp {
        router: create_router(Arc::new(state)),
        repo,
        sessions,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
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

/// Sends the request and decodes the body as JSON (`Value::Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if body.is_empty() {
        return (status, Value::Null);
    }
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "non-JSON body with status {}: {}",
            status,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}
