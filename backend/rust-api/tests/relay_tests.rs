use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use mockito::Matcher;
use serde_json::json;
use tower::ServiceExt;

mod common;

use aprueba_api::RELAY_PATH;
use common::{empty_request, json_request, send};

fn chat_body() -> serde_json::Value {
    json!({
        "sessionId": "sesion-123",
        "action": "sendMessage",
        "chatInput": "¿Qué dice el artículo 14?"
    })
}

#[tokio::test]
async fn test_relay_passes_upstream_json_through() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat")
        .match_body(Matcher::PartialJson(json!({
            "sessionId": "sesion-123",
            "chatInput": "¿Qué dice el artículo 14?"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"output":"Los españoles son iguales ante la ley."}"#)
        .expect(1)
        .create_async()
        .await;

    let app = common::create_test_app_with_relay(&server.url()).await;
    let (status, body) = send(&app.router, json_request("POST", RELAY_PATH, chat_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "Los españoles son iguales ante la ley.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_upstream_failure_returns_fallback() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(500)
        .with_body("workflow crashed")
        .create_async()
        .await;

    let app = common::create_test_app_with_relay(&server.url()).await;
    let (status, body) = send(&app.router, json_request("POST", RELAY_PATH, chat_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "fallback");
    assert_eq!(
        body["output"],
        "Lo siento, el servicio de IA no está disponible en este momento. Por favor, inténtalo más tarde."
    );
    assert_eq!(body["debug"]["upstream_status"], 500);
    assert_eq!(body["debug"]["upstream_body"], "workflow crashed");
}

#[tokio::test]
async fn test_relay_unreachable_upstream_returns_connection_error() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app.router, json_request("POST", RELAY_PATH, chat_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "connection_error");
    assert!(body["output"].as_str().unwrap().contains("Mentor IA"));
    assert!(body["debug"]["error"].is_string());
}

#[tokio::test]
async fn test_relay_non_json_success_is_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat")
        .with_status(200)
        .with_body("<html>ok</html>")
        .create_async()
        .await;

    let app = common::create_test_app_with_relay(&server.url()).await;
    let (status, body) = send(&app.router, json_request("POST", RELAY_PATH, chat_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_relay_routes_review_action_to_review_webhook() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/review")
        .match_body(Matcher::PartialJson(json!({
            "action": "generateReviewExercises",
            "tema": "Delitos",
            "area": "Derecho Penal",
            "totalErrores": 4
        })))
        .with_status(200)
        .with_body(r#"{"exercises":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let app = common::create_test_app_with_relay(&server.url()).await;
    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            RELAY_PATH,
            json!({
                "action": "generateReviewExercises",
                "area": "Derecho Penal",
                "tema": "Delitos",
                "totalErrores": 4
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_relay_rejects_other_methods() {
    let app = common::create_test_app().await;
    let (status, body) = send(&app.router, empty_request("GET", RELAY_PATH)).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Método no permitido");
}

#[tokio::test]
async fn test_relay_rejects_malformed_json() {
    let app = common::create_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri(RELAY_PATH)
        .header("content-type", "application/json")
        .body(Body::from("{\"sessionId\": "))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "JSON inválido");
}

#[tokio::test]
async fn test_relay_rejects_missing_fields() {
    let app = common::create_test_app().await;
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            RELAY_PATH,
            json!({ "action": "sendMessage", "sessionId": "sesion-123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Faltan datos requeridos");
}

#[tokio::test]
async fn test_relay_preflight_sets_cors_headers() {
    let app = common::create_test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri(RELAY_PATH)
                .header("origin", "http://localhost:5173")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        response.headers()["access-control-allow-headers"],
        "authorization, x-client-info, apikey, content-type"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_relay_error_responses_carry_cors_headers() {
    let app = common::create_test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(empty_request("PUT", RELAY_PATH))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
