use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{empty_request, json_request, send};

fn chosen_option(question_id: &str) -> &'static str {
    // q3 is answered wrong on purpose (correct is "c")
    match question_id {
        "q1" => "a",
        "q2" => "b",
        _ => "d",
    }
}

async fn start_session(app: &axum::Router, body: Value) -> Value {
    let (status, view) = send(app, json_request("POST", "/api/v1/sessions", body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {}", view);
    view
}

#[tokio::test]
async fn test_full_session_scores_and_persists() {
    let app = common::create_test_app().await;

    let mut view = start_session(&app.router, json!({ "user_id": "opositor-1" })).await;
    assert_eq!(view["state"], "in_progress");
    assert_eq!(view["total_questions"], 3);
    assert!(view["question"].get("correct_option").is_none());

    let session_id = view["session_id"].as_str().unwrap().to_string();

    let outcome = loop {
        let question_id = view["question"]["id"].as_str().unwrap().to_string();
        let (status, selected) = send(
            &app.router,
            json_request(
                "POST",
                &format!("/api/v1/sessions/{}/select", session_id),
                json!({ "option": chosen_option(&question_id) }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(selected["pending_option"], chosen_option(&question_id));

        let (status, next) = send(
            &app.router,
            empty_request("POST", &format!("/api/v1/sessions/{}/next", session_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        if next["result"] == "completed" {
            break next;
        }
        assert_eq!(next["result"], "moved");
        view = next;
    };

    assert_eq!(outcome["score"]["correct_count"], 2);
    assert_eq!(outcome["score"]["incorrect_count"], 1);
    assert_eq!(outcome["score"]["percentage"], 67);
    assert_eq!(outcome["passed"], true);
    assert_eq!(outcome["feedback"], "can_improve");
    assert_eq!(outcome["questions"].as_array().unwrap().len(), 3);
    assert_eq!(outcome["persistence"]["attempted"], 4);
    assert_eq!(outcome["persistence"]["failed"], 0);

    let results = app.repo.test_results().await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].correct_count, 2);
    assert_eq!(results[0].user_id.as_deref(), Some("opositor-1"));

    let events = app.repo.answer_events().await;
    assert_eq!(events.len(), 3);
    assert_eq!(events.iter().filter(|e| !e.correct).count(), 1);

    let streaks = app.repo.failure_streaks().await;
    assert_eq!(streaks.len(), 1);
    assert_eq!(streaks[0].question_id, "q3");
    assert_eq!(streaks[0].failures, 1);

    // Completed sessions are dropped from the store
    assert!(app.sessions.is_empty().await);
    let (status, _) = send(
        &app.router,
        empty_request("GET", &format!("/api/v1/sessions/{}", session_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_next_without_selection_is_conflict() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({})).await;
    let session_id = view["session_id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        empty_request("POST", &format!("/api/v1/sessions/{}/next", session_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_option_is_bad_request() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({})).await;
    let session_id = view["session_id"].as_str().unwrap();

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/sessions/{}/select", session_id),
            json!({ "option": "z" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_no_matching_questions_is_unprocessable() {
    let app = common::create_test_app().await;

    let (status, body) = send(
        &app.router,
        json_request("POST", "/api/v1/sessions", json!({ "area": "Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "No hay preguntas para los filtros seleccionados");
    assert!(app.sessions.is_empty().await);
}

#[tokio::test]
async fn test_filters_and_limit_shape_the_session() {
    let app = common::create_test_app().await;

    let view = start_session(
        &app.router,
        json!({ "area": "Derecho Constitucional", "limit": 1 }),
    )
    .await;
    assert_eq!(view["total_questions"], 1);
    assert_eq!(view["question"]["area"], "Derecho Constitucional");
}

#[tokio::test]
async fn test_previous_restores_recorded_choice() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({})).await;
    let session_id = view["session_id"].as_str().unwrap().to_string();
    let first_question = view["question"]["id"].clone();

    send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/sessions/{}/select", session_id),
            json!({ "option": "b" }),
        ),
    )
    .await;
    let (_, moved) = send(
        &app.router,
        empty_request("POST", &format!("/api/v1/sessions/{}/next", session_id)),
    )
    .await;
    assert_eq!(moved["current_index"], 1);
    assert_eq!(moved["answered_count"], 1);

    let (status, back) = send(
        &app.router,
        empty_request("POST", &format!("/api/v1/sessions/{}/previous", session_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(back["current_index"], 0);
    assert_eq!(back["question"]["id"], first_question);
    assert_eq!(back["pending_option"], "b");

    // Already at the first question: stays put
    let (_, still) = send(
        &app.router,
        empty_request("POST", &format!("/api/v1/sessions/{}/previous", session_id)),
    )
    .await;
    assert_eq!(still["current_index"], 0);
}

#[tokio::test]
async fn test_discard_drops_session_without_persisting() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({})).await;
    let session_id = view["session_id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        empty_request("DELETE", &format!("/api/v1/sessions/{}", session_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    assert!(app.repo.test_results().await.is_empty());
    assert!(app.repo.answer_events().await.is_empty());

    let (status, _) = send(
        &app.router,
        empty_request("DELETE", &format!("/api/v1/sessions/{}", session_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = common::create_test_app().await;

    let (status, body) = send(
        &app.router,
        empty_request("GET", "/api/v1/sessions/does-not-exist"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}

#[tokio::test]
async fn test_write_failures_still_return_outcome() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({ "limit": 1 })).await;
    let session_id = view["session_id"].as_str().unwrap().to_string();

    app.repo.set_fail_writes(true);

    send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/sessions/{}/select", session_id),
            json!({ "option": "a" }),
        ),
    )
    .await;
    let (status, outcome) = send(
        &app.router,
        empty_request("POST", &format!("/api/v1/sessions/{}/next", session_id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["result"], "completed");
    assert_eq!(outcome["persistence"]["attempted"], 2);
    assert_eq!(outcome["persistence"]["failed"], 2);
}

#[tokio::test]
async fn test_concurrent_next_on_last_question_finalizes_once() {
    let app = common::create_test_app().await;
    let view = start_session(&app.router, json!({ "area": "Derecho Penal", "limit": 1 })).await;
    let session_id = view["session_id"].as_str().unwrap().to_string();

    send(
        &app.router,
        json_request(
            "POST",
            &format!("/api/v1/sessions/{}/select", session_id),
            json!({ "option": "c" }),
        ),
    )
    .await;

    let uri = format!("/api/v1/sessions/{}/next", session_id);
    let ((first, _), (second, _)) = tokio::join!(
        send(&app.router, empty_request("POST", &uri)),
        send(&app.router, empty_request("POST", &uri)),
    );

    let mut statuses = [first, second];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::NOT_FOUND]);
    assert_eq!(app.repo.test_results().await.len(), 1);
    assert_eq!(app.repo.answer_events().await.len(), 1);

    // A late retry after completion cannot persist again either
    let (status, _) = send(&app.router, empty_request("POST", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.repo.test_results().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = common::create_test_app().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/sessions")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("JSON"));
}
