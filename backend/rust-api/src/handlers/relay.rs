use std::any::Any;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::models::relay::{RawRelayRequest, RelayOutcome, RelayRequest, RelayRequestError};
use crate::services::AppState;

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

fn relay_json(status: StatusCode, body: Value) -> Response {
    with_cors((status, Json(body)).into_response())
}

fn parse_request(body: &[u8]) -> Result<RelayRequest, RelayRequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| RelayRequestError::InvalidJson)?;
    let raw: RawRelayRequest =
        serde_json::from_value(value).map_err(|_| RelayRequestError::InvalidJson)?;
    RelayRequest::try_from(raw)
}

/// Mentor relay. Only method and body errors are non-200; upstream trouble is
/// reported inside a 200 body.
pub async fn mentor_chat(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return with_cors(Response::new(Body::empty()));
    }
    if method != Method::POST {
        return relay_json(
            StatusCode::METHOD_NOT_ALLOWED,
            json!({ "error": "Método no permitido" }),
        );
    }

    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(err) => {
            if let RelayRequestError::MissingFields(fields) = &err {
                tracing::warn!("Relay request missing fields: {:?}", fields);
            }
            return relay_json(StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }));
        }
    };

    let outcome = state.relay.forward(&request).await;
    relay_json(StatusCode::OK, outcome.into_body())
}

/// Used by the relay route's `CatchPanicLayer`.
pub fn relay_panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Relay handler panicked: {}", detail);

    relay_json(
        StatusCode::OK,
        RelayOutcome::Internal { error: detail }.into_body(),
    )
}
