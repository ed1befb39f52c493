use axum::{
    http::{header, Method},
    middleware,
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub const RELAY_PATH: &str = "/functions/v1/mentor-ia-chat";

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .merge(api_routes().layer(cors))
        // The relay answers its own preflight and sets its own CORS headers
        .route(
            RELAY_PATH,
            any(handlers::relay::mentor_chat).layer(CatchPanicLayer::custom(
                handlers::relay::relay_panic_response,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/questions", get(handlers::questions::list_questions))
        .route("/api/v1/taxonomy/areas", get(handlers::taxonomy::list_areas))
        .route("/api/v1/taxonomy/blocks", get(handlers::taxonomy::list_blocks))
        .route("/api/v1/sessions", post(handlers::sessions::create_session))
        .route(
            "/api/v1/sessions/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::discard_session),
        )
        .route(
            "/api/v1/sessions/{id}/select",
            post(handlers::sessions::select_option),
        )
        .route(
            "/api/v1/sessions/{id}/next",
            post(handlers::sessions::next_question),
        )
        .route(
            "/api/v1/sessions/{id}/previous",
            post(handlers::sessions::previous_question),
        )
        .route("/api/v1/stats", get(handlers::stats::get_stats))
        .route(
            "/api/v1/review/candidates",
            get(handlers::review::list_candidates),
        )
        .route(
            "/api/v1/review/exercises",
            post(handlers::review::generate_exercises),
        )
        .route("/api/v1/review/score", post(handlers::review::score_round))
}
