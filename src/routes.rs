// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, staff_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (quiz, results, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (engine services and config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let quiz_routes = Router::new()
        .route("/", get(quiz::list_quizzes))
        .route("/{id}/status", get(quiz::get_quiz_status))
        .route("/{id}/submit", post(quiz::submit_attempt));

    let result_routes = Router::new().route("/me", get(quiz::list_my_results));

    let admin_routes = Router::new()
        .route("/quizzes", post(admin::publish_quiz))
        .route("/quizzes/{id}/schedule", put(admin::reschedule_quiz))
        .route("/quizzes/{id}/results", get(admin::list_quiz_results))
        // Auth first, then staff check
        .layer(middleware::from_fn(staff_middleware));

    let api = Router::new()
        .nest("/quizzes", quiz_routes)
        .nest("/results", result_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
