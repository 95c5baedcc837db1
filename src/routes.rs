// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam, report, session},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (exams, sessions, reports, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let exam_routes = Router::new()
        .route("/", get(exam::list_exams))
        .route("/{id}", get(exam::get_exam));

    let session_routes = Router::new()
        .route("/", post(session::open_session))
        .route(
            "/{id}",
            get(session::get_session).delete(session::abandon_session),
        )
        .route("/{id}/start", post(session::start_session))
        .route("/{id}/next", post(session::next_question))
        .route("/{id}/previous", post(session::previous_question))
        .route("/{id}/answer", post(session::select_answer))
        .route("/{id}/run", post(session::run_code))
        .route("/{id}/submit", post(session::submit_session));

    let report_routes = Router::new().route("/mine", get(report::my_reports));

    let admin_routes = Router::new()
        .route("/exams", post(exam::create_exam))
        .route("/reports", get(report::list_reports))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware));

    let protected = Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/reports", report_routes)
        .nest("/api/admin", admin_routes)
        .layer(auth);

    Router::new()
        .merge(protected)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
