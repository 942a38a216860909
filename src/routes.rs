// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{exam_code, grading},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges the exam-code and grading sub-routers.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (repositories and config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let exam_routes = Router::new().route(
        "/{id}/codes",
        get(exam_code::list_codes).post(exam_code::generate_codes),
    );

    let exam_code_routes = Router::new().route("/{id}/paper", get(exam_code::get_paper));

    let submission_routes = Router::new()
        .route("/{id}/auto-grade", post(grading::auto_grade))
        .route("/{id}/total-score", put(grading::set_total_score))
        .route(
            "/{id}/answers/{question_id}/score",
            put(grading::grade_answer),
        );

    Router::new()
        .nest("/api/exams", exam_routes)
        .nest("/api/exam-codes", exam_code_routes)
        .nest("/api/submissions", submission_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
