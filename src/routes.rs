// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, questions, quizzes, subjects, submissions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the Quiz Store router.
///
/// * Public routes: login, browsing subjects and quizzes, submitting results.
/// * Instructor routes: everything that authors content or reads submissions.
/// * Applies global middleware (Trace, CORS) and injects `AppState`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/subjects", get(subjects::list_subjects))
        .route("/api/quizzes", get(quizzes::list_quizzes))
        .route("/api/quizzes/{id}", get(quizzes::get_quiz))
        .route("/api/submissions", post(submissions::create_submission));

    let admin_routes = Router::new()
        .route("/api/subjects", post(subjects::create_subject))
        .route(
            "/api/subjects/{id}",
            put(subjects::update_subject).delete(subjects::delete_subject),
        )
        .route("/api/quizzes", post(quizzes::create_quiz))
        .route(
            "/api/quizzes/{id}",
            post(quizzes::add_question)
                .put(quizzes::update_quiz)
                .delete(quizzes::delete_quiz),
        )
        .route(
            "/api/questions/{id}",
            put(questions::update_question).delete(questions::delete_question),
        )
        .route("/api/questions/{id}/reorder", put(questions::reorder_question))
        .route("/api/submissions", get(submissions::list_submissions))
        // Double middleware protection: Auth first, then Admin check.
        // Route layers leave the 405 fallback of shared paths untouched.
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
