pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pdf;
use crate::review;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/evaluate_stream",
            post(review::handlers::handle_evaluate_stream),
        )
        .route("/evaluate", post(review::handlers::handle_evaluate))
        .route("/extract_pdf", post(pdf::handlers::handle_extract_pdf))
        .with_state(state)
}
