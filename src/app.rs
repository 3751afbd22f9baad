use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/_ah/health", get(handlers::health_check))
        .route("/latest", get(handlers::latest))
        .route("/task_latest", get(handlers::task_latest))
        .route("/queue_latest", get(handlers::queue_latest))
        .with_state(state)
}
