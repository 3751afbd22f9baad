use crate::collector::collect_latest_reports;
use crate::errors::AppError;
use crate::models::{LatestQuery, QueuedResponse, Report, MAX_AMOUNT};
use crate::state::AppState;
use crate::tasks::LatestTask;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

const TOKEN_REQUIRED: &str = "token parameter required.";

pub async fn index() -> &'static str {
    "index"
}

pub async fn health_check() -> &'static str {
    "healthy"
}

pub async fn latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    let amount = authorize(&state, &query)?;
    run_latest(state, amount).await
}

/// Execution target for deferred runs; same work as [`latest`].
pub async fn task_latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    let amount = authorize(&state, &query)?;
    info!("task_latest invoked");
    run_latest(state, amount).await
}

pub async fn queue_latest(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let amount = authorize(&state, &query)?;
    if !state.tasks.enqueue(LatestTask { amount }) {
        return Err(AppError::unavailable("task worker is not running"));
    }

    info!("queued deferred run for {amount} report(s)");
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: amount })))
}

/// Checks the token, then the requested amount.
fn authorize(state: &AppState, query: &LatestQuery) -> Result<usize, AppError> {
    if !state.settings.token_matches(query.token.as_deref()) {
        warn!("rejected request with missing or wrong token");
        return Err(AppError::forbidden(TOKEN_REQUIRED));
    }

    query
        .amount()
        .ok_or_else(|| AppError::bad_request(format!("amount must be at most {MAX_AMOUNT}")))
}

/// Runs on its own task so a dropped request cannot skip closing the
/// browser session.
async fn run_latest(state: AppState, amount: usize) -> Result<Json<Vec<Report>>, AppError> {
    let run = tokio::spawn(async move {
        let _guard = state.run_lock.lock().await;
        collect_latest_reports(
            state.collector.as_ref(),
            amount,
            state.settings.start_weight,
        )
        .await
    });

    let reports = run.await.map_err(AppError::internal)??;
    Ok(Json(reports))
}
