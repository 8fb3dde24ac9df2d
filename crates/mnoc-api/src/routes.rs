use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use mnoc_core::db::{JobQueue, LibSqlJobQueue};
use mnoc_core::jobs::SyncJobPayload;
use mnoc_core::SyncJob;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    queue: LibSqlJobQueue,
}

impl AppState {
    pub const fn new(queue: LibSqlJobQueue) -> Self {
        Self { queue }
    }
}

pub fn app_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/queue/sync", get(list_sync_queue))
        .route("/jobs/sync", post(submit_sync_job));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", v1_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    queue_depth: usize,
}

async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let queue_depth = state.queue.depth(SyncJob::QUEUE_NAME).await?;
    Ok(Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        queue_depth,
    }))
}

#[derive(Debug, Deserialize)]
struct QueueRangeQuery {
    #[serde(default)]
    start: i64,
    #[serde(default = "default_range_end")]
    end: i64,
}

const fn default_range_end() -> i64 {
    10
}

async fn list_sync_queue(
    State(state): State<AppState>,
    Query(range): Query<QueueRangeQuery>,
) -> Result<Json<Vec<SyncJobPayload>>, AppError> {
    let payloads = state
        .queue
        .list(SyncJob::QUEUE_NAME, range.start, range.end)
        .await?;

    let jobs = payloads
        .iter()
        .filter_map(|payload| {
            match SyncJob::decode(payload).and_then(|job| job.to_payload()) {
                Ok(job) => Some(job),
                Err(error) => {
                    tracing::warn!(%error, "Skipping undecodable queue entry");
                    None
                }
            }
        })
        .collect();
    Ok(Json(jobs))
}

#[derive(Debug, Deserialize)]
struct SubmitSyncJobRequest {
    device_id: i64,
    sync_from: String,
    sync_to: String,
}

async fn submit_sync_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitSyncJobRequest>,
) -> Result<(StatusCode, Json<SyncJobPayload>), AppError> {
    let mut job = SyncJob::new(request.device_id, &request.sync_from, &request.sync_to)?;
    job.submit(&state.queue).await?;

    let payload = job.to_payload().map_err(mnoc_core::Error::from)?;
    tracing::info!(
        endpoint = "jobs_sync",
        uid = job.uid(),
        device_id = job.device_id(),
        direction = %job.direction(),
        "Queued sync job"
    );
    Ok((StatusCode::CREATED, Json(payload)))
}
