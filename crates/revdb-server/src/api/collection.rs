use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use revdb_pipeline::{CollectError, CollectionOutcome, TriggerSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CollectionRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionRunItem {
    collection_run_id: Uuid,
    trigger_source: String,
    mode: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    reviews_inserted: i64,
    pages_fetched: i64,
    error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct CheckpointItem {
    last_collection_time: Option<DateTime<Utc>>,
    /// Earliest time a trigger will run an incremental sync.
    next_sync_due: Option<DateTime<Utc>>,
}

pub(super) fn map_collect_error(request_id: String, error: &CollectError) -> ApiError {
    match error {
        CollectError::RunInProgress => ApiError::new(
            request_id,
            "conflict",
            "a collection run is already in progress",
        ),
        CollectError::Store(e) => map_db_error(request_id, e),
    }
}

/// Runs one collection trigger synchronously and returns its outcome.
pub(super) async fn run_collection(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CollectionOutcome>>, ApiError> {
    let outcome = state
        .collector
        .run(TriggerSource::Api)
        .await
        .map_err(|e| map_collect_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(outcome, req_id.0))
}

pub(super) async fn list_collection_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CollectionRunsQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionRunItem>>>, ApiError> {
    let rows = revdb_db::list_collection_runs(&state.pool, normalize_limit(query.limit, 50))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CollectionRunItem {
            collection_run_id: row.public_id,
            trigger_source: row.trigger_source,
            mode: row.mode,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            reviews_inserted: row.reviews_inserted,
            pages_fetched: row.pages_fetched,
            error_message: row.error_message,
        })
        .collect();

    Ok(ApiResponse::ok(data, req_id.0))
}

pub(super) async fn get_checkpoint(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CheckpointItem>>, ApiError> {
    let checkpoint = revdb_db::get_checkpoint(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let interval = state.collector.settings().sync_interval;
    let data = CheckpointItem {
        last_collection_time: checkpoint,
        next_sync_due: checkpoint.map(|at| at + interval),
    };
    Ok(ApiResponse::ok(data, req_id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn run_in_progress_maps_to_conflict() {
        let err = map_collect_error("req-1".to_string(), &CollectError::RunInProgress);
        assert_eq!(err.error.code, "conflict");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn store_error_maps_to_internal_error() {
        let err = map_collect_error(
            "req-1".to_string(),
            &CollectError::Store(revdb_db::DbError::NotFound),
        );
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
