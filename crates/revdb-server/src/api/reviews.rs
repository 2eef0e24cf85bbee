//! Review aggregation endpoints.
//!
//! Category-based endpoints score any unscored reviews before reading, so
//! newly collected reviews show up without a separate enrichment step.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use revdb_core::{normalize_keyword, SentimentCategory};
use revdb_db::{CategoryReview, DislikedReviewRow, LikedReviewRow, ReviewSummaryRow};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CategoryCountItem {
    pub category: SentimentCategory,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct KeywordCounts {
    pub keyword: String,
    pub categories: Vec<CategoryCountItem>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn enrich(state: &AppState, req_id: &RequestId) -> Result<(), ApiError> {
    revdb_pipeline::enrich_missing_scores(&state.pool, state.classifier.as_ref())
        .await
        .map(|_| ())
        .map_err(|e| map_db_error(req_id.0.clone(), &e))
}

fn count_items(rows: Vec<revdb_db::CategoryCount>) -> Vec<CategoryCountItem> {
    rows.into_iter()
        .map(|row| CategoryCountItem {
            category: row.category,
            label: row.category.label(),
            count: row.count,
        })
        .collect()
}

pub(super) async fn latest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<ReviewSummaryRow>> {
    let rows = revdb_db::latest_reviews(&state.pool, normalize_limit(query.limit, 10))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(rows, req_id.0))
}

pub(super) async fn sensational(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<ReviewSummaryRow>> {
    let rows = revdb_db::most_commented(&state.pool, normalize_limit(query.limit, 5))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(rows, req_id.0))
}

pub(super) async fn most_liked(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<LikedReviewRow>> {
    let rows = revdb_db::most_liked_authors(&state.pool, normalize_limit(query.limit, 5))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(rows, req_id.0))
}

pub(super) async fn most_disliked(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<DislikedReviewRow>> {
    let rows = revdb_db::most_disliked(&state.pool, normalize_limit(query.limit, 5))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(rows, req_id.0))
}

pub(super) async fn sentimental(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<Vec<CategoryReview>> {
    enrich(&state, &req_id).await?;
    let rows = revdb_db::top_liked_by_category(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(rows, req_id.0))
}

pub(super) async fn overall_count(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<Vec<CategoryCountItem>> {
    enrich(&state, &req_id).await?;
    let rows = revdb_db::category_counts(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::ok(count_items(rows), req_id.0))
}

async fn keyword_counts(
    state: &AppState,
    req_id: RequestId,
    raw_keyword: &str,
) -> ApiResult<KeywordCounts> {
    let keyword = match normalize_keyword(raw_keyword) {
        Ok(keyword) => keyword,
        Err(e) => return Err(ApiError::new(req_id.0, "validation_error", e.to_string())),
    };

    enrich(state, &req_id).await?;
    let rows = revdb_db::keyword_counts_by_category(&state.pool, keyword)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = KeywordCounts {
        keyword: keyword.to_string(),
        categories: count_items(rows),
    };
    Ok(ApiResponse::ok(data, req_id.0))
}

pub(super) async fn feature(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<KeywordCounts> {
    keyword_counts(&state, req_id, "feature").await
}

pub(super) async fn graphics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> ApiResult<KeywordCounts> {
    keyword_counts(&state, req_id, "graphics").await
}

pub(super) async fn keyword(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(keyword): Path<String>,
) -> ApiResult<KeywordCounts> {
    keyword_counts(&state, req_id, &keyword).await
}
