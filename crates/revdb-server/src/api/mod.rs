mod collection;
mod reviews;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use revdb_pipeline::Collector;
use revdb_sentiment::SentimentClassifier;
use serde::Serialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, throttle_collection_trigger, RequestId, TriggerThrottle};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub collector: Arc<Collector>,
    pub classifier: Arc<dyn SentimentClassifier>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

/// Clamp a caller-supplied `limit` to `[1, 200]`, using `default` when absent.
pub(super) fn normalize_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &revdb_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn collection_router(throttle: TriggerThrottle) -> Router<AppState> {
    let trigger = Router::new()
        .route("/api/v1/collection/run", post(collection::run_collection))
        .route_layer(axum::middleware::from_fn_with_state(
            throttle,
            throttle_collection_trigger,
        ));

    Router::new()
        .merge(trigger)
        .route("/api/v1/collection/runs", get(collection::list_collection_runs))
        .route("/api/v1/collection/checkpoint", get(collection::get_checkpoint))
}

fn review_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/reviews/latest", get(reviews::latest))
        .route("/api/v1/reviews/sensational", get(reviews::sensational))
        .route("/api/v1/reviews/sentimental", get(reviews::sentimental))
        .route("/api/v1/reviews/overall-count", get(reviews::overall_count))
        .route("/api/v1/reviews/most-liked", get(reviews::most_liked))
        .route("/api/v1/reviews/most-disliked", get(reviews::most_disliked))
        .route("/api/v1/reviews/feature", get(reviews::feature))
        .route("/api/v1/reviews/graphics", get(reviews::graphics))
        .route("/api/v1/reviews/keyword/{keyword}", get(reviews::keyword))
}

/// Builds the HTTP app. Only the collection trigger is throttled.
pub fn build_app(state: AppState, throttle: TriggerThrottle) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .merge(collection_router(throttle))
        .merge(review_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match revdb_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
