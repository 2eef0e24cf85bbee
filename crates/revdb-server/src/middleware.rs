use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::ApiError;

/// Request ID carried in request extensions and echoed as `x-request-id`.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Tags each request with an ID and runs it inside a `request` span.
///
/// An incoming `x-request-id` header is reused; otherwise a `UUIDv4` is
/// generated. Every event logged while handling the request, including the
/// collector's, carries the ID.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id);
    let mut res = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Enforces a minimum spacing between accepted manual collection triggers.
///
/// Each accepted trigger can hold the upstream for a full run budget, so
/// repeated `POST /collection/run` calls are turned away until the cooldown
/// has passed. A zero cooldown accepts every trigger.
#[derive(Debug, Clone)]
pub struct TriggerThrottle {
    cooldown: Duration,
    last_accepted: Arc<Mutex<Option<Instant>>>,
}

impl TriggerThrottle {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: Arc::new(Mutex::new(None)),
        }
    }

    /// Accepts a trigger at `now`, or returns how long the caller must wait.
    async fn try_accept(&self, now: Instant) -> Result<(), Duration> {
        let mut last = self.last_accepted.lock().await;
        if let Some(previous) = *last {
            let elapsed = now.saturating_duration_since(previous);
            if elapsed < self.cooldown {
                return Err(self.cooldown - elapsed);
            }
        }
        *last = Some(now);
        Ok(())
    }
}

/// Whole seconds to advertise in `Retry-After`, rounded up.
fn retry_after_secs(wait: Duration) -> u64 {
    wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
}

/// Middleware applied to the collection trigger route only.
pub async fn throttle_collection_trigger(
    State(throttle): State<TriggerThrottle>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(wait) = throttle.try_accept(Instant::now()).await {
        let retry_after = retry_after_secs(wait);
        tracing::info!(retry_after_secs = retry_after, "collection trigger throttled");

        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map_or_else(String::new, |id| id.0.clone());
        let mut response = ApiError::new(
            request_id,
            "rate_limited",
            format!("a collection was triggered recently; retry in {retry_after}s"),
        )
        .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request as HttpRequest, StatusCode},
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    use super::*;

    fn app(cooldown: Duration) -> Router {
        let trigger = Router::new()
            .route("/trigger", post(|| async { "started" }))
            .route_layer(axum::middleware::from_fn_with_state(
                TriggerThrottle::new(cooldown),
                throttle_collection_trigger,
            ));

        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .merge(trigger)
            .layer(axum::middleware::from_fn(request_id))
    }

    fn request(method: Method, uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn request_id_is_generated_when_missing() {
        let response = app(Duration::ZERO)
            .oneshot(request(Method::GET, "/ping"))
            .await
            .expect("response");
        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("x-request-id header");
        assert!(Uuid::parse_str(id).is_ok(), "expected a UUID, got {id}");
    }

    #[tokio::test]
    async fn request_id_is_echoed_when_present() {
        let request = HttpRequest::builder()
            .uri("/ping")
            .header("x-request-id", "req-abc")
            .body(Body::empty())
            .expect("request");
        let response = app(Duration::ZERO)
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-abc")
        );
    }

    #[tokio::test]
    async fn second_trigger_inside_cooldown_gets_429_envelope() {
        let app = app(Duration::from_secs(60));

        let first = app
            .clone()
            .oneshot(request(Method::POST, "/trigger"))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(request(Method::POST, "/trigger"))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .expect("retry-after header");
        assert!((1..=60).contains(&retry_after));

        let header_id = second
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .expect("x-request-id header");
        let body = to_bytes(second.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["error"]["code"], "rate_limited");
        assert_eq!(json["meta"]["request_id"], header_id);

        // Reads are never throttled.
        let ping = app
            .oneshot(request(Method::GET, "/ping"))
            .await
            .expect("response");
        assert_eq!(ping.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn zero_cooldown_accepts_every_trigger() {
        let app = app(Duration::ZERO);
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(request(Method::POST, "/trigger"))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn throttle_reopens_after_cooldown() {
        let throttle = TriggerThrottle::new(Duration::from_secs(10));
        let start = Instant::now();

        assert!(throttle.try_accept(start).await.is_ok());
        let wait = throttle
            .try_accept(start + Duration::from_secs(4))
            .await
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(6));
        assert!(throttle
            .try_accept(start + Duration::from_secs(10))
            .await
            .is_ok());
    }

    #[test]
    fn retry_after_rounds_up_partial_seconds() {
        assert_eq!(retry_after_secs(Duration::from_secs(3)), 3);
        assert_eq!(retry_after_secs(Duration::from_millis(3_200)), 4);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
    }
}
