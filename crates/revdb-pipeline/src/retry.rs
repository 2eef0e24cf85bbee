//! Deadline-bounded retry for upstream fetches.
//!
//! Transient failures ([`FetchError::is_transient`]) are retried after
//! `backoff` plus up to 25% jitter. A retry is only attempted if the wait
//! ends before `deadline`; otherwise the last error is returned so the
//! caller can stop its loop. Non-transient errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use revdb_fetcher::FetchError;
use tokio::time::Instant;

/// Returns `base` stretched by a random factor in `[1.0, 1.25)`.
fn jittered(base: Duration) -> Duration {
    base.mul_f64(1.0 + rand::random::<f64>() * 0.25)
}

pub(crate) async fn retry_until<T, F, Fut>(
    backoff: Duration,
    deadline: Instant,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) => {
                let delay = jittered(backoff);
                if Instant::now() + delay >= deadline {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "upstream error and no budget left for another attempt"
                    );
                    return Err(err);
                }
                attempt += 1;
                #[allow(clippy::cast_possible_truncation)]
                let delay_ms = delay.as_millis() as u64;
                tracing::warn!(
                    attempt,
                    delay_ms,
                    error = %err,
                    "transient upstream error, retrying after back-off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unavailable() -> FetchError {
        FetchError::UpstreamUnavailable {
            status: 503,
            url: "http://localhost/appreviews/1".to_string(),
        }
    }

    #[test]
    fn jitter_stays_within_a_quarter_above_base() {
        let base = Duration::from_secs(5);
        for _ in 0..100 {
            let d = jittered(base);
            assert!(d >= base);
            assert!(d < base.mul_f64(1.25) + Duration::from_millis(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_after_backoff() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let deadline = start + Duration::from_secs(60);

        let result = retry_until(Duration::from_secs(5), deadline, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(unavailable())
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_when_backoff_would_pass_deadline() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let deadline = start + Duration::from_secs(3);

        let result: Result<(), _> = retry_until(Duration::from_secs(5), deadline, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

        assert!(matches!(result, Err(FetchError::UpstreamUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_is_not_retried() {
        let calls = AtomicU32::new(0);
        let deadline = Instant::now() + Duration::from_secs(60);

        let result: Result<(), _> = retry_until(Duration::from_secs(5), deadline, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(FetchError::UpstreamMalformed {
                    context: "test".to_string(),
                    reason: "bad".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::UpstreamMalformed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
