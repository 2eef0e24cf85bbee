//! Incremental sync: fetch reviews posted since the last checkpoint.

use chrono::{DateTime, Utc};
use revdb_db::DbError;
use tokio::time::Instant;

use super::{Collector, LoopEnd, Progress, StopReason};
use crate::retry::retry_until;

impl Collector {
    /// Pages newest-first from offset 0, keeping reviews posted within
    /// `[since, now]`. Stops on an empty page, the upstream total, a page
    /// that lies entirely before `since`, or the run budget. The checkpoint
    /// advances unless an upstream error aborted the loop.
    pub(super) async fn incremental(
        &self,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
        progress: &mut Progress,
    ) -> Result<LoopEnd, DbError> {
        let deadline = Instant::now() + self.settings.run_budget;
        let page_size = self.settings.page_size;
        let backoff = self.settings.retry_backoff;
        let pause = self.settings.page_pause;

        tracing::info!(%since, %now, "incremental sync starting");

        let mut offset = 0u64;
        let mut known_total: Option<u64> = None;
        let stop_reason = loop {
            if offset > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            if Instant::now() >= deadline {
                tracing::info!(offset, "incremental sync budget exhausted");
                break StopReason::BudgetExhausted;
            }

            let page = match retry_until(backoff, deadline, || {
                self.source.fetch_page(offset, page_size)
            })
            .await
            {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(offset, error = %err, "incremental sync aborted by upstream error");
                    return Ok(LoopEnd {
                        stop_reason: StopReason::Aborted,
                        error: Some(err.to_string()),
                        advance_checkpoint: false,
                    });
                }
            };
            progress.pages_fetched += 1;

            if page.reviews.is_empty() {
                break StopReason::EndOfReviews;
            }
            if page.total_reviews.is_some() {
                known_total = page.total_reviews;
            }

            let fetched = page.reviews.len() as u64;
            let all_before_window = page.reviews.iter().all(|r| r.posted_at < since);
            let in_window: Vec<_> = page
                .reviews
                .into_iter()
                .filter(|r| r.posted_at >= since && r.posted_at <= now)
                .collect();
            self.store_page(in_window, progress).await?;
            offset += fetched;

            if all_before_window {
                break StopReason::WindowStart;
            }
            if known_total.is_some_and(|total| offset >= total) {
                break StopReason::EndOfReviews;
            }
        };

        Ok(LoopEnd {
            stop_reason,
            error: None,
            advance_checkpoint: true,
        })
    }
}
