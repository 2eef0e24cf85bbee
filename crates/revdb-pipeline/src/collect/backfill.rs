//! First-run backfill: page through the full review history.

use chrono::{DateTime, Utc};
use revdb_db::DbError;
use tokio::time::Instant;

use super::{Collector, LoopEnd, Progress, StopReason};
use crate::retry::retry_until;

impl Collector {
    /// Pages from offset 0 until the probed total, an empty page, or the run
    /// budget.
    ///
    /// The checkpoint is set to `now` as soon as the probe succeeds, before
    /// the first page is stored. A later upstream abort or store error then
    /// cannot send the next trigger back to offset 0 over rows that are
    /// already committed. Only a failed probe leaves it absent.
    pub(super) async fn backfill(
        &self,
        now: DateTime<Utc>,
        progress: &mut Progress,
    ) -> Result<LoopEnd, DbError> {
        let deadline = Instant::now() + self.settings.run_budget;
        let page_size = self.settings.page_size;
        let backoff = self.settings.retry_backoff;

        let total = match retry_until(backoff, deadline, || self.source.probe_total()).await {
            Ok(total) => total,
            Err(err) => {
                tracing::warn!(error = %err, "backfill total probe failed");
                return Ok(LoopEnd {
                    stop_reason: StopReason::Aborted,
                    error: Some(err.to_string()),
                    advance_checkpoint: false,
                });
            }
        };
        revdb_db::upsert_checkpoint(&self.pool, now).await?;
        tracing::info!(total, page_size, checkpoint = %now, "backfill starting");

        let mut offset = 0u64;
        let mut error = None;
        let stop_reason = loop {
            if offset >= total {
                break StopReason::EndOfReviews;
            }
            if Instant::now() >= deadline {
                tracing::info!(offset, total, "backfill budget exhausted");
                break StopReason::BudgetExhausted;
            }

            let page = match retry_until(backoff, deadline, || {
                self.source.fetch_page(offset, page_size)
            })
            .await
            {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(offset, error = %err, "backfill aborted by upstream error");
                    error = Some(err.to_string());
                    break StopReason::Aborted;
                }
            };
            progress.pages_fetched += 1;

            if page.reviews.is_empty() {
                break StopReason::EndOfReviews;
            }

            let fetched = page.reviews.len() as u64;
            self.store_page(page.reviews, progress).await?;
            offset += fetched;

            tracing::debug!(offset, total, inserted = progress.reviews_inserted, "backfill page stored");
        };

        Ok(LoopEnd {
            stop_reason,
            error,
            advance_checkpoint: true,
        })
    }
}
