//! Collection orchestrator.
//!
//! One trigger runs one of three modes, chosen from the checkpoint:
//!
//! | Checkpoint                  | Mode              |
//! |-----------------------------|-------------------|
//! | absent                      | `FullBackfill`    |
//! | older than `sync_interval`  | `IncrementalSync` |
//! | newer than `sync_interval`  | `Idle`            |
//!
//! Each fetched page is inserted in its own transaction before the next page
//! is requested. A backfill sets the checkpoint as soon as its total probe
//! succeeds; an incremental sync commits it together with the run's
//! completion once the paging loop ends.
//!
//! Idle runs are recorded like any other, but idle rows older than
//! [`IDLE_RUN_RETENTION_DAYS`] are pruned whenever a new idle run is recorded.

mod backfill;
mod incremental;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use revdb_core::CollectorSettings;
use revdb_db::{DbError, NewReview, RunStats};
use revdb_fetcher::{FetchedReview, ReviewSource};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::CollectError;

/// Days that idle run rows are kept in the run ledger.
pub const IDLE_RUN_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Api,
    Cli,
    Scheduler,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Api => "api",
            TriggerSource::Cli => "cli",
            TriggerSource::Scheduler => "scheduler",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    FullBackfill,
    IncrementalSync,
    Idle,
}

impl CollectionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionMode::FullBackfill => "full_backfill",
            CollectionMode::IncrementalSync => "incremental_sync",
            CollectionMode::Idle => "idle",
        }
    }
}

/// Why the paging loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nothing to do; the checkpoint is recent.
    Idle,
    /// Upstream returned an empty page or the offset reached its total.
    EndOfReviews,
    /// A whole page predated the incremental window.
    WindowStart,
    /// The run's time budget ran out.
    BudgetExhausted,
    /// An upstream error ended the loop.
    Aborted,
}

/// Result of one collection trigger.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub run_id: Uuid,
    pub mode: CollectionMode,
    pub reviews_inserted: u64,
    pub pages_fetched: u32,
    pub checkpoint_advanced: bool,
    pub stop_reason: StopReason,
    /// Upstream error that aborted the loop, if any.
    pub error: Option<String>,
}

/// Picks the mode for a trigger at `now`.
#[must_use]
pub fn select_mode(
    checkpoint: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    sync_interval: chrono::Duration,
) -> CollectionMode {
    match checkpoint {
        None => CollectionMode::FullBackfill,
        Some(at) if now - at >= sync_interval => CollectionMode::IncrementalSync,
        Some(_) => CollectionMode::Idle,
    }
}

#[derive(Debug, Default)]
struct Progress {
    reviews_inserted: u64,
    pages_fetched: u32,
}

impl Progress {
    fn stats(&self, error_message: Option<String>) -> RunStats {
        RunStats {
            reviews_inserted: i64::try_from(self.reviews_inserted).unwrap_or(i64::MAX),
            pages_fetched: i64::from(self.pages_fetched),
            error_message,
        }
    }
}

#[derive(Debug)]
struct LoopEnd {
    stop_reason: StopReason,
    error: Option<String>,
    advance_checkpoint: bool,
}

/// Runs collection triggers against one store and one review source.
///
/// At most one run is in flight per `Collector`; a concurrent trigger gets
/// [`CollectError::RunInProgress`] without touching the store.
pub struct Collector {
    pool: SqlitePool,
    source: Arc<dyn ReviewSource>,
    settings: CollectorSettings,
    in_flight: Mutex<()>,
}

impl Collector {
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        source: Arc<dyn ReviewSource>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            pool,
            source,
            settings,
            in_flight: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Runs one collection trigger at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::RunInProgress`] if another run holds the
    /// guard, or [`CollectError::Store`] if a store operation fails.
    pub async fn run(&self, trigger: TriggerSource) -> Result<CollectionOutcome, CollectError> {
        self.run_at(trigger, Utc::now()).await
    }

    /// Runs one collection trigger treating `now` as the current time.
    ///
    /// `now` decides the mode, bounds the incremental window, and becomes the
    /// new checkpoint.
    ///
    /// # Errors
    ///
    /// See [`Collector::run`].
    pub async fn run_at(
        &self,
        trigger: TriggerSource,
        now: DateTime<Utc>,
    ) -> Result<CollectionOutcome, CollectError> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::warn!(trigger = trigger.as_str(), "collection run already in progress");
            return Err(CollectError::RunInProgress);
        };

        let checkpoint = revdb_db::get_checkpoint(&self.pool).await?;
        let mode = select_mode(checkpoint, now, self.settings.sync_interval);
        let run =
            revdb_db::create_collection_run(&self.pool, trigger.as_str(), mode.as_str(), now)
                .await?;

        tracing::info!(
            run_id = %run.public_id,
            trigger = trigger.as_str(),
            mode = mode.as_str(),
            checkpoint = ?checkpoint,
            "collection run started"
        );

        let mut progress = Progress::default();
        let looped = match (mode, checkpoint) {
            (CollectionMode::FullBackfill, _) => self.backfill(now, &mut progress).await,
            (CollectionMode::IncrementalSync, Some(since)) => {
                self.incremental(since, now, &mut progress).await
            }
            _ => Ok(LoopEnd {
                stop_reason: StopReason::Idle,
                error: None,
                advance_checkpoint: false,
            }),
        };

        let end = match looped {
            Ok(end) => end,
            Err(err) => {
                self.fail_run_best_effort(run.id, &progress, &err).await;
                return Err(err.into());
            }
        };

        let stats = progress.stats(end.error.clone());
        if let Err(err) = self.finish_run(run.id, &stats, end.advance_checkpoint, now).await {
            self.fail_run_best_effort(run.id, &progress, &err).await;
            return Err(err.into());
        }

        if mode == CollectionMode::Idle {
            self.prune_idle_runs_best_effort(now).await;
        }

        let outcome = CollectionOutcome {
            run_id: run.public_id,
            mode,
            reviews_inserted: progress.reviews_inserted,
            pages_fetched: progress.pages_fetched,
            checkpoint_advanced: end.advance_checkpoint,
            stop_reason: end.stop_reason,
            error: end.error,
        };

        tracing::info!(
            run_id = %outcome.run_id,
            mode = mode.as_str(),
            reviews_inserted = outcome.reviews_inserted,
            pages_fetched = outcome.pages_fetched,
            checkpoint_advanced = outcome.checkpoint_advanced,
            stop_reason = ?outcome.stop_reason,
            "collection run finished"
        );

        Ok(outcome)
    }

    /// Commits the run's completion and, when earned, the new checkpoint in
    /// one transaction.
    async fn finish_run(
        &self,
        run_id: i64,
        stats: &RunStats,
        advance_checkpoint: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        if advance_checkpoint {
            revdb_db::upsert_checkpoint(&mut *tx, now).await?;
        }
        revdb_db::complete_collection_run(&mut *tx, run_id, stats).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn prune_idle_runs_best_effort(&self, now: DateTime<Utc>) {
        let cutoff = now - chrono::Duration::days(IDLE_RUN_RETENTION_DAYS);
        match revdb_db::prune_idle_runs(&self.pool, cutoff).await {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(pruned, "pruned old idle runs"),
            Err(e) => tracing::warn!(error = %e, "failed to prune old idle runs"),
        }
    }

    async fn fail_run_best_effort(&self, run_id: i64, progress: &Progress, err: &DbError) {
        tracing::error!(run_id, error = %err, "collection run failed");
        let stats = progress.stats(Some(err.to_string()));
        if let Err(mark_err) = revdb_db::fail_collection_run(&self.pool, run_id, &stats).await {
            tracing::error!(
                run_id,
                error = %mark_err,
                "failed to mark collection run as failed"
            );
        }
    }

    /// Inserts one page of reviews in a single transaction.
    async fn store_page(
        &self,
        reviews: Vec<FetchedReview>,
        progress: &mut Progress,
    ) -> Result<(), DbError> {
        let rows: Vec<NewReview> = reviews.into_iter().map(to_new_review).collect();
        progress.reviews_inserted += revdb_db::insert_reviews(&self.pool, &rows).await?;
        Ok(())
    }
}

fn to_new_review(review: FetchedReview) -> NewReview {
    NewReview {
        author_id: review.author_id,
        text: review.text,
        posted_at: review.posted_at,
        like_count: review.like_count,
        dislike_count: review.dislike_count,
        comment_count: review.comment_count,
    }
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
