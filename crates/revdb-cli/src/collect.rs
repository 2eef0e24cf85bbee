//! Collection and enrichment command handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use revdb_core::CollectorSettings;
use revdb_fetcher::ReviewClient;
use revdb_pipeline::{Collector, TriggerSource};
use revdb_sentiment::LexiconClassifier;

/// Run a single collection trigger against the configured upstream and print
/// the outcome as JSON.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, another run is in
/// flight, or a store write fails.
pub(crate) async fn run_collect(
    pool: &sqlx::SqlitePool,
    settings: &CollectorSettings,
) -> anyhow::Result<()> {
    let client = ReviewClient::from_settings(settings)?;
    let collector = Collector::new(pool.clone(), Arc::new(client), settings.clone());

    let outcome = collector.run(TriggerSource::Cli).await?;
    if let Some(error) = &outcome.error {
        tracing::warn!(run_id = %outcome.run_id, error = %error, "collection ended early");
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Score all unscored reviews with the lexicon classifier.
///
/// # Errors
///
/// Returns an error if reading or writing scores fails.
pub(crate) async fn run_enrich(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    let summary = revdb_pipeline::enrich_missing_scores(pool, &LexiconClassifier).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Print the checkpoint, when the next incremental sync is due, and the most
/// recent `limit` runs.
///
/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_status(
    pool: &sqlx::SqlitePool,
    sync_interval: chrono::Duration,
    limit: i64,
) -> anyhow::Result<()> {
    let checkpoint = revdb_db::get_checkpoint(pool).await?;
    let total = revdb_db::count_reviews(pool).await?;

    match checkpoint {
        Some(at) => {
            println!("Last collection: {}", fmt_time(Some(at)));
            println!("Next sync due:   {}", fmt_time(Some(at + sync_interval)));
        }
        None => println!("Last collection: never (next trigger runs a full backfill)"),
    }
    println!("Stored reviews:  {total}");
    println!();

    let runs = revdb_db::list_collection_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no collection runs recorded; run `collect` first");
        return Ok(());
    }

    let header = format!(
        "{:<21}{:<11}{:<18}{:<11}{:>9}{:>7}  ERROR",
        "STARTED", "TRIGGER", "MODE", "STATUS", "INSERTED", "PAGES"
    );
    println!("{header}");
    for run in &runs {
        println!(
            "{:<21}{:<11}{:<18}{:<11}{:>9}{:>7}  {}",
            fmt_time(Some(run.started_at)),
            run.trigger_source,
            run.mode,
            run.status,
            run.reviews_inserted,
            run.pages_fetched,
            run.error_message.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
