//! Lazy sentiment backfill for stored reviews.

use revdb_core::{MAX_SCORE, MIN_SCORE};
use revdb_db::DbError;
use revdb_sentiment::SentimentClassifier;
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichSummary {
    /// Reviews that had text and no score when the pass started.
    pub candidates: usize,
    pub scored: usize,
    /// Candidates left unscored: the classifier returned NaN, or another
    /// writer scored the review first.
    pub skipped: usize,
}

/// Scores every review that has text but no sentiment score yet.
///
/// Scores are clamped to `[-1, 1]` and written at most once per review.
/// Reviews without text are never selected.
///
/// # Errors
///
/// Returns [`DbError`] if listing or updating reviews fails.
pub async fn enrich_missing_scores(
    pool: &SqlitePool,
    classifier: &dyn SentimentClassifier,
) -> Result<EnrichSummary, DbError> {
    let pending = revdb_db::list_unscored_reviews(pool).await?;
    let mut summary = EnrichSummary {
        candidates: pending.len(),
        ..EnrichSummary::default()
    };

    for review in pending {
        let raw = classifier.classify(&review.review_text);
        if raw.is_nan() {
            tracing::warn!(review_id = review.id, "classifier returned NaN; leaving unscored");
            summary.skipped += 1;
            continue;
        }

        let score = raw.clamp(MIN_SCORE, MAX_SCORE);
        if revdb_db::set_sentiment_score(pool, review.id, score).await? {
            summary.scored += 1;
        } else {
            summary.skipped += 1;
        }
    }

    if summary.candidates > 0 {
        tracing::info!(
            candidates = summary.candidates,
            scored = summary.scored,
            skipped = summary.skipped,
            "sentiment enrichment complete"
        );
    }

    Ok(summary)
}
