//! Read-only aggregation queries over stored reviews.
//!
//! Category-based queries only see reviews that already carry a score; callers
//! run sentiment enrichment first when they want fresh results. Category
//! assignment uses [`SentimentCategory::sql_case`], the same band table as the
//! in-process classifier.

use chrono::{DateTime, Utc};
use revdb_core::SentimentCategory;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A review with text, as listed by `latest_reviews` and `most_commented`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewSummaryRow {
    pub id: i64,
    pub author_id: String,
    pub review_text: String,
    pub posted_at: DateTime<Utc>,
    pub sentiment_score: Option<f64>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

/// The most-liked review within one sentiment category.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReview {
    pub category: SentimentCategory,
    pub id: i64,
    pub author_id: String,
    pub review_text: String,
    pub sentiment_score: f64,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: SentimentCategory,
    pub count: i64,
}

/// An author's single highest-liked review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LikedReviewRow {
    pub id: i64,
    pub author_id: String,
    pub review_text: String,
    pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DislikedReviewRow {
    pub author_id: String,
    pub review_text: String,
    pub dislike_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RawCategoryReview {
    category: String,
    id: i64,
    author_id: String,
    review_text: String,
    sentiment_score: f64,
    like_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct RawCategoryCount {
    category: String,
    count: i64,
}

const SUMMARY_COLUMNS: &str = "id, author_id, review_text, posted_at, sentiment_score, \
                               like_count, dislike_count, comment_count";

// ---------------------------------------------------------------------------
// Listing queries
// ---------------------------------------------------------------------------

/// The `limit` most recently posted reviews that have text.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_reviews(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<ReviewSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewSummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM reviews \
         WHERE review_text IS NOT NULL \
         ORDER BY posted_at DESC, id DESC \
         LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The `limit` reviews with text that drew the most comments.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn most_commented(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<ReviewSummaryRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewSummaryRow>(&format!(
        "SELECT {SUMMARY_COLUMNS} FROM reviews \
         WHERE review_text IS NOT NULL \
         ORDER BY comment_count DESC, id ASC \
         LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// One row per author holding their highest-liked review, best first.
///
/// Ties within an author go to the earliest stored review.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn most_liked_authors(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<LikedReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, LikedReviewRow>(
        "WITH ranked AS ( \
             SELECT id, author_id, review_text, like_count, \
                    ROW_NUMBER() OVER ( \
                        PARTITION BY author_id ORDER BY like_count DESC, id ASC \
                    ) AS rn \
             FROM reviews \
             WHERE review_text IS NOT NULL \
         ) \
         SELECT id, author_id, review_text, like_count \
         FROM ranked \
         WHERE rn = 1 \
         ORDER BY like_count DESC, id ASC \
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The `limit` most-disliked distinct `(author, text, dislike_count)` rows.
///
/// Reviews without text are skipped. Ordering is applied to the full distinct set before limiting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn most_disliked(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<DislikedReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, DislikedReviewRow>(
        "SELECT DISTINCT author_id, review_text, dislike_count \
         FROM reviews \
         WHERE review_text IS NOT NULL \
         ORDER BY dislike_count DESC, author_id ASC \
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Category queries
// ---------------------------------------------------------------------------

/// The single most-liked scored review in each sentiment category.
///
/// Categories with no scored reviews are omitted. Results are ordered from
/// very positive to very negative.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_liked_by_category(pool: &SqlitePool) -> Result<Vec<CategoryReview>, DbError> {
    let case = SentimentCategory::sql_case("sentiment_score");
    let raw = sqlx::query_as::<_, RawCategoryReview>(&format!(
        "WITH scored AS ( \
             SELECT id, author_id, review_text, sentiment_score, like_count, \
                    {case} AS category \
             FROM reviews \
             WHERE sentiment_score IS NOT NULL AND review_text IS NOT NULL \
         ), \
         ranked AS ( \
             SELECT *, ROW_NUMBER() OVER ( \
                 PARTITION BY category ORDER BY like_count DESC, id ASC \
             ) AS rn \
             FROM scored \
             WHERE category IS NOT NULL \
         ) \
         SELECT category, id, author_id, review_text, sentiment_score, like_count \
         FROM ranked \
         WHERE rn = 1"
    ))
    .fetch_all(pool)
    .await?;

    let mut rows: Vec<CategoryReview> = raw
        .into_iter()
        .filter_map(|r| {
            SentimentCategory::from_slug(&r.category).map(|category| CategoryReview {
                category,
                id: r.id,
                author_id: r.author_id,
                review_text: r.review_text,
                sentiment_score: r.sentiment_score,
                like_count: r.like_count,
            })
        })
        .collect();
    rows.sort_by_key(|r| r.category);

    Ok(rows)
}

/// Per-category count of scored reviews whose text contains `keyword`.
///
/// Matching is a case-sensitive substring test. All five categories are
/// always present, with zero counts where nothing matched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn keyword_counts_by_category(
    pool: &SqlitePool,
    keyword: &str,
) -> Result<Vec<CategoryCount>, DbError> {
    let case = SentimentCategory::sql_case("sentiment_score");
    let raw = sqlx::query_as::<_, RawCategoryCount>(&format!(
        "SELECT {case} AS category, COUNT(*) AS count \
         FROM reviews \
         WHERE sentiment_score IS NOT NULL \
           AND review_text IS NOT NULL \
           AND instr(review_text, ?1) > 0 \
         GROUP BY category"
    ))
    .bind(keyword)
    .fetch_all(pool)
    .await?;

    Ok(zero_filled(raw))
}

/// Histogram of all scored reviews by category, zero-filled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn category_counts(pool: &SqlitePool) -> Result<Vec<CategoryCount>, DbError> {
    let case = SentimentCategory::sql_case("sentiment_score");
    let raw = sqlx::query_as::<_, RawCategoryCount>(&format!(
        "SELECT {case} AS category, COUNT(*) AS count \
         FROM reviews \
         WHERE sentiment_score IS NOT NULL \
         GROUP BY category"
    ))
    .fetch_all(pool)
    .await?;

    Ok(zero_filled(raw))
}

fn zero_filled(raw: Vec<RawCategoryCount>) -> Vec<CategoryCount> {
    SentimentCategory::ALL
        .into_iter()
        .map(|category| CategoryCount {
            category,
            count: raw
                .iter()
                .filter(|r| r.category == category.slug())
                .map(|r| r.count)
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::reviews::{insert_review, set_sentiment_score, NewReview};
    use crate::connect_in_memory;

    fn review(author: &str, text: Option<&str>, posted_secs: i64) -> NewReview {
        NewReview {
            author_id: author.to_string(),
            text: text.map(str::to_string),
            posted_at: Utc.timestamp_opt(posted_secs, 0).unwrap(),
            like_count: 0,
            dislike_count: 0,
            comment_count: 0,
        }
    }

    async fn scored(pool: &SqlitePool, author: &str, text: &str, score: f64, likes: i64) -> i64 {
        let mut new = review(author, Some(text), 1_700_000_000);
        new.like_count = likes;
        let id = insert_review(pool, &new).await.unwrap();
        set_sentiment_score(pool, id, score).await.unwrap();
        id
    }

    fn count_for(counts: &[CategoryCount], category: SentimentCategory) -> i64 {
        counts
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
            .unwrap()
    }

    #[tokio::test]
    async fn latest_reviews_orders_by_posted_at_and_skips_null_text() {
        let pool = connect_in_memory().await.unwrap();
        insert_review(&pool, &review("a", Some("old"), 100)).await.unwrap();
        insert_review(&pool, &review("b", Some("new"), 300)).await.unwrap();
        insert_review(&pool, &review("c", None, 400)).await.unwrap();
        insert_review(&pool, &review("d", Some("mid"), 200)).await.unwrap();

        let rows = latest_reviews(&pool, 10).await.unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.review_text.as_str()).collect();
        assert_eq!(texts, vec!["new", "mid", "old"]);

        let limited = latest_reviews(&pool, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn most_commented_orders_by_comment_count() {
        let pool = connect_in_memory().await.unwrap();
        for (text, comments) in [("quiet", 0), ("loud", 40), ("busy", 12)] {
            let mut new = review("a", Some(text), 1);
            new.comment_count = comments;
            insert_review(&pool, &new).await.unwrap();
        }

        let rows = most_commented(&pool, 2).await.unwrap();
        let texts: Vec<_> = rows.iter().map(|r| r.review_text.as_str()).collect();
        assert_eq!(texts, vec!["loud", "busy"]);
    }

    #[tokio::test]
    async fn most_disliked_orders_before_limiting() {
        let pool = connect_in_memory().await.unwrap();
        for (i, dislikes) in [5_i64, 3, 9, 1, 7].into_iter().enumerate() {
            let mut new = review(&format!("author-{i}"), Some("meh"), 1);
            new.dislike_count = dislikes;
            insert_review(&pool, &new).await.unwrap();
        }

        let rows = most_disliked(&pool, 3).await.unwrap();
        let counts: Vec<_> = rows.iter().map(|r| r.dislike_count).collect();
        assert_eq!(counts, vec![9, 7, 5]);
    }

    #[tokio::test]
    async fn most_disliked_collapses_duplicates() {
        let pool = connect_in_memory().await.unwrap();
        for _ in 0..2 {
            let mut new = review("dup", Some("same text"), 1);
            new.dislike_count = 4;
            insert_review(&pool, &new).await.unwrap();
        }

        let rows = most_disliked(&pool, 5).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn most_disliked_skips_reviews_without_text() {
        let pool = connect_in_memory().await.unwrap();
        let mut silent = review("x", None, 1);
        silent.dislike_count = 99;
        insert_review(&pool, &silent).await.unwrap();
        let mut meh = review("y", Some("meh"), 2);
        meh.dislike_count = 1;
        insert_review(&pool, &meh).await.unwrap();

        let rows = most_disliked(&pool, 5).await.unwrap();
        assert_eq!(
            rows,
            vec![DislikedReviewRow {
                author_id: "y".to_string(),
                review_text: "meh".to_string(),
                dislike_count: 1,
            }]
        );
    }

    #[tokio::test]
    async fn most_liked_authors_keeps_one_review_per_author() {
        let pool = connect_in_memory().await.unwrap();
        for (author, text, likes) in [
            ("alice", "first", 10),
            ("alice", "best", 50),
            ("bob", "only", 30),
            ("carol", "tiny", 1),
        ] {
            let mut new = review(author, Some(text), 1);
            new.like_count = likes;
            insert_review(&pool, &new).await.unwrap();
        }

        let rows = most_liked_authors(&pool, 5).await.unwrap();
        let pairs: Vec<_> = rows
            .iter()
            .map(|r| (r.author_id.as_str(), r.review_text.as_str(), r.like_count))
            .collect();
        assert_eq!(
            pairs,
            vec![("alice", "best", 50), ("bob", "only", 30), ("carol", "tiny", 1)]
        );
    }

    #[tokio::test]
    async fn keyword_counts_are_zero_filled_per_category() {
        let pool = connect_in_memory().await.unwrap();
        scored(&pool, "a", "the graphics are stunning", 0.6, 0).await;
        scored(&pool, "b", "graphics are fine", 0.05, 0).await;
        scored(&pool, "c", "graphics ruin it", -0.6, 0).await;
        scored(&pool, "d", "no mention here", 0.3, 0).await;

        let counts = keyword_counts_by_category(&pool, "graphics").await.unwrap();
        assert_eq!(counts.len(), 5);
        assert_eq!(count_for(&counts, SentimentCategory::VeryPositive), 1);
        assert_eq!(count_for(&counts, SentimentCategory::Positive), 0);
        assert_eq!(count_for(&counts, SentimentCategory::Neutral), 1);
        assert_eq!(count_for(&counts, SentimentCategory::Negative), 0);
        assert_eq!(count_for(&counts, SentimentCategory::VeryNegative), 1);
    }

    #[tokio::test]
    async fn keyword_match_is_case_sensitive() {
        let pool = connect_in_memory().await.unwrap();
        scored(&pool, "a", "Graphics upgrade", 0.6, 0).await;

        let counts = keyword_counts_by_category(&pool, "graphics").await.unwrap();
        assert!(counts.iter().all(|c| c.count == 0));
    }

    #[tokio::test]
    async fn keyword_counts_ignore_unscored_reviews() {
        let pool = connect_in_memory().await.unwrap();
        insert_review(&pool, &review("a", Some("feature creep"), 1))
            .await
            .unwrap();

        let counts = keyword_counts_by_category(&pool, "feature").await.unwrap();
        assert!(counts.iter().all(|c| c.count == 0));
    }

    #[tokio::test]
    async fn category_counts_use_band_edges() {
        let pool = connect_in_memory().await.unwrap();
        for (i, score) in [0.5, 0.1, -0.1, -0.5, -1.0, 1.0].into_iter().enumerate() {
            scored(&pool, &format!("a{i}"), "text", score, 0).await;
        }

        let counts = category_counts(&pool).await.unwrap();
        assert_eq!(count_for(&counts, SentimentCategory::VeryPositive), 2);
        assert_eq!(count_for(&counts, SentimentCategory::Positive), 1);
        assert_eq!(count_for(&counts, SentimentCategory::Neutral), 1);
        assert_eq!(count_for(&counts, SentimentCategory::Negative), 1);
        assert_eq!(count_for(&counts, SentimentCategory::VeryNegative), 1);
    }

    #[tokio::test]
    async fn category_counts_on_empty_store_are_all_zero() {
        let pool = connect_in_memory().await.unwrap();
        let counts = category_counts(&pool).await.unwrap();
        let categories: Vec<_> = counts.iter().map(|c| c.category).collect();
        assert_eq!(categories, SentimentCategory::ALL.to_vec());
        assert!(counts.iter().all(|c| c.count == 0));
    }

    #[tokio::test]
    async fn top_liked_picks_highest_like_count_with_lowest_id_tiebreak() {
        let pool = connect_in_memory().await.unwrap();
        scored(&pool, "a", "love it", 0.8, 5).await;
        let best = scored(&pool, "b", "adore it", 0.9, 20).await;
        let tie_first = scored(&pool, "c", "hate it", -0.7, 8).await;
        scored(&pool, "d", "loathe it", -0.9, 8).await;
        let neutral = scored(&pool, "e", "it exists", 0.0, 1).await;

        let rows = top_liked_by_category(&pool).await.unwrap();
        let picked: Vec<_> = rows.iter().map(|r| (r.category, r.id)).collect();
        assert_eq!(
            picked,
            vec![
                (SentimentCategory::VeryPositive, best),
                (SentimentCategory::Neutral, neutral),
                (SentimentCategory::VeryNegative, tie_first),
            ]
        );
    }
}
