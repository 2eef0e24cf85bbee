//! Database operations for the `reviews` table.
//!
//! Reviews are append-only. The only mutation after insert is setting
//! `sentiment_score` once, from NULL to a value.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

/// A review as fetched from upstream, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub author_id: String,
    pub text: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

/// A row from the `reviews` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub author_id: String,
    pub review_text: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub sentiment_score: Option<f64>,
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
}

/// A review still waiting for a sentiment score.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnscoredReview {
    pub id: i64,
    pub review_text: String,
}

async fn insert_on(conn: &mut SqliteConnection, review: &NewReview) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO reviews \
             (author_id, review_text, posted_at, sentiment_score, \
              like_count, dislike_count, comment_count) \
         VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6) \
         RETURNING id",
    )
    .bind(&review.author_id)
    .bind(review.text.as_deref())
    .bind(review.posted_at)
    .bind(review.like_count)
    .bind(review.dislike_count)
    .bind(review.comment_count)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Insert a single review with a NULL sentiment score and return its id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_review(pool: &SqlitePool, review: &NewReview) -> Result<i64, DbError> {
    let mut conn = pool.acquire().await?;
    insert_on(&mut conn, review).await
}

/// Insert one page of reviews in a single transaction.
///
/// Either every review in `reviews` is committed or none is. Callers use one
/// call per fetched page, which makes the page the unit of durability: pages
/// committed before a later failure stay committed.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert or the commit fails; the
/// transaction is rolled back on drop.
pub async fn insert_reviews(pool: &SqlitePool, reviews: &[NewReview]) -> Result<u64, DbError> {
    if reviews.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for review in reviews {
        insert_on(&mut tx, review).await?;
    }
    tx.commit().await?;

    Ok(reviews.len() as u64)
}

/// Fetch a single review by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_review(pool: &SqlitePool, id: i64) -> Result<ReviewRow, DbError> {
    sqlx::query_as::<_, ReviewRow>(
        "SELECT id, author_id, review_text, posted_at, sentiment_score, \
                like_count, dislike_count, comment_count \
         FROM reviews \
         WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Total number of stored reviews.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_reviews(pool: &SqlitePool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Reviews with text but no sentiment score yet, oldest id first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unscored_reviews(pool: &SqlitePool) -> Result<Vec<UnscoredReview>, DbError> {
    let rows = sqlx::query_as::<_, UnscoredReview>(
        "SELECT id, review_text \
         FROM reviews \
         WHERE sentiment_score IS NULL AND review_text IS NOT NULL \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Set the sentiment score of a review that does not have one yet.
///
/// Returns `true` if the score was written, `false` if the review already
/// had a score (or does not exist). An existing score is never overwritten.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails, including when `score`
/// falls outside `[-1, 1]` and violates the column check.
pub async fn set_sentiment_score(pool: &SqlitePool, id: i64, score: f64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE reviews \
         SET sentiment_score = ?1 \
         WHERE id = ?2 AND sentiment_score IS NULL",
    )
    .bind(score)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
