//! The singleton collection checkpoint.
//!
//! `review_collection_status` holds at most one row (`id = 1`, enforced by a
//! CHECK constraint). Writes always upsert that row; there is no insert path
//! that could create a second checkpoint.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use crate::DbError;

/// Returns the last collection time, or `None` if no collection has run yet.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_checkpoint(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>, DbError> {
    let checkpoint: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT last_collection_time FROM review_collection_status WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(checkpoint)
}

/// Create or move the checkpoint to `at`.
///
/// Accepts a pool or a connection/transaction, so the checkpoint can be
/// committed together with the run record that justifies it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_checkpoint<'e, E>(executor: E, at: DateTime<Utc>) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO review_collection_status (id, last_collection_time) \
         VALUES (1, ?1) \
         ON CONFLICT (id) DO UPDATE SET \
             last_collection_time = excluded.last_collection_time",
    )
    .bind(at)
    .execute(executor)
    .await?;
    Ok(())
}
