//! Database operations for `collection_runs`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `collection_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub mode: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reviews_inserted: i64,
    pub pages_fetched: i64,
    pub error_message: Option<String>,
}

/// Counters recorded when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub reviews_inserted: i64,
    pub pages_fetched: i64,
    /// Set when the paging loop ended early on an upstream error. The run
    /// itself still succeeds because every committed page is kept.
    pub error_message: Option<String>,
}

const RUN_COLUMNS: &str = "id, public_id, trigger_source, mode, status, started_at, \
                           completed_at, reviews_inserted, pages_fetched, error_message";

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Creates a new collection run in `running` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(
    pool: &SqlitePool,
    trigger_source: &str,
    mode: &str,
    started_at: DateTime<Utc>,
) -> Result<CollectionRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, CollectionRunRow>(&format!(
        "INSERT INTO collection_runs (public_id, trigger_source, mode, status, started_at) \
         VALUES (?1, ?2, ?3, 'running', ?4) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(public_id)
    .bind(trigger_source)
    .bind(mode)
    .bind(started_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a `running` run as `succeeded` and records its counters.
///
/// Takes any executor so the caller can commit it in the same transaction
/// as the checkpoint it justifies.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_collection_run<'e, E>(
    executor: E,
    id: i64,
    stats: &RunStats,
) -> Result<(), DbError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'succeeded', completed_at = ?1, reviews_inserted = ?2, \
             pages_fetched = ?3, error_message = ?4 \
         WHERE id = ?5 AND status = 'running'",
    )
    .bind(Utc::now())
    .bind(stats.reviews_inserted)
    .bind(stats.pages_fetched)
    .bind(stats.error_message.as_deref())
    .bind(id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a `running` run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_collection_run(
    pool: &SqlitePool,
    id: i64,
    stats: &RunStats,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = 'failed', completed_at = ?1, reviews_inserted = ?2, \
             pages_fetched = ?3, error_message = ?4 \
         WHERE id = ?5 AND status = 'running'",
    )
    .bind(Utc::now())
    .bind(stats.reviews_inserted)
    .bind(stats.pages_fetched)
    .bind(stats.error_message.as_deref())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_collection_run(pool: &SqlitePool, id: i64) -> Result<CollectionRunRow, DbError> {
    sqlx::query_as::<_, CollectionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT ?1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deletes `idle` runs that started before `before`.
///
/// Returns the number of rows removed. Runs in any other mode are kept.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn prune_idle_runs(pool: &SqlitePool, before: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM collection_runs \
         WHERE mode = 'idle' AND status <> 'running' AND started_at < ?1",
    )
    .bind(before)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
