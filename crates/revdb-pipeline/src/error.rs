use revdb_db::DbError;
use thiserror::Error;

/// Errors that abort a collection trigger.
///
/// Upstream failures are not errors at this level: they end the paging loop
/// and are reported in the run's outcome, keeping every committed page.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("a collection run is already in progress")]
    RunInProgress,

    #[error("store error: {0}")]
    Store(#[from] DbError),
}

impl From<sqlx::Error> for CollectError {
    fn from(err: sqlx::Error) -> Self {
        CollectError::Store(DbError::Sqlx(err))
    }
}
