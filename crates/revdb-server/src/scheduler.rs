//! Background job scheduler.
//!
//! Registers the recurring collection trigger. Extra triggers are cheap: a
//! run inside the sync interval is recorded as idle and touches nothing.

use std::sync::Arc;

use revdb_pipeline::{CollectError, Collector, TriggerSource};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    collector: Arc<Collector>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_collection_job(&scheduler, collector, cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_collection_job(
    scheduler: &JobScheduler,
    collector: Arc<Collector>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let collector = Arc::clone(&collector);

        Box::pin(async move {
            tracing::info!("scheduler: collection trigger fired");
            match collector.run(TriggerSource::Scheduler).await {
                Ok(outcome) => tracing::info!(
                    run_id = %outcome.run_id,
                    mode = outcome.mode.as_str(),
                    reviews_inserted = outcome.reviews_inserted,
                    "scheduler: collection trigger complete"
                ),
                Err(CollectError::RunInProgress) => {
                    tracing::info!("scheduler: collection already running; skipping");
                }
                Err(e) => tracing::error!(error = %e, "scheduler: collection run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered collection job");
    Ok(())
}
