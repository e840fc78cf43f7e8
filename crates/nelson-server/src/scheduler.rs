//! Background job scheduler.
//!
//! Registers the ingestion cycle as a repeated job at the configured interval,
//! plus a one-shot job so the first cycle runs right after startup instead of
//! one full interval later.

use std::sync::Arc;
use std::time::Duration;

use nelson_ingest::IngestCycle;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a job
/// cannot be registered, or the scheduler cannot be started.
pub async fn build_scheduler(
    cycle: Arc<IngestCycle>,
    interval: Duration,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_startup_run(&scheduler, Arc::clone(&cycle)).await?;
    register_ingest_job(&scheduler, cycle, interval).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_ingest_job(
    scheduler: &JobScheduler,
    cycle: Arc<IngestCycle>,
    interval: Duration,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let cycle = Arc::clone(&cycle);
        Box::pin(async move {
            tracing::info!("scheduler: starting ingest cycle");
            run_cycle(&cycle).await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: registered ingest job"
    );
    Ok(())
}

async fn register_startup_run(
    scheduler: &JobScheduler,
    cycle: Arc<IngestCycle>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_one_shot_async(Duration::ZERO, move |_uuid, _lock| {
        let cycle = Arc::clone(&cycle);
        Box::pin(async move {
            tracing::info!("scheduler: starting initial ingest cycle");
            run_cycle(&cycle).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn run_cycle(cycle: &IngestCycle) {
    match cycle.run_once().await {
        Some(report) => tracing::info!(
            persisted = report.persisted,
            enqueued = report.enqueued,
            "scheduler: ingest cycle complete"
        ),
        None => tracing::info!("scheduler: ingest cycle skipped"),
    }
}
