use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::due_summary::DueSummaryService;

const JOB_NAME: &str = "due_summary";

pub struct Scheduler {
    summary: DueSummaryService,
    config: SchedulerConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(summary: DueSummaryService, config: SchedulerConfig) -> Self {
        Self {
            summary,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`Scheduler::stop`] is called. Returns immediately when disabled.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        let offset = FixedOffset::east_opt(self.config.timezone_offset_minutes * 60)
            .context("Invalid scheduler timezone offset")?;

        let mut sched = JobScheduler::new().await?;

        let summary = self.summary.clone();
        let running = Arc::clone(&self.running);
        let job = Job::new_async_tz(self.config.cron_expression.as_str(), offset, move |_uuid, _lock| {
            let summary = summary.clone();
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_job(&summary).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!(
            cron = %self.config.cron_expression,
            offset = %offset,
            "Scheduler running"
        );

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }
}

/// One scheduled execution. Failures are logged and never propagated.
async fn run_job(summary: &DueSummaryService) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = JOB_NAME, "Starting scheduled due summary");

    match summary.run().await {
        Ok(result) => info!(
            event = "job_finished",
            job_name = JOB_NAME,
            count = result.count,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled due summary finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = JOB_NAME,
            error = %e,
            "Scheduled due summary failed"
        ),
    }
}
