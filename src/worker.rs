//! # Provisioner Service
//!
//! Background task that drains the provisioning_jobs queue: each claimed job
//! creates and migrates one tenant database. Runs until its shutdown token
//! fires; jitter spreads job starts within a tick so a burst of signups does
//! not hammer the database server all at once.

use std::sync::Arc;

use metrics::{counter, gauge, histogram};
use rand::Rng;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::provisioning_job;
use crate::provisioning::ProvisioningService;
use crate::repositories::ProvisioningJobRepository;

/// Background provisioning service
pub struct Provisioner {
    config: Arc<AppConfig>,
    provisioning: Arc<ProvisioningService>,
    jobs: ProvisioningJobRepository,
}

#[derive(Debug, Default)]
struct TickStats {
    jobs_claimed: u64,
    jobs_succeeded: u64,
    jobs_failed: u64,
}

impl Provisioner {
    /// Create a new provisioner instance
    pub fn new(
        config: Arc<AppConfig>,
        provisioning: Arc<ProvisioningService>,
        jobs: ProvisioningJobRepository,
    ) -> Self {
        Self {
            config,
            provisioning,
            jobs,
        }
    }

    /// Run the provisioning loop until the provided shutdown token fires
    #[instrument(skip_all)]
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ApiError> {
        info!("Starting provisioner service");
        let tick_interval = TokioDuration::from_secs(self.config.provisioner.tick_interval_seconds);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Provisioner shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = std::time::Instant::now();
                    if let Err(err) = self.tick().await {
                        error!(error = ?err, "Provisioner tick failed");
                    }
                    let elapsed = tick_started.elapsed();
                    histogram!("provisioner_tick_duration_ms")
                        .record(elapsed.as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Provisioner service stopped");
        Ok(())
    }

    /// Execute one tick: claim due jobs up to the concurrency limit and run them
    #[instrument(skip_all)]
    pub async fn tick(&self) -> Result<(), ApiError> {
        let mut stats = TickStats::default();
        let concurrency = self.config.provisioner.concurrency as usize;

        // Claiming flips each job to running, so a crash mid-tick leaves the
        // claimed jobs visibly stuck rather than silently requeued.
        let mut claimed = Vec::new();
        while claimed.len() < concurrency {
            match self.jobs.claim_next_queued().await? {
                Some(job) => claimed.push(job),
                None => break,
            }
        }

        if claimed.is_empty() {
            return Ok(());
        }

        stats.jobs_claimed = claimed.len() as u64;
        info!(claimed = claimed.len(), "Claimed provisioning jobs");

        let mut handles = Vec::new();

        for job in claimed {
            let provisioning = self.provisioning.clone();
            let jobs = self.jobs.clone();
            let jitter = self.compute_jitter();

            let handle = tokio::spawn(async move {
                if jitter > 0 {
                    debug!(job_id = %job.id, jitter_seconds = jitter, "Applying jitter before provisioning");
                    sleep(TokioDuration::from_secs(jitter)).await;
                }
                process_job(&provisioning, &jobs, job).await
            });

            handles.push(handle);
        }

        for handle in handles {
            match handle.await {
                Ok(true) => stats.jobs_succeeded += 1,
                Ok(false) => stats.jobs_failed += 1,
                Err(e) => {
                    stats.jobs_failed += 1;
                    error!(error = ?e, "Provisioning task panicked or was cancelled");
                }
            }
        }

        gauge!("provisioner_jobs_claimed_gauge").set(stats.jobs_claimed as f64);
        counter!("provisioner_jobs_succeeded_total").increment(stats.jobs_succeeded);
        counter!("provisioner_jobs_failed_total").increment(stats.jobs_failed);

        debug!(
            jobs_claimed = stats.jobs_claimed,
            jobs_succeeded = stats.jobs_succeeded,
            jobs_failed = stats.jobs_failed,
            "Provisioner tick completed"
        );

        Ok(())
    }

    /// Compute jitter delay based on configuration
    fn compute_jitter(&self) -> u64 {
        if self.config.provisioner.jitter_factor <= 0.0 {
            return 0;
        }

        let max_delay_seconds = (self.config.provisioner.tick_interval_seconds as f64
            * self.config.provisioner.jitter_factor) as u64;

        if max_delay_seconds == 0 {
            return 0;
        }

        let mut rng = rand::thread_rng();
        rng.gen_range(0..=max_delay_seconds)
    }
}

/// Run one claimed job to completion, recording the outcome on the job and
/// tenant rows. Returns whether the run succeeded.
#[instrument(skip_all, fields(job_id = %job.id, tenant_id = %job.tenant_id))]
async fn process_job(
    provisioning: &ProvisioningService,
    jobs: &ProvisioningJobRepository,
    job: provisioning_job::Model,
) -> bool {
    let run_started = std::time::Instant::now();

    match provisioning.setup_tenant_database(&job.tenant_id).await {
        Ok(report) => {
            histogram!("provisioner_job_duration_ms")
                .record(run_started.elapsed().as_secs_f64() * 1_000.0);

            if let Err(e) = jobs.mark_succeeded(job.id).await {
                error!(job_id = %job.id, "Failed to mark provisioning job succeeded: {}", e);
            }

            info!(
                job_id = %job.id,
                tenant_id = %job.tenant_id,
                applied = ?report.applied,
                skipped = ?report.skipped,
                duration_ms = run_started.elapsed().as_millis(),
                "Provisioning job succeeded"
            );
            true
        }
        Err(e) => {
            error!(
                job_id = %job.id,
                tenant_id = %job.tenant_id,
                error = %e,
                "Provisioning job failed"
            );

            provisioning
                .record_job_failure(job.id, &job.tenant_id, &e)
                .await;

            false
        }
    }
}
