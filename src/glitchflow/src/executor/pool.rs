use super::{JobBackend, JobResult, JobStatus};
use crate::jobs::JobSpec;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("max_parallel must be at least 1")]
    ZeroWorkers,
}

/// A fixed number of workers draining a shared job queue through one backend.
pub struct WorkerPool<B> {
    backend: Arc<B>,
    max_parallel: usize,
}

impl<B: JobBackend> WorkerPool<B> {
    pub fn new(backend: B, max_parallel: usize) -> Result<Self, PoolError> {
        if max_parallel == 0 {
            return Err(PoolError::ZeroWorkers);
        }
        Ok(Self {
            backend: Arc::new(backend),
            max_parallel,
        })
    }

    /// Runs every job and returns one result per job, in completion order.
    pub async fn run(&self, jobs: Vec<JobSpec>) -> Vec<JobResult> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }

        let (job_tx, job_rx) = mpsc::channel(total);
        for job in jobs {
            // capacity equals the job count, so this never waits
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);

        let queue = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let workers = self.max_parallel.min(total);
        info!(
            jobs = total,
            workers,
            backend = self.backend.name(),
            "starting worker pool"
        );

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let backend = Arc::clone(&self.backend);
            let results = result_tx.clone();
            set.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some(job) = next else { break };
                    let result = run_one(Arc::clone(&backend), job, worker).await;
                    if results.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("worker task failed: {e}");
            }
        }

        let failed = results.iter().filter(|r| !r.status.is_success()).count();
        info!(jobs = results.len(), failed, "worker pool drained");
        results
    }
}

/// Executes one job on its own task so a panicking backend only costs that job.
async fn run_one<B: JobBackend>(backend: Arc<B>, job: JobSpec, worker: usize) -> JobResult {
    let label = job.label();
    debug!(worker, job = %label, "job started");
    let started = Instant::now();

    let spec = job.clone();
    let status = match tokio::spawn(async move { backend.execute(&spec).await }).await {
        Ok(status) => status,
        Err(e) => JobStatus::LaunchFailed {
            reason: format!("backend task failed: {e}"),
        },
    };
    let duration = started.elapsed();

    if status.is_success() {
        info!(worker, job = %label, ?duration, "job finished");
    } else {
        warn!(worker, job = %label, ?duration, %status, "job failed");
    }

    JobResult {
        job,
        status,
        duration,
    }
}
