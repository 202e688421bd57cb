use super::{report_results, Outcome};
use crate::config::Config;
use crate::executor::{DryRunBackend, JobResult, LocalProcessBackend};
use crate::jobs::manifest::JobManifest;
use crate::jobs::JobSpec;
use crate::pipeline::Pipeline;
use anyhow::Result;
use glitchflow_common::info_message;

pub async fn execute(config: Config, dry_run: bool, retry_failed: bool) -> Result<Outcome> {
    let manifest = JobManifest::load(&config.layout().job_manifest())?;
    let pipeline = Pipeline::new(config);
    info_message!(
        "Running {} jobs, {} at a time",
        manifest.jobs.len(),
        pipeline.config().max_parallel
    );

    let results = execute_jobs(&pipeline, manifest.jobs, dry_run, retry_failed).await?;
    Ok(Outcome::from_failures(report_results(&results)))
}

async fn execute_jobs(
    pipeline: &Pipeline,
    jobs: Vec<JobSpec>,
    dry_run: bool,
    retry_failed: bool,
) -> Result<Vec<JobResult>> {
    if dry_run {
        pipeline.execute(DryRunBackend, jobs, retry_failed).await
    } else {
        let backend = LocalProcessBackend::new(pipeline.config().job_timeout());
        pipeline.execute(backend, jobs, retry_failed).await
    }
}
