use super::{JobBackend, JobStatus};
use crate::jobs::JobSpec;
use tracing::info;

/// Logs what would run and reports success without spawning anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

impl JobBackend for DryRunBackend {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn execute(&self, job: &JobSpec) -> JobStatus {
        info!(job = %job.label(), command = %job.recipe, "dry run");
        JobStatus::Succeeded
    }
}
