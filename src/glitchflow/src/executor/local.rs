use super::{JobBackend, JobStatus};
use crate::jobs::JobSpec;
use glitchflow_common::fs::ensure_dir;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs each job's recipe as a child process on this machine, with stdout and stderr captured
/// to the job's log files.
#[derive(Debug, Clone, Default)]
pub struct LocalProcessBackend {
    timeout: Option<Duration>,
}

impl LocalProcessBackend {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn spawn_and_wait(&self, job: &JobSpec) -> io::Result<JobStatus> {
        let program = which::which(&job.recipe.program).map_err(|e| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("`{}` not found: {e}", job.recipe.program),
            )
        })?;

        let stdout = create_log(&job.stdout_path)?;
        let stderr = create_log(&job.stderr_path)?;

        let mut child = Command::new(program)
            .args(&job.recipe.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()?;
        debug!(job = %job.label(), pid = ?child.id(), "spawned");

        let status = match self.timeout {
            None => child.wait().await?,
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(job = %job.label(), "timed out after {:?}, killing", limit);
                    if let Err(e) = child.kill().await {
                        warn!(job = %job.label(), "failed to kill timed out job: {e}");
                    }
                    return Ok(JobStatus::TimedOut { after: limit });
                }
            },
        };

        Ok(JobStatus::from_exit_status(status))
    }
}

fn create_log(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    File::create(path)
}

impl JobBackend for LocalProcessBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn execute(&self, job: &JobSpec) -> JobStatus {
        self.spawn_and_wait(job)
            .await
            .unwrap_or_else(|e| JobStatus::LaunchFailed {
                reason: e.to_string(),
            })
    }
}
