//! Bounded-concurrency execution of jobs through a pluggable backend.
mod dry_run;
mod local;
mod pool;

pub use dry_run::DryRunBackend;
pub use local::LocalProcessBackend;
pub use pool::{PoolError, WorkerPool};

use crate::jobs::JobSpec;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::process::ExitStatus;
use std::time::Duration;

/// How one job ended. Execution problems are recorded here rather than raised, so one bad job
/// never stops its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    /// Non-zero exit; `code` is `None` if the process was killed by a signal.
    Failed { code: Option<i32> },
    TimedOut { after: Duration },
    LaunchFailed { reason: String },
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn from_exit_status(status: ExitStatus) -> Self {
        if status.success() {
            Self::Succeeded
        } else {
            Self::Failed {
                code: status.code(),
            }
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed { code: Some(code) } => write!(f, "failed with exit code {code}"),
            Self::Failed { code: None } => write!(f, "terminated by signal"),
            Self::TimedOut { after } => write!(f, "timed out after {after:?}"),
            Self::LaunchFailed { reason } => write!(f, "could not be launched: {reason}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job: JobSpec,
    pub status: JobStatus,
    pub duration: Duration,
}

/// Strategy for running a single job. Implementations must report every failure through the
/// returned status.
pub trait JobBackend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn execute(&self, job: &JobSpec) -> impl Future<Output = JobStatus> + Send;
}
