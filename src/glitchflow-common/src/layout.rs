//! On-disk layout of a project directory. Every stream owns a private working directory, so
//! jobs for different streams never write to the same files.
use std::path::{Path, PathBuf};

const CONFIG_EXTENSION: &str = "cfg";
const CACHE_EXTENSION: &str = "lcf";
const TRIGGER_OUTPUT_DIR: &str = "trigger_output";
const MERGE_DIR: &str = "merge";
const LOG_DIR: &str = "logs";
const JOB_MANIFEST_FILE: &str = "jobs.json";
const LOG_FILE: &str = "glitchflow.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a possibly relative path against the project root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn stream_dir(&self, stream: &str) -> PathBuf {
        self.root.join(stream)
    }

    pub fn config_file(&self, stream: &str) -> PathBuf {
        self.stream_dir(stream)
            .join(format!("job_{stream}.{CONFIG_EXTENSION}"))
    }

    pub fn script_file(&self, stream: &str, start: i64, end: i64) -> PathBuf {
        self.stream_dir(stream).join(format!("run_{start}-{end}.sh"))
    }

    pub fn cache_file(&self, stream: &str, start: i64, end: i64) -> PathBuf {
        self.stream_dir(stream)
            .join(format!("data_{start}-{end}.{CACHE_EXTENSION}"))
    }

    pub fn output_dir(&self, stream: &str) -> PathBuf {
        self.stream_dir(stream).join(TRIGGER_OUTPUT_DIR)
    }

    /// Directory where the trigger tool leaves its merged per-chunk result files.
    pub fn merge_dir(&self, stream: &str, channel: &str) -> PathBuf {
        self.output_dir(stream)
            .join(MERGE_DIR)
            .join(format!("{stream}:{channel}"))
    }

    pub fn log_dir(&self, stream: &str) -> PathBuf {
        self.stream_dir(stream).join(LOG_DIR)
    }

    pub fn stdout_file(&self, stream: &str, start: i64, end: i64) -> PathBuf {
        self.log_dir(stream).join(format!("{start}-{end}.out"))
    }

    pub fn stderr_file(&self, stream: &str, start: i64, end: i64) -> PathBuf {
        self.log_dir(stream).join(format!("{start}-{end}.err"))
    }

    pub fn job_manifest(&self) -> PathBuf {
        self.root.join(JOB_MANIFEST_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }
}
