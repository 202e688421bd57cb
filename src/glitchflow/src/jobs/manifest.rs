//! The job manifest (`jobs.json`): every job generated for a run, so jobs can be executed in a
//! separate invocation from the one that generated them.
use super::JobSpec;
use anyhow::{Context, Result};
use glitchflow_common::fs::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobManifest {
    pub version: u32,
    pub jobs: Vec<JobSpec>,
}

impl JobManifest {
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            jobs,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self).context("failed to serialize job manifest")?;
        write_atomic(path, &json).with_context(|| format!("failed to write {:?}", path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read job manifest {:?}", path))?;
        let manifest: JobManifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse job manifest {:?}", path))?;
        if manifest.version != MANIFEST_VERSION {
            anyhow::bail!(
                "unsupported job manifest version {} in {:?}",
                manifest.version,
                path
            );
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::test_support::shell_job;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_survives_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.json");
        let manifest = JobManifest::new(vec![
            shell_job(tmp.path(), "H1", 0, "true"),
            shell_job(tmp.path(), "L1", 0, "true"),
        ]);

        manifest.save(&path).unwrap();
        assert_eq!(JobManifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("jobs.json");
        std::fs::write(&path, r#"{"version": 99, "jobs": []}"#).unwrap();

        let err = JobManifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported job manifest version 99"));
    }
}
