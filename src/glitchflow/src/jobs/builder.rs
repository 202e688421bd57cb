use super::params::{render_ini, ParameterSet, SpecError, TriggerParameters};
use super::{InvocationRecipe, JobSpec};
use crate::config::ToolConfig;
use crate::segments::{CoincidentSegment, StreamId};
use glitchflow_common::fs::{ensure_dir, write_script};
use glitchflow_common::layout::ProjectLayout;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Jobs built for one segment, plus the streams that could not be built.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub jobs: Vec<JobSpec>,
    pub failures: Vec<SpecError>,
}

impl BuildOutcome {
    pub fn extend(&mut self, other: BuildOutcome) {
        self.jobs.extend(other.jobs);
        self.failures.extend(other.failures);
    }
}

/// Materializes job specifications under a project directory.
#[derive(Debug, Clone)]
pub struct JobSpecBuilder {
    layout: ProjectLayout,
    tool: ToolConfig,
}

impl JobSpecBuilder {
    pub fn new(layout: ProjectLayout, tool: ToolConfig) -> Self {
        Self { layout, tool }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Builds one job per stream for `segment`. A stream with a bad parameter set or an
    /// unwritable directory is reported in `failures` and does not stop the other streams.
    pub fn build(
        &self,
        segment: &CoincidentSegment,
        streams: &[StreamId],
        params: &BTreeMap<StreamId, ParameterSet>,
    ) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        for stream in streams {
            match self.build_one(segment, stream, params) {
                Ok(job) => {
                    debug!(job = %job.label(), script = ?job.script_path, "built job");
                    outcome.jobs.push(job);
                }
                Err(e) => {
                    warn!(%segment, "{e}");
                    outcome.failures.push(e);
                }
            }
        }
        outcome
    }

    fn build_one(
        &self,
        segment: &CoincidentSegment,
        stream: &StreamId,
        params: &BTreeMap<StreamId, ParameterSet>,
    ) -> Result<JobSpec, SpecError> {
        let set = params.get(stream).ok_or_else(|| SpecError::UnknownStream {
            stream: stream.clone(),
        })?;
        // validate before touching the filesystem
        let parameters = TriggerParameters::from_set(stream, set)?;

        let fs_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SpecError::Filesystem {
                stream: stream.clone(),
                path,
                source,
            }
        };

        let stream_dir = self.layout.stream_dir(stream);
        let output_dir = self.layout.output_dir(stream);
        let log_dir = self.layout.log_dir(stream);
        for dir in [&stream_dir, &output_dir, &log_dir] {
            ensure_dir(dir).map_err(fs_err(dir.as_path()))?;
        }

        let (start, end) = (segment.start(), segment.end());
        let config_path = self.layout.config_file(stream);
        let script_path = self.layout.script_file(stream, start, end);
        let cache_path = self.layout.cache_file(stream, start, end);

        let entries = parameters.entries(stream);
        std::fs::write(&config_path, render_ini(&self.tool.section, &entries))
            .map_err(fs_err(config_path.as_path()))?;

        let recipe = InvocationRecipe::trigger_tool(
            &self.tool,
            stream,
            segment,
            &config_path,
            &output_dir,
            &cache_path,
        );
        let script = recipe.render_script().map_err(fs_err(script_path.as_path()))?;
        write_script(&script_path, &script).map_err(fs_err(script_path.as_path()))?;

        Ok(JobSpec {
            stream: stream.clone(),
            segment: *segment,
            parameters: entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            config_path,
            script_path,
            output_dir,
            cache_path,
            stdout_path: self.layout.stdout_file(stream, start, end),
            stderr_path: self.layout.stderr_file(stream, start, end),
            recipe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::params::tests::complete_set;
    use crate::segments::Interval;
    use tempfile::TempDir;

    fn builder(root: &Path) -> JobSpecBuilder {
        JobSpecBuilder::new(
            ProjectLayout::new(root),
            ToolConfig {
                program: "omicron-process".to_string(),
                section: "GW".to_string(),
                verbose: false,
            },
        )
    }

    fn segment(start: i64, end: i64) -> CoincidentSegment {
        CoincidentSegment::new(Interval::new(start, end).unwrap())
    }

    fn streams(names: &[&str]) -> Vec<StreamId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn params_for(names: &[&str]) -> BTreeMap<StreamId, ParameterSet> {
        names
            .iter()
            .map(|s| (s.to_string(), complete_set()))
            .collect()
    }

    #[test]
    fn test_one_job_per_stream_for_a_segment() {
        let tmp = TempDir::new().unwrap();
        let outcome = builder(tmp.path()).build(
            &segment(50, 100),
            &streams(&["A", "B"]),
            &params_for(&["A", "B"]),
        );

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.jobs.len(), 2);
        assert_eq!(outcome.jobs[0].stream, "A");
        assert_eq!(outcome.jobs[1].stream, "B");
        for job in &outcome.jobs {
            assert_eq!((job.segment.start(), job.segment.end()), (50, 100));
            assert!(tmp.path().join(&job.stream).is_dir());
            assert!(job.output_dir.is_dir());
            assert!(job.config_path.is_file());
            assert!(job.script_path.is_file());
        }
    }

    #[test]
    fn test_segments_times_streams_jobs() {
        let tmp = TempDir::new().unwrap();
        let builder = builder(tmp.path());
        let names = ["H1", "L1", "V1"];

        let mut all = BuildOutcome::default();
        for seg in [segment(0, 100), segment(200, 300)] {
            all.extend(builder.build(&seg, &streams(&names), &params_for(&names)));
        }

        assert_eq!(all.jobs.len(), 6);
        let scripts: std::collections::HashSet<_> =
            all.jobs.iter().map(|j| j.script_path.clone()).collect();
        assert_eq!(scripts.len(), 6);
    }

    #[test]
    fn test_build_is_idempotent_on_existing_directories() {
        let tmp = TempDir::new().unwrap();
        let builder = builder(tmp.path());
        let first = builder.build(&segment(0, 64), &streams(&["H1"]), &params_for(&["H1"]));
        let second = builder.build(&segment(0, 64), &streams(&["H1"]), &params_for(&["H1"]));

        assert!(first.failures.is_empty() && second.failures.is_empty());
        assert_eq!(first.jobs, second.jobs);
    }

    #[test]
    fn test_config_and_script_contents() {
        let tmp = TempDir::new().unwrap();
        let outcome = builder(tmp.path()).build(
            &segment(50, 100),
            &streams(&["H1"]),
            &params_for(&["H1"]),
        );
        let job = &outcome.jobs[0];

        let config = std::fs::read_to_string(&job.config_path).unwrap();
        assert!(config.starts_with("[GW]\n"));
        assert!(config.contains("channels = H1:GDS-CALIB_STRAIN"));
        assert_eq!(job.parameters["frametype"], "H1_HOFT_C00");

        let script = std::fs::read_to_string(&job.script_path).unwrap();
        assert!(script.contains("--gps 50 100"));
        assert!(script.contains("--ifo H1"));
        assert!(job.recipe.args.iter().all(|a| a != "--verbose"));
    }

    #[test]
    fn test_bad_stream_does_not_block_others() {
        let tmp = TempDir::new().unwrap();
        let mut params = params_for(&["H1", "L1"]);
        if let Some(l1) = params.get_mut("L1") {
            l1.tuning.snr_threshold = None;
        }

        let outcome = builder(tmp.path()).build(
            &segment(0, 100),
            &streams(&["H1", "L1", "V1"]),
            &params,
        );

        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(outcome.jobs[0].stream, "H1");
        assert_eq!(outcome.failures.len(), 2);
        assert!(matches!(
            &outcome.failures[0],
            SpecError::MissingParameter { stream, field: "snr_threshold" } if stream == "L1"
        ));
        assert!(matches!(&outcome.failures[1], SpecError::UnknownStream { stream } if stream == "V1"));
        // nothing is written for a stream that fails validation
        assert!(!tmp.path().join("L1").exists());
    }

    #[test]
    fn test_filesystem_failure_is_reported_per_stream() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("H1"), b"a file where a directory should be").unwrap();

        let outcome = builder(tmp.path()).build(
            &segment(0, 100),
            &streams(&["H1", "L1"]),
            &params_for(&["H1", "L1"]),
        );

        assert_eq!(outcome.jobs.len(), 1);
        assert_eq!(outcome.jobs[0].stream, "L1");
        assert!(matches!(&outcome.failures[0], SpecError::Filesystem { stream, .. } if stream == "H1"));
    }
}
