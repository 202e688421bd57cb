//! The end-to-end run: segment discovery, job generation, execution and merging.
use crate::config::Config;
use crate::datafind::{write_cache, DataLocator};
use crate::executor::{JobBackend, JobResult, WorkerPool};
use crate::jobs::manifest::JobManifest;
use crate::jobs::{BuildOutcome, JobSpec, JobSpecBuilder, SpecError};
use crate::merge::{MergedDataset, ResultMerger};
use crate::segments::query::{QueryError, SegmentSource};
use crate::segments::{intersect, CoincidentSegment};
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Jobs generated for a run.
#[derive(Debug)]
pub struct Generated {
    pub segments: Vec<CoincidentSegment>,
    pub outcome: BuildOutcome,
}

/// Everything a full run produced, for reporting and the exit code.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub segments: usize,
    pub spec_failures: Vec<SpecError>,
    pub results: Vec<JobResult>,
    pub merged: Option<MergedDataset>,
}

impl RunSummary {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }

    pub fn has_failures(&self) -> bool {
        !self.spec_failures.is_empty()
            || self.failed_jobs().next().is_some()
            || self
                .merged
                .as_ref()
                .is_some_and(|merged| !merged.failures.is_empty())
    }
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queries every detector's segments over the configured range and intersects them.
    /// Segments shorter than `min_segment_duration` are dropped; having none left is an error.
    pub async fn discover_segments<S: SegmentSource>(
        &self,
        source: &S,
    ) -> Result<Vec<CoincidentSegment>> {
        let span = self.config.span()?;
        let flags = self.config.flags()?;
        let per_stream = source
            .query(&flags, span)
            .await
            .context("segment query failed")?;
        for (stream, intervals) in &per_stream {
            info!(%stream, segments = intervals.len(), "queried segments");
        }

        let min = self.config.min_segment_duration;
        let (segments, short): (Vec<_>, Vec<_>) = intersect(&per_stream)
            .into_iter()
            .partition(|segment| segment.duration() >= min);
        for segment in &short {
            warn!(%segment, min, "skipping segment shorter than the minimum duration");
        }

        if segments.is_empty() {
            return Err(QueryError::NoCoincidentSegments {
                start: span.start(),
                end: span.end(),
            }
            .into());
        }
        info!(count = segments.len(), "found coincident segments");
        Ok(segments)
    }

    /// Builds every (segment, detector) job, writes each job's data cache and saves the job
    /// manifest. Streams whose parameters are invalid are reported in the outcome; a failed
    /// data lookup stops the run.
    pub async fn generate<S: SegmentSource, L: DataLocator>(
        &self,
        source: &S,
        locator: &L,
    ) -> Result<Generated> {
        let segments = self.discover_segments(source).await?;
        let builder = JobSpecBuilder::new(self.config.layout(), self.config.tool.clone());
        let params = self.config.parameter_sets();

        let mut outcome = BuildOutcome::default();
        for segment in &segments {
            outcome.extend(builder.build(segment, &self.config.detectors, &params));
        }

        for job in &outcome.jobs {
            let frame_type = self
                .config
                .frame_type(&job.stream)
                .with_context(|| format!("no frame type for stream {}", job.stream))?;
            let files = write_cache(
                locator,
                &job.stream,
                frame_type,
                job.segment.interval(),
                &job.cache_path,
            )
            .await
            .with_context(|| format!("data lookup failed for {}", job.label()))?;
            info!(job = %job.label(), files, "wrote data cache");
        }

        let manifest_path = builder.layout().job_manifest();
        JobManifest::new(outcome.jobs.clone()).save(&manifest_path)?;
        info!(
            jobs = outcome.jobs.len(),
            failed = outcome.failures.len(),
            manifest = %manifest_path.display(),
            "generated jobs"
        );

        Ok(Generated { segments, outcome })
    }

    /// Runs `jobs` on `backend`. With `retry_failed`, jobs that did not succeed are submitted
    /// once more and their second result replaces the first.
    pub async fn execute<B: JobBackend>(
        &self,
        backend: B,
        jobs: Vec<JobSpec>,
        retry_failed: bool,
    ) -> Result<Vec<JobResult>> {
        let pool = WorkerPool::new(backend, self.config.max_parallel)?;
        let results = pool.run(jobs).await;
        if !retry_failed {
            return Ok(results);
        }

        let (mut done, failed): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.status.is_success());
        if failed.is_empty() {
            return Ok(done);
        }
        info!(jobs = failed.len(), "retrying failed jobs");
        done.extend(pool.run(failed.into_iter().map(|r| r.job).collect()).await);
        Ok(done)
    }

    pub fn merge(&self) -> Result<MergedDataset> {
        let merger = ResultMerger::new(self.config.layout(), self.config.merge.mode);
        let output = self.config.merge_output();
        merger
            .merge(
                &self.config.detectors,
                &self.config.channel_by_stream(),
                &output,
            )
            .with_context(|| format!("merge into {:?} failed", output))
    }

    /// Generate, execute and merge in one go.
    pub async fn run<S, L, B>(
        &self,
        source: &S,
        locator: &L,
        backend: B,
        retry_failed: bool,
    ) -> Result<RunSummary>
    where
        S: SegmentSource,
        L: DataLocator,
        B: JobBackend,
    {
        let generated = self.generate(source, locator).await?;
        let results = self
            .execute(backend, generated.outcome.jobs, retry_failed)
            .await?;
        let merged = self.merge()?;

        Ok(RunSummary {
            segments: generated.segments.len(),
            spec_failures: generated.outcome.failures,
            results,
            merged: Some(merged),
        })
    }
}
