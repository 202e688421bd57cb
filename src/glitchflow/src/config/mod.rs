mod config_loader;
mod defaults;

pub use config_loader::{ConfigLoader, ConfigOverrides};

use crate::jobs::{ParameterSet, Tuning};
use crate::merge::MergeMode;
use crate::segments::query::StreamFlag;
use crate::segments::{Interval, StreamId};
use anyhow::{bail, Context, Result};
use glitchflow_common::layout::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub project_dir: PathBuf,
    pub detectors: Vec<StreamId>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub max_parallel: usize,
    /// Per-job wall-clock limit in seconds; 0 disables it.
    pub job_timeout_secs: u64,
    /// Coincident segments shorter than this are not processed.
    pub min_segment_duration: i64,

    #[serde(default)]
    pub segments: SegmentsConfig,
    #[serde(default)]
    pub datafind: DataFindConfig,
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default)]
    pub streams: BTreeMap<StreamId, StreamConfig>,
    #[serde(default)]
    pub merge: MergeConfig,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSourceKind {
    #[default]
    Dqsegdb,
    File,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SegmentsConfig {
    pub source: SegmentSourceKind,
    pub url: String,
    /// Offline segment list, relative to `project_dir` unless absolute.
    pub file: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    #[default]
    Gwdatafind,
    Directory,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DataFindConfig {
    pub source: LocatorKind,
    pub url: String,
    pub urltype: String,
    /// Frame tree to scan, relative to `project_dir` unless absolute.
    pub directory: Option<PathBuf>,
    pub timeout_secs: u64,
}

/// How the external trigger tool is invoked.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolConfig {
    pub program: String,
    pub section: String,
    pub verbose: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StreamConfig {
    pub channel: String,
    pub frame_type: String,
    /// Flag queried for valid segments; falls back to `state_flag`.
    pub segment_flag: Option<String>,
    pub state_flag: Option<String>,
    #[serde(default)]
    pub tuning: Tuning,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Artifact path, relative to `project_dir` unless absolute.
    pub output: PathBuf,
    pub mode: MergeMode,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            bail!("max_parallel must be at least 1");
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start >= end {
                bail!("start ({start}) must be before end ({end})");
            }
        }
        if self.detectors.is_empty() {
            bail!("no detectors configured");
        }

        let mut seen = BTreeSet::new();
        for detector in &self.detectors {
            if !seen.insert(detector) {
                bail!("detector {detector} is listed more than once");
            }
            if !self.streams.contains_key(detector) {
                bail!("detector {detector} has no [streams.{detector}] table");
            }
        }
        Ok(())
    }

    /// Anchors the relative input paths at `project_dir`, the same way `merge.output` is.
    pub(crate) fn resolve_paths(&mut self) {
        let layout = self.layout();
        for path in [&mut self.segments.file, &mut self.datafind.directory]
            .into_iter()
            .flatten()
        {
            *path = layout.resolve(path);
        }
    }

    /// The global analysis range.
    pub fn span(&self) -> Result<Interval> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            bail!("start and end must be set (config file or --start/--end)");
        };
        Interval::new(start, end).context("invalid analysis range")
    }

    /// Per-stream parameter sets with shared tuning overlaid by stream overrides.
    pub fn parameter_sets(&self) -> BTreeMap<StreamId, ParameterSet> {
        self.streams
            .iter()
            .map(|(stream, cfg)| {
                let set = ParameterSet {
                    channel: cfg.channel.clone(),
                    frame_type: cfg.frame_type.clone(),
                    state_flag: cfg.state_flag.clone(),
                    tuning: self.tuning.overlay(&cfg.tuning),
                };
                (stream.clone(), set)
            })
            .collect()
    }

    pub fn channel_by_stream(&self) -> BTreeMap<StreamId, String> {
        self.streams
            .iter()
            .map(|(stream, cfg)| (stream.clone(), cfg.channel.clone()))
            .collect()
    }

    /// Segment flags to query, one per configured detector.
    pub fn flags(&self) -> Result<Vec<StreamFlag>> {
        self.detectors
            .iter()
            .map(|detector| {
                let stream = self
                    .streams
                    .get(detector)
                    .with_context(|| format!("detector {detector} is not configured"))?;
                let flag = stream
                    .segment_flag
                    .as_ref()
                    .or(stream.state_flag.as_ref())
                    .with_context(|| {
                        format!("detector {detector} needs segment_flag or state_flag")
                    })?;
                Ok(StreamFlag::new(detector.clone(), flag.clone()))
            })
            .collect()
    }

    pub fn frame_type(&self, stream: &str) -> Option<&str> {
        self.streams.get(stream).map(|s| s.frame_type.as_str())
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.project_dir.clone())
    }

    pub fn merge_output(&self) -> PathBuf {
        self.layout().resolve(&self.merge.output)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}
