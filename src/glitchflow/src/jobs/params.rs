//! Tuning parameters for the trigger tool and their validation.
use crate::segments::StreamId;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("stream {stream}: no parameters configured")]
    UnknownStream { stream: StreamId },

    #[error("stream {stream}: missing required parameter `{field}`")]
    MissingParameter {
        stream: StreamId,
        field: &'static str,
    },

    #[error("stream {stream}: invalid parameter `{field}`: {reason}")]
    InvalidParameter {
        stream: StreamId,
        field: &'static str,
        reason: String,
    },

    #[error("stream {stream}: failed to write {path:?}: {source}")]
    Filesystem {
        stream: StreamId,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SpecError {
    pub fn stream(&self) -> &str {
        match self {
            Self::UnknownStream { stream }
            | Self::MissingParameter { stream, .. }
            | Self::InvalidParameter { stream, .. }
            | Self::Filesystem { stream, .. } => stream,
        }
    }
}

/// Tool tuning knobs. Every field is optional so that a per-stream table can override only
/// some of the shared values; [`TriggerParameters`] enforces that the merged set is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub q_range: Option<[f64; 2]>,
    pub frequency_range: Option<[f64; 2]>,
    pub cluster_dt: Option<f64>,
    pub sample_rate: Option<u32>,
    pub chunk_duration: Option<u64>,
    pub segment_duration: Option<u64>,
    pub overlap_duration: Option<u64>,
    pub mismatch_max: Option<f64>,
    pub snr_threshold: Option<f64>,
}

impl Tuning {
    /// Returns `self` with every value set in `overrides` replaced.
    pub fn overlay(&self, overrides: &Tuning) -> Tuning {
        Tuning {
            q_range: overrides.q_range.or(self.q_range),
            frequency_range: overrides.frequency_range.or(self.frequency_range),
            cluster_dt: overrides.cluster_dt.or(self.cluster_dt),
            sample_rate: overrides.sample_rate.or(self.sample_rate),
            chunk_duration: overrides.chunk_duration.or(self.chunk_duration),
            segment_duration: overrides.segment_duration.or(self.segment_duration),
            overlap_duration: overrides.overlap_duration.or(self.overlap_duration),
            mismatch_max: overrides.mismatch_max.or(self.mismatch_max),
            snr_threshold: overrides.snr_threshold.or(self.snr_threshold),
        }
    }
}

/// Everything needed to configure the trigger tool for one stream, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub channel: String,
    pub frame_type: String,
    pub state_flag: Option<String>,
    pub tuning: Tuning,
}

/// A complete, validated parameter record.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerParameters {
    pub channel: String,
    pub frame_type: String,
    pub state_flag: Option<String>,
    pub q_range: [f64; 2],
    pub frequency_range: [f64; 2],
    pub cluster_dt: f64,
    pub sample_rate: u32,
    pub chunk_duration: u64,
    pub segment_duration: u64,
    pub overlap_duration: u64,
    pub mismatch_max: f64,
    pub snr_threshold: f64,
}

impl TriggerParameters {
    pub fn from_set(stream: &str, set: &ParameterSet) -> Result<Self, SpecError> {
        let missing = |field| SpecError::MissingParameter {
            stream: stream.to_string(),
            field,
        };
        let invalid = |field, reason: &str| SpecError::InvalidParameter {
            stream: stream.to_string(),
            field,
            reason: reason.to_string(),
        };

        if set.channel.trim().is_empty() {
            return Err(missing("channel"));
        }
        if set.frame_type.trim().is_empty() {
            return Err(missing("frame_type"));
        }

        let t = &set.tuning;
        let q_range = t.q_range.ok_or_else(|| missing("q_range"))?;
        let frequency_range = t.frequency_range.ok_or_else(|| missing("frequency_range"))?;
        let cluster_dt = t.cluster_dt.ok_or_else(|| missing("cluster_dt"))?;
        let sample_rate = t.sample_rate.ok_or_else(|| missing("sample_rate"))?;
        let chunk_duration = t.chunk_duration.ok_or_else(|| missing("chunk_duration"))?;
        let segment_duration = t.segment_duration.ok_or_else(|| missing("segment_duration"))?;
        let overlap_duration = t.overlap_duration.ok_or_else(|| missing("overlap_duration"))?;
        let mismatch_max = t.mismatch_max.ok_or_else(|| missing("mismatch_max"))?;
        let snr_threshold = t.snr_threshold.ok_or_else(|| missing("snr_threshold"))?;

        for (field, [low, high]) in [("q_range", q_range), ("frequency_range", frequency_range)] {
            if !(low.is_finite() && high.is_finite() && low > 0.0 && low < high) {
                return Err(invalid(field, "expected finite, positive [low, high] with low < high"));
            }
        }
        for (field, value) in [
            ("cluster_dt", cluster_dt),
            ("mismatch_max", mismatch_max),
            ("snr_threshold", snr_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "expected a finite, positive number"));
            }
        }
        if sample_rate == 0 {
            return Err(invalid("sample_rate", "must be positive"));
        }
        if chunk_duration == 0 || segment_duration == 0 {
            let field = if chunk_duration == 0 { "chunk_duration" } else { "segment_duration" };
            return Err(invalid(field, "must be positive"));
        }
        if overlap_duration >= segment_duration {
            return Err(invalid("overlap_duration", "must be shorter than segment_duration"));
        }

        Ok(Self {
            channel: set.channel.clone(),
            frame_type: set.frame_type.clone(),
            state_flag: set.state_flag.clone().filter(|f| !f.trim().is_empty()),
            q_range,
            frequency_range,
            cluster_dt,
            sample_rate,
            chunk_duration,
            segment_duration,
            overlap_duration,
            mismatch_max,
            snr_threshold,
        })
    }

    /// Key/value entries of the tool's configuration section, in file order.
    pub fn entries(&self, stream: &str) -> Vec<(&'static str, String)> {
        let mut entries = vec![
            ("q-range", format!("{} {}", self.q_range[0], self.q_range[1])),
            (
                "frequency-range",
                format!("{} {}", self.frequency_range[0], self.frequency_range[1]),
            ),
            ("frametype", format!("{stream}_{}", self.frame_type)),
            ("channels", format!("{stream}:{}", self.channel)),
            ("cluster-dt", self.cluster_dt.to_string()),
            ("sample-frequency", self.sample_rate.to_string()),
            ("chunk-duration", self.chunk_duration.to_string()),
            ("segment-duration", self.segment_duration.to_string()),
            ("overlap-duration", self.overlap_duration.to_string()),
            ("mismatch-max", self.mismatch_max.to_string()),
            ("snr-threshold", self.snr_threshold.to_string()),
        ];
        if let Some(flag) = &self.state_flag {
            entries.push(("state-flag", format!("{stream}:{flag}")));
        }
        entries
    }
}

/// Renders an INI document with a single section.
pub fn render_ini(section: &str, entries: &[(&'static str, String)]) -> String {
    let mut out = format!("[{section}]\n");
    for (key, value) in entries {
        out.push_str(key);
        out.push_str(" = ");
        out.push_str(value);
        out.push('\n');
    }
    out
}
