//! Consolidation of per-job trigger files into one artifact grouped by stream.
mod artifact;
mod merger;
mod reader;

pub use artifact::{ArtifactError, TriggerArtifact, TriggerColumns, TriggerGroup};
pub use merger::{MergedDataset, ResultMerger, StreamDataset};
pub use reader::{list_result_files, read_result_file};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Column order of every trigger file and artifact group.
pub const TRIGGER_FIELDS: [&str; 10] = [
    "time",
    "frequency",
    "tstart",
    "tend",
    "fstart",
    "fend",
    "snr",
    "q",
    "amplitude",
    "phase",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub time: f64,
    pub frequency: f64,
    pub tstart: f64,
    pub tend: f64,
    pub fstart: f64,
    pub fend: f64,
    pub snr: f64,
    pub q: f64,
    pub amplitude: f64,
    pub phase: f64,
}

impl TriggerRecord {
    /// Builds a record from values in [`TRIGGER_FIELDS`] order.
    pub fn from_values(values: [f64; 10]) -> Self {
        let [time, frequency, tstart, tend, fstart, fend, snr, q, amplitude, phase] = values;
        Self {
            time,
            frequency,
            tstart,
            tend,
            fstart,
            fend,
            snr,
            q,
            amplitude,
            phase,
        }
    }

    /// Identity used when dropping duplicates across merges.
    pub(crate) fn span_key(&self) -> (u64, u64) {
        (self.tstart.to_bits(), self.tend.to_bits())
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no channel configured for stream {stream}")]
    UnknownChannel { stream: String },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path:?} has no `{field}` column")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("{path:?}: column `{field}` has {found} values, expected {expected}")]
    LengthMismatch {
        path: PathBuf,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{path:?}: no header line naming the columns")]
    MissingHeader { path: PathBuf },

    #[error("{path:?}: column `{field}` row {row} is not a finite number")]
    NonFinite {
        path: PathBuf,
        field: &'static str,
        row: usize,
    },

    #[error("{path:?} is not a recognized result file (expected .json or .txt)")]
    UnsupportedFormat { path: PathBuf },

    #[error("{path:?} line {line}: {reason}")]
    InvalidRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// What to do when the artifact already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Add new groups after the existing ones.
    #[default]
    Append,
    /// Refuse to touch an existing artifact.
    Fresh,
    /// Append, skipping triggers whose (tstart, tend) the stream already has.
    Dedup,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Append => "append",
            Self::Fresh => "fresh",
            Self::Dedup => "dedup",
        };
        f.write_str(name)
    }
}
