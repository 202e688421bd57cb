use super::TriggerRecord;
use crate::segments::StreamId;
use glitchflow_common::fs::write_atomic;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact {path:?} is locked by another merge (remove {lock:?} if it is stale)")]
    Locked { path: PathBuf, lock: PathBuf },

    #[error("artifact {path:?} already exists and merge mode is `fresh`")]
    AlreadyExists { path: PathBuf },

    #[error("failed to access artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact {path:?} is not valid: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact {path:?} has format version {found}, expected {}", ARTIFACT_FORMAT_VERSION)]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("artifact {path:?} group {stream} has columns of different lengths")]
    RaggedGroup { path: PathBuf, stream: StreamId },
}

/// One column per trigger field; all columns have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerColumns {
    pub time: Vec<f64>,
    pub frequency: Vec<f64>,
    pub tstart: Vec<f64>,
    pub tend: Vec<f64>,
    pub fstart: Vec<f64>,
    pub fend: Vec<f64>,
    pub snr: Vec<f64>,
    pub q: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub phase: Vec<f64>,
}

impl TriggerColumns {
    pub fn from_records(records: &[TriggerRecord]) -> Self {
        let mut columns = Self::default();
        for record in records {
            columns.push(record);
        }
        columns
    }

    pub fn push(&mut self, record: &TriggerRecord) {
        self.time.push(record.time);
        self.frequency.push(record.frequency);
        self.tstart.push(record.tstart);
        self.tend.push(record.tend);
        self.fstart.push(record.fstart);
        self.fend.push(record.fend);
        self.snr.push(record.snr);
        self.q.push(record.q);
        self.amplitude.push(record.amplitude);
        self.phase.push(record.phase);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    fn columns(&self) -> [&Vec<f64>; 10] {
        [
            &self.time,
            &self.frequency,
            &self.tstart,
            &self.tend,
            &self.fstart,
            &self.fend,
            &self.snr,
            &self.q,
            &self.amplitude,
            &self.phase,
        ]
    }

    fn is_rectangular(&self) -> bool {
        let len = self.len();
        self.columns().iter().all(|column| column.len() == len)
    }

    pub fn records(&self) -> impl Iterator<Item = TriggerRecord> + '_ {
        (0..self.len()).map(|row| {
            let mut values = [0.0; 10];
            for (slot, column) in values.iter_mut().zip(self.columns()) {
                *slot = column[row];
            }
            TriggerRecord::from_values(values)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerGroup {
    pub stream: StreamId,
    pub channel: String,
    /// Result files the group was read from, in merge order.
    pub sources: Vec<PathBuf>,
    pub columns: TriggerColumns,
}

/// The merged container: every merge appends one group per stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerArtifact {
    pub format_version: u32,
    pub groups: Vec<TriggerGroup>,
}

impl Default for TriggerArtifact {
    fn default() -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            groups: Vec::new(),
        }
    }
}

impl TriggerArtifact {
    /// Loads the artifact at `path`, or `None` if there is none yet.
    pub fn load(path: &Path) -> Result<Option<Self>, ArtifactError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ArtifactError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let artifact: Self = serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: artifact.format_version,
            });
        }
        if let Some(group) = artifact.groups.iter().find(|g| !g.columns.is_rectangular()) {
            return Err(ArtifactError::RaggedGroup {
                path: path.to_path_buf(),
                stream: group.stream.clone(),
            });
        }
        Ok(Some(artifact))
    }

    pub fn save(&self, path: &Path) -> Result<(), ArtifactError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(|source| ArtifactError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, &bytes).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn groups_for<'a>(&'a self, stream: &'a str) -> impl Iterator<Item = &'a TriggerGroup> {
        self.groups.iter().filter(move |g| g.stream == stream)
    }
}
