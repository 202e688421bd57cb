use super::{
    list_result_files, read_result_file, ArtifactError, MergeError, MergeMode, TriggerArtifact,
    TriggerColumns, TriggerGroup, TriggerRecord,
};
use crate::segments::StreamId;
use glitchflow_common::fs::{ensure_dir, lock_path, LockFile};
use glitchflow_common::layout::ProjectLayout;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDataset {
    pub records: Vec<TriggerRecord>,
    pub sources: Vec<PathBuf>,
    pub skipped_duplicates: usize,
}

/// Outcome of one merge pass. Streams that failed are absent from `streams`.
#[derive(Debug)]
pub struct MergedDataset {
    pub streams: BTreeMap<StreamId, StreamDataset>,
    pub failures: BTreeMap<StreamId, MergeError>,
    pub output_path: PathBuf,
}

impl MergedDataset {
    pub fn total_records(&self) -> usize {
        self.streams.values().map(|s| s.records.len()).sum()
    }
}

pub struct ResultMerger {
    layout: ProjectLayout,
    mode: MergeMode,
}

impl ResultMerger {
    pub fn new(layout: ProjectLayout, mode: MergeMode) -> Self {
        Self { layout, mode }
    }

    /// Merges every stream's result files into the artifact at `output_path`, holding an
    /// exclusive lock on it for the duration.
    pub fn merge(
        &self,
        streams: &[StreamId],
        channel_by_stream: &BTreeMap<StreamId, String>,
        output_path: &Path,
    ) -> Result<MergedDataset, ArtifactError> {
        if let Some(parent) = output_path.parent() {
            ensure_dir(parent).map_err(|source| ArtifactError::Io {
                path: output_path.to_path_buf(),
                source,
            })?;
        }
        let _lock = LockFile::acquire(output_path).map_err(|source| {
            if source.kind() == io::ErrorKind::WouldBlock {
                ArtifactError::Locked {
                    path: output_path.to_path_buf(),
                    lock: lock_path(output_path),
                }
            } else {
                ArtifactError::Io {
                    path: output_path.to_path_buf(),
                    source,
                }
            }
        })?;

        let existing = TriggerArtifact::load(output_path)?;
        if self.mode == MergeMode::Fresh && existing.is_some() {
            return Err(ArtifactError::AlreadyExists {
                path: output_path.to_path_buf(),
            });
        }
        let mut artifact = existing.unwrap_or_default();

        let mut merged = MergedDataset {
            streams: BTreeMap::new(),
            failures: BTreeMap::new(),
            output_path: output_path.to_path_buf(),
        };

        for stream in streams {
            let Some(channel) = channel_by_stream.get(stream) else {
                merged.failures.insert(
                    stream.clone(),
                    MergeError::UnknownChannel {
                        stream: stream.clone(),
                    },
                );
                continue;
            };

            let mut dataset = match self.merge_stream(stream, channel) {
                Ok(dataset) => dataset,
                Err(e) => {
                    warn!(%stream, "merge failed: {e}");
                    merged.failures.insert(stream.clone(), e);
                    continue;
                }
            };

            if self.mode == MergeMode::Dedup {
                let mut seen: HashSet<(u64, u64)> = artifact
                    .groups_for(stream)
                    .flat_map(|g| g.columns.records())
                    .map(|r| r.span_key())
                    .collect();
                let before = dataset.records.len();
                dataset.records.retain(|r| seen.insert(r.span_key()));
                dataset.skipped_duplicates = before - dataset.records.len();
            }

            info!(
                %stream,
                files = dataset.sources.len(),
                records = dataset.records.len(),
                skipped = dataset.skipped_duplicates,
                "stream merged"
            );
            artifact.groups.push(TriggerGroup {
                stream: stream.clone(),
                channel: channel.clone(),
                sources: dataset.sources.clone(),
                columns: TriggerColumns::from_records(&dataset.records),
            });
            merged.streams.insert(stream.clone(), dataset);
        }

        artifact.save(output_path)?;
        info!(
            path = %output_path.display(),
            groups = artifact.groups.len(),
            "artifact written"
        );
        Ok(merged)
    }

    fn merge_stream(&self, stream: &str, channel: &str) -> Result<StreamDataset, MergeError> {
        let dir = self.layout.merge_dir(stream, channel);
        let files = list_result_files(&dir)?;
        debug!(%stream, dir = %dir.display(), files = files.len(), "reading results");

        let mut dataset = StreamDataset::default();
        for file in files {
            let records = read_result_file(&file)?;
            dataset.records.extend(records);
            dataset.sources.push(file);
        }
        Ok(dataset)
    }
}
