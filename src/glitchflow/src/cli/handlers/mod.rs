mod execute;
mod generate;
mod merge;
mod run;
mod segments;

pub(super) use execute::execute;
pub(super) use generate::generate;
pub(super) use merge::merge;
pub(super) use run::run;
pub(super) use segments::segments;

use crate::executor::JobResult;
use crate::jobs::SpecError;
use crate::merge::MergedDataset;
use glitchflow_common::{error_message, info_message, success_message, warning_message};

/// Whether a command that ran to completion hit per-job or per-stream failures along the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    Failures,
}

impl Outcome {
    fn from_failures(failed: bool) -> Self {
        if failed {
            Self::Failures
        } else {
            Self::Clean
        }
    }
}

fn report_spec_failures(failures: &[SpecError]) -> bool {
    for failure in failures {
        error_message!("{failure}");
    }
    !failures.is_empty()
}

fn report_results(results: &[JobResult]) -> bool {
    let failed: Vec<_> = results.iter().filter(|r| !r.status.is_success()).collect();
    for result in &failed {
        error_message!(
            "{} {} (logs: {:?})",
            result.job.label(),
            result.status,
            result.job.stderr_path
        );
    }
    if failed.is_empty() {
        success_message!("{} jobs succeeded", results.len());
    } else {
        warning_message!("{} of {} jobs failed", failed.len(), results.len());
    }
    !failed.is_empty()
}

fn report_merge(merged: &MergedDataset) -> bool {
    for (stream, dataset) in &merged.streams {
        info_message!(
            "{stream}: {} triggers from {} files",
            dataset.records.len(),
            dataset.sources.len()
        );
        if dataset.skipped_duplicates > 0 {
            info_message!(
                "{stream}: skipped {} triggers already in the artifact",
                dataset.skipped_duplicates
            );
        }
    }
    for (stream, error) in &merged.failures {
        error_message!("{stream}: {error}");
    }
    success_message!(
        "Merged {} triggers into {:?}",
        merged.total_records(),
        merged.output_path
    );
    !merged.failures.is_empty()
}
