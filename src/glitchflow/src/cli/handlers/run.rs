use super::{report_merge, report_results, report_spec_failures, Outcome};
use crate::config::Config;
use crate::datafind::LocatorProvider;
use crate::executor::{DryRunBackend, LocalProcessBackend};
use crate::pipeline::Pipeline;
use crate::segments::SegmentProvider;
use anyhow::Result;
use glitchflow_common::info_message;

pub async fn run(config: Config, dry_run: bool, retry_failed: bool) -> Result<Outcome> {
    let source = SegmentProvider::from_config(&config.segments)?;
    let locator = LocatorProvider::from_config(&config.datafind)?;
    let timeout = config.job_timeout();
    let pipeline = Pipeline::new(config);

    let summary = if dry_run {
        pipeline
            .run(&source, &locator, DryRunBackend, retry_failed)
            .await?
    } else {
        let backend = LocalProcessBackend::new(timeout);
        pipeline.run(&source, &locator, backend, retry_failed).await?
    };

    info_message!(
        "{} coincident segments, {} jobs",
        summary.segments,
        summary.results.len()
    );
    report_spec_failures(&summary.spec_failures);
    report_results(&summary.results);
    if let Some(merged) = &summary.merged {
        report_merge(merged);
    }
    Ok(Outcome::from_failures(summary.has_failures()))
}
