use super::{report_spec_failures, Outcome};
use crate::config::Config;
use crate::datafind::LocatorProvider;
use crate::pipeline::Pipeline;
use crate::segments::SegmentProvider;
use anyhow::Result;
use glitchflow_common::success_message;

pub async fn generate(config: Config) -> Result<Outcome> {
    let source = SegmentProvider::from_config(&config.segments)?;
    let locator = LocatorProvider::from_config(&config.datafind)?;
    let pipeline = Pipeline::new(config);

    let generated = pipeline.generate(&source, &locator).await?;
    let failed = report_spec_failures(&generated.outcome.failures);
    success_message!(
        "Generated {} jobs for {} segments, manifest at {:?}",
        generated.outcome.jobs.len(),
        generated.segments.len(),
        pipeline.config().layout().job_manifest()
    );
    Ok(Outcome::from_failures(failed))
}
