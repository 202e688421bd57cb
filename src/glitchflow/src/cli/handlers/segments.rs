use super::Outcome;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::segments::SegmentProvider;
use anyhow::Result;
use glitchflow_common::info_message;

pub async fn segments(config: Config, json: bool) -> Result<Outcome> {
    let source = SegmentProvider::from_config(&config.segments)?;
    let pipeline = Pipeline::new(config);
    let segments = pipeline.discover_segments(&source).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(Outcome::Clean);
    }

    let livetime: i64 = segments.iter().map(|s| s.duration()).sum();
    info_message!(
        "{} coincident segments for {}, {livetime}s in total",
        segments.len(),
        pipeline.config().detectors.join(", ")
    );
    for segment in &segments {
        println!("{} {} {}", segment.start(), segment.end(), segment.duration());
    }
    Ok(Outcome::Clean)
}
