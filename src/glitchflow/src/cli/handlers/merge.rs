use super::{report_merge, Outcome};
use crate::config::Config;
use crate::pipeline::Pipeline;
use anyhow::Result;

pub fn merge(config: Config) -> Result<Outcome> {
    let merged = Pipeline::new(config).merge()?;
    Ok(Outcome::from_failures(report_merge(&merged)))
}
