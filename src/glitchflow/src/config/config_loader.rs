use super::Config;
use crate::constants::{
    CONFIG_ENV_PREFIX, DEFAULT_CHUNK_DURATION, DEFAULT_CLUSTER_DT, DEFAULT_MAX_PARALLEL,
    DEFAULT_MISMATCH_MAX, DEFAULT_OVERLAP_DURATION, DEFAULT_SAMPLE_RATE,
    DEFAULT_SEGMENT_DURATION, DEFAULT_SNR_THRESHOLD,
};
use anyhow::{Context, Result};
use clap::Args;
use config::{Config as RConfig, Environment, File, FileFormat};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Root of the per-stream working directories
    #[clap(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Comma-separated detector list, e.g. H1,L1
    #[clap(long, global = true, value_delimiter = ',')]
    pub detectors: Option<Vec<String>>,

    /// Start of the analysis range (GPS seconds)
    #[clap(long, global = true, allow_negative_numbers = true)]
    pub start: Option<i64>,

    /// End of the analysis range (GPS seconds)
    #[clap(long, global = true, allow_negative_numbers = true)]
    pub end: Option<i64>,

    /// Number of jobs run at the same time
    #[clap(long, global = true)]
    pub max_parallel: Option<u64>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Layers defaults, the optional TOML file, `GLITCHFLOW__*` environment variables and the
    /// command-line overrides, in that order.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Config> {
        let mut builder = RConfig::builder();

        builder = builder
            .set_default("project_dir", ".")?
            .set_default::<&str, Vec<&str>>("detectors", vec![])?
            .set_default("max_parallel", DEFAULT_MAX_PARALLEL)?
            .set_default("job_timeout_secs", 0)?
            .set_default("min_segment_duration", 0)?
            .set_default("tuning.cluster_dt", DEFAULT_CLUSTER_DT)?
            .set_default("tuning.sample_rate", DEFAULT_SAMPLE_RATE)?
            .set_default("tuning.chunk_duration", DEFAULT_CHUNK_DURATION)?
            .set_default("tuning.segment_duration", DEFAULT_SEGMENT_DURATION)?
            .set_default("tuning.overlap_duration", DEFAULT_OVERLAP_DURATION)?
            .set_default("tuning.mismatch_max", DEFAULT_MISMATCH_MAX)?
            .set_default("tuning.snr_threshold", DEFAULT_SNR_THRESHOLD)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(CONFIG_ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("detectors"),
        );

        builder = builder
            .set_override_option(
                "project_dir",
                overrides
                    .project_dir
                    .as_ref()
                    .map(|p| p.display().to_string()),
            )?
            .set_override_option("detectors", overrides.detectors.clone())?
            .set_override_option("start", overrides.start)?
            .set_override_option("end", overrides.end)?
            .set_override_option("max_parallel", overrides.max_parallel)?;

        let mut config: Config = builder
            .build()
            .context("failed to load configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;

        config.validate()?;
        config.resolve_paths();
        Ok(config)
    }
}
