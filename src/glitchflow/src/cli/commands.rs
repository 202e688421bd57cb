use crate::config::ConfigOverrides;
use crate::merge::MergeMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "glitchflow",
    about = "Generate trigger catalogs across detectors and coincident data segments",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// TOML configuration file
    #[clap(long, global = true, env = "GLITCHFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub overrides: ConfigOverrides,

    /// Log the jobs instead of running the trigger tool
    #[clap(long, global = true)]
    pub dry_run: bool,

    /// Debug-level logging, also written to stderr
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Query and print the segments in which all detectors have usable data
    Segments {
        /// Print the segments as JSON
        #[clap(long)]
        json: bool,
    },

    /// Write the data caches, tool configurations and scripts for every job
    Generate,

    /// Run the jobs listed in the project's job manifest
    Execute {
        /// Submit jobs that did not succeed a second time
        #[clap(long)]
        retry_failed: bool,
    },

    /// Merge the trigger files of every detector into one artifact
    Merge {
        /// Overrides merge.mode from the configuration
        #[clap(long, value_enum)]
        mode: Option<MergeMode>,
    },

    /// Generate, execute and merge
    Run {
        /// Submit jobs that did not succeed a second time
        #[clap(long)]
        retry_failed: bool,
    },
}
