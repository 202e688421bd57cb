pub mod cli;
pub mod config;
pub mod constants;
pub mod datafind;
pub mod executor;
pub mod jobs;
pub mod logging;
pub mod merge;
pub mod pipeline;
pub mod segments;
