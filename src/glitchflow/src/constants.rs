pub const DEFAULT_DQSEGDB_URL: &str = "https://segments.ligo.org";
pub const DEFAULT_DATAFIND_URL: &str = "https://datafind.ligo.org";
pub const DEFAULT_DATAFIND_URLTYPE: &str = "file";
/// Prefix the data-location service puts on local file URLs.
pub const FILE_URL_PREFIX: &str = "file://localhost";
pub const HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_TOOL: &str = "omicron-process";
pub const DEFAULT_SECTION: &str = "GW";

pub const DEFAULT_MAX_PARALLEL: u64 = 2;
pub const DEFAULT_MERGE_OUTPUT: &str = "glitch_info.json";
pub const CONFIG_ENV_PREFIX: &str = "GLITCHFLOW";

// tuning defaults; q_range and frequency_range must always be configured
pub const DEFAULT_CLUSTER_DT: f64 = 0.5;
pub const DEFAULT_SAMPLE_RATE: u64 = 4096;
pub const DEFAULT_CHUNK_DURATION: u64 = 124;
pub const DEFAULT_SEGMENT_DURATION: u64 = 64;
pub const DEFAULT_OVERLAP_DURATION: u64 = 4;
pub const DEFAULT_MISMATCH_MAX: f64 = 0.2;
pub const DEFAULT_SNR_THRESHOLD: f64 = 5.0;
