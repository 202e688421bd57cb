use super::{DataFindConfig, LocatorKind, MergeConfig, SegmentSourceKind, SegmentsConfig, ToolConfig};
use crate::constants::{
    DEFAULT_DATAFIND_URL, DEFAULT_DATAFIND_URLTYPE, DEFAULT_DQSEGDB_URL, DEFAULT_MERGE_OUTPUT,
    DEFAULT_SECTION, DEFAULT_TOOL, HTTP_TIMEOUT_SECS,
};
use crate::merge::MergeMode;
use std::path::PathBuf;

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            source: SegmentSourceKind::Dqsegdb,
            url: DEFAULT_DQSEGDB_URL.to_string(),
            file: None,
            timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for DataFindConfig {
    fn default() -> Self {
        Self {
            source: LocatorKind::Gwdatafind,
            url: DEFAULT_DATAFIND_URL.to_string(),
            urltype: DEFAULT_DATAFIND_URLTYPE.to_string(),
            directory: None,
            timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_TOOL.to_string(),
            section: DEFAULT_SECTION.to_string(),
            verbose: true,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_MERGE_OUTPUT),
            mode: MergeMode::Append,
        }
    }
}
