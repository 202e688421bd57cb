use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const CHANNEL: &str = "GDS-CALIB_STRAIN";

/// Writes one trigger per job into the tool's merge directory, like the real tool does.
/// Arguments: <section> --gps <start> <end> --ifo <ifo> --config-file <cfg> --output-dir <dir>
/// --cache-file <cache> [--verbose]
const FAKE_TOOL: &str = r##"#!/bin/sh
start=$3
ifo=$6
out=${10}
dir="$out/merge/$ifo:GDS-CALIB_STRAIN"
mkdir -p "$dir"
{
  echo "# trigger file"
  echo "# time frequency tstart tend fstart fend snr q amplitude phase"
  echo "$start.5 100 $start $start.9 90 110 8 6 1e-22 0.1"
} > "$dir/$ifo-$start.txt"
"##;

const FAILING_TOOL: &str = "#!/bin/sh\necho 'cannot read frames' >&2\nexit 3\n";

/// An offline project: segments from a file, frames from a directory and a fake tool.
pub struct Project {
    pub tmp: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::with_tool(FAKE_TOOL)
    }

    pub fn with_failing_tool() -> Self {
        Self::with_tool(FAILING_TOOL)
    }

    fn with_tool(script: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();

        fs::write(
            root.join("segments.json"),
            r#"{"H1": [[0, 100], [150, 200]], "L1": [[50, 180]]}"#,
        )
        .unwrap();

        let frames = root.join("frames");
        fs::create_dir_all(&frames).unwrap();
        for name in ["H-H1_HOFT_C00-0-256.gwf", "L-L1_HOFT_C00-0-256.gwf"] {
            fs::write(frames.join(name), "").unwrap();
        }

        let tool = root.join("fake-omicron");
        fs::write(&tool, script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let config = format!(
            r#"
project_dir = "{project}"
detectors = ["H1", "L1"]
start = 0
end = 1000
max_parallel = 2

[segments]
source = "file"
file = "{segments}"

[datafind]
source = "directory"
directory = "{frames}"

[tool]
program = "{tool}"

[tuning]
q_range = [3.3166, 108.0]
frequency_range = [32.0, 2048.0]

[streams.H1]
channel = "{CHANNEL}"
frame_type = "HOFT_C00"
state_flag = "DMT-ANALYSIS_READY:1"

[streams.L1]
channel = "{CHANNEL}"
frame_type = "HOFT_C00"
state_flag = "DMT-ANALYSIS_READY:1"
"#,
            project = root.join("project").display(),
            segments = root.join("segments.json").display(),
            frames = frames.display(),
            tool = tool.display(),
        );
        fs::write(root.join("glitchflow.toml"), config).unwrap();

        Self { tmp }
    }

    pub fn config_path(&self) -> PathBuf {
        self.tmp.path().join("glitchflow.toml")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.tmp.path().join("project")
    }

    pub fn artifact(&self) -> serde_json::Value {
        let bytes = fs::read(self.project_dir().join("glitch_info.json")).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// The binary with this project's config and a clean environment.
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("glitchflow").unwrap();
        cmd.env_remove("GLITCHFLOW_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path())
            .args(args);
        cmd
    }
}

pub fn group_lengths(artifact: &serde_json::Value) -> Vec<(String, usize)> {
    artifact["groups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| {
            (
                g["stream"].as_str().unwrap().to_string(),
                g["columns"]["time"].as_array().unwrap().len(),
            )
        })
        .collect()
}
