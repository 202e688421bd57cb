//! Job specifications: one unit of work applying the trigger tool to one coincident segment of
//! one stream.
mod builder;
pub mod manifest;
pub mod params;

pub use builder::{BuildOutcome, JobSpecBuilder};
pub use params::{ParameterSet, SpecError, TriggerParameters, Tuning};

use crate::config::ToolConfig;
use crate::segments::{CoincidentSegment, StreamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// A program and its arguments; what a backend executes for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRecipe {
    pub program: String,
    pub args: Vec<String>,
}

impl InvocationRecipe {
    /// `<program> <section> --gps <start> <end> --ifo <stream> --config-file <cfg>
    /// --output-dir <dir> --cache-file <cache> [--verbose]`
    pub fn trigger_tool(
        tool: &ToolConfig,
        stream: &str,
        segment: &CoincidentSegment,
        config_path: &Path,
        output_dir: &Path,
        cache_path: &Path,
    ) -> Self {
        let mut args = vec![
            tool.section.clone(),
            "--gps".to_string(),
            segment.start().to_string(),
            segment.end().to_string(),
            "--ifo".to_string(),
            stream.to_string(),
            "--config-file".to_string(),
            config_path.display().to_string(),
            "--output-dir".to_string(),
            output_dir.display().to_string(),
            "--cache-file".to_string(),
            cache_path.display().to_string(),
        ];
        if tool.verbose {
            args.push("--verbose".to_string());
        }
        Self {
            program: tool.program.clone(),
            args,
        }
    }

    /// Renders the recipe as a standalone bash script, one option per line.
    pub fn render_script(&self) -> io::Result<String> {
        let quote = |arg: &str| {
            shlex::try_quote(arg)
                .map(|quoted| quoted.into_owned())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
        };

        let mut lines = vec![quote(&self.program)?];
        for arg in &self.args {
            let quoted = quote(arg)?;
            match lines.last_mut() {
                Some(line) if !arg.starts_with("--") => {
                    line.push(' ');
                    line.push_str(&quoted);
                }
                _ => lines.push(quoted),
            }
        }

        Ok(format!(
            "#!/usr/bin/env bash\nset -euo pipefail\n\nexec {}\n",
            lines.join(" \\\n    ")
        ))
    }
}

impl fmt::Display for InvocationRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub stream: StreamId,
    pub segment: CoincidentSegment,
    /// Rendered tool configuration entries, as written to `config_path`.
    pub parameters: BTreeMap<String, String>,
    pub config_path: PathBuf,
    pub script_path: PathBuf,
    pub output_dir: PathBuf,
    pub cache_path: PathBuf,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
    pub recipe: InvocationRecipe,
}

impl JobSpec {
    pub fn label(&self) -> String {
        format!("{}{}", self.stream, self.segment)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::segments::Interval;

    /// A job whose recipe runs `sh -c <script>` with logs under `dir`.
    pub(crate) fn shell_job(dir: &Path, stream: &str, start: i64, script: &str) -> JobSpec {
        let segment = CoincidentSegment::new(Interval::new(start, start + 10).unwrap());
        JobSpec {
            stream: stream.to_string(),
            segment,
            parameters: BTreeMap::new(),
            config_path: dir.join(format!("job_{stream}.cfg")),
            script_path: dir.join(format!("run_{start}.sh")),
            output_dir: dir.join("trigger_output"),
            cache_path: dir.join("data.lcf"),
            stdout_path: dir.join("logs").join(format!("{stream}-{start}.out")),
            stderr_path: dir.join("logs").join(format!("{stream}-{start}.err")),
            recipe: InvocationRecipe {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Interval;

    fn tool() -> ToolConfig {
        ToolConfig {
            program: "omicron-process".to_string(),
            section: "GW".to_string(),
            verbose: true,
        }
    }

    #[test]
    fn test_trigger_tool_recipe() {
        let segment = CoincidentSegment::new(Interval::new(50, 100).unwrap());
        let recipe = InvocationRecipe::trigger_tool(
            &tool(),
            "H1",
            &segment,
            Path::new("/p/H1/job_H1.cfg"),
            Path::new("/p/H1/trigger_output"),
            Path::new("/p/H1/data_50-100.lcf"),
        );

        assert_eq!(
            recipe.to_string(),
            "omicron-process GW --gps 50 100 --ifo H1 --config-file /p/H1/job_H1.cfg \
             --output-dir /p/H1/trigger_output --cache-file /p/H1/data_50-100.lcf --verbose"
        );
    }

    #[test]
    fn test_render_script_groups_options_and_quotes() {
        let recipe = InvocationRecipe {
            program: "omicron-process".to_string(),
            args: vec![
                "GW".to_string(),
                "--gps".to_string(),
                "50".to_string(),
                "100".to_string(),
                "--output-dir".to_string(),
                "/data/with space".to_string(),
            ],
        };
        let script = recipe.render_script().unwrap();

        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("exec omicron-process GW \\\n    --gps 50 100 \\\n"));
        assert!(script.contains("--output-dir '/data/with space'\n"));
    }

    #[test]
    fn test_render_script_rejects_nul() {
        let recipe = InvocationRecipe {
            program: "tool".to_string(),
            args: vec!["bad\0arg".to_string()],
        };
        assert!(recipe.render_script().is_err());
    }
}
