use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GapwatchError, Result};

/// Configuration for the external analysis job.
///
/// The job is a black box: it reads the watched input via its own path
/// knowledge, writes zero or more result files into the working directory,
/// and exits with code 0 on success. Nothing about the triggering change is
/// passed to it; every run processes the full current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Program to launch (e.g., "python")
    pub command: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Extra environment variables injected into the child process.
    /// `PYTHONIOENCODING=utf-8` keeps Python output UTF-8 on every platform.
    pub env: Vec<(String, String)>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            command: "python".to_string(),
            args: vec!["main.py".to_string()],
            env: vec![("PYTHONIOENCODING".to_string(), "utf-8".to_string())],
        }
    }
}

/// Naming convention for candidate result files in the working directory:
/// a fixed prefix, a non-empty variable suffix, and a fixed extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPattern {
    /// File name prefix (e.g., "gap_analysis_")
    pub prefix: String,
    /// File extension without the dot (e.g., "json")
    pub extension: String,
}

impl Default for ResultPattern {
    fn default() -> Self {
        Self {
            prefix: "gap_analysis_".to_string(),
            extension: "json".to_string(),
        }
    }
}

impl ResultPattern {
    /// Whether `file_name` names a candidate result.
    ///
    /// The suffix between prefix and extension must be non-empty, so the
    /// published artifact's own fixed name never counts as a candidate.
    pub fn matches(&self, file_name: &str) -> bool {
        let Some(rest) = file_name.strip_prefix(&self.prefix) else {
            return false;
        };
        let Some(stem) = rest.strip_suffix(&self.extension) else {
            return false;
        };
        match stem.strip_suffix('.') {
            Some(suffix) => !suffix.is_empty(),
            None => false,
        }
    }
}

/// Top-level configuration for the watcher pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Record file whose mutations trigger analysis runs
    pub watched_input: PathBuf,

    /// Directory the analysis job runs in and writes result files to
    pub working_dir: PathBuf,

    /// Directory consumers poll for the published artifact
    pub publish_dir: PathBuf,

    /// File name of the published artifact inside `publish_dir`
    pub artifact_name: String,

    /// Naming convention for candidate result files
    pub pattern: ResultPattern,

    /// Quiet period after the last write before a change counts as settled
    pub stability_window_ms: u64,

    /// Interval between stability probes of the watched file
    pub recheck_interval_ms: u64,

    /// External analysis job invocation
    pub job: JobConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            watched_input: PathBuf::from("data/jobs.json"),
            working_dir: PathBuf::from("."),
            publish_dir: PathBuf::from("public"),
            artifact_name: "gap_analysis.json".to_string(),
            pattern: ResultPattern::default(),
            stability_window_ms: 2000,
            recheck_interval_ms: 100,
            job: JobConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| GapwatchError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// The fixed path consumers read the published artifact from.
    pub fn publish_path(&self) -> PathBuf {
        self.publish_dir.join(&self.artifact_name)
    }

    pub fn stability_window(&self) -> Duration {
        Duration::from_millis(self.stability_window_ms)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_millis(self.recheck_interval_ms)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.watched_input.file_name().is_none() {
            return Err(GapwatchError::Config(
                "watched_input must name a file".to_string(),
            ));
        }
        if self.artifact_name.is_empty() {
            return Err(GapwatchError::Config(
                "artifact_name must not be empty".to_string(),
            ));
        }
        if self.pattern.prefix.is_empty() || self.pattern.extension.is_empty() {
            return Err(GapwatchError::Config(
                "result pattern prefix and extension must not be empty".to_string(),
            ));
        }
        if self.job.command.is_empty() {
            return Err(GapwatchError::Config(
                "job command must not be empty".to_string(),
            ));
        }
        if self.recheck_interval_ms == 0 {
            return Err(GapwatchError::Config(
                "recheck_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
