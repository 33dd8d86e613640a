//! Test harness for pipeline integration tests.
//!
//! Provides a temporary workspace mirroring the production layout and small
//! helpers for driving the pipeline against real files and processes.
#![allow(dead_code)]

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use gapwatch::config::{JobConfig, PipelineConfig, ResultPattern};

/// A temporary workspace with the directories the pipeline expects:
/// a data dir holding the watched input, a working dir for the analysis job,
/// and a publish dir for consumers.
pub struct TestWorkspace {
    pub root: TempDir,
    pub input: PathBuf,
    pub working_dir: PathBuf,
    pub publish_dir: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp workspace");
        let data_dir = root.path().join("data");
        let working_dir = root.path().join("work");
        let publish_dir = root.path().join("public");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&working_dir).unwrap();
        std::fs::create_dir_all(&publish_dir).unwrap();

        let input = data_dir.join("jobs.json");
        std::fs::write(&input, b"[]").unwrap();

        Self {
            root,
            input,
            working_dir,
            publish_dir,
        }
    }

    /// Pipeline config pointing at this workspace, with short debounce
    /// windows for faster tests and a no-op job.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            watched_input: self.input.clone(),
            working_dir: self.working_dir.clone(),
            publish_dir: self.publish_dir.clone(),
            artifact_name: "gap_analysis.json".to_string(),
            pattern: ResultPattern::default(),
            stability_window_ms: 150,
            recheck_interval_ms: 25,
            job: shell_job("true"),
        }
    }

    /// Write a candidate result file into the working directory.
    ///
    /// Sleeps briefly afterwards so the next write gets a strictly later
    /// modification time.
    pub fn write_candidate(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.working_dir.join(name);
        std::fs::write(&path, contents).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        path
    }

    /// Append a record to the watched input file.
    pub fn touch_input(&self, contents: &str) {
        std::fs::write(&self.input, contents).unwrap();
    }

    /// The fixed path consumers read the published artifact from.
    pub fn published_path(&self) -> PathBuf {
        self.publish_dir.join("gap_analysis.json")
    }

    /// File names in a directory, sorted for stable assertions.
    pub fn list_names(&self, dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Job config running `script` through the shell.
pub fn shell_job(script: &str) -> JobConfig {
    JobConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        env: Vec::new(),
    }
}

/// Poll an async condition until it holds or the timeout elapses.
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration, poll_interval: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(poll_interval).await;
    }
    false
}

/// Assert a condition eventually becomes true
pub async fn assert_eventually<F, Fut>(condition: F, timeout: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = wait_for(condition, timeout, Duration::from_millis(25)).await;
    assert!(result, "{}", message);
}
