use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{GapwatchError, Result};
use crate::pipeline::{publish, reap, select_newest, JobInvoker, RunGuard, RunPermit};
use crate::watcher::ChangeDetector;

/// Terminal state of one trigger cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Job succeeded; the newest candidate was published and stale outputs reaped
    Published,
    /// External job could not be launched or exited nonzero; artifact untouched
    JobFailed,
    /// Job succeeded but produced no candidate result
    NoCandidate,
    /// A candidate was selected but the publish step failed
    PublishFailed,
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Published => write!(f, "published"),
            CycleStatus::JobFailed => write!(f, "job_failed"),
            CycleStatus::NoCandidate => write!(f, "no_candidate"),
            CycleStatus::PublishFailed => write!(f, "publish_failed"),
        }
    }
}

/// Record of one admitted trigger cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub run_id: Uuid,
    pub status: CycleStatus,
    pub exit_code: Option<i32>,
    pub job_duration_ms: u64,
    pub published: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Wires the change detector, run guard and pipeline stages together.
///
/// Owns the process-wide run state: the guard is mutated only through its
/// admit/release contract, never inspected directly by other components.
pub struct Orchestrator {
    config: PipelineConfig,
    guard: Arc<RunGuard>,
    invoker: JobInvoker,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        let invoker = JobInvoker::new(config.job.clone());
        Self {
            config,
            guard: Arc::new(RunGuard::new()),
            invoker,
        }
    }

    /// Run the watch loop until `shutdown` is cancelled.
    ///
    /// Each settled change is offered to the run guard. Admitted triggers run
    /// the pipeline as a spawned task, so the notification loop keeps
    /// draining events while a job is in flight; triggers arriving during a
    /// run are dropped, and a later change re-triggers once the guard is
    /// free. Failures stay contained inside their cycle.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        self.config.validate()?;

        let detector = ChangeDetector::new(&self.config);
        let mut changes = detector.spawn(shutdown.clone());

        tracing::info!(
            input = %self.config.watched_input.display(),
            working_dir = %self.config.working_dir.display(),
            publish_path = %self.config.publish_path().display(),
            "Watch mode active"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, stopping watch loop");
                    return Ok(());
                }
                change = changes.recv() => {
                    let Some(change) = change else {
                        tracing::info!("Change stream closed, stopping watch loop");
                        return Ok(());
                    };
                    tracing::info!(path = %change.path.display(), "Input change settled");
                    match self.guard.try_admit() {
                        Some(permit) => {
                            let config = self.config.clone();
                            let invoker = self.invoker.clone();
                            tokio::spawn(async move {
                                run_cycle(permit, &config, &invoker).await;
                            });
                        }
                        None => {
                            tracing::info!("Previous run still in progress, skipping trigger");
                        }
                    }
                }
            }
        }
    }

    /// Run a single cycle immediately, bypassing the change detector.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        self.config.validate()?;
        let permit = self.guard.try_admit().ok_or(GapwatchError::Busy)?;
        Ok(run_cycle(permit, &self.config, &self.invoker).await)
    }

    /// Whether a cycle is currently in flight.
    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }
}

/// Execute one admitted pipeline cycle: invoke → select → publish → reap.
///
/// The permit is held for the whole cycle and released on drop, whatever the
/// exit path.
async fn run_cycle(permit: RunPermit, config: &PipelineConfig, invoker: &JobInvoker) -> CycleOutcome {
    let _permit = permit;
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    tracing::info!(run_id = %run_id, "Starting analysis cycle");

    let mut state = CycleState::default();
    let status = run_stages(config, invoker, run_id, &mut state).await;

    let outcome = CycleOutcome {
        run_id,
        status,
        exit_code: state.exit_code,
        job_duration_ms: state.job_duration_ms,
        published: state.published,
        started_at,
        finished_at: Utc::now(),
    };
    tracing::info!(run_id = %run_id, status = %status, "Analysis cycle finished");
    outcome
}

#[derive(Default)]
struct CycleState {
    exit_code: Option<i32>,
    job_duration_ms: u64,
    published: Option<PathBuf>,
}

async fn run_stages(
    config: &PipelineConfig,
    invoker: &JobInvoker,
    run_id: Uuid,
    state: &mut CycleState,
) -> CycleStatus {
    let exit = match invoker.invoke(&config.working_dir).await {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Could not launch analysis job");
            return CycleStatus::JobFailed;
        }
    };
    state.exit_code = exit.code;
    state.job_duration_ms = exit.duration.as_millis() as u64;
    if !exit.success() {
        return CycleStatus::JobFailed;
    }

    let candidate = match select_newest(&config.working_dir, &config.pattern).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            tracing::warn!(
                run_id = %run_id,
                working_dir = %config.working_dir.display(),
                "Run produced no candidate result, nothing to publish"
            );
            return CycleStatus::NoCandidate;
        }
        Err(e) => {
            tracing::warn!(
                run_id = %run_id,
                error = %e,
                "Could not scan working directory for results"
            );
            return CycleStatus::NoCandidate;
        }
    };
    tracing::info!(
        run_id = %run_id,
        candidate = %candidate.path.display(),
        "Selected newest candidate result"
    );

    let publish_path = config.publish_path();
    if let Err(e) = publish(&candidate, &publish_path).await {
        tracing::error!(
            run_id = %run_id,
            error = %e,
            "Publish failed, keeping previous artifact"
        );
        return CycleStatus::PublishFailed;
    }

    reap(
        &config.working_dir,
        &config.publish_dir,
        &candidate.path,
        &publish_path,
        &config.pattern,
    )
    .await;

    state.published = Some(publish_path);
    CycleStatus::Published
}
