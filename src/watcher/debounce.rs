use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::{GapwatchError, Result};

/// Delay before rebuilding the watch after a notification-subsystem failure.
const REARM_DELAY: Duration = Duration::from_secs(1);

/// One settled mutation of the watched input file.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// The watched file that changed
    pub path: PathBuf,
}

/// Debounced change detector for a single file.
///
/// Subscribes to filesystem notifications for the file's parent directory,
/// filters events down to the watched path, and emits a [`ChangeEvent`] only
/// once writes have stopped for the stability window. Quiet means no further
/// notification events for the file and an unchanged (size, mtime) sample
/// between probes taken at the re-check interval.
pub struct ChangeDetector {
    path: PathBuf,
    file_name: OsString,
    stability_window: Duration,
    recheck_interval: Duration,
}

impl ChangeDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        let file_name = config
            .watched_input
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        Self {
            path: config.watched_input.clone(),
            file_name,
            stability_window: config.stability_window(),
            recheck_interval: config.recheck_interval(),
        }
    }

    /// Start watching. Returns a channel yielding one event per settled change.
    ///
    /// The detector task runs until `shutdown` is cancelled or the receiver
    /// is dropped. Watch failures are logged and the watch is re-armed after
    /// a short back-off.
    pub fn spawn(self, shutdown: CancellationToken) -> mpsc::Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            self.run(tx, shutdown).await;
        });
        rx
    }

    async fn run(self, tx: mpsc::Sender<ChangeEvent>, shutdown: CancellationToken) {
        loop {
            if shutdown.is_cancelled() {
                return;
            }
            match self.watch_until_failure(&tx, &shutdown).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::error!(
                        path = %self.path.display(),
                        error = %e,
                        "Watch failed, re-arming"
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = tokio::time::sleep(REARM_DELAY) => {}
                    }
                }
            }
        }
    }

    /// Watch and emit events until shutdown (Ok) or a watch failure (Err).
    async fn watch_until_failure(
        &self,
        tx: &mpsc::Sender<ChangeEvent>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let watch_root = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // The notify callback runs on its own thread; bridge events onto a
        // bounded tokio channel.
        let (raw_tx, mut raw_rx) = mpsc::channel::<notify::Result<Event>>(64);
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.blocking_send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(watch_root, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Watching for changes");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                received = raw_rx.recv() => match received {
                    None => {
                        return Err(GapwatchError::Internal(
                            "notification channel closed".to_string(),
                        ));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(event)) if self.touches(&event) => {
                        tracing::debug!(path = %self.path.display(), "Write burst started");
                        self.settle(&mut raw_rx, shutdown).await?;
                        if shutdown.is_cancelled() {
                            return Ok(());
                        }
                        let change = ChangeEvent {
                            path: self.path.clone(),
                        };
                        if tx.send(change).await.is_err() {
                            return Ok(());
                        }
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    /// Wait until the watched file has been quiet for the stability window.
    ///
    /// Any further notification event for the file, or a changed
    /// (size, mtime) sample between probes, restarts the window.
    async fn settle(
        &self,
        raw_rx: &mut mpsc::Receiver<notify::Result<Event>>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let mut last_activity = Instant::now();
        let mut last_sample = probe(&self.path).await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.recheck_interval) => {
                    let sample = probe(&self.path).await;
                    if sample != last_sample {
                        last_sample = sample;
                        last_activity = Instant::now();
                    } else if last_activity.elapsed() >= self.stability_window {
                        return Ok(());
                    }
                }
                received = raw_rx.recv() => match received {
                    None => {
                        return Err(GapwatchError::Internal(
                            "notification channel closed".to_string(),
                        ));
                    }
                    Some(Err(e)) => return Err(e.into()),
                    Some(Ok(event)) if self.touches(&event) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    /// Whether a raw notification concerns the watched file's content.
    fn touches(&self, event: &Event) -> bool {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return false;
        }
        event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }
}

/// Sample the watched file's (size, mtime); `None` while it does not exist.
async fn probe(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    Some((meta.len(), modified))
}
