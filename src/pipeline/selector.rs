use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::ResultPattern;
use crate::error::Result;

/// A result file produced by the analysis job, with its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Pick the newest candidate result in `working_dir`.
///
/// Lists pattern-matching files and returns the one with the maximum
/// modification time; equal timestamps resolve to the lexically greatest
/// file name, so the choice is deterministic regardless of listing order.
/// Returns `None` when the run produced no usable output.
pub async fn select_newest(
    working_dir: &Path,
    pattern: &ResultPattern,
) -> Result<Option<CandidateResult>> {
    let mut newest: Option<(SystemTime, String, PathBuf)> = None;

    let mut entries = tokio::fs::read_dir(working_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !pattern.matches(name) {
            continue;
        }

        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "Skipping unreadable candidate"
                );
                continue;
            }
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        let replace = match &newest {
            None => true,
            Some((best_time, best_name, _)) => {
                (modified, name) > (*best_time, best_name.as_str())
            }
        };
        if replace {
            newest = Some((modified, name.to_string(), entry.path()));
        }
    }

    Ok(newest.map(|(modified, _, path)| CandidateResult { path, modified }))
}
