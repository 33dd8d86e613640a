use std::path::Path;

use crate::config::ResultPattern;

/// Counts from one reap pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapStats {
    pub removed: usize,
    pub failed: usize,
}

/// Remove superseded outputs after a successful publish.
///
/// Deletes every pattern-matching file in the working directory except
/// `keep` (the candidate just published), and every pattern-matching file in
/// the publish directory except `published` itself. Deletion is best-effort:
/// individual failures are logged per file and the remaining files are still
/// attempted. Running reap twice yields the same end state.
pub async fn reap(
    working_dir: &Path,
    publish_dir: &Path,
    keep: &Path,
    published: &Path,
    pattern: &ResultPattern,
) -> ReapStats {
    let mut stats = ReapStats::default();
    reap_dir(working_dir, keep, pattern, &mut stats).await;
    reap_dir(publish_dir, published, pattern, &mut stats).await;

    if stats.removed > 0 || stats.failed > 0 {
        tracing::info!(
            removed = stats.removed,
            failed = stats.failed,
            "Reaped stale outputs"
        );
    }
    stats
}

async fn reap_dir(dir: &Path, keep: &Path, pattern: &ResultPattern, stats: &mut ReapStats) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Cannot list directory for cleanup"
            );
            stats.failed += 1;
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Directory listing failed mid-cleanup"
                );
                stats.failed += 1;
                return;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !pattern.matches(name) {
            continue;
        }
        let path = entry.path();
        if path == keep {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                stats.removed += 1;
                tracing::debug!(file = %path.display(), "Removed stale output");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::warn!(
                    file = %path.display(),
                    error = %e,
                    "Failed to remove stale output"
                );
            }
        }
    }
}
