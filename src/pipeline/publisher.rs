use std::path::Path;

use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::selector::CandidateResult;

/// Atomically publish `candidate` at `publish_path`.
///
/// The bytes are copied to a uniquely named staging file inside the publish
/// directory and renamed over the publish path. The rename stays on one
/// filesystem, so a concurrent reader observes either the previous complete
/// artifact or the new complete artifact, never a partial write.
pub async fn publish(candidate: &CandidateResult, publish_path: &Path) -> Result<()> {
    let publish_dir = publish_path.parent().unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(publish_dir).await?;

    let staging = publish_dir.join(format!(".{}.tmp", Uuid::new_v4()));
    let bytes = tokio::fs::read(&candidate.path).await?;
    if let Err(e) = tokio::fs::write(&staging, &bytes).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&staging, publish_path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(e.into());
    }

    tracing::info!(
        source = %candidate.path.display(),
        publish_path = %publish_path.display(),
        bytes = bytes.len(),
        "Published analysis result"
    );
    Ok(())
}
