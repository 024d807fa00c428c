//! Compilation database export.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Result of the post-build copy. None of these fail the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Copied { bytes: usize },
    Missing { path: PathBuf },
    CopyFailed { reason: String },
}

impl ArtifactOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, ArtifactOutcome::Copied { .. })
    }
}

/// Copy the full text of `src` to `dst`, replacing any existing file.
pub async fn copy_compile_commands(src: &Path, dst: &Path) -> ArtifactOutcome {
    if tokio::fs::metadata(src).await.is_err() {
        warn!(path = %src.display(), "compile_commands.json not found");
        return ArtifactOutcome::Missing {
            path: src.to_path_buf(),
        };
    }

    let copied = async {
        let text = tokio::fs::read_to_string(src).await?;
        tokio::fs::write(dst, &text).await?;
        Ok::<_, std::io::Error>(text.len())
    }
    .await;

    match copied {
        Ok(bytes) => {
            info!(dst = %dst.display(), bytes, "compile_commands.json copied to project root");
            ArtifactOutcome::Copied { bytes }
        }
        Err(e) => {
            error!(src = %src.display(), dst = %dst.display(), error = %e, "Failed to copy compile_commands.json");
            ArtifactOutcome::CopyFailed {
                reason: e.to_string(),
            }
        }
    }
}
