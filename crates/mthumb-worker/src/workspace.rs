//! Per-attempt scratch directory.

use std::path::{Path, PathBuf};

use mthumb_models::JobId;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Scratch space owned by one pipeline attempt.
///
/// Holds the downloaded model and the encoded outputs. Removed by `close`,
/// or on drop if the attempt unwinds early.
#[derive(Debug)]
pub struct AttemptWorkspace {
    dir: TempDir,
}

impl AttemptWorkspace {
    /// Create `<work_dir>/job-<id>-XXXX/` with `model/` and `out/` inside.
    pub async fn create(work_dir: &Path, job_id: JobId) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(work_dir).await?;

        let parent = work_dir.to_path_buf();
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(&format!("job-{}-", job_id))
                .tempdir_in(parent)
        })
        .await
        .map_err(std::io::Error::other)??;
        tokio::fs::create_dir(dir.path().join("model")).await?;
        tokio::fs::create_dir(dir.path().join("out")).await?;

        debug!(job_id = %job_id, path = %dir.path().display(), "Created attempt workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Download target for the model file.
    pub fn model_dir(&self) -> PathBuf {
        self.dir.path().join("model")
    }

    /// Encoder output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Remove the workspace on the blocking pool. Failures are logged and
    /// swallowed.
    pub async fn close(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        let removed = tokio::task::spawn_blocking(move || dir.close())
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result);
        match removed {
            Ok(()) => debug!(path = %path.display(), "Removed attempt workspace"),
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove attempt workspace"
            ),
        }
    }
}
