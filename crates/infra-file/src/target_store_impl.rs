// File-backed TargetStore (partition mode leads file)

use async_trait::async_trait;
use relay_core::domain::Target;
use relay_core::error::Result;
use relay_core::port::TargetStore;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Removes reached targets from a list file.
///
/// Each removal rewrites the whole file under one async mutex, so
/// concurrent workers never interleave read-modify-write cycles.
pub struct FileTargetStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TargetStore for FileTargetStore {
    async fn remove(&self, target: &Target) -> Result<()> {
        let _guard = self.lock.lock().await;

        if !tokio::fs::try_exists(&self.path).await? {
            warn!(path = %self.path.display(), "Target file missing, nothing to remove");
            return Ok(());
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let mut removed = 0usize;
        let remaining: String = content
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                if trimmed == target.as_str() {
                    removed += 1;
                    false
                } else {
                    !trimmed.is_empty()
                }
            })
            .map(|line| format!("{}\n", line))
            .collect();

        tokio::fs::write(&self.path, remaining).await?;
        debug!(target = %target, removed, "Target removed from file");
        Ok(())
    }
}
