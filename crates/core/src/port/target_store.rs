// Target Store Port
// Backing store of not-yet-reached targets (e.g. a leads file)

use crate::domain::Target;
use crate::error::Result;
use async_trait::async_trait;

/// Called by a worker right after a successful send in partition mode,
/// before the worker moves to its next task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Remove a reached target from the store
    ///
    /// # Errors
    /// Store-specific I/O errors; the worker logs them and carries on
    async fn remove(&self, target: &Target) -> Result<()>;
}
