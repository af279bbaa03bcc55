// Task Queue Domain Model

use super::dispatch::Target;

/// One entry of a worker's task queue.
///
/// Queues are pre-filled by the orchestrator and always end with `Stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    Target(Target),
    /// Sentinel: no more work for this worker
    Stop,
}
