// Panic isolation for worker safety
use std::any::Any;
use tokio::task::JoinError;
use tracing::error;

/// Extract a readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Describe why an isolated send task did not return an outcome
///
/// Panics are logged here once; the caller turns the text into a
/// `WORKER_ERROR` result.
pub fn describe_join_error(join_err: JoinError) -> String {
    if join_err.is_panic() {
        let payload = join_err.into_panic();
        let msg = panic_message(payload.as_ref());
        error!(panic_msg = %msg, "Send task panicked");
        format!("sender panicked: {}", msg)
    } else {
        error!("Send task cancelled");
        "send task cancelled".to_string()
    }
}
