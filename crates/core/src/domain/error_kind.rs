// Error taxonomy reported by workers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified reason a single task failed.
///
/// Canonical across transports. Adapters map their own codes through
/// [`ErrorKind::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthFailed,
    RateLimited,
    InvalidRecipient,
    TransportError,
    UnsupportedProvider,
    /// Unexpected fault inside the worker loop; ends that worker early
    WorkerError,
    Suspended,
    QuotaExceeded,
    ConnectionError,
    Timeout,
    Blocked,
    Other,
}

impl ErrorKind {
    /// Wire code, e.g. `AUTH_FAILED`
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::AuthFailed => "AUTH_FAILED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::InvalidRecipient => "INVALID_RECIPIENT",
            ErrorKind::TransportError => "TRANSPORT_ERROR",
            ErrorKind::UnsupportedProvider => "UNSUPPORTED_PROVIDER",
            ErrorKind::WorkerError => "WORKER_ERROR",
            ErrorKind::Suspended => "SUSPENDED",
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Blocked => "BLOCKED",
            ErrorKind::Other => "OTHER",
        }
    }

    /// Human-readable name used in error reports
    pub fn display_name(&self) -> &'static str {
        match self {
            ErrorKind::AuthFailed => "Authentication Failed",
            ErrorKind::RateLimited => "Rate Limited",
            ErrorKind::InvalidRecipient => "Invalid Recipient",
            ErrorKind::TransportError => "Transport Error",
            ErrorKind::UnsupportedProvider => "Unsupported Provider",
            ErrorKind::WorkerError => "Worker Error",
            ErrorKind::Suspended => "Account Suspended",
            ErrorKind::QuotaExceeded => "Quota Exceeded",
            ErrorKind::ConnectionError => "Connection Error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Blocked => "Account Blocked",
            ErrorKind::Other => "Other Error",
        }
    }

    /// Map a transport-specific code to a canonical kind.
    ///
    /// Never fails: unknown codes become [`ErrorKind::Other`].
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "AUTH_FAILED" => ErrorKind::AuthFailed,
            "RATE_LIMITED" => ErrorKind::RateLimited,
            "INVALID_RECIPIENT" => ErrorKind::InvalidRecipient,
            "TRANSPORT_ERROR" | "SMTP_ERROR" | "GMAIL_API_ERROR" => ErrorKind::TransportError,
            "UNSUPPORTED_PROVIDER" => ErrorKind::UnsupportedProvider,
            "WORKER_ERROR" => ErrorKind::WorkerError,
            "SUSPENDED" => ErrorKind::Suspended,
            "QUOTA_EXCEEDED" => ErrorKind::QuotaExceeded,
            "CONNECTION_ERROR" => ErrorKind::ConnectionError,
            "TIMEOUT" => ErrorKind::Timeout,
            "BLOCKED" => ErrorKind::Blocked,
            _ => ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
