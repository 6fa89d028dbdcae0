//! Errors returned by readiness notifiers.

use std::path::PathBuf;

use thiserror::Error;

/// Transport failure while talking to the service manager. "Not supported" is not an
/// error: notifiers report it as `Ok(false)`.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid NOTIFY_SOCKET address '{0}'")]
    InvalidSocket(String),

    #[error("failed to send notification to {path}: {source}")]
    Send {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
