use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("timed out after {waited:?} waiting for lock '{key}'")]
    AcquisitionTimeout { key: String, waited: Duration },

    #[error("lock '{key}' is held by '{owner}'")]
    AlreadyHeld { key: String, owner: String },

    #[error("lock service operation failed: {0}")]
    Service(String),

    #[error("malformed lock record: {0}")]
    InvalidRecord(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
