//! Fatal conditions of a lock-keeper run and the exit code each one maps to.

use std::time::Duration;

use dynamo_lock::LockError;
use thiserror::Error;

use crate::identity::IdentityError;

pub const EXIT_CONFIGURATION: u8 = 3;
pub const EXIT_IDENTITY: u8 = 4;
pub const EXIT_ACQUISITION_TIMEOUT: u8 = 5;
pub const EXIT_LOCK_SERVICE: u8 = 6;
pub const EXIT_LOCK_LOST: u8 = 7;
pub const EXIT_RELEASE: u8 = 8;
pub const EXIT_SIGNAL_HANDLER: u8 = 9;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no owner name given and failed to resolve one: {0}")]
    IdentityResolution(#[source] IdentityError),

    #[error("timed out after {waited:?} waiting to acquire lock '{key}'")]
    LockAcquisitionTimeout { key: String, waited: Duration },

    #[error("failed to acquire lock: {0}")]
    LockService(#[source] LockError),

    /// The lock was taken over or expired while held. Another process may already be
    /// working on the resource.
    #[error("lost lock '{key}' before release")]
    LockLostBeforeRelease { key: String },

    #[error("error releasing lock: {0}")]
    Release(#[source] LockError),

    #[error("failed to wait for shutdown signal: {0}")]
    SignalHandler(#[source] std::io::Error),
}

impl KeeperError {
    /// Classify a failed acquisition.
    pub fn from_acquire(err: LockError) -> Self {
        match err {
            LockError::AcquisitionTimeout { key, waited } => {
                KeeperError::LockAcquisitionTimeout { key, waited }
            }
            other => KeeperError::LockService(other),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            KeeperError::Configuration(_) => EXIT_CONFIGURATION,
            KeeperError::IdentityResolution(_) => EXIT_IDENTITY,
            KeeperError::LockAcquisitionTimeout { .. } => EXIT_ACQUISITION_TIMEOUT,
            KeeperError::LockService(_) => EXIT_LOCK_SERVICE,
            KeeperError::LockLostBeforeRelease { .. } => EXIT_LOCK_LOST,
            KeeperError::Release(_) => EXIT_RELEASE,
            KeeperError::SignalHandler(_) => EXIT_SIGNAL_HANDLER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_classified_separately_from_service_errors() {
        let err = KeeperError::from_acquire(LockError::AcquisitionTimeout {
            key: "orders".into(),
            waited: Duration::from_secs(600),
        });
        assert!(matches!(err, KeeperError::LockAcquisitionTimeout { .. }));
        assert_eq!(err.exit_code(), EXIT_ACQUISITION_TIMEOUT);

        let err = KeeperError::from_acquire(LockError::Service("throttled".into()));
        assert!(matches!(err, KeeperError::LockService(_)));
        assert_eq!(err.exit_code(), EXIT_LOCK_SERVICE);
    }

    #[test]
    fn exit_codes_are_distinct_and_non_zero() {
        let codes = [
            EXIT_CONFIGURATION,
            EXIT_IDENTITY,
            EXIT_ACQUISITION_TIMEOUT,
            EXIT_LOCK_SERVICE,
            EXIT_LOCK_LOST,
            EXIT_RELEASE,
            EXIT_SIGNAL_HANDLER,
        ];
        for (i, a) in codes.iter().enumerate() {
            assert_ne!(*a, 0);
            // clap exits with 2 on usage errors
            assert_ne!(*a, 2);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn lost_lock_message_names_the_key() {
        let err = KeeperError::LockLostBeforeRelease {
            key: "process-order-42".into(),
        };
        assert_eq!(err.to_string(), "lost lock 'process-order-42' before release");
        assert_eq!(err.exit_code(), EXIT_LOCK_LOST);
    }
}
