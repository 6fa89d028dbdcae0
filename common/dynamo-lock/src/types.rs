use std::fmt;
use std::time::Duration;

use crate::error::LockError;

/// Identifies the shared resource being protected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    pub fn new(key: impl Into<String>) -> Result<Self, LockError> {
        let key = key.into();
        if key.is_empty() {
            return Err(LockError::InvalidArgument("lock key must not be empty".into()));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name attached to a lock record by whoever claims it. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerIdentity(String);

impl OwnerIdentity {
    pub fn new(owner: impl Into<String>) -> Result<Self, LockError> {
        let owner = owner.into();
        if owner.is_empty() {
            return Err(LockError::InvalidArgument(
                "owner identity must not be empty".into(),
            ));
        }
        Ok(Self(owner))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for [`LockClient::acquire`](crate::LockClient::acquire).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcquireOptions {
    /// How often the background task renews the lease while the lock is held.
    /// Must be shorter than the client's lease duration.
    pub refresh_period: Duration,
    /// Total time to keep retrying before failing with a timeout.
    pub additional_wait: Duration,
    /// Pause between acquisition attempts.
    pub retry_interval: Duration,
    /// Fail immediately with [`LockError::AlreadyHeld`] instead of waiting.
    pub fail_if_locked: bool,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self {
            refresh_period: Duration::from_secs(10),
            additional_wait: Duration::from_secs(600),
            retry_interval: Duration::from_secs(1),
            fail_if_locked: false,
        }
    }

    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub fn with_additional_wait(mut self, wait: Duration) -> Self {
        self.additional_wait = wait;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_fail_if_locked(mut self, fail_if_locked: bool) -> Self {
        self.fail_if_locked = fail_if_locked;
        self
    }
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`LockClient::release`](crate::LockClient::release).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Delete the record instead of leaving it present but released. A released
    /// record is reclaimed with a single conditional write by the next owner.
    pub delete_record: bool,
}

impl ReleaseOptions {
    pub fn with_delete_record(mut self, delete_record: bool) -> Self {
        self.delete_record = delete_record;
        self
    }
}
