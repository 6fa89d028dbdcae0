use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::LockError;
use crate::record::{Condition, LockRecord};
use crate::refresh::{run_lease_refresh, LeaseState};
use crate::store::LockStore;
use crate::types::{AcquireOptions, LockKey, OwnerIdentity, ReleaseOptions};

/// Acquire and release a single named lock.
#[async_trait]
pub trait LockClient: Send + Sync {
    /// Block until the lock is held or `options.additional_wait` has elapsed. While the
    /// returned handle is alive its lease is renewed in the background.
    async fn acquire(
        &self,
        key: &LockKey,
        owner: &OwnerIdentity,
        options: &AcquireOptions,
    ) -> Result<LockHandle, LockError>;

    /// `Ok(true)` once released, `Ok(false)` if the lock had already been lost (lease
    /// expired or taken by another owner), `Err` on a service failure.
    async fn release(&self, handle: LockHandle, options: &ReleaseOptions)
        -> Result<bool, LockError>;
}

/// A held lock. Dropping it stops lease renewal without releasing the record, which then
/// lapses once its lease duration passes.
pub struct LockHandle {
    key: LockKey,
    owner: OwnerIdentity,
    acquired_at: DateTime<Utc>,
    lease: Arc<LeaseState>,
    cancel: CancellationToken,
    refresher: Option<JoinHandle<()>>,
}

impl LockHandle {
    pub fn key(&self) -> &LockKey {
        &self.key
    }

    pub fn owner(&self) -> &OwnerIdentity {
        &self.owner
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    #[cfg(test)]
    pub(crate) fn is_lost(&self) -> bool {
        self.lease.is_lost()
    }

    async fn stop_refreshing(&mut self) {
        self.cancel.cancel();
        if let Some(refresher) = self.refresher.take() {
            if let Err(e) = refresher.await {
                tracing::warn!(key = %self.key, error = %e, "lease refresh task did not exit cleanly");
            }
        }
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("owner", &self.owner)
            .field("acquired_at", &self.acquired_at)
            .field("lost", &self.lease.is_lost())
            .finish()
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The lease lock protocol over any [`LockStore`].
pub struct LeaseLockClient<S: LockStore> {
    store: Arc<S>,
    lease_duration: Duration,
}

impl<S: LockStore> LeaseLockClient<S> {
    pub fn new(store: S, lease_duration: Duration) -> Self {
        Self {
            store: Arc::new(store),
            lease_duration,
        }
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    fn validate(&self, options: &AcquireOptions) -> Result<(), LockError> {
        if options.refresh_period.is_zero() || options.refresh_period >= self.lease_duration {
            return Err(LockError::InvalidArgument(format!(
                "refresh period {:?} must be non-zero and shorter than the lease duration {:?}",
                options.refresh_period, self.lease_duration
            )));
        }
        if options.retry_interval.is_zero() {
            return Err(LockError::InvalidArgument(
                "retry interval must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// One pass of the acquisition protocol. `observed` carries the holder's record
    /// version across passes together with when it was first seen, so a holder whose
    /// version does not move for a whole lease duration is treated as dead.
    async fn try_acquire(
        &self,
        key: &LockKey,
        owner: &OwnerIdentity,
        options: &AcquireOptions,
        observed: &mut Option<(String, Instant)>,
    ) -> Result<Option<LockRecord>, LockError> {
        let claim = LockRecord::new(key, owner, self.lease_duration);

        let current = match self.store.get(key.as_str()).await? {
            None => {
                let created = self.store.put(&claim, Condition::Absent).await?;
                return Ok(created.then_some(claim));
            }
            Some(current) => current,
        };

        let takeover = Condition::VersionIs(current.record_version.clone());
        if current.is_released {
            let taken = self.store.put(&claim, takeover).await?;
            return Ok(taken.then_some(claim));
        }

        if options.fail_if_locked {
            return Err(LockError::AlreadyHeld {
                key: key.to_string(),
                owner: current.owner,
            });
        }

        let unchanged_since = observed
            .as_ref()
            .filter(|(version, _)| *version == current.record_version)
            .map(|(_, since)| *since);

        match unchanged_since {
            Some(since) if since.elapsed() >= current.lease_duration => {
                tracing::info!(
                    key = %key,
                    previous_owner = %current.owner,
                    "lease expired without renewal, taking over lock"
                );
                let taken = self.store.put(&claim, takeover).await?;
                return Ok(taken.then_some(claim));
            }
            Some(_) => {}
            None => *observed = Some((current.record_version.clone(), Instant::now())),
        }

        tracing::debug!(key = %key, holder = %current.owner, "lock held by another owner, waiting");
        Ok(None)
    }

    fn hold(
        &self,
        key: &LockKey,
        owner: &OwnerIdentity,
        record: LockRecord,
        options: &AcquireOptions,
    ) -> LockHandle {
        let lease = Arc::new(LeaseState::new(record));
        let cancel = CancellationToken::new();
        let refresher = tokio::spawn(run_lease_refresh(
            self.store.clone(),
            lease.clone(),
            options.refresh_period,
            cancel.clone(),
        ));

        LockHandle {
            key: key.clone(),
            owner: owner.clone(),
            acquired_at: Utc::now(),
            lease,
            cancel,
            refresher: Some(refresher),
        }
    }
}

#[async_trait]
impl<S: LockStore> LockClient for LeaseLockClient<S> {
    async fn acquire(
        &self,
        key: &LockKey,
        owner: &OwnerIdentity,
        options: &AcquireOptions,
    ) -> Result<LockHandle, LockError> {
        self.validate(options)?;

        let started = Instant::now();
        // A budget too large to represent as an instant means no deadline.
        let deadline = started.checked_add(options.additional_wait);
        let mut observed = None;

        loop {
            if let Some(record) = self.try_acquire(key, owner, options, &mut observed).await? {
                tracing::debug!(key = %key, record_version = %record.record_version, "lock record claimed");
                return Ok(self.hold(key, owner, record, options));
            }

            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => {
                    return Err(LockError::AcquisitionTimeout {
                        key: key.to_string(),
                        waited: now.duration_since(started),
                    });
                }
                Some(deadline) => options.retry_interval.min(deadline - now),
                None => options.retry_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn release(
        &self,
        mut handle: LockHandle,
        options: &ReleaseOptions,
    ) -> Result<bool, LockError> {
        handle.stop_refreshing().await;

        if handle.lease.is_lost() {
            return Ok(false);
        }

        let current = handle.lease.current();
        let condition = Condition::VersionIs(current.record_version.clone());
        if options.delete_record {
            self.store
                .delete(&current.key, &current.record_version)
                .await
        } else {
            self.store.put(&current.released(), condition).await
        }
    }
}
