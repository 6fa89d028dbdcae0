//! Background lease renewal for a held lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::record::{Condition, LockRecord};
use crate::store::LockStore;

/// Lease state shared between a [`LockHandle`](crate::LockHandle) and its refresh task.
pub(crate) struct LeaseState {
    record: Mutex<LockRecord>,
    lost: AtomicBool,
}

impl LeaseState {
    pub(crate) fn new(record: LockRecord) -> Self {
        Self {
            record: Mutex::new(record),
            lost: AtomicBool::new(false),
        }
    }

    pub(crate) fn current(&self) -> LockRecord {
        self.record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn replace(&self, record: LockRecord) {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = record;
    }

    pub(crate) fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }
}

/// Renew the lease every `period` until `cancel` fires or the lease is lost.
///
/// Each renewal rewrites the record under a new version, conditioned on the previous
/// one. A failed condition means another owner took the lock. Store errors are retried
/// on the next tick until a whole lease duration has passed without a successful
/// renewal, after which other owners are free to take over and the lease is given up.
pub(crate) async fn run_lease_refresh<S>(
    store: Arc<S>,
    lease: Arc<LeaseState>,
    period: Duration,
    cancel: CancellationToken,
) where
    S: LockStore + ?Sized,
{
    let mut last_renewed = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(period) => {}
        }

        let current = lease.current();
        let next = current.renewed();
        let condition = Condition::VersionIs(current.record_version.clone());

        // Contenders time the lease from the write, so count it from when it was sent.
        let sent = Instant::now();
        match store.put(&next, condition).await {
            Ok(true) => {
                tracing::debug!(key = %current.key, "lease renewed");
                lease.replace(next);
                last_renewed = sent;
            }
            Ok(false) => {
                tracing::warn!(key = %current.key, "lease lost, record was changed by another owner");
                lease.mark_lost();
                return;
            }
            Err(e) => {
                tracing::warn!(key = %current.key, error = %e, "lease renewal failed");
                if last_renewed.elapsed() >= current.lease_duration {
                    tracing::error!(
                        key = %current.key,
                        lease_duration_secs = current.lease_duration.as_secs_f64(),
                        "lease expired without a successful renewal"
                    );
                    lease.mark_lost();
                    return;
                }
            }
        }
    }
}
