//! Lock lifecycle: resolve identity, acquire, report ready, hold until a termination
//! signal, report stopping, release.
//!
//! Only `Held` is long-lived. Every failure is terminal for the run; there is no retry
//! at this level beyond what the lock client does while acquiring.

use std::fmt;
use std::future::Future;

use dynamo_lock::{AcquireOptions, LockClient, LockKey, ReleaseOptions};
use lifecycle::{notify_best_effort, NotifyEvent, ReadinessNotifier, ShutdownTrigger};
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::KeeperError;
use crate::identity::{resolve_identity, IdentityProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Acquiring,
    Held,
    Stopping,
    Released,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Acquiring => "acquiring",
            LifecycleState::Held => "held",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Released => "released",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub struct CoordinatorSettings {
    pub key: LockKey,
    /// Explicit owner name; `None` or empty resolves the identity from the provider.
    pub owner_name: Option<String>,
    pub acquire: AcquireOptions,
    pub release: ReleaseOptions,
}

pub struct Coordinator<C, I, N> {
    client: C,
    identity: I,
    notifier: N,
    settings: CoordinatorSettings,
    state: watch::Sender<LifecycleState>,
}

impl<C, I, N> Coordinator<C, I, N>
where
    C: LockClient,
    I: IdentityProvider,
    N: ReadinessNotifier,
{
    pub fn new(client: C, identity: I, notifier: N, settings: CoordinatorSettings) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            client,
            identity,
            notifier,
            settings,
            state,
        }
    }

    /// Observe state transitions. The receiver keeps working after `run` returns.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Run one full lifecycle. `shutdown` is awaited exactly once, after the lock is
    /// held; it is not polled before that.
    pub async fn run<F>(self, shutdown: F) -> Result<(), KeeperError>
    where
        F: Future<Output = std::io::Result<ShutdownTrigger>>,
    {
        let result = self.drive(shutdown).await;
        if result.is_err() {
            self.transition(LifecycleState::Failed);
        }
        result
    }

    async fn drive<F>(&self, shutdown: F) -> Result<(), KeeperError>
    where
        F: Future<Output = std::io::Result<ShutdownTrigger>>,
    {
        let key = &self.settings.key;

        let owner = resolve_identity(self.settings.owner_name.as_deref(), &self.identity).await?;

        self.transition(LifecycleState::Acquiring);
        info!(key = %key, owner = %owner, "acquiring lock");
        let handle = self
            .client
            .acquire(key, &owner, &self.settings.acquire)
            .await
            .map_err(KeeperError::from_acquire)?;

        self.transition(LifecycleState::Held);
        info!(key = %key, owner = %owner, acquired_at = %handle.acquired_at(), "acquired lock");
        notify_best_effort(&self.notifier, NotifyEvent::Ready).await;

        let signal = shutdown.await;
        match &signal {
            Ok(trigger) => info!(signal = %trigger, "got {trigger}, stopping"),
            Err(e) => error!(error = %e, "cannot wait for shutdown signal, stopping"),
        }

        self.transition(LifecycleState::Stopping);
        notify_best_effort(&self.notifier, NotifyEvent::Stopping).await;

        info!(key = %key, delete_record = self.settings.release.delete_record, "cleaning lock");
        let released = self
            .client
            .release(handle, &self.settings.release)
            .await
            .map_err(KeeperError::Release)?;
        if !released {
            return Err(KeeperError::LockLostBeforeRelease {
                key: key.to_string(),
            });
        }
        signal.map_err(KeeperError::SignalHandler)?;

        self.transition(LifecycleState::Released);
        info!(key = %key, owner = %owner, "released lock");
        Ok(())
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "lifecycle transition");
    }
}
