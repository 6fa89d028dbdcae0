use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockError;
use crate::record::{Condition, LockRecord};
use crate::store::LockStore;

#[derive(Default)]
struct Inner {
    records: HashMap<String, LockRecord>,
    failing_gets: usize,
    failing_puts: usize,
    failing_deletes: usize,
    put_delay: Duration,
    gets: usize,
    puts: usize,
    deletes: usize,
}

/// In-process [`LockStore`] with the same conditional semantics as the DynamoDB store.
///
/// Always available, not only under `cfg(test)`: clones share state, so a test can keep
/// one clone to seed records, inject failures and inspect what the client wrote.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the guard can only come from a test assertion; the map
        // itself is never left half-updated.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `record` unconditionally.
    pub fn insert(&self, record: LockRecord) {
        self.lock().records.insert(record.key.clone(), record);
    }

    pub fn record(&self, key: &str) -> Option<LockRecord> {
        self.lock().records.get(key).cloned()
    }

    /// Simulate another process taking the lock over: `owner` now holds `key` under a
    /// new record version.
    pub fn preempt(&self, key: &str, owner: &str) -> Option<LockRecord> {
        let mut inner = self.lock();
        let current = inner.records.get(key)?;
        let mut stolen = current.renewed();
        stolen.owner = owner.to_string();
        stolen.is_released = false;
        inner.records.insert(key.to_string(), stolen.clone());
        Some(stolen)
    }

    /// Fail the next `n` reads with a service error.
    pub fn fail_gets(&self, n: usize) {
        self.lock().failing_gets = n;
    }

    /// Fail the next `n` writes with a service error.
    pub fn fail_puts(&self, n: usize) {
        self.lock().failing_puts = n;
    }

    /// Fail the next `n` deletes with a service error.
    pub fn fail_deletes(&self, n: usize) {
        self.lock().failing_deletes = n;
    }

    /// Make every later write take `delay` before it reaches the map.
    pub fn delay_puts(&self, delay: Duration) {
        self.lock().put_delay = delay;
    }

    pub fn get_calls(&self) -> usize {
        self.lock().gets
    }

    pub fn put_calls(&self) -> usize {
        self.lock().puts
    }

    pub fn delete_calls(&self) -> usize {
        self.lock().deletes
    }
}

fn take_failure(counter: &mut usize, op: &str) -> Result<(), LockError> {
    if *counter > 0 {
        *counter -= 1;
        return Err(LockError::Service(format!("injected {op} failure")));
    }
    Ok(())
}

fn condition_holds(current: Option<&LockRecord>, condition: &Condition) -> bool {
    match (condition, current) {
        (Condition::Absent, None) => true,
        (Condition::VersionIs(expected), Some(record)) => record.record_version == *expected,
        _ => false,
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<LockRecord>, LockError> {
        let mut inner = self.lock();
        inner.gets += 1;
        take_failure(&mut inner.failing_gets, "get")?;
        Ok(inner.records.get(key).cloned())
    }

    async fn put(&self, record: &LockRecord, condition: Condition) -> Result<bool, LockError> {
        let delay = self.lock().put_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        inner.puts += 1;
        take_failure(&mut inner.failing_puts, "put")?;
        if !condition_holds(inner.records.get(&record.key), &condition) {
            return Ok(false);
        }
        inner.records.insert(record.key.clone(), record.clone());
        Ok(true)
    }

    async fn delete(&self, key: &str, record_version: &str) -> Result<bool, LockError> {
        let mut inner = self.lock();
        inner.deletes += 1;
        take_failure(&mut inner.failing_deletes, "delete")?;
        let condition = Condition::VersionIs(record_version.to_string());
        if !condition_holds(inner.records.get(key), &condition) {
            return Ok(false);
        }
        inner.records.remove(key);
        Ok(true)
    }
}
