use async_trait::async_trait;

use crate::error::LockError;
use crate::record::{Condition, LockRecord};

/// Conditional-write storage for lock records.
///
/// A failed precondition is contention, not an error: `put` and `delete` report it as
/// `Ok(false)`. `Err` is reserved for transport or service failures.
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    /// Strongly consistent read of the record for `key`.
    async fn get(&self, key: &str) -> Result<Option<LockRecord>, LockError>;

    /// Create or overwrite `record` if `condition` holds.
    async fn put(&self, record: &LockRecord, condition: Condition) -> Result<bool, LockError>;

    /// Delete the record for `key` if it still carries `record_version`.
    async fn delete(&self, key: &str, record_version: &str) -> Result<bool, LockError>;
}
