//! Lease-based distributed lock over a conditional-write key/value store.
//!
//! The protocol lives in [`LeaseLockClient`] and is written once against the
//! [`LockStore`] trait. [`DynamoStore`] backs it with a DynamoDB table, [`MemoryStore`]
//! with an in-process map for tests and local runs.
//!
//! Every write stamps the record with a fresh random record version. Writes are
//! conditioned on the version the writer last saw, so a holder that lost its lease can
//! never overwrite the new owner's record.

mod client;
mod dynamo;
mod error;
mod memory;
mod record;
mod refresh;
mod store;
mod types;

pub use client::{LeaseLockClient, LockClient, LockHandle};
pub use dynamo::{DynamoStore, DEFAULT_PARTITION_KEY};
pub use error::LockError;
pub use memory::MemoryStore;
pub use record::{Condition, LockRecord};
pub use store::LockStore;
pub use types::{AcquireOptions, LockKey, OwnerIdentity, ReleaseOptions};
