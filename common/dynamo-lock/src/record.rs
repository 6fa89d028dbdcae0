use std::time::Duration;

use uuid::Uuid;

use crate::types::{LockKey, OwnerIdentity};

/// One lock item as persisted by a [`LockStore`](crate::LockStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub key: String,
    pub owner: String,
    /// Random token rewritten on every write; doubles as the fencing token.
    pub record_version: String,
    pub lease_duration: Duration,
    pub is_released: bool,
}

impl LockRecord {
    pub fn new(key: &LockKey, owner: &OwnerIdentity, lease_duration: Duration) -> Self {
        Self {
            key: key.as_str().to_string(),
            owner: owner.as_str().to_string(),
            record_version: new_record_version(),
            lease_duration,
            is_released: false,
        }
    }

    /// Same claim under a fresh record version.
    pub fn renewed(&self) -> Self {
        Self {
            record_version: new_record_version(),
            ..self.clone()
        }
    }

    /// Same owner, marked released, under a fresh record version.
    pub fn released(&self) -> Self {
        Self {
            record_version: new_record_version(),
            is_released: true,
            ..self.clone()
        }
    }
}

/// Precondition for a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// No record exists for the key.
    Absent,
    /// A record exists and carries exactly this record version.
    VersionIs(String),
}

fn new_record_version() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LockRecord {
        LockRecord::new(
            &LockKey::new("orders").unwrap(),
            &OwnerIdentity::new("i-0abc").unwrap(),
            Duration::from_secs(20),
        )
    }

    #[test]
    fn renewal_changes_only_the_version() {
        let original = record();
        let renewed = original.renewed();
        assert_ne!(original.record_version, renewed.record_version);
        assert_eq!(original.owner, renewed.owner);
        assert_eq!(original.lease_duration, renewed.lease_duration);
        assert!(!renewed.is_released);
    }

    #[test]
    fn released_record_keeps_owner() {
        let original = record();
        let released = original.released();
        assert!(released.is_released);
        assert_eq!(released.owner, "i-0abc");
        assert_ne!(original.record_version, released.record_version);
    }
}
