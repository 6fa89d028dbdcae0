use std::time::Duration;

use dynamo_lock::{AcquireOptions, ReleaseOptions};
use envconfig::Envconfig;

use crate::error::KeeperError;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    // ── DynamoDB ────────────────────────────────────────────────────
    #[envconfig(from = "DYNAMODB_TABLE_NAME")]
    pub dynamodb_table_name: String,

    #[envconfig(from = "DYNAMODB_ENDPOINT")]
    pub dynamodb_endpoint: Option<String>,

    #[envconfig(from = "LOCK_PARTITION_KEY", default = "key")]
    pub partition_key: String,

    // ── Lease ───────────────────────────────────────────────────────
    #[envconfig(from = "LOCK_LEASE_DURATION_SECS", default = "20")]
    pub lease_duration_secs: u64,

    #[envconfig(from = "LOCK_REFRESH_PERIOD_SECS", default = "10")]
    pub refresh_period_secs: u64,

    // ── Acquisition ─────────────────────────────────────────────────
    #[envconfig(from = "LOCK_ADDITIONAL_WAIT_SECS", default = "600")]
    pub additional_wait_secs: u64,

    #[envconfig(from = "LOCK_RETRY_INTERVAL_MS", default = "1000")]
    pub retry_interval_ms: u64,

    #[envconfig(from = "LOCK_FAIL_IF_LOCKED", default = "false")]
    pub fail_if_locked: bool,

    // ── Release ─────────────────────────────────────────────────────
    #[envconfig(from = "LOCK_DELETE_ON_RELEASE", default = "false")]
    pub delete_on_release: bool,
}

impl Config {
    /// Load from the environment and validate.
    pub fn load() -> Result<Self, KeeperError> {
        let config =
            Config::init_from_env().map_err(|e| KeeperError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KeeperError> {
        if self.dynamodb_table_name.trim().is_empty() {
            return Err(KeeperError::Configuration(
                "DYNAMODB_TABLE_NAME must not be empty".into(),
            ));
        }
        if self.partition_key.is_empty() {
            return Err(KeeperError::Configuration(
                "LOCK_PARTITION_KEY must not be empty".into(),
            ));
        }
        if self.refresh_period_secs == 0 || self.refresh_period_secs >= self.lease_duration_secs {
            return Err(KeeperError::Configuration(format!(
                "LOCK_REFRESH_PERIOD_SECS ({}) must be non-zero and shorter than LOCK_LEASE_DURATION_SECS ({})",
                self.refresh_period_secs, self.lease_duration_secs
            )));
        }
        if self.retry_interval_ms == 0 {
            return Err(KeeperError::Configuration(
                "LOCK_RETRY_INTERVAL_MS must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }

    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions::new()
            .with_refresh_period(Duration::from_secs(self.refresh_period_secs))
            .with_additional_wait(Duration::from_secs(self.additional_wait_secs))
            .with_retry_interval(Duration::from_millis(self.retry_interval_ms))
            .with_fail_if_locked(self.fail_if_locked)
    }

    pub fn release_options(&self) -> ReleaseOptions {
        ReleaseOptions::default().with_delete_record(self.delete_on_release)
    }
}
