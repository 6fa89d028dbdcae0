//! Owner identity resolution: an explicit name, or the EC2 instance id.

use async_trait::async_trait;
use aws_config::imds;
use dynamo_lock::OwnerIdentity;
use thiserror::Error;

use crate::error::KeeperError;

const INSTANCE_ID_PATH: &str = "/latest/meta-data/instance-id";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("instance metadata request failed: {0}")]
    Metadata(String),

    #[error("identity provider returned an empty identifier")]
    Empty,
}

/// Source of a unique identifier for this process's host.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn instance_id(&self) -> Result<String, IdentityError>;
}

/// Reads the instance id from the EC2 instance metadata service.
#[derive(Clone)]
pub struct ImdsIdentityProvider {
    client: imds::Client,
}

impl ImdsIdentityProvider {
    pub fn new() -> Self {
        Self {
            client: imds::Client::builder().build(),
        }
    }
}

impl Default for ImdsIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for ImdsIdentityProvider {
    async fn instance_id(&self) -> Result<String, IdentityError> {
        let value = self
            .client
            .get(INSTANCE_ID_PATH)
            .await
            .map_err(|e| IdentityError::Metadata(e.to_string()))?;
        let instance_id: &str = value.as_ref();
        Ok(instance_id.trim().to_string())
    }
}

/// Use `explicit_name` verbatim when it is non-empty; otherwise ask `provider`, exactly once.
pub async fn resolve_identity<P>(
    explicit_name: Option<&str>,
    provider: &P,
) -> Result<OwnerIdentity, KeeperError>
where
    P: IdentityProvider + ?Sized,
{
    if let Some(name) = explicit_name.filter(|name| !name.is_empty()) {
        return OwnerIdentity::new(name).map_err(|e| KeeperError::Configuration(e.to_string()));
    }

    let instance_id = provider
        .instance_id()
        .await
        .map_err(KeeperError::IdentityResolution)?;
    OwnerIdentity::new(instance_id).map_err(|_| KeeperError::IdentityResolution(IdentityError::Empty))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FixedProvider {
        result: Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn returning(result: Result<&'static str, &'static str>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FixedProvider {
        async fn instance_id(&self) -> Result<String, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map(str::to_string)
                .map_err(|e| IdentityError::Metadata(e.to_string()))
        }
    }

    #[tokio::test]
    async fn explicit_name_skips_the_provider() {
        let provider = FixedProvider::returning(Ok("i-0abc"));
        let owner = resolve_identity(Some("worker-1"), &provider).await.unwrap();
        assert_eq!(owner.as_str(), "worker-1");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_name_asks_the_provider_once() {
        let provider = FixedProvider::returning(Ok("i-0abc"));
        let owner = resolve_identity(None, &provider).await.unwrap();
        assert_eq!(owner.as_str(), "i-0abc");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_name_falls_back_to_the_provider() {
        let provider = FixedProvider::returning(Ok("i-0abc"));
        let owner = resolve_identity(Some(""), &provider).await.unwrap();
        assert_eq!(owner.as_str(), "i-0abc");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_an_identity_error() {
        let provider = FixedProvider::returning(Err("connection refused"));
        let err = resolve_identity(None, &provider).await.unwrap_err();
        assert!(matches!(
            err,
            KeeperError::IdentityResolution(IdentityError::Metadata(_))
        ));
    }

    #[tokio::test]
    async fn empty_instance_id_is_rejected() {
        let provider = FixedProvider::returning(Ok(""));
        let err = resolve_identity(None, &provider).await.unwrap_err();
        assert!(matches!(
            err,
            KeeperError::IdentityResolution(IdentityError::Empty)
        ));
    }
}
