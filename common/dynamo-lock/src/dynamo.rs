use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;

use crate::error::LockError;
use crate::record::{Condition, LockRecord};
use crate::store::LockStore;

pub const DEFAULT_PARTITION_KEY: &str = "key";

const OWNER_ATTR: &str = "ownerName";
const RVN_ATTR: &str = "recordVersionNumber";
const LEASE_ATTR: &str = "leaseDuration";
const RELEASED_ATTR: &str = "isReleased";

const CONDITION_ABSENT: &str = "attribute_not_exists(#pk)";
const CONDITION_VERSION: &str = "attribute_exists(#pk) AND #rvn = :rvn";

/// [`LockStore`] backed by a DynamoDB table keyed by a single string partition key.
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table: String,
    partition_key: String,
}

impl DynamoStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            partition_key: DEFAULT_PARTITION_KEY.to_string(),
        }
    }

    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.partition_key = partition_key.into();
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl LockStore for DynamoStore {
    async fn get(&self, key: &str) -> Result<Option<LockRecord>, LockError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(&self.partition_key, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                LockError::Service(format!("get_item failed: {}", DisplayErrorContext(&e)))
            })?;

        output
            .item()
            .map(|item| record_from_item(&self.partition_key, item))
            .transpose()
    }

    async fn put(&self, record: &LockRecord, condition: Condition) -> Result<bool, LockError> {
        let mut request = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item_from_record(&self.partition_key, record)))
            .expression_attribute_names("#pk", &self.partition_key);

        request = match condition {
            Condition::Absent => request.condition_expression(CONDITION_ABSENT),
            Condition::VersionIs(version) => request
                .condition_expression(CONDITION_VERSION)
                .expression_attribute_names("#rvn", RVN_ATTR)
                .expression_attribute_values(":rvn", AttributeValue::S(version)),
        };

        match request.send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let e = e.into_service_error();
                if e.is_conditional_check_failed_exception() {
                    Ok(false)
                } else {
                    Err(LockError::Service(format!(
                        "put_item failed: {}",
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }

    async fn delete(&self, key: &str, record_version: &str) -> Result<bool, LockError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key(&self.partition_key, AttributeValue::S(key.to_string()))
            .condition_expression(CONDITION_VERSION)
            .expression_attribute_names("#pk", &self.partition_key)
            .expression_attribute_names("#rvn", RVN_ATTR)
            .expression_attribute_values(":rvn", AttributeValue::S(record_version.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let e = e.into_service_error();
                if e.is_conditional_check_failed_exception() {
                    Ok(false)
                } else {
                    Err(LockError::Service(format!(
                        "delete_item failed: {}",
                        DisplayErrorContext(&e)
                    )))
                }
            }
        }
    }
}

fn item_from_record(partition_key: &str, record: &LockRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (
            partition_key.to_string(),
            AttributeValue::S(record.key.clone()),
        ),
        (OWNER_ATTR.to_string(), AttributeValue::S(record.owner.clone())),
        (
            RVN_ATTR.to_string(),
            AttributeValue::S(record.record_version.clone()),
        ),
        (
            LEASE_ATTR.to_string(),
            AttributeValue::N(record.lease_duration.as_millis().to_string()),
        ),
        (
            RELEASED_ATTR.to_string(),
            AttributeValue::Bool(record.is_released),
        ),
    ])
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, LockError> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| LockError::InvalidRecord(format!("missing string attribute '{name}'")))
}

fn record_from_item(
    partition_key: &str,
    item: &HashMap<String, AttributeValue>,
) -> Result<LockRecord, LockError> {
    let lease_ms = item
        .get(LEASE_ATTR)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| LockError::InvalidRecord(format!("missing number attribute '{LEASE_ATTR}'")))?
        .parse::<u64>()
        .map_err(|e| LockError::InvalidRecord(format!("bad '{LEASE_ATTR}': {e}")))?;

    // Records written by other tooling may omit the flag; absent means held.
    let is_released = item
        .get(RELEASED_ATTR)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false);

    Ok(LockRecord {
        key: string_attr(item, partition_key)?,
        owner: string_attr(item, OWNER_ATTR)?,
        record_version: string_attr(item, RVN_ATTR)?,
        lease_duration: Duration::from_millis(lease_ms),
        is_released,
    })
}
