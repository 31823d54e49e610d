//! Run-scoped cross-reference registry.
//!
//! Units publish values (endpoints, security-group ids, cluster names) under
//! `(producer, key)` and later units read them. Entries are written at most
//! once and never removed. Reading a key that was never written is a catalog
//! bug, so it fails with [`ComposerError::CrossReferenceMissing`] instead of
//! returning an `Option`.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{ComposerError, Result};
use crate::units::UnitId;

/// Documented cross-reference keys
pub mod keys {
    // network
    pub const VPC_ID: &str = "vpcId";
    pub const PRIVATE_SUBNET_IDS: &str = "privateSubnetIds";
    pub const OS_ACCESS_SECURITY_GROUP_ID: &str = "osAccessSecurityGroupId";

    // opensearch-domain
    pub const OS_CLUSTER_ENDPOINT: &str = "osClusterEndpoint";
    pub const DOMAIN_ARN: &str = "domainArn";

    // migration-assistance
    pub const MSK_BROKERS: &str = "mskBrokers";
    pub const SERVICE_CONNECT_SECURITY_GROUP_ID: &str = "serviceConnectSecurityGroupId";
    pub const ECS_CLUSTER_NAME: &str = "ecsClusterName";

    // migration services
    pub const KAFKA_ZOOKEEPER_ENDPOINT: &str = "kafkaZookeeperEndpoint";
    pub const KAFKA_BROKER_ENDPOINT: &str = "kafkaBrokerEndpoint";
    pub const ELASTICSEARCH_ENDPOINT: &str = "elasticsearchEndpoint";
    pub const CAPTURE_PROXY_ES_ENDPOINT: &str = "captureProxyESEndpoint";
    pub const CAPTURE_PROXY_ENDPOINT: &str = "captureProxyEndpoint";
    pub const COMPARATOR_ENDPOINT: &str = "comparatorEndpoint";
    pub const JUPYTER_ENDPOINT: &str = "jupyterEndpoint";

    // fetch-migration
    pub const FETCH_MIGRATION_TASK_DEF_ARN: &str = "fetchMigrationTaskDefArn";
    pub const FETCH_MIGRATION_TASK_ROLE_ARN: &str = "fetchMigrationTaskRoleArn";
    pub const FETCH_MIGRATION_TASK_EXEC_ROLE_ARN: &str = "fetchMigrationTaskExecRoleArn";
    pub const FETCH_MIGRATION_COMMAND: &str = "fetchMigrationCommand";
}

/// Append-only `(producer, key) -> value` store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossReferenceRegistry {
    entries: BTreeMap<(UnitId, String), String>,
}

impl CrossReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; a second write to the same key is rejected
    pub fn publish(
        &mut self,
        producer: UnitId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&(producer, key.clone())) {
            return Err(ComposerError::CrossReferenceConflict { producer, key });
        }
        self.entries.insert((producer, key), value.into());
        Ok(())
    }

    /// Read a value on behalf of `consumer`
    pub fn get(&self, consumer: UnitId, producer: UnitId, key: &str) -> Result<&str> {
        self.entries
            .get(&(producer, key.to_string()))
            .map(String::as_str)
            .ok_or_else(|| ComposerError::CrossReferenceMissing {
                consumer,
                producer,
                key: key.to_string(),
            })
    }

    /// Entries published by one unit, sorted by key
    pub fn published_by(&self, producer: UnitId) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .filter(|((unit, _), _)| *unit == producer)
            .map(|((_, key), value)| (key.as_str(), value.as_str()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &str, &str)> {
        self.entries
            .iter()
            .map(|((unit, key), value)| (*unit, key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CrossReferenceRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for ((unit, key), value) in &self.entries {
            map.serialize_entry(&format!("{unit}/{key}"), value)?;
        }
        map.end()
    }
}
