//! Effective configuration and the static defaults table.
//!
//! [`EffectiveConfig`] is the closed, fully defaulted record every enablement
//! predicate and materialization step reads. It is derived once per run from
//! a [`ValidatedConfig`] and never mutated afterwards.

use serde::Serialize;

use crate::access_policy::AccessPolicyDocument;
use crate::engine_version::{EngineFamily, EngineVersion};
use crate::types::{EbsVolumeType, RemovalPolicy, TlsSecurityPolicy};
use crate::validator::ValidatedConfig;

// ============================================================================
// Defaults
// ============================================================================

pub mod defaults {
    use super::*;

    pub const STAGE: &str = "dev";
    pub const DEFAULT_DEPLOY_ID: &str = "default";
    pub const ENGINE_VERSION: EngineVersion = EngineVersion::new(EngineFamily::OpenSearch, 2, 9);
    pub const DOMAIN_NAME: &str = "os-service-domain";
    pub const DATA_NODE_TYPE: &str = "r6g.large.search";
    pub const DATA_NODE_COUNT: u32 = 1;
    pub const DEDICATED_MANAGER_NODE_COUNT: u32 = 0;
    pub const WARM_NODE_COUNT: u32 = 0;
    pub const EBS_VOLUME_SIZE_GIB: u32 = 10;
    pub const AVAILABILITY_ZONE_COUNT: u32 = 1;
    pub const DP_PIPELINE_TEMPLATE_PATH: &str = "./dp_pipeline_template.yaml";
}

/// Fully validated and defaulted deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
    pub stage: String,
    pub default_deploy_id: String,

    pub engine_version: EngineVersion,
    pub domain_name: String,
    pub data_node_type: String,
    pub data_node_count: u32,
    pub dedicated_manager_node_type: Option<String>,
    pub dedicated_manager_node_count: u32,
    pub warm_node_type: Option<String>,
    pub warm_node_count: u32,

    pub access_policies: Option<AccessPolicyDocument>,
    pub use_unsigned_basic_auth: bool,
    pub fine_grained_manager_user_arn: Option<String>,
    pub fine_grained_manager_user_name: Option<String>,
    pub fine_grained_manager_user_secret_arn: Option<String>,
    pub enable_demo_admin: bool,
    pub open_access_policy_enabled: bool,

    pub enforce_https: bool,
    pub tls_security_policy: TlsSecurityPolicy,
    pub ebs_enabled: bool,
    pub ebs_iops: Option<u32>,
    pub ebs_volume_size: u32,
    pub ebs_volume_type: EbsVolumeType,
    pub encryption_at_rest_enabled: bool,
    pub encryption_at_rest_kms_key_arn: Option<String>,
    pub app_log_enabled: bool,
    pub app_log_group: Option<String>,
    pub node_to_node_encryption_enabled: bool,
    pub domain_removal_policy: RemovalPolicy,

    pub vpc_enabled: bool,
    pub vpc_id: Option<String>,
    pub vpc_subnet_ids: Vec<String>,
    pub vpc_security_group_ids: Vec<String>,
    pub availability_zone_count: u32,

    pub migration_assistance_enabled: bool,
    pub source_cluster_endpoint: Option<String>,
    pub migration_console_service_enabled: bool,
    pub capture_proxy_es_service_enabled: bool,
    pub capture_proxy_service_enabled: bool,
    pub elasticsearch_service_enabled: bool,
    pub traffic_replayer_service_enabled: bool,
    pub traffic_comparator_service_enabled: bool,
    pub traffic_comparator_jupyter_service_enabled: bool,
    pub kafka_broker_service_enabled: bool,
    pub kafka_zookeeper_service_enabled: bool,
    pub fetch_migration_enabled: bool,
    pub dp_pipeline_template_path: String,
}

impl EffectiveConfig {
    /// Fill every unset option from the defaults table.
    ///
    /// Defaults are trusted and not re-validated.
    pub fn resolve(v: ValidatedConfig) -> Self {
        Self {
            stage: v.stage.unwrap_or_else(|| defaults::STAGE.to_string()),
            default_deploy_id: v
                .default_deploy_id
                .unwrap_or_else(|| defaults::DEFAULT_DEPLOY_ID.to_string()),

            engine_version: v.engine_version.unwrap_or(defaults::ENGINE_VERSION),
            domain_name: v
                .domain_name
                .unwrap_or_else(|| defaults::DOMAIN_NAME.to_string()),
            data_node_type: v
                .data_node_type
                .unwrap_or_else(|| defaults::DATA_NODE_TYPE.to_string()),
            data_node_count: v.data_node_count.unwrap_or(defaults::DATA_NODE_COUNT),
            dedicated_manager_node_type: v.dedicated_manager_node_type,
            dedicated_manager_node_count: v
                .dedicated_manager_node_count
                .unwrap_or(defaults::DEDICATED_MANAGER_NODE_COUNT),
            warm_node_type: v.warm_node_type,
            warm_node_count: v.warm_node_count.unwrap_or(defaults::WARM_NODE_COUNT),

            access_policies: v.access_policies,
            use_unsigned_basic_auth: v.use_unsigned_basic_auth.unwrap_or(false),
            fine_grained_manager_user_arn: v.fine_grained_manager_user_arn,
            fine_grained_manager_user_name: v.fine_grained_manager_user_name,
            fine_grained_manager_user_secret_arn: v.fine_grained_manager_user_secret_arn,
            enable_demo_admin: v.enable_demo_admin.unwrap_or(false),
            open_access_policy_enabled: v.open_access_policy_enabled.unwrap_or(false),

            enforce_https: v.enforce_https.unwrap_or(true),
            tls_security_policy: v.tls_security_policy.unwrap_or_default(),
            ebs_enabled: v.ebs_enabled.unwrap_or(true),
            ebs_iops: v.ebs_iops,
            ebs_volume_size: v.ebs_volume_size.unwrap_or(defaults::EBS_VOLUME_SIZE_GIB),
            ebs_volume_type: v.ebs_volume_type.unwrap_or_default(),
            encryption_at_rest_enabled: v.encryption_at_rest_enabled.unwrap_or(true),
            encryption_at_rest_kms_key_arn: v.encryption_at_rest_kms_key_arn,
            app_log_enabled: v.app_log_enabled.unwrap_or(false),
            app_log_group: v.app_log_group,
            node_to_node_encryption_enabled: v.node_to_node_encryption_enabled.unwrap_or(true),
            domain_removal_policy: v.domain_removal_policy.unwrap_or_default(),

            vpc_enabled: v.vpc_enabled.unwrap_or(false),
            vpc_id: v.vpc_id,
            vpc_subnet_ids: v.vpc_subnet_ids.unwrap_or_default(),
            vpc_security_group_ids: v.vpc_security_group_ids.unwrap_or_default(),
            availability_zone_count: v
                .availability_zone_count
                .unwrap_or(defaults::AVAILABILITY_ZONE_COUNT),

            migration_assistance_enabled: v.migration_assistance_enabled.unwrap_or(false),
            source_cluster_endpoint: v.source_cluster_endpoint,
            migration_console_service_enabled: v.migration_console_service_enabled.unwrap_or(false),
            capture_proxy_es_service_enabled: v.capture_proxy_es_service_enabled.unwrap_or(false),
            capture_proxy_service_enabled: v.capture_proxy_service_enabled.unwrap_or(false),
            elasticsearch_service_enabled: v.elasticsearch_service_enabled.unwrap_or(false),
            traffic_replayer_service_enabled: v.traffic_replayer_service_enabled.unwrap_or(false),
            traffic_comparator_service_enabled: v
                .traffic_comparator_service_enabled
                .unwrap_or(false),
            traffic_comparator_jupyter_service_enabled: v
                .traffic_comparator_jupyter_service_enabled
                .unwrap_or(false),
            kafka_broker_service_enabled: v.kafka_broker_service_enabled.unwrap_or(false),
            kafka_zookeeper_service_enabled: v.kafka_zookeeper_service_enabled.unwrap_or(false),
            fetch_migration_enabled: v.fetch_migration_enabled.unwrap_or(false),
            dp_pipeline_template_path: v
                .dp_pipeline_template_path
                .unwrap_or_else(|| defaults::DP_PIPELINE_TEMPLATE_PATH.to_string()),
        }
    }

    /// Access policy handed to the domain: explicit document first, then the
    /// open policy if requested, otherwise none.
    pub fn domain_access_policy(&self) -> Option<AccessPolicyDocument> {
        match (&self.access_policies, self.open_access_policy_enabled) {
            (Some(policy), _) => Some(policy.clone()),
            (None, true) => Some(AccessPolicyDocument::open(&self.domain_name)),
            (None, false) => None,
        }
    }

    /// Name of the shared container cluster for migration services
    pub fn ecs_cluster_name(&self) -> String {
        format!("migration-{}-ecs-cluster", self.stage)
    }

    /// Parameter-store path for a published cross-reference key
    pub fn parameter_path(&self, key: &str) -> String {
        format!("/migration/{}/{}/{}", self.stage, self.default_deploy_id, key)
    }
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::resolve(ValidatedConfig::default())
    }
}
