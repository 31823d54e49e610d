//! Context validation.
//!
//! Checks every option present in a [`RawConfig`] against its expected type
//! and grammar and produces a [`ValidatedConfig`] where each field is `None`
//! when the option was absent or given as an empty string. Unknown option
//! names are rejected. Defaults are applied later by
//! [`EffectiveConfig::resolve`](crate::config::EffectiveConfig::resolve).
//!
//! # Accepted Shapes
//!
//! | Kind        | JSON forms                                     |
//! |-------------|------------------------------------------------|
//! | string      | string                                         |
//! | bool        | `true`/`false`, `"true"`/`"false"`             |
//! | number      | non-negative integer, decimal string           |
//! | string list | array of strings, comma-separated string       |
//! | enum        | exact member literal (see [`crate::types`])    |
//! | policy      | object or its JSON text, see [`AccessPolicyDocument`] |

use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::access_policy::AccessPolicyDocument;
use crate::config_file::{json_kind, RawConfig};
use crate::engine_version::EngineVersion;
use crate::error::{ComposerError, Result};
use crate::types::{allowed_values, EbsVolumeType, RemovalPolicy, TlsSecurityPolicy};

/// Every option name the composer recognizes
pub const OPTION_NAMES: &[&str] = &[
    "stage",
    "defaultDeployId",
    "engineVersion",
    "domainName",
    "dataNodeType",
    "dataNodeCount",
    "dedicatedManagerNodeType",
    "dedicatedManagerNodeCount",
    "warmNodeType",
    "warmNodeCount",
    "accessPolicies",
    "useUnsignedBasicAuth",
    "fineGrainedManagerUserARN",
    "fineGrainedManagerUserName",
    "fineGrainedManagerUserSecretManagerKeyARN",
    "enableDemoAdmin",
    "enforceHTTPS",
    "tlsSecurityPolicy",
    "ebsEnabled",
    "ebsIops",
    "ebsVolumeSize",
    "ebsVolumeType",
    "encryptionAtRestEnabled",
    "encryptionAtRestKmsKeyARN",
    "appLogEnabled",
    "appLogGroup",
    "nodeToNodeEncryptionEnabled",
    "vpcEnabled",
    "vpcId",
    "vpcSubnetIds",
    "vpcSecurityGroupIds",
    "availabilityZoneCount",
    "openAccessPolicyEnabled",
    "domainRemovalPolicy",
    "migrationAssistanceEnabled",
    "sourceClusterEndpoint",
    "migrationConsoleServiceEnabled",
    "captureProxyESServiceEnabled",
    "captureProxyServiceEnabled",
    "elasticsearchServiceEnabled",
    "trafficReplayerServiceEnabled",
    "trafficComparatorServiceEnabled",
    "trafficComparatorJupyterServiceEnabled",
    "kafkaBrokerServiceEnabled",
    "kafkaZookeeperServiceEnabled",
    "fetchMigrationEnabled",
    "dpPipelineTemplatePath",
];

/// Type-checked options; `None` means "use the default"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedConfig {
    // Deployment identity
    pub stage: Option<String>,
    pub default_deploy_id: Option<String>,

    // Domain shape
    pub engine_version: Option<EngineVersion>,
    pub domain_name: Option<String>,
    pub data_node_type: Option<String>,
    pub data_node_count: Option<u32>,
    pub dedicated_manager_node_type: Option<String>,
    pub dedicated_manager_node_count: Option<u32>,
    pub warm_node_type: Option<String>,
    pub warm_node_count: Option<u32>,

    // Access
    pub access_policies: Option<AccessPolicyDocument>,
    pub use_unsigned_basic_auth: Option<bool>,
    pub fine_grained_manager_user_arn: Option<String>,
    pub fine_grained_manager_user_name: Option<String>,
    pub fine_grained_manager_user_secret_arn: Option<String>,
    pub enable_demo_admin: Option<bool>,
    pub open_access_policy_enabled: Option<bool>,

    // Transport & storage
    pub enforce_https: Option<bool>,
    pub tls_security_policy: Option<TlsSecurityPolicy>,
    pub ebs_enabled: Option<bool>,
    pub ebs_iops: Option<u32>,
    pub ebs_volume_size: Option<u32>,
    pub ebs_volume_type: Option<EbsVolumeType>,
    pub encryption_at_rest_enabled: Option<bool>,
    pub encryption_at_rest_kms_key_arn: Option<String>,
    pub app_log_enabled: Option<bool>,
    pub app_log_group: Option<String>,
    pub node_to_node_encryption_enabled: Option<bool>,
    pub domain_removal_policy: Option<RemovalPolicy>,

    // Network
    pub vpc_enabled: Option<bool>,
    pub vpc_id: Option<String>,
    pub vpc_subnet_ids: Option<Vec<String>>,
    pub vpc_security_group_ids: Option<Vec<String>>,
    pub availability_zone_count: Option<u32>,

    // Migration units
    pub migration_assistance_enabled: Option<bool>,
    pub source_cluster_endpoint: Option<String>,
    pub migration_console_service_enabled: Option<bool>,
    pub capture_proxy_es_service_enabled: Option<bool>,
    pub capture_proxy_service_enabled: Option<bool>,
    pub elasticsearch_service_enabled: Option<bool>,
    pub traffic_replayer_service_enabled: Option<bool>,
    pub traffic_comparator_service_enabled: Option<bool>,
    pub traffic_comparator_jupyter_service_enabled: Option<bool>,
    pub kafka_broker_service_enabled: Option<bool>,
    pub kafka_zookeeper_service_enabled: Option<bool>,
    pub fetch_migration_enabled: Option<bool>,
    pub dp_pipeline_template_path: Option<String>,
}

/// Validate every option in `raw`, failing on the first offending one.
///
/// # Errors
///
/// Returns [`ComposerError::Validation`] naming the option and the violated
/// rule. No partial result is produced.
pub fn validate(raw: &RawConfig) -> Result<ValidatedConfig> {
    let mut out = ValidatedConfig::default();

    for (name, value) in raw.iter() {
        debug!(option = name, "validating option");
        match name {
            "stage" => out.stage = text(name, value)?,
            "defaultDeployId" => out.default_deploy_id = text(name, value)?,
            "engineVersion" => out.engine_version = engine_version(name, value)?,
            "domainName" => out.domain_name = text(name, value)?,
            "dataNodeType" => out.data_node_type = text(name, value)?,
            "dataNodeCount" => out.data_node_count = number(name, value)?,
            "dedicatedManagerNodeType" => out.dedicated_manager_node_type = text(name, value)?,
            "dedicatedManagerNodeCount" => out.dedicated_manager_node_count = number(name, value)?,
            "warmNodeType" => out.warm_node_type = text(name, value)?,
            "warmNodeCount" => out.warm_node_count = number(name, value)?,
            "accessPolicies" => out.access_policies = access_policy(name, value)?,
            "useUnsignedBasicAuth" => out.use_unsigned_basic_auth = flag(name, value)?,
            "fineGrainedManagerUserARN" => out.fine_grained_manager_user_arn = text(name, value)?,
            "fineGrainedManagerUserName" => out.fine_grained_manager_user_name = text(name, value)?,
            "fineGrainedManagerUserSecretManagerKeyARN" => {
                out.fine_grained_manager_user_secret_arn = text(name, value)?
            }
            "enableDemoAdmin" => out.enable_demo_admin = flag(name, value)?,
            "openAccessPolicyEnabled" => out.open_access_policy_enabled = flag(name, value)?,
            "enforceHTTPS" => out.enforce_https = flag(name, value)?,
            "tlsSecurityPolicy" => out.tls_security_policy = member(name, value)?,
            "ebsEnabled" => out.ebs_enabled = flag(name, value)?,
            "ebsIops" => out.ebs_iops = number(name, value)?,
            "ebsVolumeSize" => out.ebs_volume_size = number(name, value)?,
            "ebsVolumeType" => out.ebs_volume_type = member(name, value)?,
            "encryptionAtRestEnabled" => out.encryption_at_rest_enabled = flag(name, value)?,
            "encryptionAtRestKmsKeyARN" => out.encryption_at_rest_kms_key_arn = text(name, value)?,
            "appLogEnabled" => out.app_log_enabled = flag(name, value)?,
            "appLogGroup" => out.app_log_group = text(name, value)?,
            "nodeToNodeEncryptionEnabled" => {
                out.node_to_node_encryption_enabled = flag(name, value)?
            }
            "domainRemovalPolicy" => out.domain_removal_policy = member(name, value)?,
            "vpcEnabled" => out.vpc_enabled = flag(name, value)?,
            "vpcId" => out.vpc_id = text(name, value)?,
            "vpcSubnetIds" => out.vpc_subnet_ids = list(name, value)?,
            "vpcSecurityGroupIds" => out.vpc_security_group_ids = list(name, value)?,
            "availabilityZoneCount" => {
                out.availability_zone_count = number(name, value)?;
                if let Some(count) = out.availability_zone_count {
                    if !(1..=3).contains(&count) {
                        return Err(ComposerError::validation(
                            name,
                            format!("must be between 1 and 3, got {count}"),
                        ));
                    }
                }
            }
            "migrationAssistanceEnabled" => out.migration_assistance_enabled = flag(name, value)?,
            "sourceClusterEndpoint" => out.source_cluster_endpoint = text(name, value)?,
            "migrationConsoleServiceEnabled" => {
                out.migration_console_service_enabled = flag(name, value)?
            }
            "captureProxyESServiceEnabled" => {
                out.capture_proxy_es_service_enabled = flag(name, value)?
            }
            "captureProxyServiceEnabled" => out.capture_proxy_service_enabled = flag(name, value)?,
            "elasticsearchServiceEnabled" => {
                out.elasticsearch_service_enabled = flag(name, value)?
            }
            "trafficReplayerServiceEnabled" => {
                out.traffic_replayer_service_enabled = flag(name, value)?
            }
            "trafficComparatorServiceEnabled" => {
                out.traffic_comparator_service_enabled = flag(name, value)?
            }
            "trafficComparatorJupyterServiceEnabled" => {
                out.traffic_comparator_jupyter_service_enabled = flag(name, value)?
            }
            "kafkaBrokerServiceEnabled" => out.kafka_broker_service_enabled = flag(name, value)?,
            "kafkaZookeeperServiceEnabled" => {
                out.kafka_zookeeper_service_enabled = flag(name, value)?
            }
            "fetchMigrationEnabled" => out.fetch_migration_enabled = flag(name, value)?,
            "dpPipelineTemplatePath" => out.dp_pipeline_template_path = text(name, value)?,
            unknown => {
                return Err(ComposerError::validation(unknown, "unrecognized option"));
            }
        }
    }

    check_iops(&out)?;
    Ok(out)
}

/// Provisioned IOPS only apply to volume types that support them
fn check_iops(out: &ValidatedConfig) -> Result<()> {
    let volume_type = out.ebs_volume_type.unwrap_or_default();
    match out.ebs_iops {
        Some(iops) if !volume_type.supports_iops() => Err(ComposerError::validation(
            "ebsIops",
            format!("{iops} IOPS cannot be set on ebsVolumeType {volume_type}"),
        )),
        _ => Ok(()),
    }
}

// ============================================================================
// Per-kind checks
// ============================================================================

/// `true` when the value should fall back to its default
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn wrong_type(name: &str, expected: &str, value: &Value) -> ComposerError {
    ComposerError::validation(name, format!("expected {expected}, got {}", json_kind(value)))
}

fn text(name: &str, value: &Value) -> Result<Option<String>> {
    if is_unset(value) {
        return Ok(None);
    }
    match value {
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(wrong_type(name, "a string", other)),
    }
}

fn flag(name: &str, value: &Value) -> Result<Option<bool>> {
    if is_unset(value) {
        return Ok(None);
    }
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(ComposerError::validation(
                name,
                format!("expected true or false, got '{s}'"),
            )),
        },
        other => Err(wrong_type(name, "a boolean", other)),
    }
}

fn number(name: &str, value: &Value) -> Result<Option<u32>> {
    if is_unset(value) {
        return Ok(None);
    }
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        other => return Err(wrong_type(name, "a non-negative integer", other)),
    };
    parsed.map(Some).ok_or_else(|| {
        ComposerError::validation(name, format!("expected a non-negative integer, got {value}"))
    })
}

fn list(name: &str, value: &Value) -> Result<Option<Vec<String>>> {
    if is_unset(value) {
        return Ok(None);
    }
    let items: Vec<String> = match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                other => Err(ComposerError::validation(
                    name,
                    format!("list entries must be non-empty strings, got {other}"),
                )),
            })
            .collect::<Result<_>>()?,
        other => return Err(wrong_type(name, "a list of strings", other)),
    };
    Ok(Some(items))
}

fn member<T>(name: &str, value: &Value) -> Result<Option<T>>
where
    T: FromStr + IntoEnumIterator + Display,
{
    let Some(literal) = text(name, value)? else {
        return Ok(None);
    };
    literal.parse::<T>().map(Some).map_err(|_| {
        ComposerError::validation(
            name,
            format!("'{literal}' is not one of [{}]", allowed_values::<T>()),
        )
    })
}

fn engine_version(name: &str, value: &Value) -> Result<Option<EngineVersion>> {
    let Some(literal) = text(name, value)? else {
        return Ok(None);
    };
    literal
        .parse::<EngineVersion>()
        .map(Some)
        .map_err(|e| ComposerError::validation(name, e.to_string()))
}

fn access_policy(name: &str, value: &Value) -> Result<Option<AccessPolicyDocument>> {
    if is_unset(value) {
        return Ok(None);
    }
    let parsed;
    let document = match value {
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text).map_err(|e| {
                ComposerError::validation(name, format!("access policy is not valid JSON: {e}"))
            })?;
            &parsed
        }
        other => other,
    };
    AccessPolicyDocument::from_value(document)
        .map(Some)
        .map_err(|reason| ComposerError::validation(name, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_version::EngineFamily;
    use serde_json::json;

    fn validate_one(name: &str, value: Value) -> Result<ValidatedConfig> {
        validate(&RawConfig::new().with(name, value))
    }

    #[test]
    fn test_empty_context_is_valid() {
        let validated = validate(&RawConfig::new()).unwrap();
        assert_eq!(validated, ValidatedConfig::default());
    }

    #[test]
    fn test_engine_version_accepted() {
        let v = validate_one("engineVersion", json!("ES_7.10")).unwrap();
        assert_eq!(
            v.engine_version,
            Some(EngineVersion::new(EngineFamily::Elasticsearch, 7, 10))
        );
    }

    #[test]
    fn test_invalid_engine_version_rejected() {
        let err = validate_one("engineVersion", json!("OpenSearch_1.3")).unwrap_err();
        assert_eq!(err.option(), Some("engineVersion"));
    }

    #[test]
    fn test_invalid_enum_values_name_allowed_set() {
        let err = validate_one("tlsSecurityPolicy", json!("TLS_0_9")).unwrap_err();
        assert!(err.to_string().contains("TLS_1_0, TLS_1_2, TLS_1_2_PFS"));

        let err = validate_one("ebsVolumeType", json!("GP0")).unwrap_err();
        assert_eq!(err.option(), Some("ebsVolumeType"));

        let err = validate_one("domainRemovalPolicy", json!("DELETE")).unwrap_err();
        assert!(err.to_string().contains("DESTROY, RETAIN, SNAPSHOT"));
    }

    #[test]
    fn test_empty_string_means_unset() {
        let v = validate_one("domainName", json!("")).unwrap();
        assert_eq!(v.domain_name, None);
        let v = validate_one("ebsVolumeType", json!("")).unwrap();
        assert_eq!(v.ebs_volume_type, None);
    }

    #[test]
    fn test_string_booleans_accepted() {
        let v = validate_one("vpcEnabled", json!("true")).unwrap();
        assert_eq!(v.vpc_enabled, Some(true));
        let v = validate_one("vpcEnabled", json!("False")).unwrap();
        assert_eq!(v.vpc_enabled, Some(false));
        assert!(validate_one("vpcEnabled", json!("yes")).is_err());
        assert!(validate_one("vpcEnabled", json!(1)).is_err());
    }

    #[test]
    fn test_numbers_accept_strings_and_reject_negatives() {
        let v = validate_one("dataNodeCount", json!("4")).unwrap();
        assert_eq!(v.data_node_count, Some(4));
        assert!(validate_one("dataNodeCount", json!(-1)).is_err());
        assert!(validate_one("dataNodeCount", json!(1.5)).is_err());
        assert!(validate_one("dataNodeCount", json!("many")).is_err());
    }

    #[test]
    fn test_availability_zone_range() {
        assert!(validate_one("availabilityZoneCount", json!(3)).is_ok());
        assert!(validate_one("availabilityZoneCount", json!(0)).is_err());
        assert!(validate_one("availabilityZoneCount", json!(4)).is_err());
    }

    #[test]
    fn test_lists_accept_array_or_csv() {
        let v = validate_one("vpcSubnetIds", json!(["subnet-1", "subnet-2"])).unwrap();
        assert_eq!(v.vpc_subnet_ids, Some(vec!["subnet-1".into(), "subnet-2".into()]));
        let v = validate_one("vpcSubnetIds", json!("subnet-1, subnet-2")).unwrap();
        assert_eq!(v.vpc_subnet_ids, Some(vec!["subnet-1".into(), "subnet-2".into()]));
        assert!(validate_one("vpcSubnetIds", json!([1, 2])).is_err());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = validate_one("domainNmae", json!("typo")).unwrap_err();
        assert_eq!(err.option(), Some("domainNmae"));
        assert!(err.to_string().contains("unrecognized"));
    }

    #[test]
    fn test_access_policy_errors_are_attributed() {
        let err = validate_one("accessPolicies", json!({"Version": "2012-10-17"})).unwrap_err();
        assert_eq!(err.option(), Some("accessPolicies"));
    }

    const POLICY_STATEMENT: &str = r#"{"Effect":"Allow","Principal":{"AWS":"*"},"Action":"es:ESHttp*","Resource":"arn:aws:es:us-east-1:12345678912:domain/test-os-domain/*"}"#;

    #[test]
    fn test_access_policy_as_json_text_block() {
        let text = format!(r#"{{"Version":"2012-10-17","Statement":{POLICY_STATEMENT}}}"#);
        let raw = RawConfig::new()
            .with("vpcEnabled", "true")
            .with("dataNodeCount", "2")
            .with("accessPolicies", text);
        let v = validate(&raw).unwrap();
        let policy = v.access_policies.unwrap();
        assert_eq!(policy.statements.len(), 1);
        assert_eq!(policy.statements[0].effect, "Allow");
        assert_eq!(v.data_node_count, Some(2));
    }

    #[test]
    fn test_access_policy_as_json_text_array() {
        let text = format!(
            r#"{{"Version":"2012-10-17","Statement":[{POLICY_STATEMENT},{POLICY_STATEMENT}]}}"#
        );
        let v = validate_one("accessPolicies", json!(text)).unwrap();
        assert_eq!(v.access_policies.unwrap().statements.len(), 2);
    }

    #[test]
    fn test_access_policy_malformed_json_text() {
        let err = validate_one("accessPolicies", json!(r#"{"Statement": ["#)).unwrap_err();
        assert_eq!(err.option(), Some("accessPolicies"));
        assert!(err.to_string().contains("not valid JSON"));

        let err = validate_one("accessPolicies", json!("allow-all")).unwrap_err();
        assert_eq!(err.option(), Some("accessPolicies"));
    }

    #[test]
    fn test_engine_version_out_of_range_is_reported() {
        let err = validate_one("engineVersion", json!("OS_4294967296.0")).unwrap_err();
        assert_eq!(err.option(), Some("engineVersion"));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_iops_requires_supporting_volume_type() {
        let err = validate(
            &RawConfig::new()
                .with("ebsVolumeType", "GP2")
                .with("ebsIops", 3000),
        )
        .unwrap_err();
        assert_eq!(err.option(), Some("ebsIops"));
        assert!(err.to_string().contains("GP2"));

        // GP3 is the default volume type and supports IOPS
        let v = validate_one("ebsIops", json!(3000)).unwrap();
        assert_eq!(v.ebs_iops, Some(3000));
        let v = validate(&RawConfig::new().with("ebsVolumeType", "IO1").with("ebsIops", "4000"))
            .unwrap();
        assert_eq!(v.ebs_iops, Some(4000));
    }

    #[test]
    fn test_every_listed_option_is_recognized() {
        for name in OPTION_NAMES {
            let result = validate_one(name, json!(""));
            assert!(result.is_ok(), "{name} should accept an empty value");
        }
    }
}
