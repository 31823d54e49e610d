//! Template substitution and secret packaging.
//!
//! The fetch-migration unit ships its pipeline definition as a secret: a
//! template file with two host placeholders is filled in, base64-encoded and
//! scoped to that single unit. This module also renders the `aws ecs run-task`
//! invocation operators use to start the task by hand.
//!
//! # Design
//!
//! - **Strict placeholders**: every known placeholder must resolve to a
//!   non-empty value, otherwise [`ComposerError::MissingPlaceholder`]
//! - **All occurrences**: a placeholder that appears several times is replaced
//!   everywhere
//! - **Opaque payload**: the encoded value never appears in serialized output

use base64::{Engine as _, engine::general_purpose};
use serde::{Serialize, Serializer};
use std::fs;
use std::path::Path;

use crate::config::EffectiveConfig;
use crate::error::{ComposerError, Result};
use crate::units::UnitId;

pub const SOURCE_CLUSTER_HOST: &str = "<SOURCE_CLUSTER_HOST>";
pub const TARGET_CLUSTER_HOST: &str = "<TARGET_CLUSTER_HOST>";

/// Environment variable the container reads the pipeline from
pub const PIPELINE_ENV_VAR: &str = "INLINE_PIPELINE";

const REDACTED: &str = "<redacted>";

// ============================================================================
// Template
// ============================================================================

/// A pipeline template and the placeholders it must have filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateArtifact {
    name: String,
    text: String,
    placeholders: Vec<&'static str>,
}

impl TemplateArtifact {
    /// Read a template from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ComposerError::TemplateLoad {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_text(path.display().to_string(), text))
    }

    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            placeholders: vec![SOURCE_CLUSTER_HOST, TARGET_CLUSTER_HOST],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace every placeholder with its value.
    ///
    /// `values` pairs a placeholder token with the value resolved for it. A
    /// placeholder with no entry, a `None` entry or an empty value fails the
    /// whole substitution. Only the template text is scanned, so a value that
    /// itself contains a placeholder token is inserted verbatim.
    pub fn substitute(&self, values: &[(&str, Option<&str>)]) -> Result<String> {
        let resolved = self
            .placeholders
            .iter()
            .map(|placeholder| {
                values
                    .iter()
                    .find(|(token, _)| token == placeholder)
                    .and_then(|(_, value)| *value)
                    .filter(|value| !value.is_empty())
                    .map(|value| (*placeholder, value))
                    .ok_or_else(|| ComposerError::MissingPlaceholder {
                        template: self.name.clone(),
                        placeholder: placeholder.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rendered = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        // Earliest placeholder left in the remaining text
        while let Some((at, placeholder, value)) = resolved
            .iter()
            .filter_map(|(placeholder, value)| {
                rest.find(*placeholder).map(|at| (at, *placeholder, *value))
            })
            .min_by_key(|(at, _, _)| *at)
        {
            rendered.push_str(&rest[..at]);
            rendered.push_str(value);
            rest = &rest[at + placeholder.len()..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }
}

// ============================================================================
// Secret payload
// ============================================================================

/// An encoded artifact handed to exactly one unit as a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    pub name: String,
    pub unit: UnitId,
    pub env_var: String,
    #[serde(serialize_with = "redact")]
    pub value: String,
}

impl SecretPayload {
    /// Base64-encode `contents` as the pipeline secret of `container`
    pub fn pipeline_config(
        config: &EffectiveConfig,
        unit: UnitId,
        container: &str,
        contents: &str,
    ) -> Self {
        Self {
            name: format!(
                "{}-{}-{}-pipelineConfig",
                config.stage, config.default_deploy_id, container
            ),
            unit,
            env_var: PIPELINE_ENV_VAR.to_string(),
            value: general_purpose::STANDARD.encode(contents),
        }
    }

    /// Decode the payload back to text
    pub fn decode(&self) -> Result<String> {
        let bytes = general_purpose::STANDARD
            .decode(&self.value)
            .map_err(|e| ComposerError::config(format!("secret '{}' is not base64: {e}", self.name)))?;
        String::from_utf8(bytes)
            .map_err(|e| ComposerError::config(format!("secret '{}' is not UTF-8: {e}", self.name)))
    }
}

fn redact<S: Serializer>(_: &str, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(REDACTED)
}

// ============================================================================
// Invocation command
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkConfiguration<'a> {
    awsvpc_configuration: AwsVpcConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AwsVpcConfiguration<'a> {
    subnets: &'a [String],
    security_groups: [&'a str; 2],
}

/// Render the command that starts a Fargate task in the migration network.
///
/// Security groups are ordered (domain access group, service-connect group).
pub fn run_task_command(
    task_definition_arn: &str,
    cluster_name: &str,
    subnets: &[String],
    access_security_group: &str,
    connect_security_group: &str,
) -> Result<String> {
    let network = serde_json::to_string(&NetworkConfiguration {
        awsvpc_configuration: AwsVpcConfiguration {
            subnets,
            security_groups: [access_security_group, connect_security_group],
        },
    })?;
    Ok(format!(
        "aws ecs run-task --task-definition {task_definition_arn} --cluster {cluster_name} \
         --launch-type FARGATE --network-configuration '{network}'"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "source:\n  host: <SOURCE_CLUSTER_HOST>\nsink:\n  host: <TARGET_CLUSTER_HOST>\n";

    fn template() -> TemplateArtifact {
        TemplateArtifact::from_text("pipeline.yaml", TEMPLATE)
    }

    #[test]
    fn test_substitutes_both_hosts() {
        let rendered = template()
            .substitute(&[
                (SOURCE_CLUSTER_HOST, Some("https://source:9200")),
                (TARGET_CLUSTER_HOST, Some("https://target:443")),
            ])
            .unwrap();
        assert!(rendered.contains("host: https://source:9200"));
        assert!(rendered.contains("host: https://target:443"));
        assert!(!rendered.contains('<'));
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let artifact = TemplateArtifact::from_text(
            "t",
            "<SOURCE_CLUSTER_HOST> <SOURCE_CLUSTER_HOST> <TARGET_CLUSTER_HOST>",
        );
        let rendered = artifact
            .substitute(&[(SOURCE_CLUSTER_HOST, Some("a")), (TARGET_CLUSTER_HOST, Some("b"))])
            .unwrap();
        assert_eq!(rendered, "a a b");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let artifact = TemplateArtifact::from_text(
            "t",
            "src=<SOURCE_CLUSTER_HOST> dst=<TARGET_CLUSTER_HOST>",
        );
        let rendered = artifact
            .substitute(&[
                (SOURCE_CLUSTER_HOST, Some("http://a/<TARGET_CLUSTER_HOST>")),
                (TARGET_CLUSTER_HOST, Some("B")),
            ])
            .unwrap();
        assert_eq!(rendered, "src=http://a/<TARGET_CLUSTER_HOST> dst=B");

        let rendered = artifact
            .substitute(&[
                (SOURCE_CLUSTER_HOST, Some("S")),
                (TARGET_CLUSTER_HOST, Some("<SOURCE_CLUSTER_HOST>")),
            ])
            .unwrap();
        assert_eq!(rendered, "src=S dst=<SOURCE_CLUSTER_HOST>");
    }

    #[test]
    fn test_missing_or_empty_value_fails() {
        for source in [None, Some("")] {
            let err = template()
                .substitute(&[(SOURCE_CLUSTER_HOST, source), (TARGET_CLUSTER_HOST, Some("t"))])
                .unwrap_err();
            match err {
                ComposerError::MissingPlaceholder { template, placeholder } => {
                    assert_eq!(template, "pipeline.yaml");
                    assert_eq!(placeholder, SOURCE_CLUSTER_HOST);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        let err = template()
            .substitute(&[(SOURCE_CLUSTER_HOST, Some("s"))])
            .unwrap_err();
        assert!(err.to_string().contains(TARGET_CLUSTER_HOST));
    }

    #[test]
    fn test_load_missing_file() {
        let err = TemplateArtifact::load("/nonexistent/pipeline.yaml").unwrap_err();
        assert!(matches!(err, ComposerError::TemplateLoad { .. }));
    }

    #[test]
    fn test_secret_naming_and_encoding() {
        let config = EffectiveConfig::default();
        let secret =
            SecretPayload::pipeline_config(&config, UnitId::FetchMigration, "fetch-migration", "abc");
        assert_eq!(secret.name, "dev-default-fetch-migration-pipelineConfig");
        assert_eq!(secret.env_var, "INLINE_PIPELINE");
        assert_eq!(secret.value, "YWJj");
        assert_eq!(secret.decode().unwrap(), "abc");
    }

    #[test]
    fn test_secret_value_is_redacted_when_serialized() {
        let config = EffectiveConfig::default();
        let secret =
            SecretPayload::pipeline_config(&config, UnitId::FetchMigration, "fetch-migration", "abc");
        let json = serde_json::to_value(&secret).unwrap();
        assert_eq!(json["value"], REDACTED);
        assert_eq!(json["unit"], "fetch-migration");
    }

    #[test]
    fn test_run_task_command() {
        let command = run_task_command(
            "arn:task",
            "migration-dev-ecs-cluster",
            &["subnet-1".to_string(), "subnet-2".to_string()],
            "sg-access",
            "sg-connect",
        )
        .unwrap();
        assert_eq!(
            command,
            "aws ecs run-task --task-definition arn:task --cluster migration-dev-ecs-cluster \
             --launch-type FARGATE --network-configuration \
             '{\"awsvpcConfiguration\":{\"subnets\":[\"subnet-1\",\"subnet-2\"],\"securityGroups\":[\"sg-access\",\"sg-connect\"]}}'"
        );
    }
}
