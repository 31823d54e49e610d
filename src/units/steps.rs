//! Materialization steps, one per catalog unit.
//!
//! Each step reads what it needs from the configuration and from its
//! dependencies, asks the provisioner for the unit, and publishes the outputs
//! later units consume. Keys are the ones listed in [`keys`].

use tracing::info;

use super::UnitId;
use crate::engine::{UnitContext, UnitRequest, keys};
use crate::error::{ComposerError, Result};
use crate::packaging::{
    SOURCE_CLUSTER_HOST, SecretPayload, TARGET_CLUSTER_HOST, TemplateArtifact, run_task_command,
};

pub const FETCH_MIGRATION_CONTAINER: &str = "fetch-migration";
pub const FETCH_MIGRATION_MEMORY_MIB: u32 = 2048;
pub const FETCH_MIGRATION_CPU: u32 = 512;

fn csv(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(","))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Foundation units
// ============================================================================

pub fn network(ctx: &mut UnitContext<'_>) -> Result<()> {
    let config = ctx.config();
    let request = ctx
        .request()
        .param_opt(keys::VPC_ID, config.vpc_id.as_deref())
        .param_opt(keys::PRIVATE_SUBNET_IDS, csv(&config.vpc_subnet_ids))
        .param_opt("securityGroupIds", csv(&config.vpc_security_group_ids))
        .param("availabilityZoneCount", config.availability_zone_count)
        .output(keys::VPC_ID)
        .output(keys::PRIVATE_SUBNET_IDS)
        .output(keys::OS_ACCESS_SECURITY_GROUP_ID);

    let outputs = ctx.provision(request)?;
    ctx.publish_output(&outputs, keys::VPC_ID)?;
    ctx.publish_output(&outputs, keys::PRIVATE_SUBNET_IDS)?;
    ctx.publish_output(&outputs, keys::OS_ACCESS_SECURITY_GROUP_ID)
}

pub fn opensearch_domain(ctx: &mut UnitContext<'_>) -> Result<()> {
    let config = ctx.config();
    let access_policy = config.domain_access_policy().map(|policy| policy.to_json());

    let mut request = ctx
        .request()
        .param("engineVersion", &config.engine_version)
        .param("domainName", &config.domain_name)
        .param("dataNodeType", &config.data_node_type)
        .param("dataNodeCount", config.data_node_count)
        .param_opt("dedicatedManagerNodeType", config.dedicated_manager_node_type.as_deref())
        .param("dedicatedManagerNodeCount", config.dedicated_manager_node_count)
        .param_opt("warmNodeType", config.warm_node_type.as_deref())
        .param("warmNodeCount", config.warm_node_count)
        .param_opt("accessPolicies", access_policy)
        .param("useUnsignedBasicAuth", config.use_unsigned_basic_auth)
        .param_opt("fineGrainedManagerUserARN", config.fine_grained_manager_user_arn.as_deref())
        .param_opt("fineGrainedManagerUserName", config.fine_grained_manager_user_name.as_deref())
        .param_opt(
            "fineGrainedManagerUserSecretManagerKeyARN",
            config.fine_grained_manager_user_secret_arn.as_deref(),
        )
        .param("enableDemoAdmin", config.enable_demo_admin)
        .param("enforceHTTPS", config.enforce_https)
        .param("tlsSecurityPolicy", config.tls_security_policy)
        .param("ebsEnabled", config.ebs_enabled)
        .param("ebsVolumeSize", config.ebs_volume_size)
        .param("ebsVolumeType", config.ebs_volume_type)
        .param_opt("ebsIops", config.ebs_iops)
        .param("encryptionAtRestEnabled", config.encryption_at_rest_enabled)
        .param_opt("encryptionAtRestKmsKeyARN", config.encryption_at_rest_kms_key_arn.as_deref())
        .param("appLogEnabled", config.app_log_enabled)
        .param_opt("appLogGroup", config.app_log_group.as_deref())
        .param("nodeToNodeEncryptionEnabled", config.node_to_node_encryption_enabled)
        .param("domainRemovalPolicy", config.domain_removal_policy);

    // Place the domain inside the network when one is being built
    for key in [
        keys::VPC_ID,
        keys::PRIVATE_SUBNET_IDS,
        keys::OS_ACCESS_SECURITY_GROUP_ID,
    ] {
        let value = ctx.lookup_if_enabled(UnitId::Network, key)?;
        request = request.param_opt(key, value);
    }

    let request = request
        .output(keys::OS_CLUSTER_ENDPOINT)
        .output(keys::DOMAIN_ARN);
    let outputs = ctx.provision(request)?;
    ctx.publish_output(&outputs, keys::OS_CLUSTER_ENDPOINT)?;
    ctx.publish_output(&outputs, keys::DOMAIN_ARN)
}

pub fn migration_assistance(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = ctx
        .request()
        .param(keys::VPC_ID, ctx.lookup(UnitId::Network, keys::VPC_ID)?)
        .param(
            keys::PRIVATE_SUBNET_IDS,
            ctx.lookup(UnitId::Network, keys::PRIVATE_SUBNET_IDS)?,
        )
        .param(
            keys::OS_CLUSTER_ENDPOINT,
            ctx.lookup(UnitId::OpenSearchDomain, keys::OS_CLUSTER_ENDPOINT)?,
        )
        .param(keys::ECS_CLUSTER_NAME, ctx.config().ecs_cluster_name())
        .output(keys::MSK_BROKERS)
        .output(keys::SERVICE_CONNECT_SECURITY_GROUP_ID)
        .output(keys::ECS_CLUSTER_NAME);

    let outputs = ctx.provision(request)?;
    ctx.publish_output(&outputs, keys::MSK_BROKERS)?;
    ctx.publish_output(&outputs, keys::SERVICE_CONNECT_SECURITY_GROUP_ID)?;
    ctx.publish_output(&outputs, keys::ECS_CLUSTER_NAME)
}

// ============================================================================
// Migration services
// ============================================================================

/// Parameters every container service on the shared cluster needs
fn service_request(ctx: &UnitContext<'_>) -> Result<UnitRequest> {
    Ok(ctx
        .request()
        .param(keys::VPC_ID, ctx.lookup(UnitId::Network, keys::VPC_ID)?)
        .param(
            keys::ECS_CLUSTER_NAME,
            ctx.lookup(UnitId::MigrationAssistance, keys::ECS_CLUSTER_NAME)?,
        )
        .param(
            keys::SERVICE_CONNECT_SECURITY_GROUP_ID,
            ctx.lookup(UnitId::MigrationAssistance, keys::SERVICE_CONNECT_SECURITY_GROUP_ID)?,
        ))
}

/// Provision a service and publish its endpoint, if it exposes one
fn provision_service(
    ctx: &mut UnitContext<'_>,
    request: UnitRequest,
    endpoint_key: Option<&str>,
) -> Result<()> {
    let request = match endpoint_key {
        Some(key) => request.output(key),
        None => request,
    };
    let outputs = ctx.provision(request)?;
    match endpoint_key {
        Some(key) => ctx.publish_output(&outputs, key),
        None => Ok(()),
    }
}

pub fn kafka_zookeeper(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = service_request(ctx)?;
    provision_service(ctx, request, Some(keys::KAFKA_ZOOKEEPER_ENDPOINT))
}

pub fn kafka_broker(ctx: &mut UnitContext<'_>) -> Result<()> {
    let zookeeper = ctx.lookup(UnitId::KafkaZookeeper, keys::KAFKA_ZOOKEEPER_ENDPOINT)?;
    let request = service_request(ctx)?.param(keys::KAFKA_ZOOKEEPER_ENDPOINT, zookeeper);
    provision_service(ctx, request, Some(keys::KAFKA_BROKER_ENDPOINT))
}

pub fn elasticsearch(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = service_request(ctx)?;
    provision_service(ctx, request, Some(keys::ELASTICSEARCH_ENDPOINT))
}

pub fn capture_proxy_es(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = service_request(ctx)?
        .param(keys::MSK_BROKERS, ctx.lookup(UnitId::MigrationAssistance, keys::MSK_BROKERS)?);
    provision_service(ctx, request, Some(keys::CAPTURE_PROXY_ES_ENDPOINT))
}

pub fn capture_proxy(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = service_request(ctx)?
        .param(keys::MSK_BROKERS, ctx.lookup(UnitId::MigrationAssistance, keys::MSK_BROKERS)?)
        .param_opt(
            "sourceClusterEndpoint",
            ctx.config().source_cluster_endpoint.as_deref(),
        );
    provision_service(ctx, request, Some(keys::CAPTURE_PROXY_ENDPOINT))
}

pub fn traffic_comparator(ctx: &mut UnitContext<'_>) -> Result<()> {
    let request = service_request(ctx)?;
    provision_service(ctx, request, Some(keys::COMPARATOR_ENDPOINT))
}

pub fn traffic_comparator_jupyter(ctx: &mut UnitContext<'_>) -> Result<()> {
    let comparator = ctx.lookup(UnitId::TrafficComparator, keys::COMPARATOR_ENDPOINT)?;
    let request = service_request(ctx)?.param(keys::COMPARATOR_ENDPOINT, comparator);
    provision_service(ctx, request, Some(keys::JUPYTER_ENDPOINT))
}

pub fn traffic_replayer(ctx: &mut UnitContext<'_>) -> Result<()> {
    let target = ctx.lookup(UnitId::OpenSearchDomain, keys::OS_CLUSTER_ENDPOINT)?;
    let comparator = ctx.lookup_if_enabled(UnitId::TrafficComparator, keys::COMPARATOR_ENDPOINT)?;
    let request = service_request(ctx)?
        .param(keys::MSK_BROKERS, ctx.lookup(UnitId::MigrationAssistance, keys::MSK_BROKERS)?)
        .param(keys::OS_CLUSTER_ENDPOINT, target)
        .param_opt(keys::COMPARATOR_ENDPOINT, comparator);
    provision_service(ctx, request, None)
}

pub fn migration_console(ctx: &mut UnitContext<'_>) -> Result<()> {
    let target = ctx.lookup(UnitId::OpenSearchDomain, keys::OS_CLUSTER_ENDPOINT)?;
    let request = service_request(ctx)?
        .param(keys::MSK_BROKERS, ctx.lookup(UnitId::MigrationAssistance, keys::MSK_BROKERS)?)
        .param(keys::OS_CLUSTER_ENDPOINT, target)
        .param_opt(
            "sourceClusterEndpoint",
            ctx.config().source_cluster_endpoint.as_deref(),
        );
    provision_service(ctx, request, None)
}

// ============================================================================
// Fetch migration
// ============================================================================

/// Package the pipeline secret, provision the task and publish the
/// operator command that starts it.
///
/// The template is loaded and filled before the provisioner is called, so an
/// unresolvable placeholder leaves nothing half-built for this unit.
pub fn fetch_migration(ctx: &mut UnitContext<'_>) -> Result<()> {
    let config = ctx.config();
    let target = ctx.lookup(UnitId::OpenSearchDomain, keys::OS_CLUSTER_ENDPOINT)?;
    let access_group = ctx.lookup(UnitId::Network, keys::OS_ACCESS_SECURITY_GROUP_ID)?;
    let subnets = split_csv(&ctx.lookup(UnitId::Network, keys::PRIVATE_SUBNET_IDS)?);
    let connect_group =
        ctx.lookup(UnitId::MigrationAssistance, keys::SERVICE_CONNECT_SECURITY_GROUP_ID)?;
    let cluster_name = ctx.lookup(UnitId::MigrationAssistance, keys::ECS_CLUSTER_NAME)?;

    let template = TemplateArtifact::load(&config.dp_pipeline_template_path)?;
    let pipeline = template.substitute(&[
        (SOURCE_CLUSTER_HOST, config.source_cluster_endpoint.as_deref()),
        (TARGET_CLUSTER_HOST, Some(target.as_str())),
    ])?;
    let secret =
        SecretPayload::pipeline_config(config, ctx.unit(), FETCH_MIGRATION_CONTAINER, &pipeline);
    info!(secret = %secret.name, template = %template.name(), "packaged pipeline configuration");

    let request = ctx
        .request()
        .param(keys::ECS_CLUSTER_NAME, &cluster_name)
        .param("containerName", FETCH_MIGRATION_CONTAINER)
        .param("memoryLimitMiB", FETCH_MIGRATION_MEMORY_MIB)
        .param("cpu", FETCH_MIGRATION_CPU)
        .secret(secret)
        .output(keys::FETCH_MIGRATION_TASK_DEF_ARN)
        .output(keys::FETCH_MIGRATION_TASK_ROLE_ARN)
        .output(keys::FETCH_MIGRATION_TASK_EXEC_ROLE_ARN);

    let outputs = ctx.provision(request)?;
    ctx.publish_output(&outputs, keys::FETCH_MIGRATION_TASK_DEF_ARN)?;
    ctx.publish_output(&outputs, keys::FETCH_MIGRATION_TASK_ROLE_ARN)?;
    ctx.publish_output(&outputs, keys::FETCH_MIGRATION_TASK_EXEC_ROLE_ARN)?;

    let task_definition = outputs
        .get(keys::FETCH_MIGRATION_TASK_DEF_ARN)
        .ok_or_else(|| ComposerError::provisioning(ctx.unit(), "task definition ARN missing"))?;
    let command = run_task_command(
        task_definition,
        &cluster_name,
        &subnets,
        &access_group,
        &connect_group,
    )?;
    ctx.publish(keys::FETCH_MIGRATION_COMMAND, command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_helpers() {
        assert_eq!(csv(&[]), None);
        assert_eq!(
            csv(&["a".to_string(), "b".to_string()]).as_deref(),
            Some("a,b")
        );
        assert_eq!(split_csv("a, b,,c"), vec!["a", "b", "c"]);
    }
}
