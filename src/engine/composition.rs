//! Ordered Composition Engine
//!
//! Walks the enabled units in topological order and runs each unit's
//! materialization step exactly once. Every step gets a [`UnitContext`] that
//! bundles the effective configuration, read access to what earlier units
//! published, a publish handle scoped to the current unit, and the
//! provisioner.
//!
//! # Design
//!
//! - **One pass, no retries**: the first failing unit aborts the run
//! - **Scoped reads**: a unit may only read values from units it declares
//!   (hard dependencies, their hard dependencies, and soft dependencies that
//!   are enabled); anything else is [`ComposerError::CrossReferenceMissing`]
//! - **Scoped writes**: a unit only ever publishes under its own id
//! - **Checked outputs**: a provisioner answer missing a requested output is a
//!   [`ComposerError::Provisioning`] error

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::EffectiveConfig;
use crate::engine::cross_ref::CrossReferenceRegistry;
use crate::engine::provisioner::{ProvisionedOutputs, Provisioner, UnitRequest};
use crate::error::{ComposerError, Result};
use crate::logic::enablement::EnabledSet;
use crate::packaging::SecretPayload;
use crate::units::{UnitId, UnitRegistry};

// ============================================================================
// Results
// ============================================================================

/// What one unit handed to the provisioner and what it published
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedUnit {
    pub unit: UnitId,
    pub stack_name: String,
    pub parameters: BTreeMap<String, String>,
    pub secrets: Vec<SecretPayload>,
    pub exports: BTreeMap<String, String>,
}

impl MaterializedUnit {
    fn new(unit: UnitId, stack_name: String) -> Self {
        Self {
            unit,
            stack_name,
            parameters: BTreeMap::new(),
            secrets: Vec::new(),
            exports: BTreeMap::new(),
        }
    }
}

/// Outcome of a full composition run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub units: Vec<MaterializedUnit>,
    pub cross_references: CrossReferenceRegistry,
}

impl Composition {
    pub fn unit(&self, id: UnitId) -> Option<&MaterializedUnit> {
        self.units.iter().find(|u| u.unit == id)
    }

    /// Materialized unit ids in order
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.iter().map(|u| u.unit).collect()
    }

    /// Every published value keyed by its parameter-store path
    pub fn parameter_paths(&self, config: &EffectiveConfig) -> BTreeMap<String, String> {
        self.cross_references
            .iter()
            .map(|(_, key, value)| (config.parameter_path(key), value.to_string()))
            .collect()
    }
}

// ============================================================================
// Unit context
// ============================================================================

/// Everything a materialization step may touch
pub struct UnitContext<'a> {
    unit: UnitId,
    config: &'a EffectiveConfig,
    registry: &'a UnitRegistry,
    enabled: &'a EnabledSet,
    refs: &'a mut CrossReferenceRegistry,
    provisioner: &'a mut dyn Provisioner,
    record: MaterializedUnit,
}

impl<'a> UnitContext<'a> {
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn config(&self) -> &'a EffectiveConfig {
        self.config
    }

    pub fn is_enabled(&self, id: UnitId) -> bool {
        self.enabled.contains(id)
    }

    /// Start a provisioning request for the current unit
    pub fn request(&self) -> UnitRequest {
        UnitRequest::new(self.unit, self.record.stack_name.clone())
    }

    /// Read a value published by a declared dependency
    pub fn lookup(&self, producer: UnitId, key: &str) -> Result<String> {
        if !self.may_read(producer) {
            return Err(ComposerError::CrossReferenceMissing {
                consumer: self.unit,
                producer,
                key: key.to_string(),
            });
        }
        self.refs
            .get(self.unit, producer, key)
            .map(str::to_string)
    }

    /// Read from a soft dependency; `None` when that unit is not enabled
    pub fn lookup_if_enabled(&self, producer: UnitId, key: &str) -> Result<Option<String>> {
        if !self.is_enabled(producer) {
            return Ok(None);
        }
        self.lookup(producer, key).map(Some)
    }

    /// Hand a request to the provisioner and check it answered every output
    pub fn provision(&mut self, request: UnitRequest) -> Result<ProvisionedOutputs> {
        if request.unit != self.unit {
            return Err(ComposerError::provisioning(
                self.unit,
                format!("request was built for unit '{}'", request.unit),
            ));
        }

        let outputs = self.provisioner.provision(&request)?;
        if let Some(missing) = request.outputs.iter().find(|k| !outputs.contains_key(*k)) {
            return Err(ComposerError::provisioning(
                self.unit,
                format!("provisioner did not return output '{missing}'"),
            ));
        }

        self.record.parameters.extend(request.parameters);
        self.record.secrets.extend(request.secrets);
        Ok(outputs)
    }

    /// Publish a value under the current unit
    pub fn publish(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.refs.publish(self.unit, key, value.clone())?;
        debug!(unit = %self.unit, key, "published cross-reference");
        self.record.exports.insert(key.to_string(), value);
        Ok(())
    }

    /// Publish an output the provisioner returned
    pub fn publish_output(&mut self, outputs: &ProvisionedOutputs, key: &str) -> Result<()> {
        let value = outputs.get(key).cloned().ok_or_else(|| {
            ComposerError::provisioning(self.unit, format!("no output named '{key}'"))
        })?;
        self.publish(key, value)
    }

    fn may_read(&self, producer: UnitId) -> bool {
        if self.registry.hard_prerequisites(self.unit).contains(&producer) {
            return true;
        }
        self.registry
            .get(self.unit)
            .is_some_and(|d| d.optional_dependencies.contains(&producer))
            && self.enabled.contains(producer)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Materializes enabled units in dependency order
pub struct CompositionEngine<'a> {
    registry: &'a UnitRegistry,
    config: &'a EffectiveConfig,
}

impl<'a> CompositionEngine<'a> {
    pub fn new(registry: &'a UnitRegistry, config: &'a EffectiveConfig) -> Self {
        Self { registry, config }
    }

    /// Run every enabled unit's step once, in order.
    ///
    /// # What This Explicitly Refuses To Do
    ///
    /// - Retry a failed unit or skip past it
    /// - Roll back units already handed to the provisioner
    pub fn compose(
        &self,
        enabled: &EnabledSet,
        provisioner: &mut dyn Provisioner,
    ) -> Result<Composition> {
        let mut refs = CrossReferenceRegistry::new();
        let mut units = Vec::with_capacity(enabled.len());

        for id in enabled.iter() {
            let descriptor = self.registry.get(id).ok_or_else(|| {
                ComposerError::integrity(id, "enabled unit is not in the catalog")
            })?;

            let stack_name = format!(
                "{id}-{}-{}",
                self.config.stage, self.config.default_deploy_id
            );
            info!(unit = %id, stack = %stack_name, "materializing unit");

            let mut ctx = UnitContext {
                unit: id,
                config: self.config,
                registry: self.registry,
                enabled,
                refs: &mut refs,
                provisioner: &mut *provisioner,
                record: MaterializedUnit::new(id, stack_name),
            };
            (descriptor.materialize)(&mut ctx)?;
            units.push(ctx.record);
        }

        info!(units = units.len(), exports = refs.len(), "composition complete");
        Ok(Composition {
            units,
            cross_references: refs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::RawConfig;
    use crate::engine::provisioner::DryRunProvisioner;
    use crate::logic::enablement::resolve_enabled;
    use crate::units::UnitDescriptor;
    use crate::validator::validate;

    fn always(_: &EffectiveConfig) -> bool {
        true
    }

    fn publish_vpc(ctx: &mut UnitContext<'_>) -> Result<()> {
        ctx.publish("vpcId", "vpc-1")
    }

    fn read_vpc(ctx: &mut UnitContext<'_>) -> Result<()> {
        let vpc = ctx.lookup(UnitId::Network, "vpcId")?;
        ctx.publish("seen", vpc)
    }

    fn publish_twice(ctx: &mut UnitContext<'_>) -> Result<()> {
        ctx.publish("vpcId", "a")?;
        ctx.publish("vpcId", "b")
    }

    fn ask_for_output(ctx: &mut UnitContext<'_>) -> Result<()> {
        let request = ctx.request().output("endpoint");
        let outputs = ctx.provision(request)?;
        ctx.publish_output(&outputs, "endpoint")
    }

    fn descriptor(
        id: UnitId,
        deps: &'static [UnitId],
        optional: &'static [UnitId],
        step: crate::units::MaterializeFn,
    ) -> UnitDescriptor {
        UnitDescriptor {
            id,
            requested: always,
            dependencies: deps,
            optional_dependencies: optional,
            materialize: step,
        }
    }

    fn run(descriptors: Vec<UnitDescriptor>) -> Result<Composition> {
        let registry = UnitRegistry::new(descriptors)?;
        let config = EffectiveConfig::default();
        let enabled = resolve_enabled(&registry, &config);
        let mut provisioner = DryRunProvisioner::new();
        CompositionEngine::new(&registry, &config).compose(&enabled, &mut provisioner)
    }

    #[test]
    fn test_dependent_reads_published_value() {
        let composition = run(vec![
            descriptor(UnitId::Network, &[], &[], publish_vpc),
            descriptor(UnitId::OpenSearchDomain, &[UnitId::Network], &[], read_vpc),
        ])
        .unwrap();
        assert_eq!(
            composition.unit(UnitId::OpenSearchDomain).unwrap().exports["seen"],
            "vpc-1"
        );
        assert_eq!(composition.unit_ids(), vec![UnitId::Network, UnitId::OpenSearchDomain]);
    }

    #[test]
    fn test_undeclared_read_is_rejected() {
        let err = run(vec![
            descriptor(UnitId::Network, &[], &[], publish_vpc),
            descriptor(UnitId::Elasticsearch, &[], &[], read_vpc),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ComposerError::CrossReferenceMissing {
                consumer: UnitId::Elasticsearch,
                producer: UnitId::Network,
                ..
            }
        ));
    }

    #[test]
    fn test_soft_dependency_is_readable_when_enabled() {
        let composition = run(vec![
            descriptor(UnitId::Network, &[], &[], publish_vpc),
            descriptor(UnitId::OpenSearchDomain, &[], &[UnitId::Network], read_vpc),
        ])
        .unwrap();
        assert_eq!(composition.cross_references.len(), 2);
    }

    #[test]
    fn test_double_publish_aborts() {
        let err = run(vec![descriptor(UnitId::Network, &[], &[], publish_twice)]).unwrap_err();
        assert!(matches!(err, ComposerError::CrossReferenceConflict { .. }));
    }

    #[test]
    fn test_outputs_flow_into_exports() {
        let composition =
            run(vec![descriptor(UnitId::Elasticsearch, &[], &[], ask_for_output)]).unwrap();
        let unit = composition.unit(UnitId::Elasticsearch).unwrap();
        assert_eq!(unit.stack_name, "elasticsearch-dev-default");
        assert_eq!(unit.exports["endpoint"], "${elasticsearch.endpoint}");
    }

    struct ForgetfulProvisioner;

    impl Provisioner for ForgetfulProvisioner {
        fn provision(&mut self, _: &UnitRequest) -> Result<ProvisionedOutputs> {
            Ok(ProvisionedOutputs::new())
        }
    }

    #[test]
    fn test_missing_provisioner_output_is_an_error() {
        let registry =
            UnitRegistry::new(vec![descriptor(UnitId::Elasticsearch, &[], &[], ask_for_output)])
                .unwrap();
        let config = EffectiveConfig::default();
        let enabled = resolve_enabled(&registry, &config);
        let err = CompositionEngine::new(&registry, &config)
            .compose(&enabled, &mut ForgetfulProvisioner)
            .unwrap_err();
        assert!(matches!(err, ComposerError::Provisioning { .. }));
    }

    #[test]
    fn test_parameter_paths() {
        let config = EffectiveConfig::resolve(
            validate(&RawConfig::new().with("stage", "test")).unwrap(),
        );
        let registry = UnitRegistry::new(vec![descriptor(UnitId::Network, &[], &[], publish_vpc)])
            .unwrap();
        let enabled = resolve_enabled(&registry, &config);
        let composition = CompositionEngine::new(&registry, &config)
            .compose(&enabled, &mut DryRunProvisioner::new())
            .unwrap();
        assert_eq!(
            composition.parameter_paths(&config)["/migration/test/default/vpcId"],
            "vpc-1"
        );
    }
}
