//! End-to-end composition flow.
//!
//! `RawConfig -> validate -> resolve defaults -> enablement -> composition`,
//! exposed as two blocking calls: [`plan`] stops after enablement, [`compose`]
//! runs every enabled unit through a provisioner.

use serde::Serialize;
use tracing::info;

use crate::config::EffectiveConfig;
use crate::config_file::RawConfig;
use crate::engine::{Composition, CompositionEngine, Provisioner};
use crate::error::Result;
use crate::logic::enablement::{EnabledSet, resolve_enabled};
use crate::units::UnitRegistry;
use crate::validator::validate;

/// A validated configuration and the units it enables
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub config: EffectiveConfig,
    pub enabled: EnabledSet,
    #[serde(skip)]
    registry: UnitRegistry,
}

impl Plan {
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Materialize every enabled unit through `provisioner`
    pub fn compose(&self, provisioner: &mut dyn Provisioner) -> Result<Composition> {
        CompositionEngine::new(&self.registry, &self.config).compose(&self.enabled, provisioner)
    }
}

/// Validate and default a raw configuration
pub fn effective_config(raw: &RawConfig) -> Result<EffectiveConfig> {
    let validated = validate(raw)?;
    Ok(EffectiveConfig::resolve(validated))
}

/// Validate, default and decide which units to build
pub fn plan(raw: &RawConfig) -> Result<Plan> {
    let config = effective_config(raw)?;
    let registry = UnitRegistry::catalog()?;
    let enabled = resolve_enabled(&registry, &config);
    info!(
        stage = %config.stage,
        deploy_id = %config.default_deploy_id,
        enabled = enabled.len(),
        cascaded = enabled.cascaded().len(),
        "planned composition"
    );
    Ok(Plan {
        config,
        enabled,
        registry,
    })
}

/// Run the whole flow; nothing reaches the provisioner if validation fails
pub fn compose(raw: &RawConfig, provisioner: &mut dyn Provisioner) -> Result<Composition> {
    plan(raw)?.compose(provisioner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DryRunProvisioner;
    use crate::error::ComposerError;
    use crate::units::UnitId;

    #[test]
    fn test_plan_defaults() {
        let plan = plan(&RawConfig::new()).unwrap();
        assert_eq!(plan.enabled.order(), &[UnitId::OpenSearchDomain]);
        assert_eq!(plan.registry().len(), 13);
    }

    #[test]
    fn test_compose_defaults_builds_only_the_domain() {
        let mut provisioner = DryRunProvisioner::new();
        let composition = compose(&RawConfig::new(), &mut provisioner).unwrap();
        assert_eq!(composition.unit_ids(), vec![UnitId::OpenSearchDomain]);
        assert_eq!(provisioner.requests().len(), 1);
    }

    #[test]
    fn test_invalid_option_stops_before_provisioning() {
        let mut provisioner = DryRunProvisioner::new();
        let err = compose(
            &RawConfig::new().with("engineVersion", "OS-1.3"),
            &mut provisioner,
        )
        .unwrap_err();
        assert!(matches!(err, ComposerError::Validation { .. }));
        assert!(provisioner.requests().is_empty());
    }
}
