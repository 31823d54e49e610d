//! Provisioning collaborator contract.
//!
//! The composer decides *what* to build; a [`Provisioner`] turns each
//! [`UnitRequest`] into real infrastructure and hands back the values the
//! unit promised to publish. [`DryRunProvisioner`] stands in for a real
//! engine when previewing a composition.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::error::Result;
use crate::packaging::SecretPayload;
use crate::units::UnitId;

/// Values returned by a provisioner, keyed by output name
pub type ProvisionedOutputs = BTreeMap<String, String>;

/// Everything one unit hands to the provisioner
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRequest {
    pub unit: UnitId,
    pub stack_name: String,
    pub parameters: BTreeMap<String, String>,
    pub secrets: Vec<SecretPayload>,
    /// Output keys the provisioner must return
    pub outputs: Vec<String>,
}

impl UnitRequest {
    pub fn new(unit: UnitId, stack_name: impl Into<String>) -> Self {
        Self {
            unit,
            stack_name: stack_name.into(),
            parameters: BTreeMap::new(),
            secrets: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add a string parameter
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }

    /// Add a parameter only when a value is present
    pub fn param_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    pub fn secret(mut self, secret: SecretPayload) -> Self {
        self.secrets.push(secret);
        self
    }

    /// Declare an output the provisioner must return
    pub fn output(mut self, key: impl Into<String>) -> Self {
        self.outputs.push(key.into());
        self
    }
}

/// Turns unit requests into infrastructure.
///
/// # Contract
///
/// - Called exactly once per enabled unit, in composition order.
/// - Must return a value for every key in `request.outputs`.
/// - Never retried by the composer; any error aborts the run.
pub trait Provisioner {
    fn provision(&mut self, request: &UnitRequest) -> Result<ProvisionedOutputs>;
}

/// Provisioner that creates nothing and answers with stable placeholder values.
///
/// An output whose name matches a request parameter echoes that parameter
/// (e.g. an imported `vpcId`); any other output becomes `${unit.key}`.
#[derive(Debug, Default)]
pub struct DryRunProvisioner {
    requests: Vec<UnitRequest>,
}

impl DryRunProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests seen so far, in order
    pub fn requests(&self) -> &[UnitRequest] {
        &self.requests
    }

    pub fn token(unit: UnitId, key: &str) -> String {
        format!("${{{unit}.{key}}}")
    }
}

impl Provisioner for DryRunProvisioner {
    fn provision(&mut self, request: &UnitRequest) -> Result<ProvisionedOutputs> {
        info!(
            unit = %request.unit,
            stack = %request.stack_name,
            parameters = request.parameters.len(),
            secrets = request.secrets.len(),
            "[DRY RUN] would provision unit"
        );

        let outputs = request
            .outputs
            .iter()
            .map(|key| {
                let value = request
                    .parameters
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Self::token(request.unit, key));
                (key.clone(), value)
            })
            .collect();

        self.requests.push(request.clone());
        Ok(outputs)
    }
}
