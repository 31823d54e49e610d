//! Migration Composer Library
//!
//! Validates a flat deployment context, decides which migration units it
//! enables, and composes them in dependency order while threading published
//! values between units.

pub mod access_policy;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod engine;
pub mod engine_version;
pub mod error;
pub mod logic;
pub mod packaging;
pub mod pipeline;
pub mod types;
pub mod units;
pub mod validator;

// Re-export main types for convenience
pub use access_policy::{AccessPolicyDocument, Statement};
pub use config::EffectiveConfig;
pub use config_file::RawConfig;
pub use engine::{
    Composition, CompositionEngine, CrossReferenceRegistry, DryRunProvisioner, MaterializedUnit,
    Provisioner, UnitContext, UnitRequest,
};
pub use engine_version::{EngineFamily, EngineVersion};
pub use error::{ComposerError, Result};
pub use logic::enablement::{EnabledSet, resolve_enabled};
pub use packaging::{SecretPayload, TemplateArtifact};
pub use pipeline::{Plan, compose, plan};
pub use types::{EbsVolumeType, RemovalPolicy, TlsSecurityPolicy};
pub use units::{UnitDescriptor, UnitId, UnitRegistry};
pub use validator::{ValidatedConfig, validate};
