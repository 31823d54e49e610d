//! Engine modules: the part that turns an enabled unit set into a composition.
//!
//! The engine layer sits between enablement (what the user wants) and the
//! provisioner (what actually gets built). It threads published values between
//! units and hands each unit's request to the provisioner in dependency order.

pub mod composition;
pub mod cross_ref;
pub mod provisioner;

pub use composition::{Composition, CompositionEngine, MaterializedUnit, UnitContext};
pub use cross_ref::{CrossReferenceRegistry, keys};
pub use provisioner::{DryRunProvisioner, ProvisionedOutputs, Provisioner, UnitRequest};
