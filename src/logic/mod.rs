//! Logic modules: translates feature flags into the set of units to build.
//!
//! # Modules
//!
//! - `enablement`: cascading enablement over the unit catalog

pub mod enablement;
