//! Unit Enablement Resolver
//!
//! Decides which catalog units are built for a given configuration.
//!
//! # Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Flag false | Not enabled |
//! | Flag true, every hard dependency enabled | Enabled |
//! | Flag true, some hard dependency not enabled | Not enabled (cascaded) |
//! | Soft dependency not enabled | No effect |
//!
//! # Design
//!
//! - **Pure logic**: reads the registry and configuration, nothing else
//! - **Topological walk**: a unit is judged only after all its prerequisites,
//!   so one pass settles the whole catalog
//! - **Quiet cascade**: a requested unit that loses a prerequisite is dropped
//!   with a debug event and recorded in [`EnabledSet::cascaded`]

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::EffectiveConfig;
use crate::units::{UnitId, UnitRegistry};

/// Enabled units in composition order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledSet {
    order: Vec<UnitId>,
    #[serde(skip)]
    members: BTreeSet<UnitId>,
    /// Requested unit -> first prerequisite that was not enabled
    cascaded: BTreeMap<UnitId, UnitId>,
}

impl EnabledSet {
    pub fn order(&self) -> &[UnitId] {
        &self.order
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.members.contains(&id)
    }

    /// Units that were requested but dropped because a prerequisite was off
    pub fn cascaded(&self) -> &BTreeMap<UnitId, UnitId> {
        &self.cascaded
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.order.iter().copied()
    }
}

/// Compute the enabled set for `config`.
///
/// # What This Explicitly Refuses To Do
///
/// - Enable a prerequisite on behalf of a dependent: flags are never implied
/// - Fail on an unsatisfiable request: the unit is simply left out
pub fn resolve_enabled(registry: &UnitRegistry, config: &EffectiveConfig) -> EnabledSet {
    let mut set = EnabledSet::default();

    for descriptor in registry.iter() {
        if !descriptor.is_requested(config) {
            continue;
        }

        let missing = descriptor
            .dependencies
            .iter()
            .copied()
            .find(|dep| !set.members.contains(dep));

        match missing {
            Some(prerequisite) => {
                debug!(
                    unit = %descriptor.id,
                    prerequisite = %prerequisite,
                    "requested unit disabled by prerequisite"
                );
                set.cascaded.insert(descriptor.id, prerequisite);
            }
            None => {
                set.order.push(descriptor.id);
                set.members.insert(descriptor.id);
            }
        }
    }

    set
}
