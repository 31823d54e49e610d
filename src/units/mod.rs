//! Deployable unit catalog.
//!
//! Every unit the composer knows about is described once by a
//! [`UnitDescriptor`]: its id, the predicate that decides whether the user
//! asked for it, the units it cannot exist without, the units it should
//! merely follow when they exist, and the step that materializes it.
//!
//! [`UnitRegistry::new`] turns a descriptor list into an immutable DAG and
//! fixes a topological order at construction time. Cycles and references to
//! unknown units are catalog bugs and fail construction with
//! [`ComposerError::DependencyIntegrity`].

pub mod catalog;
pub mod steps;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::config::EffectiveConfig;
use crate::engine::UnitContext;
use crate::error::{ComposerError, Result};

/// Stable unit names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum UnitId {
    Network,
    #[strum(serialize = "opensearch-domain")]
    #[serde(rename = "opensearch-domain")]
    OpenSearchDomain,
    MigrationAssistance,
    KafkaZookeeper,
    KafkaBroker,
    Elasticsearch,
    CaptureProxyEs,
    CaptureProxy,
    TrafficComparator,
    TrafficComparatorJupyter,
    TrafficReplayer,
    MigrationConsole,
    FetchMigration,
}

/// Decides from the effective configuration whether a unit was requested
pub type RequestedFn = fn(&EffectiveConfig) -> bool;

/// Materializes one unit through its [`UnitContext`]
pub type MaterializeFn = fn(&mut UnitContext<'_>) -> Result<()>;

/// Static description of one deployable unit
#[derive(Clone)]
pub struct UnitDescriptor {
    pub id: UnitId,
    pub requested: RequestedFn,
    /// Hard prerequisites: if any is disabled, this unit is disabled too
    pub dependencies: &'static [UnitId],
    /// Ordering-only edges: followed when enabled, never cascade a disable
    pub optional_dependencies: &'static [UnitId],
    pub materialize: MaterializeFn,
}

impl fmt::Debug for UnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("optional_dependencies", &self.optional_dependencies)
            .finish_non_exhaustive()
    }
}

impl UnitDescriptor {
    pub fn is_requested(&self, config: &EffectiveConfig) -> bool {
        (self.requested)(config)
    }

    fn edges(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.dependencies
            .iter()
            .chain(self.optional_dependencies.iter())
            .copied()
    }
}

/// Immutable, acyclic unit catalog with a fixed topological order
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    descriptors: BTreeMap<UnitId, UnitDescriptor>,
    order: Vec<UnitId>,
}

impl UnitRegistry {
    /// Build a registry, rejecting duplicates, unknown units and cycles.
    ///
    /// Ties in the topological order are broken by declaration order, so the
    /// same catalog always composes in the same sequence.
    pub fn new(descriptors: Vec<UnitDescriptor>) -> Result<Self> {
        let declared: Vec<UnitId> = descriptors.iter().map(|d| d.id).collect();
        let mut by_id = BTreeMap::new();

        for descriptor in descriptors {
            let id = descriptor.id;
            if by_id.insert(id, descriptor).is_some() {
                return Err(ComposerError::integrity(id, "unit declared twice"));
            }
        }

        for descriptor in by_id.values() {
            for dep in descriptor.edges() {
                if dep == descriptor.id {
                    return Err(ComposerError::integrity(dep, "unit depends on itself"));
                }
                if !by_id.contains_key(&dep) {
                    return Err(ComposerError::integrity(
                        descriptor.id,
                        format!("depends on unknown unit '{dep}'"),
                    ));
                }
            }
        }

        let order = topological_order(&declared, &by_id)?;
        Ok(Self {
            descriptors: by_id,
            order,
        })
    }

    /// The built-in migration catalog
    pub fn catalog() -> Result<Self> {
        Self::new(catalog::descriptors())
    }

    /// Units leaves-first; every unit appears after everything it depends on
    pub fn order(&self) -> &[UnitId] {
        &self.order
    }

    pub fn get(&self, id: UnitId) -> Option<&UnitDescriptor> {
        self.descriptors.get(&id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Descriptors in topological order
    pub fn iter(&self) -> impl Iterator<Item = &UnitDescriptor> {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }

    /// Every unit reachable from `id` through hard dependencies
    pub fn hard_prerequisites(&self, id: UnitId) -> BTreeSet<UnitId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<UnitId> = self
            .get(id)
            .map(|d| d.dependencies.to_vec())
            .unwrap_or_default();

        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                if let Some(d) = self.get(next) {
                    stack.extend_from_slice(d.dependencies);
                }
            }
        }
        seen
    }
}

/// Kahn's algorithm over hard and optional edges.
///
/// The ready set is keyed by declaration position, so among units whose
/// prerequisites are all placed the earliest-declared one goes next.
fn topological_order(
    declared: &[UnitId],
    by_id: &BTreeMap<UnitId, UnitDescriptor>,
) -> Result<Vec<UnitId>> {
    let position: BTreeMap<UnitId, usize> =
        declared.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut in_degree: BTreeMap<UnitId, usize> = by_id.keys().map(|id| (*id, 0)).collect();
    let mut dependents: BTreeMap<UnitId, Vec<UnitId>> = BTreeMap::new();
    for descriptor in by_id.values() {
        for dep in descriptor.edges() {
            *in_degree.entry(descriptor.id).or_default() += 1;
            dependents.entry(dep).or_default().push(descriptor.id);
        }
    }

    let mut ready: BTreeSet<(usize, UnitId)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| (position[id], *id))
        .collect();
    let mut order = Vec::with_capacity(by_id.len());

    while let Some((_, id)) = ready.pop_first() {
        order.push(id);
        for dependent in dependents.get(&id).into_iter().flatten() {
            let degree = in_degree.entry(*dependent).or_default();
            *degree -= 1;
            if *degree == 0 {
                ready.insert((position[dependent], *dependent));
            }
        }
    }

    if let Some(stuck) = declared.iter().copied().find(|id| !order.contains(id)) {
        return Err(ComposerError::integrity(stuck, "dependency cycle detected"));
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &EffectiveConfig) -> bool {
        false
    }

    fn noop(_: &mut UnitContext<'_>) -> Result<()> {
        Ok(())
    }

    fn unit(id: UnitId, deps: &'static [UnitId]) -> UnitDescriptor {
        UnitDescriptor {
            id,
            requested: never,
            dependencies: deps,
            optional_dependencies: &[],
            materialize: noop,
        }
    }

    #[test]
    fn test_catalog_is_valid() {
        let registry = UnitRegistry::catalog().expect("built-in catalog must be acyclic");
        assert_eq!(registry.len(), 13);
    }

    #[test]
    fn test_catalog_order_respects_all_edges() {
        let registry = UnitRegistry::catalog().unwrap();
        let pos = |id: UnitId| registry.order().iter().position(|u| *u == id).unwrap();
        for descriptor in registry.iter() {
            for dep in descriptor.edges() {
                assert!(
                    pos(dep) < pos(descriptor.id),
                    "{dep} must precede {}",
                    descriptor.id
                );
            }
        }
    }

    #[test]
    fn test_cycle_rejected() {
        let result = UnitRegistry::new(vec![
            unit(UnitId::Network, &[UnitId::FetchMigration]),
            unit(UnitId::OpenSearchDomain, &[UnitId::Network]),
            unit(UnitId::FetchMigration, &[UnitId::OpenSearchDomain]),
        ]);
        let err = result.unwrap_err();
        assert!(matches!(err, ComposerError::DependencyIntegrity { .. }));
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let result = UnitRegistry::new(vec![unit(UnitId::Network, &[UnitId::Network])]);
        assert!(matches!(result, Err(ComposerError::DependencyIntegrity { .. })));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let result = UnitRegistry::new(vec![unit(
            UnitId::TrafficComparatorJupyter,
            &[UnitId::TrafficComparator],
        )]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown unit 'traffic-comparator'"));
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let result = UnitRegistry::new(vec![
            unit(UnitId::Network, &[]),
            unit(UnitId::Network, &[]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let registry = UnitRegistry::new(vec![
            unit(UnitId::Elasticsearch, &[]),
            unit(UnitId::Network, &[]),
            unit(UnitId::CaptureProxy, &[UnitId::Network]),
        ])
        .unwrap();
        assert_eq!(
            registry.order(),
            &[UnitId::Elasticsearch, UnitId::Network, UnitId::CaptureProxy]
        );
    }

    #[test]
    fn test_hard_prerequisites_are_transitive() {
        let registry = UnitRegistry::catalog().unwrap();
        let prereqs = registry.hard_prerequisites(UnitId::TrafficComparatorJupyter);
        assert!(prereqs.contains(&UnitId::TrafficComparator));
        assert!(prereqs.contains(&UnitId::MigrationAssistance));
        assert!(prereqs.contains(&UnitId::Network));
        assert!(!prereqs.contains(&UnitId::FetchMigration));
    }

    #[test]
    fn test_unit_names_are_kebab_case() {
        assert_eq!(UnitId::CaptureProxyEs.to_string(), "capture-proxy-es");
        assert_eq!(UnitId::OpenSearchDomain.to_string(), "opensearch-domain");
    }
}
