//! The built-in migration unit catalog.
//!
//! | Unit | Requested by | Hard deps | Soft deps |
//! |------|--------------|-----------|-----------|
//! | network | `vpcEnabled` | - | - |
//! | opensearch-domain | always | - | network |
//! | migration-assistance | `migrationAssistanceEnabled` | network, opensearch-domain | - |
//! | kafka-zookeeper | `kafkaZookeeperServiceEnabled` | migration-assistance | - |
//! | kafka-broker | `kafkaBrokerServiceEnabled` | migration-assistance, kafka-zookeeper | - |
//! | elasticsearch | `elasticsearchServiceEnabled` | migration-assistance | - |
//! | capture-proxy-es | `captureProxyESServiceEnabled` | migration-assistance | - |
//! | capture-proxy | `captureProxyServiceEnabled` | migration-assistance | - |
//! | traffic-comparator | `trafficComparatorServiceEnabled` | migration-assistance | - |
//! | traffic-comparator-jupyter | `trafficComparatorJupyterServiceEnabled` | traffic-comparator | - |
//! | traffic-replayer | `trafficReplayerServiceEnabled` | migration-assistance, opensearch-domain | traffic-comparator |
//! | migration-console | `migrationConsoleServiceEnabled` | migration-assistance, opensearch-domain | - |
//! | fetch-migration | `fetchMigrationEnabled` | network, opensearch-domain, migration-assistance | - |

use super::steps;
use super::{UnitDescriptor, UnitId};
use crate::config::EffectiveConfig;

use UnitId::*;

/// Catalog entries in declaration order
pub fn descriptors() -> Vec<UnitDescriptor> {
    vec![
        UnitDescriptor {
            id: Network,
            requested: |c: &EffectiveConfig| c.vpc_enabled,
            dependencies: &[],
            optional_dependencies: &[],
            materialize: steps::network,
        },
        UnitDescriptor {
            id: OpenSearchDomain,
            requested: |_: &EffectiveConfig| true,
            dependencies: &[],
            optional_dependencies: &[Network],
            materialize: steps::opensearch_domain,
        },
        UnitDescriptor {
            id: MigrationAssistance,
            requested: |c: &EffectiveConfig| c.migration_assistance_enabled,
            dependencies: &[Network, OpenSearchDomain],
            optional_dependencies: &[],
            materialize: steps::migration_assistance,
        },
        UnitDescriptor {
            id: KafkaZookeeper,
            requested: |c: &EffectiveConfig| c.kafka_zookeeper_service_enabled,
            dependencies: &[MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::kafka_zookeeper,
        },
        UnitDescriptor {
            id: KafkaBroker,
            requested: |c: &EffectiveConfig| c.kafka_broker_service_enabled,
            dependencies: &[MigrationAssistance, KafkaZookeeper],
            optional_dependencies: &[],
            materialize: steps::kafka_broker,
        },
        UnitDescriptor {
            id: Elasticsearch,
            requested: |c: &EffectiveConfig| c.elasticsearch_service_enabled,
            dependencies: &[MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::elasticsearch,
        },
        UnitDescriptor {
            id: CaptureProxyEs,
            requested: |c: &EffectiveConfig| c.capture_proxy_es_service_enabled,
            dependencies: &[MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::capture_proxy_es,
        },
        UnitDescriptor {
            id: CaptureProxy,
            requested: |c: &EffectiveConfig| c.capture_proxy_service_enabled,
            dependencies: &[MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::capture_proxy,
        },
        UnitDescriptor {
            id: TrafficComparator,
            requested: |c: &EffectiveConfig| c.traffic_comparator_service_enabled,
            dependencies: &[MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::traffic_comparator,
        },
        UnitDescriptor {
            id: TrafficComparatorJupyter,
            requested: |c: &EffectiveConfig| c.traffic_comparator_jupyter_service_enabled,
            dependencies: &[TrafficComparator],
            optional_dependencies: &[],
            materialize: steps::traffic_comparator_jupyter,
        },
        UnitDescriptor {
            id: TrafficReplayer,
            requested: |c: &EffectiveConfig| c.traffic_replayer_service_enabled,
            dependencies: &[MigrationAssistance, OpenSearchDomain],
            optional_dependencies: &[TrafficComparator],
            materialize: steps::traffic_replayer,
        },
        UnitDescriptor {
            id: MigrationConsole,
            requested: |c: &EffectiveConfig| c.migration_console_service_enabled,
            dependencies: &[MigrationAssistance, OpenSearchDomain],
            optional_dependencies: &[],
            materialize: steps::migration_console,
        },
        UnitDescriptor {
            id: FetchMigration,
            requested: |c: &EffectiveConfig| c.fetch_migration_enabled,
            dependencies: &[Network, OpenSearchDomain, MigrationAssistance],
            optional_dependencies: &[],
            materialize: steps::fetch_migration,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_unit_id_is_declared_once() {
        let declared: Vec<UnitId> = descriptors().iter().map(|d| d.id).collect();
        let all: Vec<UnitId> = UnitId::iter().collect();
        assert_eq!(declared, all);
    }

    #[test]
    fn test_domain_is_always_requested() {
        let config = EffectiveConfig::default();
        let requested: Vec<UnitId> = descriptors()
            .iter()
            .filter(|d| d.is_requested(&config))
            .map(|d| d.id)
            .collect();
        assert_eq!(requested, vec![OpenSearchDomain]);
    }
}
