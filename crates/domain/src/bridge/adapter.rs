use crate::common::entity::Protocol;
use crate::dispatch::entity::{DNS_TTL_SECS, DispatchTable, DnsRecord};
use crate::firewall::entity::{CompiledRuleSet, Direction, RuleAction};
use crate::zone::entity::Topology;

use super::entity::{BridgeOutput, BridgeSpec, GatewayRoute, LinkFilterRule};
use super::error::BridgeError;

/// Stitches a public gateway to an internal dispatcher over a private
/// link.
///
/// Takes the packet-filter and dispatch outputs as finished values and
/// adds one narrow link rule; it never rebuilds either.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeAdapter;

impl BridgeAdapter {
    pub fn compose(
        spec: &BridgeSpec,
        topology: &Topology,
        rules: &CompiledRuleSet,
        table: &DispatchTable,
    ) -> Result<BridgeOutput, BridgeError> {
        spec.validate()?;

        let inner = topology
            .zone(&spec.inner_zone)
            .ok_or_else(|| BridgeError::UnknownZone {
                bridge: spec.name.clone(),
                zone: spec.inner_zone.clone(),
            })?;
        if inner.has_direct_internet_route {
            return Err(BridgeError::DirectRouteExists {
                bridge: spec.name.clone(),
                zone: inner.name.clone(),
            });
        }

        if table.edge != spec.edge {
            return Err(BridgeError::EdgeMismatch {
                bridge: spec.name.clone(),
                expected: spec.edge.clone(),
                found: table.edge.clone(),
            });
        }
        if !table.match_kind.is_header() {
            return Err(BridgeError::NotHeaderMatched {
                bridge: spec.name.clone(),
                edge: table.edge.clone(),
            });
        }
        if table.listener_port != spec.dispatcher_port {
            return Err(BridgeError::PortMismatch {
                bridge: spec.name.clone(),
                dispatcher_port: spec.dispatcher_port,
                listener_port: table.listener_port,
            });
        }

        let link = spec.link_cidr.unwrap_or(inner.address_block);
        if !inner.address_block.covers(&link) {
            return Err(BridgeError::LinkOutsideZone {
                bridge: spec.name.clone(),
                link: link.to_string(),
                zone: inner.name.clone(),
            });
        }

        // The inner zone's own rules must already let the link reach the
        // dispatcher; the adapter does not add zone rules of its own.
        let admitted = rules.evaluate(
            &inner.name,
            Direction::Ingress,
            link.addr(),
            Protocol::Tcp,
            spec.dispatcher_port,
        );
        if admitted != RuleAction::Allow {
            return Err(BridgeError::DispatcherNotAdmitted {
                bridge: spec.name.clone(),
                zone: inner.name.clone(),
                port: spec.dispatcher_port,
            });
        }

        let integration = format!("{}:{}", table.dispatcher_address, spec.dispatcher_port);
        let routes = spec
            .paths
            .iter()
            .map(|path| GatewayRoute {
                path: path.clone(),
                integration: integration.clone(),
            })
            .collect();

        Ok(BridgeOutput {
            name: spec.name.clone(),
            inner_zone: inner.name.clone(),
            inner_rules: rules.rules(&inner.name).to_vec(),
            dispatch: table.clone(),
            routes,
            link_rule: LinkFilterRule {
                source: link,
                destination: table.dispatcher_address.clone(),
                protocol: Protocol::Tcp,
                port: spec.dispatcher_port,
            },
            dns_record: DnsRecord {
                name: spec.gateway_domain.clone(),
                target: spec.gateway_address.clone(),
                ttl_secs: DNS_TTL_SECS,
                zone_ref: spec.dns_zone_ref.clone(),
            },
            certificate_ref: spec.certificate_ref.clone(),
        })
    }
}
