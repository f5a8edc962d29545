//! The four isolation ladders, expressed as deployment values.
//!
//! Each posture is one network with a fixed address block. Services all
//! listen on [`SERVICE_PORT`]; public edges route by host name under the
//! given DNS domain, the bridged posture routes by header.

use crate::bridge::entity::{BridgeSpec, DEFAULT_DISPATCHER_PORT};
use crate::common::entity::Ipv4Cidr;
use crate::dispatch::entity::{DEFAULT_LISTENER_PORT, EdgeSpec, MatchKind, ServiceEndpoint};
use crate::flow::entity::{FlowSpec, Peer};
use crate::zone::entity::{Topology, Zone, ZoneTier};

use super::entity::DeploymentSpec;

/// Port every backend service listens on.
pub const SERVICE_PORT: u16 = 3000;

fn block(addr: [u8; 4], prefix_len: u8) -> Ipv4Cidr {
    // Constant blocks below are all network-aligned.
    Ipv4Cidr::new(addr.into(), prefix_len).unwrap_or(Ipv4Cidr::ANY)
}

fn host_edge(
    name: &str,
    zone: &str,
    dispatcher: &str,
    domain: &str,
    services: &[&str],
) -> EdgeSpec {
    let mut edge = EdgeSpec::new(name, MatchKind::Host, dispatcher, DEFAULT_LISTENER_PORT);
    edge.dns_zone_ref = Some(domain.to_string());
    for svc in services {
        edge = edge.with_entry(
            format!("{svc}.{domain}"),
            ServiceEndpoint::new(*svc, zone, SERVICE_PORT),
        );
    }
    edge
}

/// Dispatcher in front of the services, with a single internet-facing
/// zone holding both.
pub fn public_only(domain: &str, services: &[&str]) -> DeploymentSpec {
    let topology = Topology::new(vec![Zone::new(
        "public",
        block([10, 0, 0, 0], 24),
        ZoneTier::Public,
    )])
    .with_network_cidr(block([10, 0, 0, 0], 20));

    DeploymentSpec {
        topology,
        flows: vec![
            FlowSpec::tcp(Peer::zone("public"), Peer::zone("public"), SERVICE_PORT)
                .with_label("dispatcher to services"),
        ],
        edges: vec![host_edge("public", "public", "10.0.0.10", domain, services)],
        bridges: Vec::new(),
    }
}

/// Internet-facing dispatcher forwarding into a private zone.
pub fn public_private(domain: &str, services: &[&str]) -> DeploymentSpec {
    tiered(
        [10, 255],
        "private",
        ZoneTier::Private,
        domain,
        services,
    )
}

/// Internet-facing dispatcher forwarding into an isolated zone with no
/// outbound route.
pub fn public_isolated(domain: &str, services: &[&str]) -> DeploymentSpec {
    tiered(
        [10, 128],
        "isolated",
        ZoneTier::Isolated,
        domain,
        services,
    )
}

fn tiered(
    prefix: [u8; 2],
    inner: &str,
    tier: ZoneTier,
    domain: &str,
    services: &[&str],
) -> DeploymentSpec {
    let [a, b] = prefix;
    let topology = Topology::new(vec![
        Zone::new("public", block([a, b, 0, 0], 28), ZoneTier::Public),
        Zone::new(inner, block([a, b, 1, 0], 24), tier),
    ])
    .with_network_cidr(block([a, b, 0, 0], 20));
    let dispatcher = format!("{a}.{b}.0.10");

    DeploymentSpec {
        topology,
        flows: vec![
            FlowSpec::tcp(Peer::zone("public"), Peer::zone(inner), SERVICE_PORT)
                .with_label("dispatcher to services"),
        ],
        edges: vec![host_edge("public", inner, &dispatcher, domain, services)],
        bridges: Vec::new(),
    }
}

/// No internet route anywhere: a public gateway reaches a header-routed
/// dispatcher over a private link that lives in the same zone as the
/// dispatcher and the services.
pub fn isolated_only(gateway_domain: &str, gateway_address: &str, services: &[&str]) -> DeploymentSpec {
    let zone = "isolated";
    let topology = Topology::new(vec![Zone::new(
        zone,
        block([10, 64, 0, 0], 20),
        ZoneTier::VeryIsolated,
    )]);

    let mut edge = EdgeSpec::new(
        "internal",
        MatchKind::routing_header(),
        "10.64.0.10",
        DEFAULT_DISPATCHER_PORT,
    );
    for svc in services {
        edge = edge.with_entry(*svc, ServiceEndpoint::new(*svc, zone, SERVICE_PORT));
    }

    DeploymentSpec {
        topology,
        flows: vec![
            FlowSpec::tcp(Peer::zone(zone), Peer::zone(zone), DEFAULT_DISPATCHER_PORT)
                .with_label("link to dispatcher"),
            FlowSpec::tcp(Peer::zone(zone), Peer::zone(zone), SERVICE_PORT)
                .with_label("dispatcher to services"),
        ],
        edges: vec![edge],
        bridges: vec![BridgeSpec::new(
            "gateway",
            gateway_domain,
            gateway_address,
            zone,
            "internal",
        )],
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::common::entity::Protocol;
    use crate::deployment::compiler::DeploymentCompiler;
    use crate::firewall::entity::{
        DENY_BAND_START, Direction, GENERIC_BAND_START, RuleAction, RuleClass,
    };

    #[test]
    fn every_posture_compiles() {
        let specs = [
            public_only("example.com", &["a", "b"]),
            public_private("example.com", &["c", "d"]),
            public_isolated("example.com", &["e", "f"]),
            isolated_only("gateway.example.com", "gw.example.net", &["g", "h"]),
        ];
        for spec in &specs {
            assert!(spec.topology.validate().is_ok());
            assert!(DeploymentCompiler::compile(spec).is_ok());
        }
    }

    #[test]
    fn public_isolated_matches_ladder_layout() {
        let out = DeploymentCompiler::compile(&public_isolated("example.com", &["e", "f"])).unwrap();
        let rules = &out.rules;

        let public_in: Vec<(u32, RuleClass)> = rules
            .rules_for("public", Direction::Ingress)
            .map(|r| (r.rule_number, r.class))
            .collect();
        assert_eq!(
            public_in,
            vec![
                (1, RuleClass::Specific),
                (DENY_BAND_START, RuleClass::DenyIntraNetwork),
                (GENERIC_BAND_START, RuleClass::GenericInternet),
            ]
        );

        let isolated_in: Vec<u32> = rules
            .rules_for("isolated", Direction::Ingress)
            .map(|r| r.rule_number)
            .collect();
        assert_eq!(isolated_in, vec![1, DENY_BAND_START]);

        let service_host = Ipv4Addr::new(10, 128, 1, 20);
        let dispatcher = Ipv4Addr::new(10, 128, 0, 10);
        assert_eq!(
            rules.evaluate("isolated", Direction::Ingress, dispatcher, Protocol::Tcp, SERVICE_PORT),
            RuleAction::Allow
        );
        assert_eq!(
            rules.evaluate("public", Direction::Ingress, service_host, Protocol::Tcp, 22),
            RuleAction::Deny
        );
        // Generic internet rules on the bridge do not reach the inner zone.
        assert_eq!(
            rules.evaluate("public", Direction::Egress, service_host, Protocol::Tcp, 5432),
            RuleAction::Deny
        );
        assert_eq!(
            rules.evaluate("public", Direction::Ingress, service_host, Protocol::Tcp, 443),
            RuleAction::Deny
        );
    }

    #[test]
    fn public_only_bridge_keeps_generic_band_only() {
        let out = DeploymentCompiler::compile(&public_only("example.com", &["a"])).unwrap();
        let classes: Vec<RuleClass> = out
            .rules
            .rules_for("public", Direction::Ingress)
            .map(|r| r.class)
            .collect();
        assert_eq!(
            classes,
            vec![RuleClass::Specific, RuleClass::Specific, RuleClass::GenericInternet]
        );
    }

    #[test]
    fn host_keys_use_domain() {
        let spec = public_only("example.com", &["a", "b"]);
        let keys: Vec<&str> = spec.edges[0].entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a.example.com", "b.example.com"]);
        assert_eq!(spec.edges[0].listener_port, 443);
    }

    #[test]
    fn isolated_only_routes_by_header_on_port_80() {
        let spec = isolated_only("gateway.example.com", "gw.example.net", &["g", "h"]);
        assert!(spec.edges[0].match_kind.is_header());
        assert_eq!(spec.edges[0].listener_port, 80);
        assert_eq!(spec.edges[0].entries[0].key, "g");
        assert!(spec.topology.bridge_zones().next().is_none());
    }
}
