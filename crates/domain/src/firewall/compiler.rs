use std::collections::BTreeMap;

use crate::common::entity::{Ipv4Cidr, PortRange, Protocol};
use crate::flow::entity::{FlowSpec, Peer};
use crate::flow::registry::FlowRegistry;
use crate::zone::entity::{Topology, Zone};

use super::entity::{
    CompiledRule, CompiledRuleSet, Direction, RuleAction, RuleClass, SPECIFIC_BAND_CAPACITY,
};
use super::error::FirewallError;

/// Expands declared flows into numbered, stateless per-zone filter rules.
///
/// Each zone's list is a pure function of the topology and the sorted flow
/// set, so zones can be compiled independently and any input ordering
/// yields the same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketFilterCompiler;

/// A specific rule before its number is assigned.
struct Draft<'a> {
    zone: &'a str,
    direction: Direction,
    peer: Ipv4Cidr,
    protocol: Protocol,
    ports: PortRange,
    label: String,
}

impl PacketFilterCompiler {
    /// Compile every zone of the topology. Returns the complete rule set
    /// or the first error; nothing partial is ever returned.
    pub fn compile(
        topology: &Topology,
        flows: &FlowRegistry,
    ) -> Result<CompiledRuleSet, FirewallError> {
        Self::check_inputs(topology, flows)?;
        let sorted = flows.sorted();

        let mut zones = BTreeMap::new();
        for zone in &topology.zones {
            let rules = Self::zone_rules(topology, &sorted, zone)?;
            zones.insert(zone.name.clone(), rules);
        }
        Ok(CompiledRuleSet::from_zones(zones))
    }

    /// Compile the full rule list of a single zone. The result equals that
    /// zone's slice of [`PacketFilterCompiler::compile`].
    pub fn compile_zone(
        topology: &Topology,
        flows: &FlowRegistry,
        zone: &str,
    ) -> Result<Vec<CompiledRule>, FirewallError> {
        Self::check_inputs(topology, flows)?;
        let zone = topology.require(zone)?;
        let mut rules = Self::zone_rules(topology, &flows.sorted(), zone)?;
        rules.sort_by_key(|r| (r.direction, r.rule_number));
        Ok(rules)
    }

    fn check_inputs(topology: &Topology, flows: &FlowRegistry) -> Result<(), FirewallError> {
        topology.validate()?;
        flows.validate_against(topology)?;
        Ok(())
    }

    fn zone_rules(
        topology: &Topology,
        sorted: &[&FlowSpec],
        zone: &Zone,
    ) -> Result<Vec<CompiledRule>, FirewallError> {
        let mut ingress = Vec::new();
        let mut egress = Vec::new();
        for flow in sorted {
            for draft in expand(topology, flow)? {
                if draft.zone != zone.name {
                    continue;
                }
                match draft.direction {
                    Direction::Ingress => ingress.push(draft),
                    Direction::Egress => egress.push(draft),
                }
            }
        }

        let mut rules = Vec::new();
        for (direction, drafts) in [(Direction::Ingress, ingress), (Direction::Egress, egress)] {
            if drafts.len() > SPECIFIC_BAND_CAPACITY as usize {
                return Err(FirewallError::BandOverflow {
                    zone: zone.name.clone(),
                    direction,
                    count: drafts.len(),
                    capacity: SPECIFIC_BAND_CAPACITY,
                });
            }
            rules.extend(number_specific(drafts));
        }

        // A lone bridge zone has no intra-network peer to shut out.
        let needs_deny = !zone.is_bridge() || topology.zones.len() > 1;
        if needs_deny {
            let network = topology
                .intra_network()
                .ok_or_else(|| FirewallError::NoIntraNetwork {
                    zone: zone.name.clone(),
                })?;
            rules.extend(deny_rules(zone, network));
        }
        if zone.is_bridge() {
            rules.extend(generic_rules(zone, topology.ingress_port));
        }
        Ok(rules)
    }
}

fn peer_cidr(topology: &Topology, peer: &Peer) -> Result<Ipv4Cidr, FirewallError> {
    match peer {
        Peer::Internet => Ok(Ipv4Cidr::ANY),
        Peer::Zone(name) => Ok(topology.require(name)?.address_block),
    }
}

/// The four rules a flow `S -> D` produces, in emission order: forward
/// egress on S, forward ingress on D, reply ingress on S, reply egress on
/// D. Ends that are INTERNET produce no rules of their own.
fn expand<'a>(topology: &Topology, flow: &'a FlowSpec) -> Result<Vec<Draft<'a>>, FirewallError> {
    let src_cidr = peer_cidr(topology, &flow.source)?;
    let dst_cidr = peer_cidr(topology, &flow.dest)?;
    let label = if flow.label.is_empty() {
        flow.to_string()
    } else {
        flow.label.clone()
    };
    let reply = format!("{label} (reply)");

    let mut drafts = Vec::with_capacity(4);
    let candidates = [
        (&flow.source, Direction::Egress, dst_cidr, flow.ports, &label),
        (&flow.dest, Direction::Ingress, src_cidr, flow.ports, &label),
        (&flow.source, Direction::Ingress, dst_cidr, PortRange::EPHEMERAL, &reply),
        (&flow.dest, Direction::Egress, src_cidr, PortRange::EPHEMERAL, &reply),
    ];
    for (owner, direction, peer, ports, label) in candidates {
        if let Some(zone) = owner.as_zone() {
            drafts.push(Draft {
                zone,
                direction,
                peer,
                protocol: flow.protocol,
                ports,
                label: label.clone(),
            });
        }
    }
    Ok(drafts)
}

fn number_specific(drafts: Vec<Draft<'_>>) -> impl Iterator<Item = CompiledRule> + '_ {
    drafts.into_iter().zip(0u32..).map(|(d, i)| CompiledRule {
        zone: d.zone.to_string(),
        direction: d.direction,
        rule_number: RuleClass::Specific.band_start() + i,
        peer_cidr: d.peer,
        protocol: d.protocol,
        port_range: Some(d.ports),
        action: RuleAction::Allow,
        class: RuleClass::Specific,
        label: d.label,
    })
}

fn deny_rules(zone: &Zone, network: Ipv4Cidr) -> [CompiledRule; 2] {
    [Direction::Ingress, Direction::Egress].map(|direction| CompiledRule {
        zone: zone.name.clone(),
        direction,
        rule_number: RuleClass::DenyIntraNetwork.band_start(),
        peer_cidr: network,
        protocol: Protocol::Any,
        port_range: None,
        action: RuleAction::Deny,
        class: RuleClass::DenyIntraNetwork,
        label: "deny intra-network".to_string(),
    })
}

fn generic_rules(zone: &Zone, ingress_port: u16) -> [CompiledRule; 2] {
    let rule = |direction, ports, label: &str| CompiledRule {
        zone: zone.name.clone(),
        direction,
        rule_number: RuleClass::GenericInternet.band_start(),
        peer_cidr: Ipv4Cidr::ANY,
        protocol: Protocol::Tcp,
        port_range: Some(ports),
        action: RuleAction::Allow,
        class: RuleClass::GenericInternet,
        label: label.to_string(),
    };
    [
        rule(
            Direction::Ingress,
            PortRange::single(ingress_port),
            "internet ingress",
        ),
        rule(Direction::Egress, PortRange::EPHEMERAL, "internet reply"),
    ]
}
