#![no_main]

use libfuzzer_sys::fuzz_target;

use std::net::Ipv4Addr;

use domain::common::entity::{Ipv4Cidr, PortRange, Protocol};
use domain::firewall::compiler::PacketFilterCompiler;
use domain::firewall::entity::{DENY_BAND_START, Direction, RuleClass};
use domain::flow::entity::{FlowSpec, Peer};
use domain::flow::registry::FlowRegistry;
use domain::zone::entity::{Topology, Zone, ZoneTier};

// Deserialize fuzz data into a topology and flow set, compile, and check
// the numbering and containment invariants on success.
//
// Layout (variable-length):
//   [0]    = number of zones (1–8)
//   [1..]  = one 2-byte chunk per zone (tier, prefix length)
//   rest   = 5-byte flow chunks (source, dest, protocol, port hi, port lo)
//            where zone index 8 means INTERNET
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let num_zones = ((data[0] as usize) % 8) + 1;
    let mut cursor = 1;

    let mut zones = Vec::new();
    for i in 0..num_zones {
        if cursor + 2 > data.len() {
            break;
        }
        let chunk = &data[cursor..cursor + 2];
        cursor += 2;

        let tier = match chunk[0] % 4 {
            0 => ZoneTier::Public,
            1 => ZoneTier::Private,
            2 => ZoneTier::Isolated,
            _ => ZoneTier::VeryIsolated,
        };
        let prefix_len = 16 + chunk[1] % 17;
        let Ok(block) = Ipv4Cidr::new(Ipv4Addr::new(10, i as u8, 0, 0), prefix_len) else {
            return;
        };
        zones.push(Zone::new(format!("z{i}"), block, tier));
    }
    if zones.is_empty() {
        return;
    }

    let peer = |b: u8| {
        let idx = b % 9;
        if usize::from(idx) >= zones.len() {
            Peer::Internet
        } else {
            Peer::zone(format!("z{idx}"))
        }
    };

    let mut flows = Vec::new();
    while cursor + 5 <= data.len() {
        let chunk = &data[cursor..cursor + 5];
        cursor += 5;
        let port = u16::from_be_bytes([chunk[3], chunk[4]]);
        flows.push(FlowSpec {
            source: peer(chunk[0]),
            dest: peer(chunk[1]),
            protocol: match chunk[2] % 3 {
                0 => Protocol::Tcp,
                1 => Protocol::Udp,
                _ => Protocol::Icmp,
            },
            ports: PortRange::single(port),
            label: String::new(),
        });
    }

    let topology = Topology::new(zones);
    let Ok(registry) = FlowRegistry::from_flows(flows) else {
        return;
    };
    let Ok(rules) = PacketFilterCompiler::compile(&topology, &registry) else {
        return;
    };

    for zone in &topology.zones {
        for direction in [Direction::Ingress, Direction::Egress] {
            let mut last = 0;
            for rule in rules.rules_for(&zone.name, direction) {
                // Strictly increasing numbers within one direction.
                assert!(rule.rule_number > last);
                last = rule.rule_number;
                if rule.class == RuleClass::Specific {
                    assert!(rule.rule_number < DENY_BAND_START);
                }
                if !zone.is_bridge() {
                    assert!(!rule.has_wildcard_peer());
                }
            }
        }
    }

    // Recompiling one zone yields the same slice.
    let first = &topology.zones[0].name;
    if let Ok(single) = PacketFilterCompiler::compile_zone(&topology, &registry, first) {
        assert_eq!(single.as_slice(), rules.rules(first));
    }
});
