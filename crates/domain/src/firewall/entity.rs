use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::common::entity::{Ipv4Cidr, PortRange, Protocol, fingerprint};

// ── Direction / action ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

impl RuleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl std::fmt::Display for RuleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Rule bands ──────────────────────────────────────────────────────

/// First rule number of the specific-flow band.
pub const SPECIFIC_BAND_START: u32 = 1;

/// Rule number of the deny-all-intra-network band.
pub const DENY_BAND_START: u32 = 90;

/// Rule number of the generic internet allow band (bridge zones only).
pub const GENERIC_BAND_START: u32 = 100;

/// Specific rules a single (zone, direction) can hold before reaching the
/// deny band.
pub const SPECIFIC_BAND_CAPACITY: u32 = DENY_BAND_START - SPECIFIC_BAND_START;

/// Which numeric band a compiled rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    /// Derived from one declared flow.
    Specific,
    /// Explicit deny of all remaining intra-network traffic.
    DenyIntraNetwork,
    /// Generic allow to/from the unrestricted internet.
    GenericInternet,
}

impl RuleClass {
    pub fn band_start(self) -> u32 {
        match self {
            Self::Specific => SPECIFIC_BAND_START,
            Self::DenyIntraNetwork => DENY_BAND_START,
            Self::GenericInternet => GENERIC_BAND_START,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Specific => "specific",
            Self::DenyIntraNetwork => "deny_intra_network",
            Self::GenericInternet => "generic_internet",
        }
    }
}

// ── Compiled rule ───────────────────────────────────────────────────

/// One numbered, directional, stateless packet-filter statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub zone: String,
    pub direction: Direction,
    pub rule_number: u32,
    pub peer_cidr: Ipv4Cidr,
    pub protocol: Protocol,
    /// `None` matches every port.
    pub port_range: Option<PortRange>,
    pub action: RuleAction,
    pub class: RuleClass,
    pub label: String,
}

impl CompiledRule {
    pub fn has_wildcard_peer(&self) -> bool {
        self.peer_cidr.is_any()
    }

    /// Check a packet against this rule's peer, protocol and port.
    pub fn matches(&self, peer: Ipv4Addr, protocol: Protocol, port: u16) -> bool {
        if !self.peer_cidr.contains(peer) {
            return false;
        }
        if self.protocol != Protocol::Any && self.protocol != protocol {
            return false;
        }
        self.port_range.is_none_or(|range| range.contains(port))
    }
}

impl std::fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ports = self
            .port_range
            .map_or_else(|| "all".to_string(), |r| r.to_string());
        let relation = match self.direction {
            Direction::Ingress => "from",
            Direction::Egress => "to",
        };
        write!(
            f,
            "{} {} #{} {} {}/{} {} {}",
            self.zone,
            self.direction,
            self.rule_number,
            self.action,
            self.protocol,
            ports,
            relation,
            self.peer_cidr
        )
    }
}

// ── Compiled rule set ───────────────────────────────────────────────

/// Complete packet-filter output for one topology: every zone's rules,
/// ordered by direction then rule number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRuleSet {
    zones: BTreeMap<String, Vec<CompiledRule>>,
}

impl CompiledRuleSet {
    /// Build from per-zone rule lists, sorting each list into evaluation
    /// order.
    pub fn from_zones(zones: BTreeMap<String, Vec<CompiledRule>>) -> Self {
        let mut zones = zones;
        for rules in zones.values_mut() {
            rules.sort_by_key(|r| (r.direction, r.rule_number));
        }
        Self { zones }
    }

    /// All rules of a zone, empty if the zone is unknown.
    pub fn rules(&self, zone: &str) -> &[CompiledRule] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rules of one (zone, direction) pair in rule-number order.
    pub fn rules_for<'a>(
        &'a self,
        zone: &str,
        direction: Direction,
    ) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules(zone)
            .iter()
            .filter(move |r| r.direction == direction)
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.zones.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CompiledRule])> {
        self.zones.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    pub fn rule_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    /// Stateless first-match evaluation of one packet at a zone boundary.
    ///
    /// `peer` is the remote address and `port` the port the rule is
    /// scoped to. Rules are tried in ascending number; with no match the
    /// implicit default is `Deny`.
    pub fn evaluate(
        &self,
        zone: &str,
        direction: Direction,
        peer: Ipv4Addr,
        protocol: Protocol,
        port: u16,
    ) -> RuleAction {
        self.rules_for(zone, direction)
            .find(|r| r.matches(peer, protocol, port))
            .map_or(RuleAction::Deny, |r| r.action)
    }

    /// Hex SHA-256 of the canonical JSON encoding. Byte-identical rule
    /// sets share a fingerprint.
    pub fn fingerprint(&self) -> String {
        // BTreeMap keys and sorted rule lists make the encoding canonical.
        fingerprint(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    fn rule(direction: Direction, number: u32, class: RuleClass) -> CompiledRule {
        CompiledRule {
            zone: "inner".to_string(),
            direction,
            rule_number: number,
            peer_cidr: cidr("10.0.0.0/24"),
            protocol: Protocol::Tcp,
            port_range: Some(PortRange::single(3000)),
            action: RuleAction::Allow,
            class,
            label: String::new(),
        }
    }

    fn deny(direction: Direction) -> CompiledRule {
        CompiledRule {
            peer_cidr: cidr("10.0.0.0/8"),
            protocol: Protocol::Any,
            port_range: None,
            action: RuleAction::Deny,
            ..rule(direction, DENY_BAND_START, RuleClass::DenyIntraNetwork)
        }
    }

    fn set(rules: Vec<CompiledRule>) -> CompiledRuleSet {
        let mut zones = BTreeMap::new();
        zones.insert("inner".to_string(), rules);
        CompiledRuleSet::from_zones(zones)
    }

    #[test]
    fn band_constants() {
        assert_eq!(SPECIFIC_BAND_CAPACITY, 89);
        assert!(RuleClass::Specific.band_start() < RuleClass::DenyIntraNetwork.band_start());
        assert!(RuleClass::DenyIntraNetwork.band_start() < RuleClass::GenericInternet.band_start());
    }

    #[test]
    fn rules_sorted_by_direction_then_number() {
        let rs = set(vec![
            deny(Direction::Egress),
            rule(Direction::Ingress, 2, RuleClass::Specific),
            rule(Direction::Egress, 1, RuleClass::Specific),
            rule(Direction::Ingress, 1, RuleClass::Specific),
        ]);
        let order: Vec<(Direction, u32)> = rs
            .rules("inner")
            .iter()
            .map(|r| (r.direction, r.rule_number))
            .collect();
        assert_eq!(
            order,
            vec![
                (Direction::Ingress, 1),
                (Direction::Ingress, 2),
                (Direction::Egress, 1),
                (Direction::Egress, 90),
            ]
        );
        assert_eq!(rs.rules_for("inner", Direction::Egress).count(), 2);
        assert_eq!(rs.rules("missing").len(), 0);
    }

    #[test]
    fn evaluate_first_match_then_default_deny() {
        let rs = set(vec![rule(Direction::Ingress, 1, RuleClass::Specific), deny(Direction::Ingress)]);
        let from_edge = Ipv4Addr::new(10, 0, 0, 5);
        assert_eq!(
            rs.evaluate("inner", Direction::Ingress, from_edge, Protocol::Tcp, 3000),
            RuleAction::Allow
        );
        assert_eq!(
            rs.evaluate("inner", Direction::Ingress, from_edge, Protocol::Tcp, 22),
            RuleAction::Deny
        );
        assert_eq!(
            rs.evaluate("inner", Direction::Ingress, Ipv4Addr::new(8, 8, 8, 8), Protocol::Tcp, 3000),
            RuleAction::Deny
        );
        assert_eq!(
            rs.evaluate("inner", Direction::Egress, from_edge, Protocol::Tcp, 3000),
            RuleAction::Deny
        );
    }

    #[test]
    fn fingerprint_is_stable_and_sensitive() {
        let a = set(vec![rule(Direction::Ingress, 1, RuleClass::Specific)]);
        let b = set(vec![rule(Direction::Ingress, 1, RuleClass::Specific)]);
        let c = set(vec![rule(Direction::Ingress, 2, RuleClass::Specific)]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn display_rule() {
        let r = rule(Direction::Ingress, 1, RuleClass::Specific);
        assert_eq!(r.to_string(), "inner ingress #1 allow tcp/3000 from 10.0.0.0/24");
        assert_eq!(deny(Direction::Egress).to_string(), "inner egress #90 deny any/all to 10.0.0.0/8");
    }
}
