use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::common::entity::Ipv4Cidr;

use super::error::ZoneError;

/// Symbolic peer name reserved for the unrestricted internet.
pub const INTERNET: &str = "INTERNET";

/// Default externally exposed port on bridge zones.
pub const DEFAULT_INGRESS_PORT: u16 = 443;

/// Isolation level of a zone, from least to most isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTier {
    /// Direct internet route.
    Public,
    /// Reachable only from designated zones; outbound via translation.
    Private,
    /// Reachable only from designated zones; no outbound internet.
    Isolated,
    /// Reachable only through a bridge.
    VeryIsolated,
}

impl ZoneTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Isolated => "isolated",
            Self::VeryIsolated => "very_isolated",
        }
    }

    /// Tiers that must never see the unrestricted internet as a peer.
    pub fn is_isolated(self) -> bool {
        matches!(self, Self::Isolated | Self::VeryIsolated)
    }
}

impl std::fmt::Display for ZoneTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network segment with its own address block and isolation tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub address_block: Ipv4Cidr,
    pub tier: ZoneTier,
    pub has_direct_internet_route: bool,
}

impl Zone {
    pub fn new(name: impl Into<String>, address_block: Ipv4Cidr, tier: ZoneTier) -> Self {
        Self {
            name: name.into(),
            address_block,
            tier,
            has_direct_internet_route: tier == ZoneTier::Public,
        }
    }

    /// Bridge zones are the only zones allowed to exchange traffic with
    /// the unrestricted internet.
    pub fn is_bridge(&self) -> bool {
        self.has_direct_internet_route
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        validate_name(&self.name)?;
        if (self.tier == ZoneTier::Public) != self.has_direct_internet_route {
            return Err(ZoneError::TierConflict {
                name: self.name.clone(),
                tier: self.tier.as_str(),
                direct: self.has_direct_internet_route,
            });
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ZoneError> {
    if name.is_empty() {
        return Err(ZoneError::Invalid {
            reason: "zone name must not be empty".to_string(),
        });
    }
    if name.eq_ignore_ascii_case(INTERNET) {
        return Err(ZoneError::Invalid {
            reason: format!("zone name '{name}' is reserved"),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ZoneError::Invalid {
            reason: format!("zone name '{name}' must contain only alphanumeric, dashes, underscores"),
        });
    }
    Ok(())
}

/// The set of zones one compilation pass works on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub zones: Vec<Zone>,
    /// Enclosing block for deny-all rules. Derived from the zones when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_cidr: Option<Ipv4Cidr>,
    /// Port bridge zones expose to the internet.
    #[serde(default = "default_ingress_port")]
    pub ingress_port: u16,
}

fn default_ingress_port() -> u16 {
    DEFAULT_INGRESS_PORT
}

impl Topology {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            network_cidr: None,
            ingress_port: DEFAULT_INGRESS_PORT,
        }
    }

    #[must_use]
    pub fn with_network_cidr(mut self, network: Ipv4Cidr) -> Self {
        self.network_cidr = Some(network);
        self
    }

    #[must_use]
    pub fn with_ingress_port(mut self, port: u16) -> Self {
        self.ingress_port = port;
        self
    }

    pub fn validate(&self) -> Result<(), ZoneError> {
        if self.zones.is_empty() {
            return Err(ZoneError::Invalid {
                reason: "topology must define at least one zone".to_string(),
            });
        }
        if self.ingress_port == 0 {
            return Err(ZoneError::Invalid {
                reason: "ingress_port must not be 0".to_string(),
            });
        }

        let mut names = HashSet::new();
        for zone in &self.zones {
            zone.validate()?;
            if !names.insert(zone.name.as_str()) {
                return Err(ZoneError::Duplicate {
                    name: zone.name.clone(),
                });
            }
        }

        for (i, zone) in self.zones.iter().enumerate() {
            if let Some(other) = self.zones[i + 1..]
                .iter()
                .find(|z| z.address_block.overlaps(&zone.address_block))
            {
                return Err(ZoneError::Overlap {
                    first: zone.name.clone(),
                    second: other.name.clone(),
                });
            }
        }

        if let Some(network) = self.network_cidr
            && let Some(outside) = self
                .zones
                .iter()
                .find(|z| !network.covers(&z.address_block))
        {
            return Err(ZoneError::OutsideNetwork {
                name: outside.name.clone(),
                block: outside.address_block.to_string(),
                network: network.to_string(),
            });
        }

        // Deny-all rules must never carry the wildcard peer.
        if let Some(network) = self.intra_network()
            && network.is_any()
        {
            return Err(ZoneError::Invalid {
                reason: "intra-network block resolves to 0.0.0.0/0; set an explicit network_cidr"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Lookup a zone by name.
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Lookup a zone by name, failing with `NotFound`.
    pub fn require(&self, name: &str) -> Result<&Zone, ZoneError> {
        self.zone(name).ok_or_else(|| ZoneError::NotFound {
            name: name.to_string(),
        })
    }

    /// Block covered by deny-all-intra-network rules: the configured
    /// network, or the smallest supernet of every zone's address block.
    pub fn intra_network(&self) -> Option<Ipv4Cidr> {
        if self.network_cidr.is_some() {
            return self.network_cidr;
        }
        self.zones
            .iter()
            .map(|z| z.address_block)
            .reduce(|acc, block| acc.supernet(&block))
    }

    pub fn bridge_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_bridge())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::DomainError;

    fn cidr(s: &str) -> Ipv4Cidr {
        s.parse().unwrap()
    }

    fn edge() -> Zone {
        Zone::new("edge", cidr("10.0.0.0/24"), ZoneTier::Public)
    }

    fn inner() -> Zone {
        Zone::new("inner", cidr("10.128.0.0/24"), ZoneTier::Isolated)
    }

    #[test]
    fn zone_validate_ok() {
        assert!(edge().validate().is_ok());
        assert!(inner().validate().is_ok());
    }

    #[test]
    fn zone_empty_name() {
        let zone = Zone::new("", cidr("10.0.0.0/24"), ZoneTier::Private);
        assert!(zone.validate().is_err());
    }

    #[test]
    fn zone_reserved_name() {
        let zone = Zone::new("internet", cidr("10.0.0.0/24"), ZoneTier::Private);
        assert!(zone.validate().is_err());
    }

    #[test]
    fn isolated_zone_with_direct_route_conflicts() {
        let mut zone = inner();
        zone.has_direct_internet_route = true;
        assert!(matches!(
            zone.validate(),
            Err(ZoneError::TierConflict { .. })
        ));
    }

    #[test]
    fn public_zone_without_direct_route_conflicts() {
        let mut zone = edge();
        zone.has_direct_internet_route = false;
        assert!(zone.validate().is_err());
    }

    #[test]
    fn new_sets_route_from_tier() {
        assert!(edge().is_bridge());
        assert!(!inner().is_bridge());
        assert!(ZoneTier::VeryIsolated.is_isolated());
        assert!(!ZoneTier::Private.is_isolated());
    }

    #[test]
    fn topology_ok() {
        let topo = Topology::new(vec![edge(), inner()]);
        assert!(topo.validate().is_ok());
        assert_eq!(topo.ingress_port, 443);
        assert_eq!(topo.bridge_zones().count(), 1);
    }

    #[test]
    fn topology_empty() {
        assert!(Topology::new(Vec::new()).validate().is_err());
    }

    #[test]
    fn topology_duplicate_zone() {
        let mut dup = inner();
        dup.name = "edge".to_string();
        let topo = Topology::new(vec![edge(), dup]);
        assert!(matches!(
            topo.validate(),
            Err(ZoneError::Duplicate { .. })
        ));
    }

    #[test]
    fn topology_overlapping_blocks() {
        let other = Zone::new("other", cidr("10.0.0.0/16"), ZoneTier::Private);
        let topo = Topology::new(vec![edge(), other]);
        assert!(matches!(topo.validate(), Err(ZoneError::Overlap { .. })));
    }

    #[test]
    fn topology_zone_outside_network() {
        let topo = Topology::new(vec![edge(), inner()]).with_network_cidr(cidr("10.0.0.0/16"));
        assert!(matches!(
            topo.validate(),
            Err(ZoneError::OutsideNetwork { .. })
        ));
    }

    #[test]
    fn intra_network_derived_from_zones() {
        let topo = Topology::new(vec![edge(), inner()]);
        assert_eq!(topo.intra_network(), Some(cidr("10.0.0.0/8")));
    }

    #[test]
    fn disjoint_blocks_need_explicit_network() {
        let far = Zone::new("far", cidr("192.168.0.0/24"), ZoneTier::Isolated);
        let topo = Topology::new(vec![edge(), far.clone()]);
        assert_eq!(topo.intra_network(), Some(Ipv4Cidr::ANY));
        let err = topo.validate().unwrap_err();
        assert!(err.to_string().contains("network_cidr"));
        let e: DomainError = err.into();
        assert!(matches!(e, DomainError::InvalidConfig(_)));

        let wildcard = Topology::new(vec![edge(), far]).with_network_cidr(Ipv4Cidr::ANY);
        assert!(wildcard.validate().is_err());
    }

    #[test]
    fn intra_network_prefers_configured_block() {
        let topo = Topology::new(vec![edge()]).with_network_cidr(cidr("10.0.0.0/20"));
        assert_eq!(topo.intra_network(), Some(cidr("10.0.0.0/20")));
    }

    #[test]
    fn require_unknown_zone() {
        let topo = Topology::new(vec![edge()]);
        assert!(topo.require("edge").is_ok());
        assert!(matches!(
            topo.require("db"),
            Err(ZoneError::NotFound { .. })
        ));
    }
}
