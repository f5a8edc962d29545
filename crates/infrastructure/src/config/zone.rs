//! Zone topology configuration parsing.

use std::collections::HashSet;

use domain::zone::entity::{DEFAULT_INGRESS_PORT, INTERNET, Topology, Zone, ZoneTier};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, MAX_ZONES, check_limit, parse_cidr, require_non_empty};

/// Top-level topology section config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Block covered by the intra-network deny rules. Defaults to the
    /// smallest block enclosing every zone.
    #[serde(default)]
    pub network_cidr: Option<String>,

    #[serde(default = "default_ingress_port")]
    pub ingress_port: u16,

    #[serde(default)]
    pub zones: Vec<ZoneEntryConfig>,
}

fn default_ingress_port() -> u16 {
    DEFAULT_INGRESS_PORT
}

impl TopologyConfig {
    /// Validate the topology section.
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        check_limit("topology.zones", self.zones.len(), MAX_ZONES)?;

        if let Some(ref cidr) = self.network_cidr {
            parse_cidr(cidr).map_err(|e| ConfigError::Validation {
                field: "topology.network_cidr".to_string(),
                message: e.to_string(),
            })?;
        }

        if self.ingress_port == 0 {
            return Err(ConfigError::Validation {
                field: "topology.ingress_port".to_string(),
                message: "port must not be 0".to_string(),
            });
        }

        for (idx, zone) in self.zones.iter().enumerate() {
            zone.validate(idx)?;
        }

        // Check for duplicate zone names
        let mut names = HashSet::new();
        for (idx, zone) in self.zones.iter().enumerate() {
            if !names.insert(zone.name.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("topology.zones[{idx}].name"),
                    message: format!("duplicate zone name: {}", zone.name),
                });
            }
        }

        Ok(())
    }

    /// Convert to a domain `Topology`.
    pub fn to_domain_topology(&self) -> Result<Topology, ConfigError> {
        let zones = self
            .zones
            .iter()
            .map(ZoneEntryConfig::to_domain_zone)
            .collect::<Result<Vec<_>, _>>()?;

        let mut topology = Topology::new(zones).with_ingress_port(self.ingress_port);
        if let Some(ref cidr) = self.network_cidr {
            topology = topology.with_network_cidr(parse_cidr(cidr)?);
        }
        Ok(topology)
    }
}

/// YAML representation of a network zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneEntryConfig {
    pub name: String,
    pub cidr: String,
    pub tier: String,
    /// Overrides the tier's default internet route (only public zones
    /// have one by default).
    #[serde(default)]
    pub direct_internet_route: Option<bool>,
}

impl ZoneEntryConfig {
    pub(super) fn validate(&self, idx: usize) -> Result<(), ConfigError> {
        let prefix = format!("topology.zones[{idx}]");

        require_non_empty(format!("{prefix}.name"), &self.name)?;
        if self.name.eq_ignore_ascii_case(INTERNET) {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.name"),
                message: format!("'{INTERNET}' is reserved"),
            });
        }

        parse_cidr(&self.cidr).map_err(|e| ConfigError::Validation {
            field: format!("{prefix}.cidr"),
            message: e.to_string(),
        })?;

        parse_tier(&self.tier).map_err(|()| ConfigError::InvalidValue {
            field: format!("{prefix}.tier"),
            value: self.tier.clone(),
            expected: TIER_NAMES.to_string(),
        })?;

        Ok(())
    }

    pub fn to_domain_zone(&self) -> Result<Zone, ConfigError> {
        let tier = parse_tier(&self.tier).map_err(|()| ConfigError::InvalidValue {
            field: "tier".to_string(),
            value: self.tier.clone(),
            expected: TIER_NAMES.to_string(),
        })?;

        let mut zone = Zone::new(self.name.clone(), parse_cidr(&self.cidr)?, tier);
        if let Some(route) = self.direct_internet_route {
            zone.has_direct_internet_route = route;
        }
        Ok(zone)
    }
}

const TIER_NAMES: &str = "public, private, isolated, very_isolated";

fn parse_tier(s: &str) -> Result<ZoneTier, ()> {
    match s.to_lowercase().replace('-', "_").as_str() {
        "public" => Ok(ZoneTier::Public),
        "private" => Ok(ZoneTier::Private),
        "isolated" => Ok(ZoneTier::Isolated),
        "very_isolated" | "veryisolated" => Ok(ZoneTier::VeryIsolated),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, cidr: &str, tier: &str) -> ZoneEntryConfig {
        ZoneEntryConfig {
            name: name.to_string(),
            cidr: cidr.to_string(),
            tier: tier.to_string(),
            direct_internet_route: None,
        }
    }

    fn section(zones: Vec<ZoneEntryConfig>) -> TopologyConfig {
        TopologyConfig {
            network_cidr: None,
            ingress_port: DEFAULT_INGRESS_PORT,
            zones,
        }
    }

    #[test]
    fn valid_topology_converts() {
        let cfg = section(vec![
            zone("edge", "10.0.0.0/24", "public"),
            zone("inner", "10.128.0.0/24", "very-isolated"),
        ]);
        cfg.validate().unwrap();
        let topology = cfg.to_domain_topology().unwrap();
        assert_eq!(topology.zones.len(), 2);
        assert!(topology.zones[0].has_direct_internet_route);
        assert_eq!(topology.zones[1].tier, ZoneTier::VeryIsolated);
        assert!(!topology.zones[1].has_direct_internet_route);
    }

    #[test]
    fn duplicate_zone_name_rejected() {
        let cfg = section(vec![
            zone("edge", "10.0.0.0/24", "public"),
            zone("edge", "10.1.0.0/24", "private"),
        ]);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("topology.zones[1].name"));
    }

    #[test]
    fn unknown_tier_rejected() {
        let cfg = section(vec![zone("edge", "10.0.0.0/24", "dmz")]);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn internet_is_reserved() {
        let cfg = section(vec![zone("internet", "10.0.0.0/24", "public")]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_cidr_reports_field() {
        let cfg = section(vec![zone("edge", "10.0.0.0/40", "public")]);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("topology.zones[0].cidr"));
    }

    #[test]
    fn network_cidr_and_port_carried() {
        let mut cfg = section(vec![zone("edge", "10.0.0.0/24", "public")]);
        cfg.network_cidr = Some("10.0.0.0/16".to_string());
        cfg.ingress_port = 8443;
        let topology = cfg.to_domain_topology().unwrap();
        assert_eq!(topology.ingress_port, 8443);
        assert_eq!(
            topology.network_cidr.map(|c| c.to_string()),
            Some("10.0.0.0/16".to_string())
        );
    }

    #[test]
    fn route_override_applies() {
        let mut entry = zone("edge", "10.0.0.0/24", "private");
        entry.direct_internet_route = Some(true);
        assert!(entry.to_domain_zone().unwrap().has_direct_internet_route);
    }
}
