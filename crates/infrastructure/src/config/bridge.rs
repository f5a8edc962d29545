//! Bridge (public gateway to internal dispatcher) configuration parsing.

use domain::bridge::entity::{BridgeSpec, DEFAULT_DISPATCHER_PORT, DEFAULT_ROUTE_PATH};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, parse_cidr, require_non_empty};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub name: String,
    pub gateway_domain: String,
    pub gateway_address: String,
    pub inner_zone: String,
    /// Header-matched edge the gateway forwards into.
    pub edge: String,
    #[serde(default = "default_dispatcher_port")]
    pub dispatcher_port: u16,
    #[serde(default)]
    pub link_cidr: Option<String>,
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,
    #[serde(default)]
    pub certificate_ref: Option<String>,
    #[serde(default)]
    pub dns_zone_ref: Option<String>,
}

fn default_dispatcher_port() -> u16 {
    DEFAULT_DISPATCHER_PORT
}

fn default_paths() -> Vec<String> {
    vec![DEFAULT_ROUTE_PATH.to_string()]
}

impl BridgeConfig {
    pub(super) fn validate(&self, idx: usize) -> Result<(), ConfigError> {
        let prefix = format!("bridges[{idx}]");

        require_non_empty(format!("{prefix}.name"), &self.name)?;
        require_non_empty(format!("{prefix}.gateway_domain"), &self.gateway_domain)?;
        require_non_empty(format!("{prefix}.gateway_address"), &self.gateway_address)?;
        require_non_empty(format!("{prefix}.inner_zone"), &self.inner_zone)?;
        require_non_empty(format!("{prefix}.edge"), &self.edge)?;

        if self.dispatcher_port == 0 {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.dispatcher_port"),
                message: "port must not be 0".to_string(),
            });
        }

        if let Some(ref cidr) = self.link_cidr {
            parse_cidr(cidr).map_err(|e| ConfigError::Validation {
                field: format!("{prefix}.link_cidr"),
                message: e.to_string(),
            })?;
        }

        if self.paths.is_empty() {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.paths"),
                message: "at least one path is required".to_string(),
            });
        }
        for (i, path) in self.paths.iter().enumerate() {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation {
                    field: format!("{prefix}.paths[{i}]"),
                    message: "must start with '/'".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn to_domain_bridge(&self) -> Result<BridgeSpec, ConfigError> {
        let mut bridge = BridgeSpec::new(
            self.name.clone(),
            self.gateway_domain.clone(),
            self.gateway_address.clone(),
            self.inner_zone.clone(),
            self.edge.clone(),
        );
        bridge.dispatcher_port = self.dispatcher_port;
        bridge.link_cidr = self.link_cidr.as_deref().map(parse_cidr).transpose()?;
        bridge.paths.clone_from(&self.paths);
        bridge.certificate_ref.clone_from(&self.certificate_ref);
        bridge.dns_zone_ref.clone_from(&self.dns_zone_ref);
        Ok(bridge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIDGE: &str = r#"
name: gateway
gateway_domain: gateway.example.com
gateway_address: gw.example.net
inner_zone: isolated
edge: internal
link_cidr: 10.64.0.0/28
"#;

    fn parse(yaml: &str) -> BridgeConfig {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let cfg = parse(BRIDGE);
        cfg.validate(0).unwrap();
        let bridge = cfg.to_domain_bridge().unwrap();
        assert_eq!(bridge.dispatcher_port, DEFAULT_DISPATCHER_PORT);
        assert_eq!(bridge.paths, vec![DEFAULT_ROUTE_PATH.to_string()]);
        assert_eq!(
            bridge.link_cidr.map(|c| c.to_string()),
            Some("10.64.0.0/28".to_string())
        );
    }

    #[test]
    fn relative_path_rejected() {
        let mut cfg = parse(BRIDGE);
        cfg.paths = vec!["api".to_string()];
        let err = cfg.validate(1).unwrap_err();
        assert!(err.to_string().contains("bridges[1].paths[0]"));
    }

    #[test]
    fn bad_link_cidr_rejected() {
        let mut cfg = parse(BRIDGE);
        cfg.link_cidr = Some("10.64.0.1/28".to_string());
        assert!(cfg.validate(0).is_err());
    }

    #[test]
    fn missing_edge_rejected() {
        let mut cfg = parse(BRIDGE);
        cfg.edge = String::new();
        assert!(cfg.validate(0).is_err());
    }
}
