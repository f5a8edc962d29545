//! Flow declaration parsing.

use domain::common::entity::PortRange;
use domain::flow::entity::{FlowSpec, Peer};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, parse_port_range, parse_protocol, require_non_empty};

/// YAML representation of one permitted flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntryConfig {
    /// Source zone name or `INTERNET`.
    pub from: String,
    /// Destination zone name or `INTERNET`.
    pub to: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub port: PortRangeConfig,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

impl FlowEntryConfig {
    /// Validate this flow at the YAML level. Zone references are checked
    /// by the compiler against the topology.
    pub(super) fn validate(&self, idx: usize) -> Result<(), ConfigError> {
        let prefix = format!("flows[{idx}]");

        require_non_empty(format!("{prefix}.from"), &self.from)?;
        require_non_empty(format!("{prefix}.to"), &self.to)?;

        parse_protocol(&self.protocol).map_err(|()| ConfigError::InvalidValue {
            field: format!("{prefix}.protocol"),
            value: self.protocol.clone(),
            expected: "tcp, udp, icmp, any".to_string(),
        })?;

        self.port.to_domain().map_err(|e| ConfigError::Validation {
            field: format!("{prefix}.port"),
            message: e.to_string(),
        })?;

        Ok(())
    }

    pub fn to_domain_flow(&self) -> Result<FlowSpec, ConfigError> {
        let protocol = parse_protocol(&self.protocol).map_err(|()| ConfigError::InvalidValue {
            field: "protocol".to_string(),
            value: self.protocol.clone(),
            expected: "tcp, udp, icmp, any".to_string(),
        })?;

        Ok(FlowSpec {
            source: Peer::from(self.from.clone()),
            dest: Peer::from(self.to.clone()),
            protocol,
            ports: self.port.to_domain()?,
            label: self.label.clone().unwrap_or_default(),
        })
    }
}

// ── Port range config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortRangeConfig {
    Single(u16),
    Range(String),
    Explicit { start: u16, end: u16 },
}

impl PortRangeConfig {
    pub fn to_domain(&self) -> Result<PortRange, ConfigError> {
        match self {
            Self::Single(port) => parse_port_range(&port.to_string()),
            Self::Range(s) => parse_port_range(s),
            Self::Explicit { start, end } => parse_port_range(&format!("{start}-{end}")),
        }
    }
}
