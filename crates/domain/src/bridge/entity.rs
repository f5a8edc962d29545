use serde::{Deserialize, Serialize};

use crate::common::entity::{Ipv4Cidr, Protocol};
use crate::dispatch::entity::{DispatchTable, DnsRecord};
use crate::firewall::entity::CompiledRule;

use super::error::BridgeError;

/// Port the internal dispatcher listens on behind a bridge.
pub const DEFAULT_DISPATCHER_PORT: u16 = 80;

/// Catch-all gateway route forwarding every path.
pub const DEFAULT_ROUTE_PATH: &str = "/{proxy+}";

/// Declares a public protocol gateway fronting an internal dispatcher that
/// has no direct internet route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSpec {
    pub name: String,
    /// Public name clients use to reach the gateway.
    pub gateway_domain: String,
    /// Address the gateway DNS record points at.
    pub gateway_address: String,
    /// Zone holding the link endpoints and the dispatcher.
    pub inner_zone: String,
    /// Name of the dispatch table the gateway forwards into.
    pub edge: String,
    #[serde(default = "default_dispatcher_port")]
    pub dispatcher_port: u16,
    /// Block the private link's interfaces live in. Defaults to the inner
    /// zone's address block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_cidr: Option<Ipv4Cidr>,
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_zone_ref: Option<String>,
}

fn default_dispatcher_port() -> u16 {
    DEFAULT_DISPATCHER_PORT
}

fn default_paths() -> Vec<String> {
    vec![DEFAULT_ROUTE_PATH.to_string()]
}

impl BridgeSpec {
    pub fn new(
        name: impl Into<String>,
        gateway_domain: impl Into<String>,
        gateway_address: impl Into<String>,
        inner_zone: impl Into<String>,
        edge: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gateway_domain: gateway_domain.into(),
            gateway_address: gateway_address.into(),
            inner_zone: inner_zone.into(),
            edge: edge.into(),
            dispatcher_port: DEFAULT_DISPATCHER_PORT,
            link_cidr: None,
            paths: default_paths(),
            certificate_ref: None,
            dns_zone_ref: None,
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        let invalid = |reason: String| BridgeError::InvalidSpec {
            bridge: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("bridge name must not be empty".to_string()));
        }
        if self.gateway_domain.is_empty() || self.gateway_address.is_empty() {
            return Err(invalid("gateway domain and address must not be empty".to_string()));
        }
        if self.dispatcher_port == 0 {
            return Err(invalid("dispatcher port must not be 0".to_string()));
        }
        if self.paths.is_empty() {
            return Err(invalid("at least one gateway path is required".to_string()));
        }
        if let Some(path) = self.paths.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid(format!("path '{path}' must start with '/'")));
        }
        Ok(())
    }
}

/// A path the gateway forwards over the private link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub path: String,
    /// `address:port` of the dispatcher listener.
    pub integration: String,
}

/// The single filter scoping the private link: link interfaces may reach
/// the dispatcher's listener and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFilterRule {
    pub source: Ipv4Cidr,
    pub destination: String,
    pub protocol: Protocol,
    pub port: u16,
}

/// Everything a bridge deployment needs, assembled from plain values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOutput {
    pub name: String,
    pub inner_zone: String,
    pub inner_rules: Vec<CompiledRule>,
    pub dispatch: DispatchTable,
    pub routes: Vec<GatewayRoute>,
    pub link_rule: LinkFilterRule,
    pub dns_record: DnsRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<String>,
}
