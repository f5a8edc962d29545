//! Dispatcher edge configuration parsing.

use domain::dispatch::entity::{
    DEFAULT_LISTENER_PORT, DEFAULT_ROUTING_HEADER, EdgeSpec, MatchKind, ServiceEndpoint,
};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, MAX_EDGE_ENTRIES, check_limit, require_non_empty};

/// YAML representation of one dispatcher and its ordered services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub name: String,

    /// `host` for internet-facing edges, `header` for internal ones.
    #[serde(default = "default_match")]
    pub r#match: String,

    /// Routing header name for `header` matching.
    #[serde(default)]
    pub header: Option<String>,

    pub dispatcher_address: String,

    #[serde(default = "default_listener_port")]
    pub listener_port: u16,

    #[serde(default)]
    pub certificate_ref: Option<String>,

    #[serde(default)]
    pub dns_zone_ref: Option<String>,

    /// Declaration order sets dispatch priority.
    #[serde(default)]
    pub services: Vec<ServiceEntryConfig>,
}

fn default_match() -> String {
    "host".to_string()
}

fn default_listener_port() -> u16 {
    DEFAULT_LISTENER_PORT
}

impl EdgeConfig {
    pub(super) fn validate(&self, idx: usize) -> Result<(), ConfigError> {
        let prefix = format!("edges[{idx}]");

        require_non_empty(format!("{prefix}.name"), &self.name)?;
        require_non_empty(
            format!("{prefix}.dispatcher_address"),
            &self.dispatcher_address,
        )?;
        self.match_kind(&prefix)?;

        if self.header.is_some() && self.r#match.eq_ignore_ascii_case("host") {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.header"),
                message: "header name only applies to header matching".to_string(),
            });
        }

        if self.listener_port == 0 {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.listener_port"),
                message: "port must not be 0".to_string(),
            });
        }

        check_limit(
            &format!("{prefix}.services"),
            self.services.len(),
            MAX_EDGE_ENTRIES,
        )?;
        for (i, svc) in self.services.iter().enumerate() {
            svc.validate(&format!("{prefix}.services[{i}]"))?;
        }

        Ok(())
    }

    pub fn to_domain_edge(&self) -> Result<EdgeSpec, ConfigError> {
        let mut edge = EdgeSpec::new(
            self.name.clone(),
            self.match_kind(&self.name)?,
            self.dispatcher_address.clone(),
            self.listener_port,
        );
        edge.certificate_ref.clone_from(&self.certificate_ref);
        edge.dns_zone_ref.clone_from(&self.dns_zone_ref);
        for svc in &self.services {
            edge = edge.with_entry(svc.key.clone(), svc.to_domain_endpoint());
        }
        Ok(edge)
    }

    fn match_kind(&self, field_prefix: &str) -> Result<MatchKind, ConfigError> {
        match self.r#match.to_lowercase().as_str() {
            "host" => Ok(MatchKind::Host),
            "header" => Ok(MatchKind::Header {
                name: self
                    .header
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ROUTING_HEADER.to_string()),
            }),
            _ => Err(ConfigError::InvalidValue {
                field: format!("{field_prefix}.match"),
                value: self.r#match.clone(),
                expected: "host, header".to_string(),
            }),
        }
    }
}

/// One match key and the backend service it routes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntryConfig {
    /// Host name or routing-header value.
    pub key: String,
    pub service: String,
    pub zone: String,
    pub port: u16,
    #[serde(default = "default_health_check_path")]
    pub health_check_path: String,
}

fn default_health_check_path() -> String {
    "/".to_string()
}

impl ServiceEntryConfig {
    fn validate(&self, prefix: &str) -> Result<(), ConfigError> {
        require_non_empty(format!("{prefix}.key"), &self.key)?;
        require_non_empty(format!("{prefix}.service"), &self.service)?;
        require_non_empty(format!("{prefix}.zone"), &self.zone)?;
        if self.port == 0 {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.port"),
                message: "port must not be 0".to_string(),
            });
        }
        if !self.health_check_path.starts_with('/') {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.health_check_path"),
                message: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    pub fn to_domain_endpoint(&self) -> ServiceEndpoint {
        let mut endpoint = ServiceEndpoint::new(self.service.clone(), self.zone.clone(), self.port);
        endpoint.health_check_path.clone_from(&self.health_check_path);
        endpoint
    }
}
