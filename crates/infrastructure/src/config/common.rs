//! Shared parsing helpers and error types used across all config modules.

use std::path::Path;

use tracing::warn;

use domain::common::entity::{Ipv4Cidr, PortRange, Protocol};

// ── Security limits ────────────────────────────────────────────────
//
// Maximum counts per section to prevent OOM from excessive config.

/// Maximum zones in one topology.
pub(super) const MAX_ZONES: usize = 256;
/// Maximum declared flows.
pub(super) const MAX_FLOWS: usize = 4096;
/// Maximum dispatcher edges.
pub(super) const MAX_EDGES: usize = 64;
/// Maximum service entries behind one edge.
pub(super) const MAX_EDGE_ENTRIES: usize = 100;
/// Maximum bridges.
pub(super) const MAX_BRIDGES: usize = 64;

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("invalid CIDR notation '{value}': {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("invalid port range '{value}': {reason}")]
    InvalidPortRange { value: String, reason: String },

    #[error("invalid value '{value}' for field '{field}': expected one of {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

// ── Parsing helpers ────────────────────────────────────────────────

/// Parse an IPv4 CIDR string like `"10.0.0.0/24"` or `"10.0.0.1"`.
///
/// Host bits must be clear: `"10.0.0.1/24"` is rejected rather than
/// silently widened.
pub fn parse_cidr(s: &str) -> Result<Ipv4Cidr, ConfigError> {
    s.parse()
        .map_err(|e: domain::common::error::DomainError| ConfigError::InvalidCidr {
            value: s.to_string(),
            reason: e.to_string(),
        })
}

/// Parse `"3000"` or `"1024-65535"`.
pub fn parse_port_range(s: &str) -> Result<PortRange, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPortRange {
        value: s.to_string(),
        reason,
    };
    let parse_port = |p: &str| {
        p.trim()
            .parse::<u16>()
            .map_err(|_| invalid(format!("invalid port: '{p}'")))
    };

    let range = match s.split_once('-') {
        Some((start, end)) => PortRange {
            start: parse_port(start)?,
            end: parse_port(end)?,
        },
        None => PortRange::single(parse_port(s)?),
    };
    range.validate().map_err(|e| invalid(e.to_string()))?;
    Ok(range)
}

pub(super) fn parse_protocol(s: &str) -> Result<Protocol, ()> {
    match s.to_lowercase().as_str() {
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        "icmp" => Ok(Protocol::Icmp),
        "any" | "*" | "-1" => Ok(Protocol::Any),
        _ => Err(()),
    }
}

/// Log a warning if a file is world-readable (Unix only).
///
/// Topology files describe internal address plans and certificate
/// references; they should be readable only by the owner and group.
#[cfg(unix)]
pub(super) fn warn_if_world_readable(path: &Path, label: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o004 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{mode:04o}"),
                "{label} is world-readable, consider chmod 640 or stricter",
            );
        }
    }
}

#[cfg(not(unix))]
pub(super) fn warn_if_world_readable(_path: &Path, _label: &str) {}

/// Enforce a maximum count on a config collection.
pub(super) fn check_limit(field: &str, count: usize, max: usize) -> Result<(), ConfigError> {
    if count > max {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("count {count} exceeds maximum {max}"),
        });
    }
    Ok(())
}

/// Reject an empty string field.
pub(super) fn require_non_empty(field: String, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation {
            field,
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── CIDR parsing ──────────────────────────────────────────────

    #[test]
    fn parse_cidr_with_prefix() {
        let cidr = parse_cidr("10.128.0.0/24").unwrap();
        assert_eq!(cidr.prefix_len(), 24);
        assert_eq!(cidr.to_string(), "10.128.0.0/24");
    }

    #[test]
    fn parse_cidr_single_host() {
        let cidr = parse_cidr("10.0.0.1").unwrap();
        assert_eq!(cidr.prefix_len(), 32);
    }

    #[test]
    fn parse_cidr_zero() {
        assert!(parse_cidr("0.0.0.0/0").unwrap().is_any());
    }

    #[test]
    fn parse_cidr_rejects_host_bits() {
        let err = parse_cidr("10.0.0.1/24").unwrap_err();
        assert!(err.to_string().contains("host bits"));
    }

    #[test]
    fn parse_cidr_invalid() {
        assert!(parse_cidr("10.0.0.0/33").is_err());
        assert!(parse_cidr("10.0.0").is_err());
        assert!(parse_cidr("256.0.0.0/24").is_err());
        assert!(parse_cidr("2001:db8::/32").is_err());
        assert!(parse_cidr("not-an-ip").is_err());
    }

    // ── Port parsing ──────────────────────────────────────────────

    #[test]
    fn parse_single_port() {
        assert_eq!(parse_port_range("3000").unwrap(), PortRange::single(3000));
    }

    #[test]
    fn parse_port_span() {
        assert_eq!(parse_port_range("1024-65535").unwrap(), PortRange::EPHEMERAL);
        assert_eq!(
            parse_port_range("8000 - 8080").unwrap(),
            PortRange {
                start: 8000,
                end: 8080
            }
        );
    }

    #[test]
    fn parse_port_invalid() {
        assert!(parse_port_range("0").is_err());
        assert!(parse_port_range("9000-8000").is_err());
        assert!(parse_port_range("70000").is_err());
        assert!(parse_port_range("http").is_err());
    }

    #[test]
    fn parse_protocol_variants() {
        assert_eq!(parse_protocol("tcp").unwrap(), Protocol::Tcp);
        assert_eq!(parse_protocol("UDP").unwrap(), Protocol::Udp);
        assert_eq!(parse_protocol("icmp").unwrap(), Protocol::Icmp);
        assert_eq!(parse_protocol("-1").unwrap(), Protocol::Any);
        assert!(parse_protocol("sctp").is_err());
    }

    #[test]
    fn check_limit_enforced() {
        assert!(check_limit("flows", 4096, MAX_FLOWS).is_ok());
        let err = check_limit("flows", 4097, MAX_FLOWS).unwrap_err();
        assert!(err.to_string().contains("flows"));
    }
}
