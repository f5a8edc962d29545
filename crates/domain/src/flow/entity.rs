use serde::{Deserialize, Serialize};

use crate::common::entity::{PortRange, Protocol};
use crate::zone::entity::INTERNET;

use super::error::FlowError;

// ── Peer ────────────────────────────────────────────────────────────

/// One end of a flow: a named zone or the unrestricted internet.
///
/// Serialized as the zone name, or `"INTERNET"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Peer {
    Internet,
    Zone(String),
}

impl Peer {
    pub fn zone(name: impl Into<String>) -> Self {
        Self::Zone(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Internet => INTERNET,
            Self::Zone(name) => name,
        }
    }

    pub fn is_internet(&self) -> bool {
        matches!(self, Self::Internet)
    }

    pub fn as_zone(&self) -> Option<&str> {
        match self {
            Self::Internet => None,
            Self::Zone(name) => Some(name),
        }
    }
}

impl From<String> for Peer {
    fn from(value: String) -> Self {
        if value == INTERNET {
            Self::Internet
        } else {
            Self::Zone(value)
        }
    }
}

impl From<Peer> for String {
    fn from(peer: Peer) -> Self {
        match peer {
            Peer::Internet => INTERNET.to_string(),
            Peer::Zone(name) => name,
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── Flow spec ───────────────────────────────────────────────────────

/// A permitted directional flow `source -> dest` on a port or port range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub source: Peer,
    pub dest: Peer,
    pub protocol: Protocol,
    pub ports: PortRange,
    #[serde(default)]
    pub label: String,
}

/// Identity of a flow for duplicate detection.
pub type FlowKey<'a> = (&'a str, &'a str, Protocol, PortRange);

impl FlowSpec {
    pub fn tcp(source: Peer, dest: Peer, port: u16) -> Self {
        Self {
            source,
            dest,
            protocol: Protocol::Tcp,
            ports: PortRange::single(port),
            label: String::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn key(&self) -> FlowKey<'_> {
        (
            self.source.name(),
            self.dest.name(),
            self.protocol,
            self.ports,
        )
    }

    /// Deterministic compile order: source name, dest name, port, protocol.
    pub fn sort_key(&self) -> (&str, &str, PortRange, Protocol) {
        (
            self.source.name(),
            self.dest.name(),
            self.ports,
            self.protocol,
        )
    }

    /// Whether either end is the unrestricted internet.
    pub fn touches_internet(&self) -> bool {
        self.source.is_internet() || self.dest.is_internet()
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        let invalid = |reason: String| FlowError::Invalid {
            flow: self.to_string(),
            reason,
        };
        if self.source.is_internet() && self.dest.is_internet() {
            return Err(invalid("source and dest cannot both be INTERNET".to_string()));
        }
        if self.source.name().is_empty() || self.dest.name().is_empty() {
            return Err(invalid("source and dest must be non-empty".to_string()));
        }
        if !self.protocol.has_ports() {
            return Err(invalid(format!(
                "protocol {} is not port-scoped; expected tcp or udp",
                self.protocol
            )));
        }
        self.ports.validate().map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Display for FlowSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{}:{}/{}",
            self.source, self.dest, self.protocol, self.ports
        )
    }
}
