use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid bridge '{bridge}': {reason}")]
    InvalidSpec { bridge: String, reason: String },

    #[error("bridge '{bridge}' references undefined zone '{zone}'")]
    UnknownZone { bridge: String, zone: String },

    #[error("bridge '{bridge}': zone '{zone}' has a direct internet route and needs no bridge")]
    DirectRouteExists { bridge: String, zone: String },

    #[error("bridge '{bridge}' targets edge '{expected}' but was given '{found}'")]
    EdgeMismatch {
        bridge: String,
        expected: String,
        found: String,
    },

    #[error("bridge '{bridge}': edge '{edge}' must match on a routing header")]
    NotHeaderMatched { bridge: String, edge: String },

    #[error("bridge '{bridge}' forwards to port {dispatcher_port} but the dispatcher listens on {listener_port}")]
    PortMismatch {
        bridge: String,
        dispatcher_port: u16,
        listener_port: u16,
    },

    #[error("bridge '{bridge}': link block {link} lies outside zone '{zone}'")]
    LinkOutsideZone {
        bridge: String,
        link: String,
        zone: String,
    },

    #[error("bridge '{bridge}': zone '{zone}' does not admit tcp/{port} from the link")]
    DispatcherNotAdmitted {
        bridge: String,
        zone: String,
        port: u16,
    },
}

impl From<BridgeError> for DomainError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::UnknownZone { .. } => Self::UndefinedReference(e.to_string()),
            BridgeError::InvalidSpec { .. } => Self::InvalidConfig(e.to_string()),
            other => Self::Composition(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_zone_to_domain_error() {
        let e: DomainError = BridgeError::UnknownZone {
            bridge: "gw".to_string(),
            zone: "vault".to_string(),
        }
        .into();
        assert!(matches!(e, DomainError::UndefinedReference(_)));
    }

    #[test]
    fn composition_errors() {
        let e: DomainError = BridgeError::DispatcherNotAdmitted {
            bridge: "gw".to_string(),
            zone: "vault".to_string(),
            port: 80,
        }
        .into();
        assert!(matches!(e, DomainError::Composition(_)));
        assert!(e.to_string().contains("tcp/80"));
    }
}
