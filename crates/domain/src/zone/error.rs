use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone not found: {name}")]
    NotFound { name: String },

    #[error("duplicate zone: {name}")]
    Duplicate { name: String },

    #[error("invalid zone: {reason}")]
    Invalid { reason: String },

    #[error("zone '{name}' has tier {tier} but direct_internet_route={direct}")]
    TierConflict {
        name: String,
        tier: &'static str,
        direct: bool,
    },

    #[error("address blocks of zones '{first}' and '{second}' overlap")]
    Overlap { first: String, second: String },

    #[error("zone '{name}' address block {block} lies outside network {network}")]
    OutsideNetwork {
        name: String,
        block: String,
        network: String,
    },
}

impl From<ZoneError> for DomainError {
    fn from(e: ZoneError) -> Self {
        match e {
            ZoneError::NotFound { .. } => Self::UndefinedReference(e.to_string()),
            ZoneError::Duplicate { .. } => Self::Duplicate(e.to_string()),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}
