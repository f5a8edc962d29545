use thiserror::Error;

use crate::common::error::DomainError;
use crate::flow::error::FlowError;
use crate::zone::error::ZoneError;

use super::entity::Direction;

#[derive(Debug, Error)]
pub enum FirewallError {
    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(
        "zone '{zone}' {direction} needs {count} specific rules but the band holds {capacity}"
    )]
    BandOverflow {
        zone: String,
        direction: Direction,
        count: usize,
        capacity: u32,
    },

    #[error("zone '{zone}' needs a deny-all rule but no intra-network block is known")]
    NoIntraNetwork { zone: String },
}

impl From<FirewallError> for DomainError {
    fn from(e: FirewallError) -> Self {
        match e {
            FirewallError::Zone(inner) => inner.into(),
            FirewallError::Flow(inner) => inner.into(),
            FirewallError::BandOverflow { .. } => Self::BandOverflow(e.to_string()),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}
