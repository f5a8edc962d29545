use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid flow {flow}: {reason}")]
    Invalid { flow: String, reason: String },

    #[error("duplicate flow: {flow}")]
    Duplicate { flow: String },

    #[error("flow {flow} references undefined zone '{zone}'")]
    UndefinedZone { flow: String, zone: String },

    #[error("flow {flow} exposes non-bridge zone '{zone}' to the internet")]
    InternetExposure { flow: String, zone: String },
}

impl From<FlowError> for DomainError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::UndefinedZone { .. } => Self::UndefinedReference(e.to_string()),
            FlowError::Duplicate { .. } => Self::Duplicate(e.to_string()),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}
