use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid edge '{edge}': {reason}")]
    InvalidEdge { edge: String, reason: String },

    #[error("invalid service '{service}' on edge '{edge}': {reason}")]
    InvalidEndpoint {
        edge: String,
        service: String,
        reason: String,
    },

    #[error("edge '{edge}' declares match key '{key}' more than once")]
    DuplicateKey { edge: String, key: String },

    #[error("service '{service}' on edge '{edge}' references undefined zone '{zone}'")]
    UndefinedZone {
        edge: String,
        service: String,
        zone: String,
    },

    #[error("target group not found: {name}")]
    TargetGroupNotFound { name: String },

    #[error("edge '{edge}' matched priority {priority} but target group '{target}' is unavailable")]
    TargetUnavailable {
        edge: String,
        priority: u32,
        target: String,
    },
}

impl From<DispatchError> for DomainError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::DuplicateKey { .. } => Self::Duplicate(e.to_string()),
            DispatchError::UndefinedZone { .. } | DispatchError::TargetGroupNotFound { .. } => {
                Self::UndefinedReference(e.to_string())
            }
            DispatchError::TargetUnavailable { .. } => Self::Unavailable(e.to_string()),
            other => Self::InvalidConfig(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_to_domain_error() {
        let e: DomainError = DispatchError::DuplicateKey {
            edge: "public".to_string(),
            key: "svc-a".to_string(),
        }
        .into();
        assert!(matches!(e, DomainError::Duplicate(_)));
        assert!(e.to_string().contains("'svc-a'"));
    }

    #[test]
    fn undefined_zone_to_domain_error() {
        let e: DomainError = DispatchError::UndefinedZone {
            edge: "public".to_string(),
            service: "svc-a".to_string(),
            zone: "db".to_string(),
        }
        .into();
        assert!(matches!(e, DomainError::UndefinedReference(_)));
    }

    #[test]
    fn unavailable_is_reported_upward() {
        let e: DomainError = DispatchError::TargetUnavailable {
            edge: "public".to_string(),
            priority: 1,
            target: "public/1/svc-a".to_string(),
        }
        .into();
        assert!(matches!(e, DomainError::Unavailable(_)));
    }
}
