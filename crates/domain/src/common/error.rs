use thiserror::Error;

/// Cross-module compile error.
///
/// Every variant carries the rendered module error, which names the
/// offending zone, flow, edge or bridge.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("undefined reference: {0}")]
    UndefinedReference(String),

    #[error("duplicate definition: {0}")]
    Duplicate(String),

    #[error("rule band overflow: {0}")]
    BandOverflow(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("composition error: {0}")]
    Composition(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("policy sink error: {0}")]
    Sink(String),
}

impl DomainError {
    /// Short label used for metrics and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UndefinedReference(_) => "undefined_reference",
            Self::Duplicate(_) => "duplicate",
            Self::BandOverflow(_) => "band_overflow",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Composition(_) => "composition",
            Self::Unavailable(_) => "unavailable",
            Self::Sink(_) => "sink",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_category_and_detail() {
        let e = DomainError::UndefinedReference("zone 'db'".to_string());
        assert_eq!(e.to_string(), "undefined reference: zone 'db'");
        assert_eq!(e.category(), "undefined_reference");
    }
}
