use domain::common::error::DomainError;
use domain::deployment::entity::CompiledDeployment;

/// Destination of compiled policy.
///
/// Receives a complete deployment and replaces everything it held before.
/// There is no incremental form: an implementation either stores the whole
/// deployment or fails and keeps the previous one. The trait is object-safe
/// for use behind `Arc<dyn PolicySinkPort>`.
pub trait PolicySinkPort: Send + Sync {
    /// Replace the stored policy with `deployment`.
    fn replace_all(&self, deployment: &CompiledDeployment) -> Result<(), DomainError>;

    /// Short label used in logs.
    fn name(&self) -> &str;
}
