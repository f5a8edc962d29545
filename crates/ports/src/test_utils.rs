use std::sync::Mutex;

use domain::common::error::DomainError;
use domain::deployment::entity::CompiledDeployment;

use crate::secondary::metrics_port::{CompileMetrics, ConfigMetrics, HealthMetrics, RuleMetrics};
use crate::secondary::policy_sink::PolicySinkPort;

/// No-op implementation of all metrics sub-traits for use in tests.
///
/// All methods inherit the default no-op implementations from the sub-traits.
pub struct NoopMetrics;

impl CompileMetrics for NoopMetrics {}
impl RuleMetrics for NoopMetrics {}
impl HealthMetrics for NoopMetrics {}
impl ConfigMetrics for NoopMetrics {}

/// In-memory sink keeping the last deployment it was given.
///
/// Set `fail` to make every `replace_all` call return an error.
#[derive(Default)]
pub struct MemorySink {
    pub current: Mutex<Option<CompiledDeployment>>,
    pub writes: Mutex<usize>,
    pub fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn current(&self) -> Option<CompiledDeployment> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }
}

impl PolicySinkPort for MemorySink {
    fn replace_all(&self, deployment: &CompiledDeployment) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::Sink("memory sink set to fail".to_string()));
        }
        if let Ok(mut current) = self.current.lock() {
            *current = Some(deployment.clone());
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
