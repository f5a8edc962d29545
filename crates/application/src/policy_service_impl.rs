use std::sync::Arc;
use std::time::Instant;

use domain::common::error::DomainError;
use domain::deployment::compiler::DeploymentCompiler;
use domain::deployment::entity::{CompiledDeployment, DeploymentSpec};
use domain::dispatch::entity::{DispatchRequest, Resolution};
use domain::dispatch::error::DispatchError;
use domain::dispatch::health::{HealthRegistry, TargetHealth};
use domain::firewall::entity::CompiledRule;
use domain::firewall::compiler::PacketFilterCompiler;
use domain::flow::registry::FlowRegistry;
use ports::secondary::metrics_port::MetricsPort;
use ports::secondary::policy_sink::PolicySinkPort;

/// Outcome of a successful `apply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new deployment was compiled and handed to the sink.
    Published,
    /// The compiled output matched the current one; the sink was not called.
    Unchanged,
}

/// Application-level policy service.
///
/// Recompiles the whole deployment on every `apply` and replaces the
/// previous one only when compilation and publication both succeed. Also
/// tracks target group health for the current dispatch tables.
pub struct PolicyAppService {
    sink: Arc<dyn PolicySinkPort>,
    metrics: Arc<dyn MetricsPort>,
    current: Option<CompiledDeployment>,
    fingerprint: Option<String>,
    health: HealthRegistry,
}

impl PolicyAppService {
    pub fn new(sink: Arc<dyn PolicySinkPort>, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            sink,
            metrics,
            current: None,
            fingerprint: None,
            health: HealthRegistry::new(),
        }
    }

    /// Compile `spec` and publish the result.
    ///
    /// On any error the previously applied deployment stays in place, both
    /// here and in the sink.
    pub fn apply(&mut self, spec: &DeploymentSpec) -> Result<ApplyOutcome, DomainError> {
        let started = Instant::now();
        let result = DeploymentCompiler::compile(spec);
        self.metrics
            .observe_compile_duration(started.elapsed().as_secs_f64());

        let compiled = match result {
            Ok(compiled) => compiled,
            Err(e) => {
                self.metrics.record_compilation("failure");
                self.metrics.record_compile_error(e.category());
                tracing::warn!(error = %e, category = e.category(), "policy compilation failed");
                return Err(e);
            }
        };
        self.metrics.record_compilation("success");

        let fingerprint = compiled.fingerprint();
        if self.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            tracing::debug!(%fingerprint, "compiled policy unchanged, skipping publish");
            return Ok(ApplyOutcome::Unchanged);
        }

        if let Err(e) = self.sink.replace_all(&compiled) {
            tracing::warn!(error = %e, sink = self.sink.name(), "failed to publish compiled policy");
            return Err(e);
        }

        tracing::info!(
            zones = compiled.rules.zone_count(),
            rules = compiled.rules.rule_count(),
            edges = compiled.dispatch.len(),
            dispatch_rules = compiled.dispatch_rule_count(),
            bridges = compiled.bridges.len(),
            dns_records = compiled.dns_records.len(),
            %fingerprint,
            sink = self.sink.name(),
            "compiled policy published"
        );

        self.health = Self::rebuild_health(&self.health, &compiled);
        self.current = Some(compiled);
        self.fingerprint = Some(fingerprint);
        self.update_metrics();
        Ok(ApplyOutcome::Published)
    }

    /// Recompute a single zone's full rule list without touching the
    /// applied deployment.
    pub fn compile_zone(
        &self,
        spec: &DeploymentSpec,
        zone: &str,
    ) -> Result<Vec<CompiledRule>, DomainError> {
        let flows = FlowRegistry::from_flows(spec.flows.clone())?;
        Ok(PacketFilterCompiler::compile_zone(
            &spec.topology,
            &flows,
            zone,
        )?)
    }

    /// The currently applied deployment, if any.
    pub fn current(&self) -> Option<&CompiledDeployment> {
        self.current.as_ref()
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Feed one health probe result for a target group.
    pub fn record_probe(&mut self, target_group: &str, healthy: bool) -> Result<(), DomainError> {
        let before = self.health.status(target_group);
        if healthy {
            self.health.record_success(target_group)?;
        } else {
            self.health.record_failure(target_group)?;
        }
        let after = self.health.status(target_group);
        if before != after
            && let Some(status) = after
        {
            tracing::info!(target_group, %status, "target group health changed");
        }
        self.metrics
            .set_target_group_health(target_group, after == Some(TargetHealth::Healthy));
        Ok(())
    }

    pub fn target_health(&self, target_group: &str) -> Option<TargetHealth> {
        self.health.status(target_group)
    }

    /// Resolve a request against the applied dispatch table of `edge`.
    ///
    /// A match on an unhealthy target group is reported as `Unavailable`.
    pub fn route(
        &self,
        edge: &str,
        request: &DispatchRequest,
    ) -> Result<Resolution<'_>, DomainError> {
        let table = self
            .current
            .as_ref()
            .and_then(|c| c.dispatch_table(edge))
            .ok_or_else(|| DomainError::UndefinedReference(format!("edge '{edge}'")))?;

        self.health.route(table, request).map_err(|e| {
            if matches!(e, DispatchError::TargetUnavailable { .. }) {
                self.metrics.record_target_unavailable(edge);
                tracing::warn!(error = %e, edge, "matched target group unavailable");
            }
            DomainError::from(e)
        })
    }

    /// Carry over the state of target groups that survive the reload and
    /// start tracking new ones. Groups no longer referenced are dropped.
    fn rebuild_health(previous: &HealthRegistry, compiled: &CompiledDeployment) -> HealthRegistry {
        let mut next = HealthRegistry::new();
        for table in &compiled.dispatch {
            next.track_from(table, previous);
        }
        next
    }

    fn update_metrics(&self) {
        let Some(ref compiled) = self.current else {
            return;
        };
        self.metrics.clear_rule_gauges();
        self.metrics.clear_target_group_health();
        for (zone, rules) in compiled.rules.iter() {
            self.metrics.set_zone_rules(zone, rules.len() as u64);
        }
        for table in &compiled.dispatch {
            self.metrics
                .set_dispatch_rules(&table.edge, table.rule_count() as u64);
            for tg in table.target_groups() {
                self.metrics.set_target_group_health(
                    &tg.name,
                    self.health.status(&tg.name) == Some(TargetHealth::Healthy),
                );
            }
        }
        self.metrics
            .set_dns_records(compiled.dns_records.len() as u64);
    }
}
