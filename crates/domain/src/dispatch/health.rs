use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::entity::{DispatchRequest, DispatchTable, HealthCheckPolicy, Resolution};
use super::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetHealth {
    Healthy,
    Unhealthy,
}

impl TargetHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for TargetHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime health of one target group, driven by probe results.
#[derive(Debug, Clone)]
pub struct TargetGroupState {
    pub policy: HealthCheckPolicy,
    pub status: TargetHealth,
    pub failure_count: u32,
    pub success_count: u32,
}

impl TargetGroupState {
    pub fn new(policy: HealthCheckPolicy) -> Self {
        Self {
            policy,
            status: TargetHealth::Healthy,
            failure_count: 0,
            success_count: 0,
        }
    }

    /// Record a successful health probe.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        self.success_count = self.success_count.saturating_add(1);
        if self.status == TargetHealth::Unhealthy
            && self.success_count >= self.policy.healthy_threshold
        {
            self.status = TargetHealth::Healthy;
            self.success_count = 0;
        }
    }

    /// Record a failed health probe.
    pub fn record_failure(&mut self) {
        self.success_count = 0;
        self.failure_count = self.failure_count.saturating_add(1);
        if self.failure_count >= self.policy.unhealthy_threshold {
            self.status = TargetHealth::Unhealthy;
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == TargetHealth::Healthy
    }
}

/// Health of every target group of a set of dispatch tables.
///
/// Health is observed, never acted on: a request matching an unhealthy
/// group is reported as unavailable rather than retried elsewhere.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    states: HashMap<String, TargetGroupState>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry tracking every target group of `table`.
    pub fn for_table(table: &DispatchTable) -> Self {
        let mut registry = Self::new();
        registry.track(table);
        registry
    }

    /// Start tracking the target groups of `table`. Groups already tracked
    /// keep their state.
    pub fn track(&mut self, table: &DispatchTable) {
        for tg in table.target_groups() {
            self.states
                .entry(tg.name.clone())
                .or_insert_with(|| TargetGroupState::new(tg.health_check.clone()));
        }
    }

    /// Track the target groups of `table`, taking each group's state from
    /// `previous` when it is known there. The policy always comes from the
    /// table.
    pub fn track_from(&mut self, table: &DispatchTable, previous: &HealthRegistry) {
        for tg in table.target_groups() {
            let state = match previous.states.get(&tg.name) {
                Some(old) => TargetGroupState {
                    policy: tg.health_check.clone(),
                    ..old.clone()
                },
                None => TargetGroupState::new(tg.health_check.clone()),
            };
            self.states.entry(tg.name.clone()).or_insert(state);
        }
    }

    pub fn record_success(&mut self, target_group: &str) -> Result<(), DispatchError> {
        self.state_mut(target_group)?.record_success();
        Ok(())
    }

    pub fn record_failure(&mut self, target_group: &str) -> Result<(), DispatchError> {
        self.state_mut(target_group)?.record_failure();
        Ok(())
    }

    pub fn status(&self, target_group: &str) -> Option<TargetHealth> {
        self.states.get(target_group).map(|s| s.status)
    }

    /// Resolve a request, failing if the matched group is unhealthy or not
    /// tracked. Fallback responses are always available.
    pub fn route<'a>(
        &self,
        table: &'a DispatchTable,
        request: &DispatchRequest,
    ) -> Result<Resolution<'a>, DispatchError> {
        let resolution = table.resolve(request);
        if let Resolution::Forward { priority, target } = resolution
            && !self.states.get(&target.name).is_some_and(TargetGroupState::is_healthy)
        {
            return Err(DispatchError::TargetUnavailable {
                edge: table.edge.clone(),
                priority,
                target: target.name.clone(),
            });
        }
        Ok(resolution)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn state_mut(&mut self, target_group: &str) -> Result<&mut TargetGroupState, DispatchError> {
        self.states
            .get_mut(target_group)
            .ok_or_else(|| DispatchError::TargetGroupNotFound {
                name: target_group.to_string(),
            })
    }
}
