use std::collections::HashSet;

use crate::zone::entity::Topology;

use super::entity::{FlowSpec, Peer};
use super::error::FlowError;

/// Declared set of permitted directional flows.
///
/// Flows are kept in declaration order; [`FlowRegistry::sorted`] gives the
/// deterministic order the compiler numbers rules from.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: Vec<FlowSpec>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self { flows: Vec::new() }
    }

    /// Build a registry from a full flow list. Validates every flow and
    /// rejects duplicates rather than silently merging them.
    pub fn from_flows(flows: Vec<FlowSpec>) -> Result<Self, FlowError> {
        let mut registry = Self::new();
        registry.reload(flows)?;
        Ok(registry)
    }

    /// Add a flow. Validates the flow and rejects duplicates.
    pub fn register(&mut self, flow: FlowSpec) -> Result<(), FlowError> {
        flow.validate()?;
        if self.flows.iter().any(|f| f.key() == flow.key()) {
            return Err(FlowError::Duplicate {
                flow: flow.to_string(),
            });
        }
        self.flows.push(flow);
        Ok(())
    }

    /// Replace all flows atomically. Validates all flows before replacing.
    pub fn reload(&mut self, flows: Vec<FlowSpec>) -> Result<(), FlowError> {
        let mut seen = HashSet::new();
        for flow in &flows {
            flow.validate()?;
            if !seen.insert(flow.key()) {
                return Err(FlowError::Duplicate {
                    flow: flow.to_string(),
                });
            }
        }
        self.flows = flows;
        Ok(())
    }

    /// Check every flow against the topology: both ends must be defined
    /// zones (or INTERNET), and an internet-facing flow must land on a
    /// bridge zone.
    pub fn validate_against(&self, topology: &Topology) -> Result<(), FlowError> {
        for flow in &self.flows {
            for peer in [&flow.source, &flow.dest] {
                let Peer::Zone(name) = peer else {
                    continue;
                };
                let zone = topology.zone(name).ok_or_else(|| FlowError::UndefinedZone {
                    flow: flow.to_string(),
                    zone: name.clone(),
                })?;
                if flow.touches_internet() && !zone.is_bridge() {
                    return Err(FlowError::InternetExposure {
                        flow: flow.to_string(),
                        zone: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Flows sorted by source name, dest name, then port.
    pub fn sorted(&self) -> Vec<&FlowSpec> {
        let mut sorted: Vec<&FlowSpec> = self.flows.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        sorted
    }

    /// Flows in declaration order.
    pub fn flows(&self) -> &[FlowSpec] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
