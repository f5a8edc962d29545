use serde::{Deserialize, Serialize};

use crate::bridge::entity::{BridgeOutput, BridgeSpec};
use crate::common::entity::fingerprint;
use crate::dispatch::entity::{DispatchTable, DnsRecord, EdgeSpec};
use crate::firewall::entity::CompiledRuleSet;
use crate::flow::entity::FlowSpec;
use crate::zone::entity::Topology;

/// Every input of one compilation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub topology: Topology,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub bridges: Vec<BridgeSpec>,
}

/// Complete output of one compilation pass. Replaces whatever was applied
/// before it; there is no partial form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDeployment {
    pub rules: CompiledRuleSet,
    /// One table per edge, in declaration order.
    pub dispatch: Vec<DispatchTable>,
    pub bridges: Vec<BridgeOutput>,
    /// Sorted by name.
    pub dns_records: Vec<DnsRecord>,
}

impl CompiledDeployment {
    pub fn fingerprint(&self) -> String {
        fingerprint(self)
    }

    pub fn dispatch_table(&self, edge: &str) -> Option<&DispatchTable> {
        self.dispatch.iter().find(|t| t.edge == edge)
    }

    pub fn dispatch_rule_count(&self) -> usize {
        self.dispatch.iter().map(DispatchTable::rule_count).sum()
    }
}
