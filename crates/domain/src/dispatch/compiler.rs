use std::collections::HashSet;

use crate::zone::entity::Topology;

use super::entity::{DispatchRule, DispatchTable, EdgeSpec, FallbackRule, TargetGroup};
use super::error::DispatchError;

/// Builds the ordered match table of one dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchCompiler;

impl DispatchCompiler {
    /// Compile an edge into a dispatch table.
    ///
    /// Entries keep their declared order: entry `i` gets priority `i + 1`
    /// and its own target group. The fallback is appended last. Every
    /// entry is checked before any rule is built.
    pub fn compile(edge: &EdgeSpec, topology: &Topology) -> Result<DispatchTable, DispatchError> {
        edge.validate()?;

        let mut seen = HashSet::new();
        for entry in &edge.entries {
            if !seen.insert(edge.match_kind.normalize_key(&entry.key)) {
                return Err(DispatchError::DuplicateKey {
                    edge: edge.name.clone(),
                    key: entry.key.clone(),
                });
            }
            entry.endpoint.validate(&edge.name)?;
            if topology.zone(&entry.endpoint.zone).is_none() {
                return Err(DispatchError::UndefinedZone {
                    edge: edge.name.clone(),
                    service: entry.endpoint.name.clone(),
                    zone: entry.endpoint.zone.clone(),
                });
            }
        }

        let rules = edge
            .entries
            .iter()
            .zip(1u32..)
            .map(|(entry, priority)| DispatchRule {
                priority,
                match_kind: edge.match_kind.clone(),
                match_value: entry.key.clone(),
                target: TargetGroup::for_endpoint(
                    TargetGroup::scoped_name(&edge.name, priority, &entry.endpoint.name),
                    &entry.endpoint,
                ),
            })
            .collect();

        Ok(DispatchTable {
            edge: edge.name.clone(),
            match_kind: edge.match_kind.clone(),
            listener_port: edge.listener_port,
            dispatcher_address: edge.dispatcher_address.clone(),
            certificate_ref: edge.certificate_ref.clone(),
            dns_zone_ref: edge.dns_zone_ref.clone(),
            rules,
            fallback: FallbackRule::default(),
        })
    }
}
