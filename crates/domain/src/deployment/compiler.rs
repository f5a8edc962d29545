use std::collections::HashSet;

use crate::bridge::adapter::BridgeAdapter;
use crate::common::error::DomainError;
use crate::dispatch::compiler::DispatchCompiler;
use crate::firewall::compiler::PacketFilterCompiler;
use crate::flow::registry::FlowRegistry;

use super::entity::{CompiledDeployment, DeploymentSpec};

/// Runs every compiler over one deployment and assembles the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentCompiler;

impl DeploymentCompiler {
    /// Compile packet filters, every edge and every bridge. The first error
    /// aborts the pass and nothing is returned.
    pub fn compile(spec: &DeploymentSpec) -> Result<CompiledDeployment, DomainError> {
        check_unique("edge", spec.edges.iter().map(|e| e.name.as_str()))?;
        check_unique("bridge", spec.bridges.iter().map(|b| b.name.as_str()))?;

        let flows = FlowRegistry::from_flows(spec.flows.clone())?;
        let rules = PacketFilterCompiler::compile(&spec.topology, &flows)?;

        let dispatch = spec
            .edges
            .iter()
            .map(|edge| DispatchCompiler::compile(edge, &spec.topology))
            .collect::<Result<Vec<_>, _>>()?;

        let mut bridges = Vec::with_capacity(spec.bridges.len());
        for bridge in &spec.bridges {
            let table = dispatch
                .iter()
                .find(|t| t.edge == bridge.edge)
                .ok_or_else(|| {
                    DomainError::UndefinedReference(format!(
                        "bridge '{}' references undefined edge '{}'",
                        bridge.name, bridge.edge
                    ))
                })?;
            bridges.push(BridgeAdapter::compose(bridge, &spec.topology, &rules, table)?);
        }

        let mut dns_records: Vec<_> = dispatch
            .iter()
            .flat_map(|t| t.dns_records())
            .chain(bridges.iter().map(|b| b.dns_record.clone()))
            .collect();
        dns_records.sort();
        check_unique("dns record", dns_records.iter().map(|r| r.name.as_str()))?;

        Ok(CompiledDeployment {
            rules,
            dispatch,
            bridges,
            dns_records,
        })
    }
}

fn check_unique<'a>(
    kind: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(DomainError::Duplicate(format!("{kind} '{name}'")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::entity::BridgeSpec;
    use crate::deployment::posture;
    use crate::dispatch::entity::{EdgeSpec, MatchKind, ServiceEndpoint};
    use crate::firewall::entity::Direction;
    use crate::flow::entity::{FlowSpec, Peer};

    fn spec() -> DeploymentSpec {
        posture::public_private("example.com", &["c", "d"])
    }

    #[test]
    fn compiles_rules_tables_and_dns() {
        let out = DeploymentCompiler::compile(&spec()).unwrap();
        assert_eq!(out.rules.zone_count(), 2);
        assert_eq!(out.dispatch.len(), 1);
        assert_eq!(out.dispatch_rule_count(), 2);
        let names: Vec<&str> = out.dns_records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["c.example.com", "d.example.com"]);
        assert!(out.bridges.is_empty());
    }

    #[test]
    fn fingerprint_is_reproducible() {
        let a = DeploymentCompiler::compile(&spec()).unwrap();
        let mut shuffled = spec();
        shuffled.flows.reverse();
        let b = DeploymentCompiler::compile(&shuffled).unwrap();
        assert_eq!(a.rules, b.rules);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn duplicate_edge_names_rejected() {
        let mut spec = spec();
        let copy = spec.edges[0].clone();
        spec.edges.push(copy);
        assert!(matches!(
            DeploymentCompiler::compile(&spec),
            Err(DomainError::Duplicate(_))
        ));
    }

    #[test]
    fn conflicting_dns_names_rejected() {
        let mut spec = spec();
        let mut other = spec.edges[0].clone();
        other.name = "second".to_string();
        spec.edges.push(other);
        let err = DeploymentCompiler::compile(&spec).unwrap_err();
        assert!(err.to_string().contains("dns record"));
    }

    #[test]
    fn any_failing_edge_aborts_whole_pass() {
        let mut spec = spec();
        spec.edges.push(
            EdgeSpec::new("broken", MatchKind::Host, "10.255.0.5", 443)
                .with_entry("x.example.com", ServiceEndpoint::new("x", "nowhere", 3000)),
        );
        assert!(matches!(
            DeploymentCompiler::compile(&spec),
            Err(DomainError::UndefinedReference(_))
        ));
    }

    #[test]
    fn flow_errors_propagate() {
        let mut spec = spec();
        spec.flows.push(FlowSpec::tcp(Peer::Internet, Peer::zone("private"), 3000));
        assert!(DeploymentCompiler::compile(&spec).is_err());
    }

    #[test]
    fn bridge_with_unknown_edge_rejected() {
        let mut spec = posture::isolated_only("gateway.example.com", "gw.example.net", &["g", "h"]);
        spec.bridges[0].edge = "missing".to_string();
        assert!(matches!(
            DeploymentCompiler::compile(&spec),
            Err(DomainError::UndefinedReference(_))
        ));
    }

    #[test]
    fn isolated_only_compiles_bridge() {
        let spec = posture::isolated_only("gateway.example.com", "gw.example.net", &["g", "h"]);
        let out = DeploymentCompiler::compile(&spec).unwrap();
        assert_eq!(out.bridges.len(), 1);
        let bridge = &out.bridges[0];
        assert_eq!(bridge.link_rule.port, 80);
        assert_eq!(out.dns_records.len(), 1);
        assert_eq!(out.dns_records[0].name, "gateway.example.com");
        // No zone in this posture may see the internet.
        for (_, rules) in out.rules.iter() {
            assert!(rules.iter().all(|r| !r.has_wildcard_peer()));
        }
        assert!(out.rules.rules_for("isolated", Direction::Ingress).count() >= 3);
    }

    #[test]
    fn duplicate_bridge_names_rejected() {
        let mut spec = posture::isolated_only("gateway.example.com", "gw.example.net", &["g"]);
        let copy: BridgeSpec = spec.bridges[0].clone();
        spec.bridges.push(copy);
        assert!(matches!(
            DeploymentCompiler::compile(&spec),
            Err(DomainError::Duplicate(_))
        ));
    }
}
