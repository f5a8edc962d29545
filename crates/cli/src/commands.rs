use std::path::Path;

use anyhow::{Result, bail};
use domain::common::entity::PortRange;
use domain::deployment::compiler::DeploymentCompiler;
use domain::deployment::entity::CompiledDeployment;
use domain::dispatch::compiler::DispatchCompiler;
use domain::firewall::entity::CompiledRule;

use crate::cli::OutputFormat;
use crate::startup::Context;

// ── Compile ─────────────────────────────────────────────────────────────

pub fn cmd_compile(
    ctx: &Context,
    out: Option<&Path>,
    metrics_out: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let mut service = ctx.policy_service(out);
    let result = service.apply(&ctx.spec);

    if let Some(path) = metrics_out {
        std::fs::write(path, ctx.metrics.encode())?;
    }

    let outcome = result?;
    let Some(compiled) = service.current() else {
        bail!("compilation produced no output");
    };
    print_summary(compiled, output)?;
    if output == OutputFormat::Table {
        println!("  Outcome:        {outcome:?}");
    }
    Ok(())
}

pub fn cmd_check(ctx: &Context, output: OutputFormat) -> Result<()> {
    let compiled = DeploymentCompiler::compile(&ctx.spec)?;
    print_summary(&compiled, output)
}

fn print_summary(compiled: &CompiledDeployment, output: OutputFormat) -> Result<()> {
    if output == OutputFormat::Json {
        let summary = serde_json::json!({
            "fingerprint": compiled.fingerprint(),
            "zones": compiled.rules.zone_count(),
            "rules": compiled.rules.rule_count(),
            "dispatch_rules": compiled.dispatch_rule_count(),
            "bridges": compiled.bridges.len(),
            "dns_records": compiled.dns_records,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Compiled policy");
    println!("  Fingerprint:    {}", compiled.fingerprint());
    println!("  Zones:          {}", compiled.rules.zone_count());
    println!("  Filter rules:   {}", compiled.rules.rule_count());
    println!("  Dispatch rules: {}", compiled.dispatch_rule_count());
    println!("  Bridges:        {}", compiled.bridges.len());
    for record in &compiled.dns_records {
        println!("  DNS:            {} -> {}", record.name, record.target);
    }
    Ok(())
}

// ── Zone ────────────────────────────────────────────────────────────────

pub fn cmd_zone(ctx: &Context, name: &str, output: OutputFormat) -> Result<()> {
    let rules = ctx.policy_service(None).compile_zone(&ctx.spec, name)?;

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    print_rules(&rules);
    Ok(())
}

fn print_rules(rules: &[CompiledRule]) {
    println!(
        "{:<8} {:>4}  {:<6} {:<6} {:<12} {:<18} {}",
        "DIR", "NUM", "ACTION", "PROTO", "PORTS", "PEER", "LABEL"
    );
    for r in rules {
        let ports = format_ports(r.port_range);
        println!(
            "{:<8} {:>4}  {:<6} {:<6} {:<12} {:<18} {}",
            r.direction.as_str(),
            r.rule_number,
            r.action.as_str(),
            r.protocol.to_string(),
            ports,
            r.peer_cidr.to_string(),
            r.label
        );
    }
}

fn format_ports(range: Option<PortRange>) -> String {
    range.map_or_else(|| "all".to_string(), |p| p.to_string())
}

// ── Edge ────────────────────────────────────────────────────────────────

pub fn cmd_edge(ctx: &Context, name: &str, output: OutputFormat) -> Result<()> {
    let Some(edge) = ctx.spec.edges.iter().find(|e| e.name == name) else {
        bail!("edge '{name}' is not defined");
    };
    let table = DispatchCompiler::compile(edge, &ctx.spec.topology)?;

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!(
        "{:>4}  {:<8} {:<32} {:<32} {}",
        "PRIO", "MATCH", "VALUE", "TARGET GROUP", "PORT"
    );
    for rule in &table.rules {
        println!(
            "{:>4}  {:<8} {:<32} {:<32} {}",
            rule.priority,
            rule.match_kind.as_str(),
            rule.match_value,
            rule.target.name,
            rule.target.port
        );
    }
    println!(
        "   -  fallback {} {}",
        table.fallback.response.status_code,
        table.fallback.response.body.trim_end()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use infrastructure::config::CompilerConfig;
    use infrastructure::metrics::CompilerMetrics;

    use super::*;

    const CONFIG: &str = r#"
topology:
  network_cidr: 10.255.0.0/20
  zones:
    - { name: public, cidr: 10.255.0.0/28, tier: public }
    - { name: private, cidr: 10.255.1.0/24, tier: private }
flows:
  - { from: public, to: private, port: 3000 }
edges:
  - name: public
    dispatcher_address: 10.255.0.10
    dns_zone_ref: example.com
    services:
      - { key: c.example.com, service: c, zone: private, port: 3000 }
"#;

    fn context() -> Context {
        let config = CompilerConfig::from_yaml(CONFIG).unwrap();
        Context::from_config(config, Arc::new(CompilerMetrics::new())).unwrap()
    }

    #[test]
    fn edge_unknown_name_fails() {
        let err = cmd_edge(&context(), "missing", OutputFormat::Table).unwrap_err();
        assert_eq!(err.to_string(), "edge 'missing' is not defined");
    }

    #[test]
    fn edge_known_name_prints_table() {
        assert!(cmd_edge(&context(), "public", OutputFormat::Json).is_ok());
        assert!(cmd_edge(&context(), "public", OutputFormat::Table).is_ok());
    }

    #[test]
    fn zone_unknown_name_fails() {
        assert!(cmd_zone(&context(), "db", OutputFormat::Table).is_err());
        assert!(cmd_zone(&context(), "private", OutputFormat::Table).is_ok());
    }

    #[test]
    fn check_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context();
        ctx.config.compiler.output_path = dir.path().join("compiled.json");
        cmd_check(&ctx, OutputFormat::Json).unwrap();
        assert!(!ctx.config.compiler.output_path.exists());
    }

    #[test]
    fn compile_writes_output_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("compiled.json");
        let metrics = dir.path().join("metrics.txt");
        cmd_compile(&context(), Some(&out), Some(&metrics), OutputFormat::Table).unwrap();

        let written: CompiledDeployment =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written.dispatch_rule_count(), 1);
        let text = std::fs::read_to_string(&metrics).unwrap();
        assert!(text.contains("netladder_compilations"));
    }

    #[test]
    fn format_ports_shows_all_for_deny_rules() {
        assert_eq!(format_ports(None), "all");
        assert_eq!(format_ports(Some(PortRange::EPHEMERAL)), "1024-65535");
    }
}

