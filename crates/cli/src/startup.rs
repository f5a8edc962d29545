use std::sync::Arc;

use anyhow::Context as _;
use application::policy_service_impl::PolicyAppService;
use domain::deployment::entity::DeploymentSpec;
use infrastructure::config::CompilerConfig;
use infrastructure::logging::init_logging;
use infrastructure::metrics::CompilerMetrics;
use infrastructure::output::JsonFileSink;
use ports::secondary::metrics_port::ConfigMetrics;
use tracing::info;

use crate::cli::Cli;

/// Everything a command needs after startup.
pub struct Context {
    pub config: CompilerConfig,
    pub spec: DeploymentSpec,
    pub metrics: Arc<CompilerMetrics>,
}

impl Context {
    /// Convert a loaded configuration into compiler inputs.
    pub fn from_config(
        config: CompilerConfig,
        metrics: Arc<CompilerMetrics>,
    ) -> anyhow::Result<Self> {
        let spec = config
            .to_deployment_spec()
            .context("configuration does not describe a valid deployment")?;
        Ok(Self {
            config,
            spec,
            metrics,
        })
    }

    /// Policy service publishing to a JSON file at `out`, or to the
    /// configured output path.
    pub fn policy_service(&self, out: Option<&std::path::Path>) -> PolicyAppService {
        let path = out.map_or_else(|| self.config.compiler.output_path.clone(), Into::into);
        PolicyAppService::new(Arc::new(JsonFileSink::new(path)), self.metrics.clone())
    }
}

/// Load config, initialize logging and convert the inputs.
pub fn init(cli: &Cli) -> anyhow::Result<Context> {
    let metrics = Arc::new(CompilerMetrics::new());

    // ── 1. Load config ──────────────────────────────────────────────
    let config = match CompilerConfig::load(&cli.config) {
        Ok(config) => {
            metrics.record_config_reload("success");
            config
        }
        Err(e) => {
            metrics.record_config_reload("failure");
            return Err(e)
                .with_context(|| format!("failed to load {}", cli.config.display()));
        }
    };

    // ── 2. Initialize logging ───────────────────────────────────────
    // CLI flags take precedence over config file
    let log_level = cli.log_level.unwrap_or(config.compiler.log_level);
    let log_format = cli.log_format.unwrap_or(config.compiler.log_format);
    init_logging(log_level, log_format)?;

    info!(
        config_path = %cli.config.display(),
        log_level = log_level.as_str(),
        log_format = log_format.as_str(),
        zones = config.topology.zones.len(),
        flows = config.flows.len(),
        edges = config.edges.len(),
        bridges = config.bridges.len(),
        "netladder starting"
    );

    // ── 3. Convert inputs ───────────────────────────────────────────
    Context::from_config(config, metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn init_reports_missing_config_file() {
        let cli = Cli::try_parse_from(["netladder", "--config", "/nonexistent/netladder.yaml"])
            .unwrap();
        let err = init(&cli).err().unwrap();
        assert!(format!("{err:#}").contains("failed to load /nonexistent/netladder.yaml"));
    }

    #[test]
    fn from_config_converts_every_section() {
        let config = CompilerConfig::from_yaml(
            "topology:\n  zones:\n    - { name: edge, cidr: 10.0.0.0/24, tier: public }\nflows:\n  - { from: edge, to: edge, port: 3000 }\n",
        )
        .unwrap();
        let ctx = Context::from_config(config, Arc::new(CompilerMetrics::new())).unwrap();
        assert_eq!(ctx.spec.topology.zones.len(), 1);
        assert_eq!(ctx.spec.flows.len(), 1);
        assert!(ctx.spec.edges.is_empty());
    }
}
