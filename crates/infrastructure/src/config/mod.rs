//! Compiler configuration: structs, parsing, and validation.
//!
//! The config module is split across several sub-modules:
//! - `common`: shared helpers and `ConfigError`
//! - `zone`, `flow`, `dispatch`, `bridge`: one per input section

mod bridge;
mod common;
mod dispatch;
mod flow;
mod zone;

// ── Public re-exports ─────────────────────────────────────────────

pub use bridge::BridgeConfig;
pub use common::{ConfigError, parse_cidr, parse_port_range};
pub use dispatch::{EdgeConfig, ServiceEntryConfig};
pub use flow::{FlowEntryConfig, PortRangeConfig};
pub use zone::{TopologyConfig, ZoneEntryConfig};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use domain::deployment::entity::DeploymentSpec;
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_OUTPUT_PATH;
use common::{MAX_BRIDGES, MAX_EDGES, MAX_FLOWS, check_limit, warn_if_world_readable};

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub compiler: CompilerInfo,

    pub topology: TopologyConfig,

    #[serde(default)]
    pub flows: Vec<FlowEntryConfig>,

    #[serde(default)]
    pub edges: Vec<EdgeConfig>,

    #[serde(default)]
    pub bridges: Vec<BridgeConfig>,
}

impl CompilerConfig {
    /// Load config from a YAML file.
    ///
    /// On Unix, logs a warning if the config file is world-readable.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        warn_if_world_readable(path, "config file");
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config after deserialization.
    ///
    /// Only checks what can be checked per section. Cross references
    /// (flow zones, service zones, bridge edges) are the compiler's job.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // ── Security: enforce count limits ───────────────────────
        check_limit("flows", self.flows.len(), MAX_FLOWS)?;
        check_limit("edges", self.edges.len(), MAX_EDGES)?;
        check_limit("bridges", self.bridges.len(), MAX_BRIDGES)?;

        self.topology.validate()?;

        for (idx, flow) in self.flows.iter().enumerate() {
            flow.validate(idx)?;
        }

        let mut edge_names = HashSet::new();
        for (idx, edge) in self.edges.iter().enumerate() {
            edge.validate(idx)?;
            if !edge_names.insert(edge.name.to_lowercase()) {
                return Err(ConfigError::Validation {
                    field: format!("edges[{idx}].name"),
                    message: format!("duplicate edge name: {}", edge.name),
                });
            }
        }

        let mut bridge_names = HashSet::new();
        for (idx, bridge) in self.bridges.iter().enumerate() {
            bridge.validate(idx)?;
            if !bridge_names.insert(bridge.name.to_lowercase()) {
                return Err(ConfigError::Validation {
                    field: format!("bridges[{idx}].name"),
                    message: format!("duplicate bridge name: {}", bridge.name),
                });
            }
        }

        if self.compiler.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                field: "compiler.output_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Convert every input section into one domain `DeploymentSpec`.
    pub fn to_deployment_spec(&self) -> Result<DeploymentSpec, ConfigError> {
        Ok(DeploymentSpec {
            topology: self.topology.to_domain_topology()?,
            flows: self
                .flows
                .iter()
                .map(FlowEntryConfig::to_domain_flow)
                .collect::<Result<Vec<_>, _>>()?,
            edges: self
                .edges
                .iter()
                .map(EdgeConfig::to_domain_edge)
                .collect::<Result<Vec<_>, _>>()?,
            bridges: self
                .bridges
                .iter()
                .map(BridgeConfig::to_domain_bridge)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}

// ── Compiler settings ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerInfo {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Where the compiled deployment is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for CompilerInfo {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            output_path: default_output_path(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_log_format() -> LogFormat {
    LogFormat::Json
}
fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}
