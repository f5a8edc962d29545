use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "netladder",
    about = "Compile zone flows and dispatch tables into packet-filter and routing policy",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Log level override (takes precedence over config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// JSON
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Display version and build information
    Version,

    /// Compile the configuration and write the result (default)
    Compile {
        /// Write here instead of `compiler.output_path`
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write Prometheus metrics in OpenMetrics text format
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },

    /// Compile the configuration without writing anything
    Check,

    /// Print the full compiled rule list of one zone
    Zone {
        /// Zone name
        name: String,
    },

    /// Print the compiled dispatch table of one edge
    Edge {
        /// Edge name
        name: String,
    },
}

impl Cli {
    /// The selected subcommand; `compile` with default outputs when none
    /// was given.
    pub fn command_or_default(&self) -> Command {
        self.command.clone().unwrap_or(Command::Compile {
            out: None,
            metrics_out: None,
        })
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_default_config_path() {
        let cli = Cli::try_parse_from(["netladder"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(cli.log_level.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_custom_config_path() {
        let cli = Cli::try_parse_from(["netladder", "check", "--config", "/tmp/test.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/tmp/test.yaml"));
        assert!(matches!(cli.command, Some(Command::Check)));
    }

    #[test]
    fn cli_log_overrides() {
        let cli =
            Cli::try_parse_from(["netladder", "--log-level", "debug", "--log-format", "text"])
                .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.log_format, Some(LogFormat::Text));
    }

    #[test]
    fn cli_compile_with_outputs() {
        let cli = Cli::try_parse_from([
            "netladder",
            "compile",
            "--out",
            "/tmp/out.json",
            "--metrics-out",
            "/tmp/metrics.txt",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Compile { out, metrics_out }) => {
                assert_eq!(out, Some(PathBuf::from("/tmp/out.json")));
                assert_eq!(metrics_out, Some(PathBuf::from("/tmp/metrics.txt")));
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn cli_zone_requires_name() {
        assert!(Cli::try_parse_from(["netladder", "zone"]).is_err());
        let cli = Cli::try_parse_from(["netladder", "--output", "json", "zone", "inner"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Some(Command::Zone { ref name }) if name == "inner"));
    }

    #[test]
    fn cli_no_subcommand_means_compile() {
        let cli = Cli::try_parse_from(["netladder", "-c", "/tmp/test.yaml"]).unwrap();
        assert_eq!(
            cli.command_or_default(),
            Command::Compile {
                out: None,
                metrics_out: None,
            }
        );
        assert_eq!(cli.output, OutputFormat::Table);
    }

    #[test]
    fn cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "netladder",
            "edge",
            "public",
            "--output",
            "json",
            "--log-level",
            "warn",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level, Some(LogLevel::Warn));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(
            cli.command_or_default(),
            Command::Edge {
                name: "public".to_string()
            }
        );
    }

    #[test]
    fn cli_edge_requires_name() {
        assert!(Cli::try_parse_from(["netladder", "edge"]).is_err());
    }

    #[test]
    fn cli_rejects_unknown_values() {
        assert!(Cli::try_parse_from(["netladder", "--output", "yaml"]).is_err());
        assert!(Cli::try_parse_from(["netladder", "--log-level", "loud"]).is_err());
        assert!(Cli::try_parse_from(["netladder", "deploy"]).is_err());
    }

    #[test]
    fn cli_version_subcommand() {
        let cli = Cli::try_parse_from(["netladder", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }
}
