//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// lakeplan - lakehouse schema and workload optimization planner
#[derive(Parser)]
#[command(
    name = "lp",
    about = "Plan optimized Iceberg schemas, migrations and rewritten queries for a SQL workload",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP planning service
    Serve {
        /// Listen address, overrides server.bind
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Plan one request offline and print the plan JSON
    Plan {
        /// Planning request JSON file (`-` for stdin)
        #[arg(short, long, value_name = "FILE")]
        request: PathBuf,

        /// Skip the LLM advisor and return the deterministic plan
        #[arg(long)]
        no_advisor: bool,

        /// Pretty-print the plan
        #[arg(short, long)]
        pretty: bool,
    },

    /// Parse a connection URL and show what it resolves to
    CheckUrl {
        /// JDBC-style connection URL
        url: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

impl Command {
    /// Long-running commands log to a file, one-shot commands to stderr
    pub fn logs_to_file(&self) -> bool {
        matches!(self, Command::Serve { .. })
    }
}

/// Location of the service log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lakeplan")
        .join("logs")
        .join("lakeplan.log")
}

/// Output format for `check-url`
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_command() {
        let cli = Cli::try_parse_from(["lp", "-l", "debug", "plan", "--request", "req.json", "--no-advisor"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Plan {
                request,
                no_advisor,
                pretty,
            } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert!(no_advisor);
                assert!(!pretty);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_serve_logs_to_file() {
        let cli = Cli::try_parse_from(["lp", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        assert!(cli.command.logs_to_file());
        let cli = Cli::try_parse_from(["lp", "check-url", "jdbc://h/c?user=u", "--format", "json"]).unwrap();
        assert!(!cli.command.logs_to_file());
    }

    #[test]
    fn test_output_format_parse() {
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
