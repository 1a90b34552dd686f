//! lakeplan - lakehouse schema and workload optimization planner
//!
//! CLI entry point: serve the HTTP API, plan one request offline, or check a
//! connection URL.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use lakeplan::cli::{Cli, Command, OutputFormat, get_log_path};
use lakeplan::config::Config;
use lakeplan::domain::PlanningRequest;
use lakeplan::http;
use lakeplan::planner::PlanningService;
use lakeplan::warehouse::ConnectionDescriptor;

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>, to_file: bool) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if to_file {
        let log_path = get_log_path();
        if let Some(log_dir) = log_path.parent() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is loaded before logging so its log-level can apply
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(
        cli.log_level.as_deref(),
        config.log_level.as_deref(),
        cli.command.logs_to_file(),
    )
    .context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Serve { bind } => {
            eprintln!("Logs are written to: {}", get_log_path().display());
            http::serve(Arc::new(config), bind).await
        }
        Command::Plan {
            request,
            no_advisor,
            pretty,
        } => cmd_plan(&config, &request, !no_advisor, pretty).await,
        Command::CheckUrl { url, format } => cmd_check_url(&url, format),
    }
}

fn read_request(path: &Path) -> Result<PlanningRequest> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        buf
    } else {
        fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).context("Invalid planning request JSON")
}

async fn cmd_plan(config: &Config, request_path: &Path, use_advisor: bool, pretty: bool) -> Result<()> {
    debug!(path = %request_path.display(), use_advisor, "cmd_plan: called");
    let request = read_request(request_path)?;
    let service = PlanningService::from_config(config, use_advisor)?;
    let analysis = service.analyze(&request).await?;

    let json = if pretty {
        serde_json::to_string_pretty(&analysis.plan)?
    } else {
        serde_json::to_string(&analysis.plan)?
    };
    println!("{}", json);

    let source = if analysis.adopted {
        "advisor".green()
    } else {
        "deterministic".yellow()
    };
    eprintln!(
        "{} {}.{} ({} plan, workload baseline {})",
        "Planned".bold(),
        analysis.target.catalog,
        analysis.target.schema,
        source,
        analysis.baseline
    );
    Ok(())
}

fn cmd_check_url(url: &str, format: OutputFormat) -> Result<()> {
    debug!("cmd_check_url: called");
    let descriptor = ConnectionDescriptor::parse(url).context("Connection URL rejected")?;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "host": descriptor.host,
                "port": descriptor.port,
                "catalog": descriptor.catalog,
                "schema": descriptor.schema,
                "user": descriptor.user,
                "password": descriptor.password.as_ref().map(|_| "***"),
                "tls": descriptor.tls,
                "session_properties": descriptor.session_properties,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Coordinator:".bold(), descriptor.base_url());
            println!("{} {}", "User:".bold(), descriptor.user);
            println!("{} {}", "Catalog:".bold(), descriptor.catalog.as_deref().unwrap_or("-"));
            println!("{} {}", "Schema:".bold(), descriptor.schema.as_deref().unwrap_or("-"));
            for (key, value) in &descriptor.session_properties {
                println!("{} {}={}", "Session:".bold(), key, value);
            }
        }
    }
    Ok(())
}
