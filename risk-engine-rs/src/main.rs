//! risk-assess
//!
//! Command-line front end for the risk engine.
//!
//! Usage:
//!   risk-assess assess [request.json]   (reads stdin when no file is given)
//!   risk-assess health
//!   risk-assess schema
//!
//! Settings come from an optional TOML file (`--config`) overlaid with
//! `RISK_ENGINE_*` environment variables. A `.env` file is honoured.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use risk_engine::config::{EnvConfigProvider, DEFAULT_PROVIDER};
use risk_engine::telemetry::{self, LoggingConfig};
use risk_engine::validation;
use risk_engine::{AssessmentRequest, EngineConfig, RiskEngine};

#[derive(Parser)]
#[command(name = "risk-assess")]
#[command(version)]
#[command(about = "Score patient deterioration risk from vital signs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Assess one request: {"vitals": {...}, "context": {...}}
    Assess {
        /// Request file; '-' or nothing reads stdin
        input: Option<PathBuf>,
    },

    /// Probe the probability model with a reference patient
    Health,

    /// Print the feature format the model expects
    Schema,
}

fn load_config(path: Option<&Path>, env: &EnvConfigProvider) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config
        .apply_overrides(env)
        .context("invalid RISK_ENGINE_* environment override")?;
    config.validate()?;
    Ok(config)
}

fn read_request(input: Option<&Path>) -> Result<String> {
    let raw = match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read request from stdin")?;
            buffer
        }
    };
    Ok(raw)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let env: &EnvConfigProvider = &DEFAULT_PROVIDER;
    let mut logging = LoggingConfig::from_provider(env);
    if cli.json_logs {
        logging.json_format = true;
    }
    telemetry::init_logging(&logging)?;
    telemetry::describe_metrics();

    let config = load_config(cli.config.as_deref(), env)?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Assess { input } => {
            let raw = read_request(input.as_deref())?;
            let request: AssessmentRequest = match serde_json::from_str(&raw) {
                Ok(request) => request,
                // Well-formed JSON with bad values, e.g. an unknown arrival mode
                Err(e) if e.is_data() => {
                    eprintln!("invalid input: {}", e);
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e).context("request is not valid JSON"),
            };
            let engine = RiskEngine::builder().config(config).build()?;

            match engine.assess(&request.vitals, &request.context).await {
                Ok(assessment) => {
                    println!("{}", serde_json::to_string_pretty(&assessment)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("invalid input: {}", e);
                    Ok(ExitCode::from(2))
                }
            }
        }
        Command::Health => {
            let engine = RiskEngine::builder().config(config).build()?;
            let report = engine.check_model_health().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(if report.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&validation::feature_schema())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
