//! CLI module for the ATLAS metrics client
//!
//! Subcommands:
//! - `facilities`: list accessible facilities
//! - `devices`: list devices per facility and kind
//! - `metrics`: read device metric time series
//! - `rates`: read hourly energy rates

pub mod devices;
pub mod facilities;
pub mod metrics;
pub mod rates;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::AtlasConfig;
use crate::domain::{parse_datetime, DomainError};
use crate::infrastructure::atlas::{AtlasClient, HttpClient};
use crate::infrastructure::logging;

/// Atlas metrics - read metric point values and energy rates from ATLAS
#[derive(Debug, Parser)]
#[command(name = "atlas-metrics")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file, layered over ~/.config/atlas/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Refresh token, overrides ATLAS_REFRESH_TOKEN and the config file
    #[arg(long, global = true)]
    pub refresh_token: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print the output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List facilities the user has access to
    Facilities,

    /// List devices for every facility, grouped by kind
    Devices,

    /// Read device metrics for facilities
    Metrics(metrics::MetricsArgs),

    /// Read hourly energy rates for facilities
    Rates(rates::RatesArgs),
}

/// A command whose arguments have been validated
#[derive(Debug)]
pub enum Request {
    Facilities,
    Devices,
    Metrics(metrics::MetricsRequest),
    Rates(rates::RatesRequest),
}

impl Command {
    /// Validate arguments before any request is sent
    pub fn prepare(&self) -> Result<Request, DomainError> {
        Ok(match self {
            Command::Facilities => Request::Facilities,
            Command::Devices => Request::Devices,
            Command::Metrics(args) => Request::Metrics(args.prepare()?),
            Command::Rates(args) => Request::Rates(args.prepare()?),
        })
    }
}

/// Load configuration, set up logging and run the selected command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AtlasConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging, cli.debug);

    let request = cli.command.prepare()?;
    let client = AtlasClient::from_config(&config, cli.refresh_token.as_deref()).await?;

    let output = match request {
        Request::Facilities => facilities::run(&client, cli.json).await?,
        Request::Devices => devices::run(&client, cli.json).await?,
        Request::Metrics(request) => metrics::run(client, request, cli.json).await?,
        Request::Rates(request) => rates::run(client, request, cli.json).await?,
    };

    print!("{}", output);
    Ok(())
}

/// Shared connected client type used by the commands
pub type Client = AtlasClient<HttpClient>;

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

type Range = (Option<DateTime<Utc>>, Option<DateTime<Utc>>);

fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<Range, DomainError> {
    let start = start.map(parse_datetime).transpose()?;
    let end = end.map(parse_datetime).transpose()?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(DomainError::validation("--start must not be after --end"));
        }
    }
    Ok((start, end))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
