//! `rates` command

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;

use super::{capitalize, parse_range, to_json, Client};
use crate::domain::{DomainError, HourlyRates, RatesFilter};
use crate::infrastructure::services::RatesReader;

#[derive(Debug, Args)]
pub struct RatesArgs {
    /// Facility short names, all facilities when omitted
    pub facilities: Vec<String>,

    /// Start of the range, defaults to 24 hours before the end
    #[arg(long)]
    pub start: Option<String>,

    /// End of the range, defaults to now
    #[arg(long)]
    pub end: Option<String>,
}

/// Validated `rates` arguments
#[derive(Debug)]
pub struct RatesRequest {
    pub filter: RatesFilter,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RatesArgs {
    pub fn prepare(&self) -> Result<RatesRequest, DomainError> {
        let (start, end) = parse_range(self.start.as_deref(), self.end.as_deref())?;
        Ok(RatesRequest {
            filter: RatesFilter::new(self.facilities.clone()),
            start,
            end,
        })
    }
}

pub async fn run(client: Client, request: RatesRequest, json: bool) -> anyhow::Result<String> {
    let rates = RatesReader::new(Arc::new(client))
        .read(&request.filter, request.start, request.end)
        .await?;

    if json {
        return to_json(&rates);
    }
    Ok(render(&rates))
}

fn render(rates: &BTreeMap<String, HourlyRates>) -> String {
    let mut out = String::new();
    for (facility, hourly) in rates {
        let _ = writeln!(out, "{}", capitalize(facility));
        for (name, series) in hourly.series() {
            if series.is_empty() {
                continue;
            }
            let _ = writeln!(out, "  {}:", name);
            for rate in series {
                let _ = writeln!(out, "    {}: {}", rate.start.to_rfc3339(), rate.rate);
            }
        }
    }
    out
}
