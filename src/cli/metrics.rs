//! `metrics` command

use std::fmt::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Args;

use super::{capitalize, parse_range, to_json, Client};
use crate::domain::metrics::{parse_metric_spec, CompiledMetric};
use crate::domain::readings::DEFAULT_INTERVAL_SECS;
use crate::domain::{
    CompressorMetric, DeviceKind, DeviceMetric, DomainError, FlatMetricValue, MetricType,
    MetricsFilter,
};
use crate::infrastructure::services::{FacilityMetrics, MetricsReader};

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// Facility short names
    #[arg(required = true)]
    pub facilities: Vec<String>,

    /// Start of the range (RFC 3339 or `YYYY-MM-DD HH:MM:SS`, UTC)
    #[arg(long)]
    pub start: Option<String>,

    /// End of the range, defaults to now
    #[arg(long)]
    pub end: Option<String>,

    /// Aggregation interval in seconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u32,

    /// Print one line per value instead of grouping by device metric
    #[arg(long)]
    pub flatten: bool,

    /// Named metric, e.g. `compressor:SuctionPressure`
    #[arg(long)]
    pub metric: Vec<String>,

    /// Point alias pattern, e.g. `compressor:.*Current.*`
    #[arg(long)]
    pub alias: Vec<String>,
}

/// Validated `metrics` arguments
#[derive(Debug)]
pub struct MetricsRequest {
    pub filter: MetricsFilter,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub interval: u32,
    pub flatten: bool,
}

impl MetricsArgs {
    /// Validate the arguments without touching the network
    pub fn prepare(&self) -> Result<MetricsRequest, DomainError> {
        let filter = self.filter()?;
        filter.validate()?;
        for metric in &filter.metrics {
            CompiledMetric::compile(metric)?;
        }
        if self.interval == 0 {
            return Err(DomainError::validation("interval must be greater than 0"));
        }
        let (start, end) = parse_range(self.start.as_deref(), self.end.as_deref())?;

        Ok(MetricsRequest {
            filter,
            start,
            end,
            interval: self.interval,
            flatten: self.flatten,
        })
    }

    /// Build the filter, falling back to the default compressor metrics
    pub fn filter(&self) -> Result<MetricsFilter, DomainError> {
        let mut metrics = Vec::with_capacity(self.metric.len() + self.alias.len());
        for spec in &self.metric {
            let (device_kind, name) = parse_metric_spec(spec)?;
            metrics.push(DeviceMetric {
                name,
                alias_regex: String::new(),
                device_kind,
                metric_type: None,
            });
        }
        for spec in &self.alias {
            let (device_kind, pattern) = parse_metric_spec(spec)?;
            metrics.push(DeviceMetric::with_alias_regex(device_kind, pattern));
        }

        if metrics.is_empty() {
            metrics = default_metrics();
        }
        Ok(MetricsFilter::new(self.facilities.clone(), metrics))
    }
}

fn default_metrics() -> Vec<DeviceMetric> {
    vec![
        DeviceMetric::named(CompressorMetric::SuctionPressure),
        DeviceMetric::with_alias_regex(DeviceKind::Compressor, ".*Current.*")
            .with_metric_type(MetricType::ControlPoint),
        DeviceMetric::with_alias_regex(DeviceKind::Compressor, ".*MaxCapacity.*")
            .with_metric_type(MetricType::Setting),
    ]
}

pub async fn run(client: Client, request: MetricsRequest, json: bool) -> anyhow::Result<String> {
    let MetricsRequest {
        filter,
        start,
        end,
        interval,
        flatten,
    } = request;
    let reader = MetricsReader::new(Arc::new(client));

    if flatten {
        let values = reader.read_flat(&filter, start, end, interval).await?;
        if json {
            return to_json(&values);
        }
        return Ok(render_flat(&values));
    }

    let metrics = reader.read(&filter, start, end, interval).await?;
    if json {
        return to_json(&metrics);
    }
    Ok(render(&metrics))
}

fn render(metrics: &FacilityMetrics) -> String {
    let mut out = String::new();
    for (facility, series) in metrics {
        let _ = writeln!(out, "{}", capitalize(facility));
        for s in series {
            let _ = writeln!(out, "  {} {}", s.device_name, s.metric.name);
            for v in &s.values {
                let _ = writeln!(out, "    {}: {}", v.timestamp.to_rfc3339(), v.value);
            }
        }
    }
    out
}

fn render_flat(values: &[FlatMetricValue]) -> String {
    let mut out = String::new();
    for v in values {
        let _ = writeln!(
            out,
            "{} - {} - {} - {}: {}",
            capitalize(&v.facility),
            v.device_name,
            v.metric.name,
            v.timestamp.to_rfc3339(),
            v.value
        );
    }
    out
}
