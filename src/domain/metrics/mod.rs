//! Metric read filters and results

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::device::{Device, DeviceKind, DeviceMetric};
use crate::domain::error::DomainError;

/// Facilities and metrics to read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsFilter {
    /// Facility short names; empty selects every accessible facility
    #[serde(default)]
    pub facilities: Vec<String>,
    pub metrics: Vec<DeviceMetric>,
}

impl MetricsFilter {
    pub fn new(facilities: Vec<String>, metrics: Vec<DeviceMetric>) -> Self {
        Self {
            facilities,
            metrics,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.metrics.is_empty() {
            return Err(DomainError::validation("No metrics provided"));
        }

        if let Some(metric) = self.metrics.iter().find(|m| !m.is_valid()) {
            return Err(DomainError::validation(format!("Invalid metric {}", metric)));
        }

        Ok(())
    }
}

/// Facilities to read energy rates for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesFilter {
    #[serde(default)]
    pub facilities: Vec<String>,
}

impl RatesFilter {
    pub fn new(facilities: Vec<String>) -> Self {
        Self { facilities }
    }
}

/// A device metric with its alias pattern compiled
#[derive(Debug, Clone)]
pub struct CompiledMetric {
    pub metric: DeviceMetric,
    pattern: Option<Regex>,
}

impl CompiledMetric {
    /// Compile the alias pattern; matches are anchored at the start of the alias
    pub fn compile(metric: &DeviceMetric) -> Result<Self, DomainError> {
        let pattern = if metric.alias_regex.is_empty() {
            None
        } else {
            let anchored = format!(r"\A(?:{})", metric.alias_regex);
            let regex = Regex::new(&anchored).map_err(|e| {
                DomainError::validation(format!(
                    "Invalid alias regex '{}': {}",
                    metric.alias_regex, e
                ))
            })?;
            Some(regex)
        };

        Ok(Self {
            metric: metric.clone(),
            pattern,
        })
    }

    pub fn matches_alias(&self, alias: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(alias))
    }
}

/// A point alias selected on a device.
///
/// `metric` is the reported metric: named after the property key, tagged
/// with the type of the metric that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasFilter {
    pub alias: String,
    pub metric: DeviceMetric,
}

/// Select the device's point aliases for the given metrics.
///
/// Properties whose key equals a metric name come first, then properties
/// whose alias matches a metric pattern. Each alias appears once.
pub fn select_aliases(device: &Device, metrics: &[CompiledMetric]) -> Vec<AliasFilter> {
    let by_name = device.properties.iter().filter_map(|prop| {
        metrics
            .iter()
            .find(|m| !m.metric.name.is_empty() && m.metric.name == prop.key)
            .map(|m| (prop, m))
    });
    let by_pattern = device.properties.iter().filter_map(|prop| {
        metrics
            .iter()
            .find(|m| m.matches_alias(&prop.value.alias))
            .map(|m| (prop, m))
    });

    let mut filters: Vec<AliasFilter> = Vec::new();
    for (prop, selected_by) in by_name.chain(by_pattern) {
        if filters.iter().any(|f| f.alias == prop.value.alias) {
            continue;
        }
        filters.push(AliasFilter {
            alias: prop.value.alias.clone(),
            metric: DeviceMetric {
                name: prop.key.clone(),
                alias_regex: String::new(),
                device_kind: selected_by.metric.device_kind,
                metric_type: selected_by.metric.metric_type,
            },
        });
    }
    filters
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Time series of one metric on one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValues {
    pub metric: DeviceMetric,
    pub device_name: String,
    pub device_alias: String,
    pub values: Vec<MetricValue>,
}

/// One sample with its facility and device context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatMetricValue {
    pub facility: String,
    pub device_name: String,
    pub device_alias: String,
    pub metric: DeviceMetric,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

static METRIC_SPEC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([^:]+?)\s*:\s*(.+?)\s*$").unwrap());

/// Parse `kind:value` pairs such as `compressor:SuctionPressure`
pub fn parse_metric_spec(spec: &str) -> Result<(DeviceKind, String), DomainError> {
    let caps = METRIC_SPEC_PATTERN.captures(spec).ok_or_else(|| {
        DomainError::validation(format!(
            "Invalid metric '{}': expected '<device kind>:<value>'",
            spec
        ))
    })?;
    Ok((caps[1].parse()?, caps[2].to_string()))
}
