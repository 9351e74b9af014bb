//! Atlas metrics client
//!
//! Reads device metric time series and hourly energy rates from the ATLAS
//! refrigeration monitoring API:
//! - OAuth refresh token authentication with automatic access token renewal
//! - Facility, device and point ID lookups
//! - Metric selection by device kind, metric name or point alias pattern
//! - Async readers plus a blocking facade for synchronous callers

pub mod blocking;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AtlasConfig;
pub use domain::{
    DeviceKind, DeviceMetric, DomainError, FlatMetricValue, HourlyRates, MetricType,
    MetricValues, MetricsFilter, RatesFilter,
};
pub use infrastructure::atlas::{AtlasClient, HttpClient, HttpClientTrait};
pub use infrastructure::services::{DeviceCatalog, FacilityMetrics, MetricsReader, RatesReader};
