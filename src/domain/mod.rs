//! Domain layer - ATLAS entities, metric selection and errors

pub mod device;
pub mod error;
pub mod facility;
pub mod metrics;
pub mod readings;
pub mod time;

pub use device::{
    CompressorMetric, CondenserMetric, Connection, Device, DeviceKind, DeviceMetric,
    DeviceMetricName, EvaporatorMetric, MetricType, Property, PropertyValue, VesselMetric,
};
pub use error::DomainError;
pub use facility::{Agent, Deployment, Facility};
pub use metrics::{FlatMetricValue, MetricValue, MetricValues, MetricsFilter, RatesFilter};
pub use readings::{
    AggregateBy, AnalogValues, DiscreteValues, HistoricalValues, HistoricalValuesQuery,
    HourlyRate, HourlyRates, PointValues,
};
pub use time::{format_api_time, parse_datetime};
