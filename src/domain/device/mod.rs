//! Devices and device metrics

mod entity;
mod metric;

pub use entity::{Connection, Device, Property, PropertyValue};
pub use metric::{
    CompressorMetric, CondenserMetric, DeviceKind, DeviceMetric, DeviceMetricName,
    EvaporatorMetric, MetricType, VesselMetric,
};
