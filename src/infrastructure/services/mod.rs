//! High level readers built on the API client

mod device_service;
mod metrics_service;
mod rates_service;

pub use device_service::{DeviceCatalog, DevicesByKind};
pub use metrics_service::{FacilityMetrics, MetricsReader};
pub use rates_service::RatesReader;
