//! Device kinds and the metrics that can be read from them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "compressor")]
    Compressor,
    #[serde(rename = "evaporator")]
    Evaporator,
    #[serde(rename = "condenser")]
    Condenser,
    #[serde(rename = "vessel")]
    Vessel,
    #[serde(rename = "energy meter")]
    EnergyMeter,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 5] = [
        Self::Compressor,
        Self::Evaporator,
        Self::Condenser,
        Self::Vessel,
        Self::EnergyMeter,
    ];

    /// Wire name, as found in `Device::kind`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compressor => "compressor",
            Self::Evaporator => "evaporator",
            Self::Condenser => "condenser",
            Self::Vessel => "vessel",
            Self::EnergyMeter => "energy meter",
        }
    }

    /// Named metrics supported for this kind
    pub fn metric_names(&self) -> &'static [&'static str] {
        match self {
            Self::Compressor => CompressorMetric::NAMES,
            Self::Condenser => CondenserMetric::NAMES,
            Self::Evaporator => EvaporatorMetric::NAMES,
            Self::Vessel => VesselMetric::NAMES,
            Self::EnergyMeter => &[],
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("Unknown device kind: {}", s)))
    }
}

/// A metric name bound to a device kind
pub trait DeviceMetricName: Copy {
    const KIND: DeviceKind;

    fn as_str(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorMetric {
    DischargePressure,
    DischargeTemperature,
    SuctionPressure,
    SuctionTemperature,
}

impl CompressorMetric {
    pub const NAMES: &'static [&'static str] = &[
        "DischargePressure",
        "DischargeTemperature",
        "SuctionPressure",
        "SuctionTemperature",
    ];
}

impl DeviceMetricName for CompressorMetric {
    const KIND: DeviceKind = DeviceKind::Compressor;

    fn as_str(&self) -> &'static str {
        match self {
            Self::DischargePressure => "DischargePressure",
            Self::DischargeTemperature => "DischargeTemperature",
            Self::SuctionPressure => "SuctionPressure",
            Self::SuctionTemperature => "SuctionTemperature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondenserMetric {
    DischargePressure,
    DischargeTemperature,
}

impl CondenserMetric {
    pub const NAMES: &'static [&'static str] = &["DischargePressure", "DischargeTemperature"];
}

impl DeviceMetricName for CondenserMetric {
    const KIND: DeviceKind = DeviceKind::Condenser;

    fn as_str(&self) -> &'static str {
        match self {
            Self::DischargePressure => "DischargePressure",
            Self::DischargeTemperature => "DischargeTemperature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaporatorMetric {
    SupplyTemperature,
    ReturnTemperature,
}

impl EvaporatorMetric {
    pub const NAMES: &'static [&'static str] = &["SupplyTemperature", "ReturnTemperature"];
}

impl DeviceMetricName for EvaporatorMetric {
    const KIND: DeviceKind = DeviceKind::Evaporator;

    fn as_str(&self) -> &'static str {
        match self {
            Self::SupplyTemperature => "SupplyTemperature",
            Self::ReturnTemperature => "ReturnTemperature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselMetric {
    SuctionPressure,
}

impl VesselMetric {
    pub const NAMES: &'static [&'static str] = &["SuctionPressure"];
}

impl DeviceMetricName for VesselMetric {
    const KIND: DeviceKind = DeviceKind::Vessel;

    fn as_str(&self) -> &'static str {
        "SuctionPressure"
    }
}

/// Point category tag, carried through to results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricType {
    #[serde(rename = "control point")]
    ControlPoint,
    #[serde(rename = "setting")]
    Setting,
}

/// A metric to read from every device of a kind.
///
/// Either `name` (preferred, must be one of the kind's metric names) or
/// `alias_regex` (matched against the start of each property's point alias)
/// selects the points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetric {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub alias_regex: String,
    pub device_kind: DeviceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_type: Option<MetricType>,
}

impl DeviceMetric {
    pub fn named<M: DeviceMetricName>(metric: M) -> Self {
        Self {
            name: metric.as_str().to_string(),
            alias_regex: String::new(),
            device_kind: M::KIND,
            metric_type: None,
        }
    }

    pub fn with_alias_regex(device_kind: DeviceKind, alias_regex: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            alias_regex: alias_regex.into(),
            device_kind,
            metric_type: None,
        }
    }

    pub fn with_metric_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = Some(metric_type);
        self
    }

    /// Check the metric is usable for its device kind
    pub fn is_valid(&self) -> bool {
        if !self.name.is_empty() {
            return self.device_kind.metric_names().contains(&self.name.as_str());
        }
        !self.alias_regex.is_empty()
    }

    pub fn applies_to(&self, device_kind: &str) -> bool {
        self.device_kind.as_str() == device_kind
    }
}

impl fmt::Display for DeviceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}:/{}/", self.device_kind, self.alias_regex)
        } else {
            write!(f, "{}:{}", self.device_kind, self.name)
        }
    }
}
