//! Historical point values

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::time::format_api_time;

/// Default sample interval in seconds
pub const DEFAULT_INTERVAL_SECS: u32 = 60;

/// Default look-back window for historical values
pub const DEFAULT_VALUES_WINDOW_MINUTES: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogValues {
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscreteValues {
    pub timestamps: Vec<i64>,
    pub values: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointValues {
    #[serde(default)]
    pub analog: Option<AnalogValues>,
    #[serde(default)]
    pub discrete: Option<DiscreteValues>,
}

impl PointValues {
    /// `(unix seconds, value)` pairs, analog preferred over discrete
    pub fn samples(&self) -> Vec<(i64, f64)> {
        if let Some(analog) = &self.analog {
            return analog
                .timestamps
                .iter()
                .copied()
                .zip(analog.values.iter().copied())
                .collect();
        }

        if let Some(discrete) = &self.discrete {
            return discrete
                .timestamps
                .iter()
                .copied()
                .zip(discrete.values.iter().map(|v| if *v { 1.0 } else { 0.0 }))
                .collect();
        }

        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateBy {
    Avg,
    Min,
    Max,
    First,
    Last,
}

impl fmt::Display for AggregateBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::First => "first",
            Self::Last => "last",
        };
        write!(f, "{}", s)
    }
}

/// Values of one point, keyed by aggregation method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalValues {
    pub point_id: String,
    pub values: HashMap<AggregateBy, PointValues>,
}

impl HistoricalValues {
    pub fn aggregate(&self, by: AggregateBy) -> Option<&PointValues> {
        self.values.get(&by)
    }
}

/// Query for the facility-readings endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalValuesQuery {
    pub point_ids: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub interval: u32,
    pub aggregate_by: Vec<AggregateBy>,
    pub changes_only: bool,
    pub scaled: bool,
}

impl HistoricalValuesQuery {
    pub fn new(point_ids: Vec<String>) -> Self {
        Self {
            point_ids,
            start: None,
            end: None,
            interval: DEFAULT_INTERVAL_SECS,
            aggregate_by: vec![AggregateBy::Avg],
            changes_only: false,
            scaled: true,
        }
    }

    pub fn with_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_aggregates(mut self, aggregate_by: Vec<AggregateBy>) -> Self {
        self.aggregate_by = aggregate_by;
        self
    }

    pub fn changes_only(mut self, changes_only: bool) -> Self {
        self.changes_only = changes_only;
        self
    }

    pub fn scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }

    /// Build the request body, filling in the default window relative to `now`
    pub fn to_body(&self, now: DateTime<Utc>) -> Result<serde_json::Value, DomainError> {
        if self.interval == 0 {
            return Err(DomainError::validation("interval must be greater than 0"));
        }

        if self.aggregate_by.is_empty() {
            return Err(DomainError::validation("at least one aggregation is required"));
        }

        let end = self.end.unwrap_or(now);
        let start = self
            .start
            .unwrap_or_else(|| now - Duration::minutes(DEFAULT_VALUES_WINDOW_MINUTES));

        if start > end {
            return Err(DomainError::validation(format!(
                "start ({}) must not be after end ({})",
                format_api_time(&start),
                format_api_time(&end)
            )));
        }

        Ok(serde_json::json!({
            "point_ids": self.point_ids,
            "start": format_api_time(&start),
            "end": format_api_time(&end),
            "interval": self.interval,
            "aggregate_by": self.aggregate_by,
            "changes_only": self.changes_only,
            "scaled": self.scaled,
        }))
    }
}
