//! Hourly energy rates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::time::from_unix_seconds;

/// Default look-back window for rates
pub const DEFAULT_RATES_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRate {
    pub start: DateTime<Utc>,
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyRates {
    #[serde(default)]
    pub usage_rate: Vec<HourlyRate>,
    #[serde(default)]
    pub maximum_demand_charge: Vec<HourlyRate>,
    #[serde(default)]
    pub time_of_use_demand_charge: Vec<HourlyRate>,
    #[serde(default)]
    pub day_ahead_market_rate: Vec<HourlyRate>,
    #[serde(default)]
    pub real_time_market_rate: Vec<HourlyRate>,
}

impl HourlyRates {
    /// Series in display order
    pub fn series(&self) -> [(&'static str, &[HourlyRate]); 5] {
        [
            ("usage_rate", self.usage_rate.as_slice()),
            ("maximum_demand_charge", self.maximum_demand_charge.as_slice()),
            ("time_of_use_demand_charge", self.time_of_use_demand_charge.as_slice()),
            ("day_ahead_market_rate", self.day_ahead_market_rate.as_slice()),
            ("real_time_market_rate", self.real_time_market_rate.as_slice()),
        ]
    }
}

/// Wire form of a rate, `start` in unix seconds
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoricalHourlyRate {
    pub start: i64,
    pub rate: f64,
}

impl HistoricalHourlyRate {
    pub fn into_hourly_rate(self) -> Result<HourlyRate, DomainError> {
        Ok(HourlyRate {
            start: from_unix_seconds(self.start)?,
            rate: self.rate,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoricalHourlyRates {
    #[serde(default)]
    pub usage_rate: Vec<HistoricalHourlyRate>,
    #[serde(default)]
    pub maximum_demand_charge: Vec<HistoricalHourlyRate>,
    #[serde(default)]
    pub time_of_use_demand_charge: Vec<HistoricalHourlyRate>,
    #[serde(default)]
    pub day_ahead_market_rate: Vec<HistoricalHourlyRate>,
    #[serde(default)]
    pub real_time_market_rate: Vec<HistoricalHourlyRate>,
}

fn convert(rates: Vec<HistoricalHourlyRate>) -> Result<Vec<HourlyRate>, DomainError> {
    rates
        .into_iter()
        .map(HistoricalHourlyRate::into_hourly_rate)
        .collect()
}

impl HistoricalHourlyRates {
    pub fn into_hourly_rates(self) -> Result<HourlyRates, DomainError> {
        Ok(HourlyRates {
            usage_rate: convert(self.usage_rate)?,
            maximum_demand_charge: convert(self.maximum_demand_charge)?,
            time_of_use_demand_charge: convert(self.time_of_use_demand_charge)?,
            day_ahead_market_rate: convert(self.day_ahead_market_rate)?,
            real_time_market_rate: convert(self.real_time_market_rate)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_wire_rates() {
        let wire: HistoricalHourlyRates = serde_json::from_value(json!({
            "usage_rate": [{ "start": 1_700_000_000, "rate": 0.12 }],
            "real_time_market_rate": [
                { "start": 1_700_000_000, "rate": 31.5 },
                { "start": 1_700_003_600, "rate": 29.0 }
            ]
        }))
        .unwrap();

        let rates = wire.into_hourly_rates().unwrap();
        assert_eq!(rates.usage_rate.len(), 1);
        assert_eq!(rates.usage_rate[0].start.timestamp(), 1_700_000_000);
        assert!(rates.maximum_demand_charge.is_empty());
        assert_eq!(rates.real_time_market_rate[1].rate, 29.0);
    }

    #[test]
    fn test_series_order() {
        let names: Vec<_> = HourlyRates::default()
            .series()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names[0], "usage_rate");
        assert_eq!(names[4], "real_time_market_rate");
    }
}
