//! Point readings and energy rates

mod rates;
mod values;

pub use rates::{
    HistoricalHourlyRate, HistoricalHourlyRates, HourlyRate, HourlyRates,
    DEFAULT_RATES_WINDOW_HOURS,
};
pub use values::{
    AggregateBy, AnalogValues, DiscreteValues, HistoricalValues, HistoricalValuesQuery,
    PointValues, DEFAULT_INTERVAL_SECS, DEFAULT_VALUES_WINDOW_MINUTES,
};
