//! Synchronous facade over the async client.
//!
//! Each facade owns a current-thread tokio runtime; do not call it from
//! inside an async context.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::{Builder, Runtime};

use crate::config::AtlasConfig;
use crate::domain::{
    Device, DomainError, Facility, FlatMetricValue, HistoricalValues, HistoricalValuesQuery,
    HourlyRates, MetricsFilter, RatesFilter,
};
use crate::infrastructure::atlas::{self, HttpClient, HttpClientTrait};
use crate::infrastructure::services::{self, DeviceCatalog, FacilityMetrics};

fn runtime() -> Result<Arc<Runtime>, DomainError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map(Arc::new)
        .map_err(|e| DomainError::configuration(format!("Failed to start runtime: {}", e)))
}

/// Blocking [`atlas::AtlasClient`]
#[derive(Debug)]
pub struct AtlasClient<C: HttpClientTrait = HttpClient> {
    runtime: Arc<Runtime>,
    inner: Arc<atlas::AtlasClient<C>>,
}

impl AtlasClient<HttpClient> {
    pub fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        let runtime = runtime()?;
        let inner = runtime.block_on(atlas::AtlasClient::from_config(config, refresh_token))?;
        Ok(Self {
            runtime,
            inner: Arc::new(inner),
        })
    }
}

impl<C: HttpClientTrait> AtlasClient<C> {
    /// Wrap an existing async client
    pub fn from_async(inner: Arc<atlas::AtlasClient<C>>) -> Result<Self, DomainError> {
        Ok(Self {
            runtime: runtime()?,
            inner,
        })
    }

    pub fn list_facilities(&self) -> Result<Vec<Facility>, DomainError> {
        self.runtime.block_on(self.inner.list_facilities())
    }

    pub fn list_devices(&self, org_id: &str, agent_id: &str) -> Result<Vec<Device>, DomainError> {
        self.runtime.block_on(self.inner.list_devices(org_id, agent_id))
    }

    pub fn get_point_ids(
        &self,
        org_id: &str,
        agent_id: &str,
        point_aliases: &[String],
    ) -> Result<HashMap<String, String>, DomainError> {
        self.runtime
            .block_on(self.inner.get_point_ids(org_id, agent_id, point_aliases))
    }

    pub fn get_historical_values(
        &self,
        org_id: &str,
        agent_id: &str,
        query: &HistoricalValuesQuery,
    ) -> Result<Vec<HistoricalValues>, DomainError> {
        self.runtime
            .block_on(self.inner.get_historical_values(org_id, agent_id, query))
    }

    pub fn get_hourly_rates(
        &self,
        org_id: &str,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<HourlyRates, DomainError> {
        self.runtime
            .block_on(self.inner.get_hourly_rates(org_id, agent_id, since, until))
    }

    pub fn filter_facilities(&self, names: &[String]) -> Result<Vec<Facility>, DomainError> {
        self.runtime.block_on(self.inner.filter_facilities(names))
    }

    pub fn device_catalog(&self) -> Result<DeviceCatalog, DomainError> {
        self.runtime.block_on(DeviceCatalog::load(&*self.inner))
    }

    /// Metrics reader sharing this client and runtime
    pub fn metrics_reader(&self) -> MetricsReader<C> {
        MetricsReader {
            runtime: self.runtime.clone(),
            inner: services::MetricsReader::new(self.inner.clone()),
        }
    }

    /// Rates reader sharing this client and runtime
    pub fn rates_reader(&self) -> RatesReader<C> {
        RatesReader {
            runtime: self.runtime.clone(),
            inner: services::RatesReader::new(self.inner.clone()),
        }
    }
}

/// Blocking [`services::MetricsReader`]
#[derive(Debug)]
pub struct MetricsReader<C: HttpClientTrait = HttpClient> {
    runtime: Arc<Runtime>,
    inner: services::MetricsReader<C>,
}

impl MetricsReader<HttpClient> {
    pub fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        Ok(AtlasClient::from_config(config, refresh_token)?.metrics_reader())
    }
}

impl<C: HttpClientTrait> MetricsReader<C> {
    pub fn read(
        &self,
        filter: &MetricsFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval: u32,
    ) -> Result<FacilityMetrics, DomainError> {
        self.runtime
            .block_on(self.inner.read(filter, start, end, interval))
    }

    pub fn read_flat(
        &self,
        filter: &MetricsFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval: u32,
    ) -> Result<Vec<FlatMetricValue>, DomainError> {
        self.runtime
            .block_on(self.inner.read_flat(filter, start, end, interval))
    }
}

/// Blocking [`services::RatesReader`]
#[derive(Debug)]
pub struct RatesReader<C: HttpClientTrait = HttpClient> {
    runtime: Arc<Runtime>,
    inner: services::RatesReader<C>,
}

impl RatesReader<HttpClient> {
    pub fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        Ok(AtlasClient::from_config(config, refresh_token)?.rates_reader())
    }
}

impl<C: HttpClientTrait> RatesReader<C> {
    pub fn read(
        &self,
        filter: &RatesFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<String, HourlyRates>, DomainError> {
        self.runtime.block_on(self.inner.read(filter, start, end))
    }
}
