//! Rates service - hourly energy rates per facility

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::config::AtlasConfig;
use crate::domain::readings::DEFAULT_RATES_WINDOW_HOURS;
use crate::domain::{DomainError, HourlyRates, RatesFilter};
use crate::infrastructure::atlas::{AtlasClient, HttpClient, HttpClientTrait};

/// High level reader for energy rates
#[derive(Debug)]
pub struct RatesReader<C: HttpClientTrait> {
    client: Arc<AtlasClient<C>>,
}

impl RatesReader<HttpClient> {
    pub async fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        let client = AtlasClient::from_config(config, refresh_token).await?;
        Ok(Self::new(Arc::new(client)))
    }
}

impl<C: HttpClientTrait> RatesReader<C> {
    pub fn new(client: Arc<AtlasClient<C>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<AtlasClient<C>> {
        &self.client
    }

    /// Hourly rates indexed by facility short name, by default for the
    /// last 24 hours
    pub async fn read(
        &self,
        filter: &RatesFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<BTreeMap<String, HourlyRates>, DomainError> {
        let now = Utc::now();
        let start = start.unwrap_or_else(|| now - Duration::hours(DEFAULT_RATES_WINDOW_HOURS));
        let end = end.unwrap_or(now);

        let facilities = self.client.filter_facilities(&filter.facilities).await?;
        info!(facilities = facilities.len(), "reading hourly rates");

        let reads = facilities.iter().filter_map(|facility| {
            let Some(agent_id) = facility.primary_agent_id() else {
                warn!(facility = %facility.short_name, "facility has no agent, skipping");
                return None;
            };

            Some(async move {
                let rates = self
                    .client
                    .get_hourly_rates(&facility.organization_id, agent_id, Some(start), Some(end))
                    .await
                    .map_err(|e| {
                        e.context(format!(
                            "Error retrieving rates for facility {}",
                            facility.display_name
                        ))
                    })?;
                Ok::<_, DomainError>((facility.short_name.clone(), rates))
            })
        });

        Ok(try_join_all(reads).await?.into_iter().collect())
    }
}
