//! Metrics service - metric time series for device metrics across facilities

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::config::AtlasConfig;
use crate::domain::metrics::{select_aliases, AliasFilter, CompiledMetric};
use crate::domain::time::from_unix_seconds;
use crate::domain::{
    AggregateBy, Device, DomainError, Facility, FlatMetricValue, HistoricalValues,
    HistoricalValuesQuery, MetricValue, MetricValues, MetricsFilter,
};
use crate::infrastructure::atlas::{AtlasClient, HttpClient, HttpClientTrait};

/// Metric series indexed by facility short name
pub type FacilityMetrics = BTreeMap<String, Vec<MetricValues>>;

/// High level reader for metric point values.
///
/// Values are averaged over the sampling interval.
#[derive(Debug)]
pub struct MetricsReader<C: HttpClientTrait> {
    client: Arc<AtlasClient<C>>,
}

impl MetricsReader<HttpClient> {
    pub async fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        let client = AtlasClient::from_config(config, refresh_token).await?;
        Ok(Self::new(Arc::new(client)))
    }
}

impl<C: HttpClientTrait> MetricsReader<C> {
    pub fn new(client: Arc<AtlasClient<C>>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<AtlasClient<C>> {
        &self.client
    }

    /// Read the filter's metrics for `[start, end]`, by default the last
    /// 10 minutes. Facilities are read concurrently.
    pub async fn read(
        &self,
        filter: &MetricsFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval: u32,
    ) -> Result<FacilityMetrics, DomainError> {
        filter.validate()?;
        let metrics = filter
            .metrics
            .iter()
            .map(CompiledMetric::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let query = HistoricalValuesQuery::new(Vec::new())
            .with_range(start, end)
            .with_interval(interval);
        query.to_body(Utc::now())?;

        let facilities = self.client.filter_facilities(&filter.facilities).await?;
        info!(
            facilities = facilities.len(),
            metrics = metrics.len(),
            "reading metrics"
        );

        let reads = facilities.iter().filter_map(|facility| match facility.primary_agent_id() {
            Some(agent_id) => Some(self.read_facility(facility, agent_id, &metrics, &query)),
            None => {
                warn!(facility = %facility.short_name, "facility has no agent, skipping");
                None
            }
        });

        let mut result = FacilityMetrics::new();
        for (short_name, series) in try_join_all(reads).await? {
            if !series.is_empty() {
                result.insert(short_name, series);
            }
        }

        Ok(result)
    }

    /// Same as [`read`](Self::read), one row per sample ordered by facility,
    /// device, metric and timestamp
    pub async fn read_flat(
        &self,
        filter: &MetricsFilter,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval: u32,
    ) -> Result<Vec<FlatMetricValue>, DomainError> {
        let nested = self.read(filter, start, end, interval).await?;
        Ok(flatten(nested))
    }

    async fn read_facility(
        &self,
        facility: &Facility,
        agent_id: &str,
        metrics: &[CompiledMetric],
        query: &HistoricalValuesQuery,
    ) -> Result<(String, Vec<MetricValues>), DomainError> {
        let org_id = facility.organization_id.as_str();
        let devices = self
            .client
            .list_devices(org_id, agent_id)
            .await
            .map_err(|e| {
                e.context(format!(
                    "Error listing devices for facility {}",
                    facility.display_name
                ))
            })?;

        let mut series = Vec::new();
        for device in &devices {
            let device_metrics: Vec<CompiledMetric> = metrics
                .iter()
                .filter(|m| m.metric.applies_to(&device.kind))
                .cloned()
                .collect();
            if device_metrics.is_empty() {
                continue;
            }

            let alias_filters = select_aliases(device, &device_metrics);
            if alias_filters.is_empty() {
                debug!(device = %device.name, "no matching points on device");
                continue;
            }

            let aliases: Vec<String> = alias_filters.iter().map(|f| f.alias.clone()).collect();
            let point_map = self.point_ids(facility, agent_id, &aliases).await?;

            let point_ids = aliases.iter().map(|a| point_map[a].clone()).collect();
            let device_query = HistoricalValuesQuery {
                point_ids,
                ..query.clone()
            };
            let values = self
                .client
                .get_historical_values(org_id, agent_id, &device_query)
                .await
                .map_err(|e| {
                    e.context(format!(
                        "Error retrieving historical values for facility {}",
                        facility.display_name
                    ))
                })?;

            series.extend(to_metric_values(device, &alias_filters, &point_map, values)?);
        }

        Ok((facility.short_name.clone(), series))
    }

    async fn point_ids(
        &self,
        facility: &Facility,
        agent_id: &str,
        aliases: &[String],
    ) -> Result<HashMap<String, String>, DomainError> {
        let point_map = self
            .client
            .get_point_ids(&facility.organization_id, agent_id, aliases)
            .await
            .map_err(|e| {
                e.context(format!(
                    "Error listing points for facility {}",
                    facility.display_name
                ))
            })?;

        let missing: Vec<&str> = aliases
            .iter()
            .filter(|a| !point_map.contains_key(*a))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::not_found(format!(
                "Points {} not found for facility {}",
                missing.join(", "),
                facility.short_name
            )));
        }

        Ok(point_map)
    }
}

fn to_metric_values(
    device: &Device,
    alias_filters: &[AliasFilter],
    point_map: &HashMap<String, String>,
    values: Vec<HistoricalValues>,
) -> Result<Vec<MetricValues>, DomainError> {
    let alias_by_point: HashMap<&str, &str> = point_map
        .iter()
        .map(|(alias, point_id)| (point_id.as_str(), alias.as_str()))
        .collect();

    let mut series = Vec::with_capacity(values.len());
    for point in values {
        let Some(filter) = alias_by_point
            .get(point.point_id.as_str())
            .and_then(|alias| alias_filters.iter().find(|f| f.alias == *alias))
        else {
            warn!(point_id = %point.point_id, "unexpected point in response, skipping");
            continue;
        };

        let samples = point
            .aggregate(AggregateBy::Avg)
            .map(|v| v.samples())
            .unwrap_or_default();
        let values = samples
            .into_iter()
            .map(|(ts, value)| {
                Ok(MetricValue {
                    timestamp: from_unix_seconds(ts)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        series.push(MetricValues {
            metric: filter.metric.clone(),
            device_name: device.name.clone(),
            device_alias: device.alias.clone(),
            values,
        });
    }

    Ok(series)
}

fn flatten(nested: FacilityMetrics) -> Vec<FlatMetricValue> {
    let mut rows: Vec<FlatMetricValue> = nested
        .into_iter()
        .flat_map(|(facility, series)| {
            series.into_iter().flat_map(move |s| {
                let facility = facility.clone();
                s.values.into_iter().map(move |v| FlatMetricValue {
                    facility: facility.clone(),
                    device_name: s.device_name.clone(),
                    device_alias: s.device_alias.clone(),
                    metric: s.metric.clone(),
                    timestamp: v.timestamp,
                    value: v.value,
                })
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        (&a.facility, &a.device_name, &a.metric.name, a.timestamp)
            .cmp(&(&b.facility, &b.device_name, &b.metric.name, b.timestamp))
    });
    rows
}
