use std::collections::{BTreeSet, HashMap};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::http_client::{HttpClient, HttpClientTrait};
use crate::config::AtlasConfig;
use crate::domain::readings::{HistoricalHourlyRates, DEFAULT_RATES_WINDOW_HOURS};
use crate::domain::{
    format_api_time, Deployment, Device, DomainError, Facility, HistoricalValues,
    HistoricalValuesQuery, HourlyRates,
};
use crate::infrastructure::auth::{AccessToken, TokenManager};
use crate::infrastructure::credentials::resolve_refresh_token;

enum Method<'a> {
    Get(&'a [(&'a str, String)]),
    Post(&'a serde_json::Value),
}

/// API client for retrieving historical point values from the ATLAS platform
#[derive(Debug)]
pub struct AtlasClient<C: HttpClientTrait> {
    client: C,
    tokens: TokenManager,
    base_url: String,
}

impl AtlasClient<HttpClient> {
    /// Build a client from configuration and exchange the refresh token.
    ///
    /// `refresh_token` overrides `ATLAS_REFRESH_TOKEN` and the config file.
    pub async fn from_config(
        config: &AtlasConfig,
        refresh_token: Option<&str>,
    ) -> Result<Self, DomainError> {
        let (refresh_token, source) = resolve_refresh_token(refresh_token, config)?;
        info!(?source, token_url = %config.auth.token_url, "using refresh token");

        let refresh_margin = config.auth.refresh_margin()?;
        let http = HttpClient::with_timeout(StdDuration::from_secs(config.api.timeout_secs))?;
        let tokens = TokenManager::new(refresh_token, &config.auth.token_url, refresh_margin);

        Self::connect(http, tokens, &config.api.base_url).await
    }
}

impl<C: HttpClientTrait> AtlasClient<C> {
    pub fn new(client: C, tokens: TokenManager, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            tokens,
            base_url,
        }
    }

    /// Create the client and fetch the first access token, failing fast on
    /// a rejected refresh token
    pub async fn connect(
        client: C,
        tokens: TokenManager,
        base_url: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let atlas = Self::new(client, tokens, base_url);
        atlas.tokens.refresh(&atlas.client).await?;
        Ok(atlas)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(test)]
    pub(crate) fn http(&self) -> &C {
        &self.client
    }

    /// ID of the logged in user
    pub async fn user_id(&self) -> Result<String, DomainError> {
        self.tokens.user_id(&self.client).await
    }

    /// List facilities the logged in user has access to
    #[instrument(skip(self))]
    pub async fn list_facilities(&self) -> Result<Vec<Facility>, DomainError> {
        let user_id = self.user_id().await?;
        let path = format!("/users/{}/facilities", user_id);
        let json = self.get(&path, &[("view", "extended".to_string())]).await?;

        parse(json, "facilities")
    }

    /// List all devices for a facility in its current deployment
    #[instrument(skip(self))]
    pub async fn list_devices(
        &self,
        org_id: &str,
        agent_id: &str,
    ) -> Result<Vec<Device>, DomainError> {
        let deployment = self.current_deployment(org_id, agent_id).await?;
        let path = format!("/orgs/{}/agents/{}/devices", org_id, agent_id);
        let json = self
            .get(&path, &[("version", deployment.blueprint_version.to_string())])
            .await?;

        match json.get("values") {
            Some(values) => parse(values.clone(), "devices"),
            None => Ok(Vec::new()),
        }
    }

    /// Map point aliases to point IDs
    #[instrument(skip(self, point_aliases), fields(aliases = point_aliases.len()))]
    pub async fn get_point_ids(
        &self,
        org_id: &str,
        agent_id: &str,
        point_aliases: &[String],
    ) -> Result<HashMap<String, String>, DomainError> {
        let path = format!("/orgs/{}/agents/{}/point-ids", org_id, agent_id);
        let json = self
            .post(&path, &serde_json::json!({ "names": point_aliases }))
            .await?;

        parse(json, "point ids")
    }

    /// Historical values for the query's points. One response may carry
    /// several aggregation methods per point.
    #[instrument(skip(self, query), fields(points = query.point_ids.len()))]
    pub async fn get_historical_values(
        &self,
        org_id: &str,
        agent_id: &str,
        query: &HistoricalValuesQuery,
    ) -> Result<Vec<HistoricalValues>, DomainError> {
        let body = query.to_body(Utc::now())?;
        let path = format!("/orgs/{}/agents/{}/facility-readings", org_id, agent_id);
        let json = self.post(&path, &body).await?;

        parse(json, "historical values")
    }

    /// Hourly rates for `[since, until)`, by default the last 24 hours
    #[instrument(skip(self))]
    pub async fn get_hourly_rates(
        &self,
        org_id: &str,
        agent_id: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<HourlyRates, DomainError> {
        let now = Utc::now();
        let until = until.unwrap_or(now);
        let since = since.unwrap_or_else(|| now - Duration::hours(DEFAULT_RATES_WINDOW_HOURS));

        if since > until {
            return Err(DomainError::validation(format!(
                "since ({}) must not be after until ({})",
                format_api_time(&since),
                format_api_time(&until)
            )));
        }

        let path = format!("/orgs/{}/agents/{}/rates", org_id, agent_id);
        let query = [
            ("since", format_api_time(&since)),
            ("until", format_api_time(&until)),
        ];
        let json = self.get(&path, &query).await?;

        parse::<HistoricalHourlyRates>(json, "hourly rates")?.into_hourly_rates()
    }

    /// Facilities whose short name is listed, or all of them when `names`
    /// is empty
    pub async fn filter_facilities(&self, names: &[String]) -> Result<Vec<Facility>, DomainError> {
        let all = self
            .list_facilities()
            .await
            .map_err(|e| e.context("Error listing facilities"))?;

        if names.is_empty() {
            return Ok(all);
        }

        let facilities: Vec<Facility> = all
            .into_iter()
            .filter(|f| names.contains(&f.short_name))
            .collect();

        let found: BTreeSet<&str> = facilities.iter().map(|f| f.short_name.as_str()).collect();
        let missing: BTreeSet<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| !found.contains(name))
            .collect();

        if !missing.is_empty() {
            let missing: Vec<&str> = missing.into_iter().collect();
            return Err(DomainError::not_found(format!(
                "Facilities {} not found",
                missing.join(", ")
            )));
        }

        Ok(facilities)
    }

    /// Current deployment at a facility, including the active blueprint version
    pub async fn current_deployment(
        &self,
        org_id: &str,
        agent_id: &str,
    ) -> Result<Deployment, DomainError> {
        let path = format!(
            "/orgs/{}/agents/{}/site-narratives/deployments/current",
            org_id, agent_id
        );
        let json = self.get(&path, &[]).await?;
        Deployment::from_api(&json)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DomainError> {
        self.send(Method::Get(query), path).await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        self.send(Method::Post(body), path).await
    }

    async fn send(&self, method: Method<'_>, path: &str) -> Result<serde_json::Value, DomainError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.tokens.access_token(&self.client).await?;

        match self.dispatch(&method, &url, &token).await {
            Err(e) if e.is_unauthorized() => {
                warn!(url = %url, "access token rejected, refreshing");
                let token = self.tokens.refresh_rejected(&self.client, &token).await?;
                self.dispatch(&method, &url, &token).await
            }
            other => other,
        }
    }

    async fn dispatch(
        &self,
        method: &Method<'_>,
        url: &str,
        token: &AccessToken,
    ) -> Result<serde_json::Value, DomainError> {
        let auth_header = token.bearer();
        let headers = vec![
            ("Authorization", auth_header.as_str()),
            ("Accept", "application/json"),
        ];

        match method {
            Method::Get(query) => {
                debug!(url, "GET");
                self.client.get_json(url, headers, query).await
            }
            Method::Post(body) => {
                debug!(url, "POST");
                self.client.post_json(url, headers, body).await
            }
        }
    }
}

fn parse<T: DeserializeOwned>(json: serde_json::Value, what: &str) -> Result<T, DomainError> {
    serde_json::from_value(json.clone())
        .map_err(|e| DomainError::parse(format!("Failed to parse {}: {}, got {}", what, e, json)))
}
