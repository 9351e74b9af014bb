use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::DomainError;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DomainError>;

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;

    async fn post_form(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("atlas-metrics/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        mut request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
    ) -> Result<serde_json::Value, DomainError> {
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response received");

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(DomainError::http(status.as_u16(), error_body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DomainError::transport(format!("Failed to read response: {}", e)))?;

        serde_json::from_str(&text).map_err(|e| {
            DomainError::parse(format!("Failed to parse response: {}, got {}", e, text))
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DomainError> {
        debug!(method = "GET", url, "sending request");
        self.send(self.client.get(url).query(query), headers).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        debug!(method = "POST", url, "sending request");
        self.send(self.client.post(url).json(body), headers).await
    }

    async fn post_form(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value, DomainError> {
        debug!(method = "POST", url, "sending form request");
        self.send(self.client.post(url).form(form), headers).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::RwLock;

    /// A request seen by the mock
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub method: &'static str,
        pub url: String,
        pub headers: Vec<(String, String)>,
        pub query: Vec<(String, String)>,
        pub body: Option<serde_json::Value>,
        pub form: Vec<(String, String)>,
    }

    impl RecordedRequest {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn query_param(&self, name: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Canned responses keyed by URL.
    ///
    /// Queued responses are consumed first, then the fixed response applies.
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        responses: RwLock<HashMap<String, serde_json::Value>>,
        queued: RwLock<HashMap<String, VecDeque<Result<serde_json::Value, (u16, String)>>>>,
        errors: RwLock<HashMap<String, (u16, String)>>,
        requests: RwLock<Vec<RecordedRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.responses.write().unwrap().insert(url.into(), response);
            self
        }

        pub fn with_error(
            self,
            url: impl Into<String>,
            status: u16,
            error: impl Into<String>,
        ) -> Self {
            self.errors
                .write()
                .unwrap()
                .insert(url.into(), (status, error.into()));
            self
        }

        /// Queue a one-shot error, served before any fixed response
        pub fn with_queued_error(
            self,
            url: impl Into<String>,
            status: u16,
            error: impl Into<String>,
        ) -> Self {
            self.queued
                .write()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(Err((status, error.into())));
            self
        }

        /// Queue a one-shot response, served before any fixed response
        pub fn with_queued_response(
            self,
            url: impl Into<String>,
            response: serde_json::Value,
        ) -> Self {
            self.queued
                .write()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(Ok(response));
            self
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.read().unwrap().clone()
        }

        pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
            self.requests()
                .into_iter()
                .filter(|r| r.url == url)
                .collect()
        }

        fn respond(&self, request: RecordedRequest) -> Result<serde_json::Value, DomainError> {
            let url = request.url.clone();
            self.requests.write().unwrap().push(request);

            if let Some(next) = self
                .queued
                .write()
                .unwrap()
                .get_mut(&url)
                .and_then(|q| q.pop_front())
            {
                return next.map_err(|(status, message)| DomainError::http(status, message));
            }

            if let Some((status, error)) = self.errors.read().unwrap().get(&url) {
                return Err(DomainError::http(*status, error.clone()));
            }

            self.responses
                .read()
                .unwrap()
                .get(&url)
                .cloned()
                .ok_or_else(|| DomainError::http(404, format!("No mock response for {}", url)))
        }
    }

    fn owned_headers(headers: Vec<(&str, &str)>) -> Vec<(String, String)> {
        headers
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn get_json(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
            query: &[(&str, String)],
        ) -> Result<serde_json::Value, DomainError> {
            self.respond(RecordedRequest {
                method: "GET",
                url: url.to_string(),
                headers: owned_headers(headers),
                query: query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
                body: None,
                form: Vec::new(),
            })
        }

        async fn post_json(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, DomainError> {
            self.respond(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                headers: owned_headers(headers),
                query: Vec::new(),
                body: Some(body.clone()),
                form: Vec::new(),
            })
        }

        async fn post_form(
            &self,
            url: &str,
            headers: Vec<(&str, &str)>,
            form: &[(&str, &str)],
        ) -> Result<serde_json::Value, DomainError> {
            self.respond(RecordedRequest {
                method: "POST",
                url: url.to_string(),
                headers: owned_headers(headers),
                query: Vec::new(),
                body: None,
                form: form
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            })
        }
    }
}
