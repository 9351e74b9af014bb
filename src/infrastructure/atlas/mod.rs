//! ATLAS REST API client

mod client;
mod http_client;

pub use client::AtlasClient;
pub use http_client::{HttpClient, HttpClientTrait};

#[cfg(test)]
pub(crate) use client::test_support;
#[cfg(test)]
pub(crate) use http_client::mock;
