//! Generic HTTP search provider.
//!
//! The four supported services differ only in endpoint, authentication,
//! query parameters, and where the image URLs sit in the JSON response. Those
//! differences are captured as data in [`ProviderSpec`].

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::{ImageProvider, ProviderError, ProviderId};

/// How a service expects its API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// Sent as a request header, e.g. `Authorization: Client-ID <key>`.
    Header { name: &'static str, prefix: &'static str },
    /// Sent as a query parameter.
    Query(&'static str),
}

/// Search parameters shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub per_page: u32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Static description of a search service.
#[derive(Clone)]
pub struct ProviderSpec {
    pub id: ProviderId,
    pub endpoint: &'static str,
    pub auth: Auth,
    /// Name of the search term parameter.
    pub query_param: &'static str,
    /// Name of the page-size parameter, if the service has one.
    pub per_page_param: Option<&'static str>,
    /// Fixed parameters sent with every search.
    pub extra_params: Vec<(&'static str, String)>,
    pub per_page: u32,
    /// Extracts image URLs from a search response.
    pub parse: fn(&Value) -> Vec<String>,
}

impl fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl ProviderSpec {
    /// Query string for one search request, without credentials.
    #[must_use]
    pub fn search_params(&self, query: &str, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![(self.query_param, query.to_string()), ("page", page.to_string())];
        if let Some(name) = self.per_page_param {
            params.push((name, self.per_page.to_string()));
        }
        params.extend(self.extra_params.iter().cloned());
        params
    }
}

/// [`ImageProvider`] backed by a JSON search API.
pub struct HttpProvider {
    client: reqwest::Client,
    spec: ProviderSpec,
    api_key: Option<String>,
}

impl fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpProvider")
            .field("spec", &self.spec)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpProvider {
    #[must_use]
    pub const fn new(client: reqwest::Client, spec: ProviderSpec, api_key: Option<String>) -> Self {
        Self { client, spec, api_key }
    }

    #[must_use]
    pub const fn spec(&self) -> &ProviderSpec { &self.spec }
}

#[async_trait]
impl ImageProvider for HttpProvider {
    fn id(&self) -> ProviderId { self.spec.id }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<String>, ProviderError> {
        let mut request =
            self.client.get(self.spec.endpoint).query(&self.spec.search_params(query, page));

        if let Some(key) = &self.api_key {
            request = match self.spec.auth {
                Auth::Header { name, prefix } => request.header(name, format!("{prefix}{key}")),
                Auth::Query(name) => request.query(&[(name, key)]),
            };
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        let urls = (self.spec.parse)(&body);
        tracing::debug!(provider = %self.spec.id, query, page, found = urls.len(), "search complete");

        Ok(urls)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Collects string values found at `pointer` inside each element of the
/// array at `list`. Missing or non-string entries are ignored.
#[must_use]
pub fn collect_urls(body: &Value, list: &str, pointer: &str) -> Vec<String> {
    body.get(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer(pointer).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
