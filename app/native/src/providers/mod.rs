//! Image providers.
//!
//! A provider answers two questions: which image URLs match a query, and what
//! bytes live behind one of those URLs. Every remote service is described by a
//! [`ProviderSpec`](http::ProviderSpec) and served by the shared
//! [`HttpProvider`](http::HttpProvider); tests plug in their own
//! [`ImageProvider`] implementations.

pub mod http;
pub mod pexels;
pub mod pixabay;
pub mod unsplash;
pub mod wallhaven;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{Auth, HttpProvider, ProviderSpec, SearchSettings};

use crate::config::{ApiKeys, WallfetchConfig};

/// Identifier of a supported image source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Pexels,
    Pixabay,
    Unsplash,
    Wallhaven,
}

impl ProviderId {
    /// Every provider, in a stable order.
    pub const ALL: [Self; 4] = [Self::Pexels, Self::Pixabay, Self::Unsplash, Self::Wallhaven];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pexels => "pexels",
            Self::Pixabay => "pixabay",
            Self::Unsplash => "unsplash",
            Self::Wallhaven => "wallhaven",
        }
    }

    /// Whether the service refuses anonymous searches.
    #[must_use]
    pub const fn requires_key(self) -> bool { !matches!(self, Self::Wallhaven) }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Failure talking to an image provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service throttled us (HTTP 429).
    #[error("rate limited")]
    RateLimited,
    /// Missing or rejected credentials (HTTP 401/403).
    #[error("unauthorized")]
    Unauthorized,
    /// The service is temporarily down (HTTP 5xx).
    #[error("service unavailable (HTTP {0})")]
    Unavailable(u16),
    /// The requested resource does not exist (HTTP 404).
    #[error("not found")]
    NotFound,
    /// Any other unexpected HTTP status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    /// The request did not finish in time.
    #[error("request timed out")]
    Timeout,
    /// The connection could not be established or broke.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The response body could not be understood.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Unavailable(_) | Self::Timeout | Self::Connection(_))
    }

    /// Maps a non-success HTTP status to an error.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable(status),
            _ => Self::Status(status),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16())
        } else if err.is_decode() || err.is_body() {
            Self::Decode(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Capability every image source offers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Which service this is.
    fn id(&self) -> ProviderId;

    /// Searches for `query` and returns candidate image URLs from `page`
    /// (1-based). An empty list means there are no more results.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<String>, ProviderError>;

    /// Downloads the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ProviderError>;
}

/// The set of providers a run may draw from.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<ProviderId, Arc<dyn ImageProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry").field("providers", &self.ids()).finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Builds HTTP providers for every enabled service that has the
    /// credentials it needs. Services without a key are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &WallfetchConfig, keys: &ApiKeys) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.request_timeout_seconds))
            .user_agent(concat!("wallfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let settings = SearchSettings {
            per_page: config.per_page,
            target_width: config.target_width,
            target_height: config.target_height,
        };

        let mut registry = Self::new();
        for &id in &config.providers {
            let key = keys.for_provider(id).map(str::to_string);
            if key.is_none() && id.requires_key() {
                tracing::warn!(provider = %id, "no API key configured, provider disabled");
                continue;
            }

            let spec = match id {
                ProviderId::Pexels => pexels::spec(&settings),
                ProviderId::Pixabay => pixabay::spec(&settings),
                ProviderId::Unsplash => unsplash::spec(&settings),
                ProviderId::Wallhaven => wallhaven::spec(&settings),
            };
            registry.insert(Arc::new(HttpProvider::new(client.clone(), spec, key)));
        }

        Ok(registry)
    }

    /// Adds or replaces the provider registered under its id.
    pub fn insert(&mut self, provider: Arc<dyn ImageProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    #[must_use]
    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ImageProvider>> {
        self.providers.get(&id).cloned()
    }

    /// Picks one provider uniformly at random.
    #[must_use]
    pub fn pick_random(&self) -> Option<Arc<dyn ImageProvider>> {
        let all: Vec<&Arc<dyn ImageProvider>> = self.providers.values().collect();
        all.choose(&mut rand::rng()).map(|provider| Arc::clone(provider))
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ProviderId> { self.providers.keys().copied().collect() }

    #[must_use]
    pub fn len(&self) -> usize { self.providers.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.providers.is_empty() }
}
