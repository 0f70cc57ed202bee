//! Unsplash photo search.

use serde_json::Value;

use super::http::{Auth, ProviderSpec, SearchSettings, collect_urls};
use super::ProviderId;

const ENDPOINT: &str = "https://api.unsplash.com/search/photos";

#[must_use]
pub fn spec(settings: &SearchSettings) -> ProviderSpec {
    ProviderSpec {
        id: ProviderId::Unsplash,
        endpoint: ENDPOINT,
        auth: Auth::Header { name: "Authorization", prefix: "Client-ID " },
        query_param: "query",
        per_page_param: Some("per_page"),
        extra_params: vec![("orientation", "landscape".to_string())],
        per_page: settings.per_page,
        parse,
    }
}

#[must_use]
pub fn parse(body: &Value) -> Vec<String> { collect_urls(body, "results", "/urls/full") }
