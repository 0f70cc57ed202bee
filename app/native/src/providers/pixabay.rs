//! Pixabay photo search.

use serde_json::Value;

use super::http::{Auth, ProviderSpec, SearchSettings, collect_urls};
use super::ProviderId;

const ENDPOINT: &str = "https://pixabay.com/api/";

#[must_use]
pub fn spec(settings: &SearchSettings) -> ProviderSpec {
    ProviderSpec {
        id: ProviderId::Pixabay,
        endpoint: ENDPOINT,
        auth: Auth::Query("key"),
        query_param: "q",
        per_page_param: Some("per_page"),
        extra_params: vec![
            ("image_type", "photo".to_string()),
            ("orientation", "horizontal".to_string()),
            ("min_width", settings.target_width.to_string()),
            ("min_height", settings.target_height.to_string()),
        ],
        // Pixabay rejects page sizes below 3.
        per_page: settings.per_page.max(3),
        parse,
    }
}

#[must_use]
pub fn parse(body: &Value) -> Vec<String> { collect_urls(body, "hits", "/largeImageURL") }
