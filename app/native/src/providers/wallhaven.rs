//! Wallhaven wallpaper search.
//!
//! Searching works without a key; a key only unlocks restricted content.

use serde_json::Value;

use super::http::{Auth, ProviderSpec, SearchSettings, collect_urls};
use super::ProviderId;

const ENDPOINT: &str = "https://wallhaven.cc/api/v1/search";

#[must_use]
pub fn spec(settings: &SearchSettings) -> ProviderSpec {
    ProviderSpec {
        id: ProviderId::Wallhaven,
        endpoint: ENDPOINT,
        auth: Auth::Query("apikey"),
        query_param: "q",
        // Page size is fixed server-side.
        per_page_param: None,
        extra_params: vec![
            ("categories", "100".to_string()),
            ("purity", "100".to_string()),
            ("atleast", format!("{}x{}", settings.target_width, settings.target_height)),
        ],
        per_page: settings.per_page,
        parse,
    }
}

#[must_use]
pub fn parse(body: &Value) -> Vec<String> { collect_urls(body, "data", "/path") }

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "data": [
                { "id": "94x38z", "resolution": "1920x1080",
                  "path": "https://w.wallhaven.cc/full/94/wallhaven-94x38z.jpg" },
                { "id": "ymjl5d", "path": "https://w.wallhaven.cc/full/ym/wallhaven-ymjl5d.png" }
            ],
            "meta": { "current_page": 1, "last_page": 3 }
        });

        assert_eq!(parse(&body), vec![
            "https://w.wallhaven.cc/full/94/wallhaven-94x38z.jpg".to_string(),
            "https://w.wallhaven.cc/full/ym/wallhaven-ymjl5d.png".to_string(),
        ]);
    }

    #[test]
    fn test_spec_requests_minimum_resolution_without_page_size() {
        let spec = spec(&SearchSettings { per_page: 15, target_width: 3840, target_height: 2160 });

        assert!(spec.per_page_param.is_none());
        let params = spec.search_params("mountains", 2);
        assert!(params.contains(&("atleast", "3840x2160".to_string())));
        assert!(!params.iter().any(|(name, _)| *name == "per_page"));
    }
}
