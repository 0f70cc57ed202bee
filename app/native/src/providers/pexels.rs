//! Pexels photo search.

use serde_json::Value;

use super::http::{Auth, ProviderSpec, SearchSettings, collect_urls};
use super::ProviderId;

const ENDPOINT: &str = "https://api.pexels.com/v1/search";

#[must_use]
pub fn spec(settings: &SearchSettings) -> ProviderSpec {
    ProviderSpec {
        id: ProviderId::Pexels,
        endpoint: ENDPOINT,
        auth: Auth::Header { name: "Authorization", prefix: "" },
        query_param: "query",
        per_page_param: Some("per_page"),
        extra_params: vec![("orientation", "landscape".to_string())],
        per_page: settings.per_page,
        parse,
    }
}

/// Original-size image URLs from a search response.
#[must_use]
pub fn parse(body: &Value) -> Vec<String> { collect_urls(body, "photos", "/src/original") }

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "page": 1,
            "per_page": 2,
            "photos": [
                { "id": 1, "width": 6000, "height": 4000,
                  "src": { "original": "https://images.pexels.com/photos/1/a.jpeg", "large": "x" } },
                { "id": 2, "src": { "original": "https://images.pexels.com/photos/2/b.jpeg" } }
            ],
            "next_page": "https://api.pexels.com/v1/search/?page=2"
        });

        assert_eq!(parse(&body), vec![
            "https://images.pexels.com/photos/1/a.jpeg".to_string(),
            "https://images.pexels.com/photos/2/b.jpeg".to_string(),
        ]);
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse(&json!({ "page": 9, "photos": [] })).is_empty());
    }
}
