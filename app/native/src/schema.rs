//! JSON Schema for the configuration file.

use crate::config::WallfetchConfig;

/// Generates a JSON Schema for the wallfetch configuration.
#[must_use]
pub fn generate_schema() -> schemars::Schema {
    let mut schema = schemars::schema_for!(WallfetchConfig);

    if let Some(obj) = schema.as_object_mut() {
        obj.insert("$id".to_string(), serde_json::json!("wallfetch.schema.json"));
    }

    schema
}

/// Pretty-printed JSON Schema, ready to be saved next to the config file.
#[must_use]
pub fn generate_schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_schema_produces_valid_json() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema_json()).unwrap();

        assert_eq!(parsed["$id"], "wallfetch.schema.json");
        assert_eq!(parsed["title"], "WallfetchConfig");
        assert!(parsed["properties"]["runIntervalHours"].is_object());
        assert!(parsed["properties"]["retryAttempts"].is_object());
        assert!(parsed["properties"]["tagStrategy"].is_object());
    }

    #[test]
    fn test_schema_lists_every_provider() {
        let json = generate_schema_json();
        for provider in ["pexels", "pixabay", "unsplash", "wallhaven"] {
            assert!(json.contains(provider), "schema is missing {provider}");
        }
    }
}
