//! abuse.ch ThreatFox
//!
//! Keyless malware IOC search. The API always answers 200; the real
//! verdict lives in `query_status`.

use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct ThreatFox {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl ThreatFox {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }
}

#[async_trait::async_trait]
impl Provider for ThreatFox {
    fn name(&self) -> &'static str {
        "threatfox"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Hash]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let request = self
            .http
            .inner()
            .post(&self.settings.base_url)
            .json(&json!({"query": "search_ioc", "search_term": value}));

        let response = self.http.send_json(request).await?;
        if response["query_status"].as_str() != Some("ok") {
            return Ok(Value::Null);
        }

        // First entry only; ThreatFox orders results newest-first.
        let entry = &response["data"][0];
        if !entry.is_object() {
            return Ok(Value::Null);
        }

        Ok(json!({
            "threat_type": str_field(entry, "threat_type", ""),
            "malware": str_field(entry, "malware", ""),
            "confidence_level": entry["confidence_level"].as_u64().unwrap_or(0),
            "first_seen": str_field(entry, "first_seen", ""),
            "last_seen": str_field(entry, "last_seen", ""),
            "tags": entry["tags"].clone(),
            "ioc_type": str_field(entry, "ioc_type", ""),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_result_shape_maps_to_null() {
        let response = json!({"query_status": "no_result"});
        assert_ne!(response["query_status"].as_str(), Some("ok"));
    }
}
