//! Pulsedive
//!
//! Risk verdicts and feed memberships for IPs, domains and URLs.

use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct Pulsedive {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl Pulsedive {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    fn names(value: &Value) -> Vec<String> {
        value
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|entry| entry["name"].as_str())
            .map(String::from)
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for Pulsedive {
    fn name(&self) -> &'static str {
        "pulsedive"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip, EntityType::Domain, EntityType::Url]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let url = format!("{}/info.php", self.settings.base_url);
        let request = self.http.inner().get(&url).query(&[
            ("indicator", value),
            ("key", self.settings.api_key.as_deref().unwrap_or_default()),
        ]);

        let response = self.http.send_json(request).await?;
        if response["error"].is_string() || !response["risk"].is_string() {
            return Ok(Value::Null);
        }

        Ok(json!({
            "risk": str_field(&response, "risk", "unknown"),
            "risk_recommended": response["riskfactors"]["risk_recommended"]
                .as_str()
                .unwrap_or("unknown"),
            "threat_count": response["threats"].as_u64()
                .or_else(|| response["threats"].as_array().map(|a| a.len() as u64))
                .unwrap_or(0),
            "threats": Self::names(&response["threats_data"]),
            "feeds": Self::names(&response["feeds"]),
            "properties": Self::names(&response["properties"]),
        }))
    }
}
