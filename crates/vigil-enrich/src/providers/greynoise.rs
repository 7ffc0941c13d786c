//! GreyNoise
//!
//! Internet background-noise classification for IPs. Works keyless
//! against the community endpoint; a key unlocks the richer enterprise
//! record, so the provider stays enabled either way.

use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct GreyNoise {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl GreyNoise {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    async fn community(&self, ip: &str) -> ProviderResult<Value> {
        let url = format!("{}/community/{}", self.settings.base_url, ip);
        let request = self.http.inner().get(&url).header("Accept", "application/json");
        let response = self.http.send_json(request).await?;

        Ok(json!({
            "noise": response["noise"].as_bool().unwrap_or(false),
            "riot": response["riot"].as_bool().unwrap_or(false),
            "classification": str_field(&response, "classification", "unknown"),
            "name": str_field(&response, "name", ""),
            "link": str_field(&response, "link", ""),
            "last_seen": str_field(&response, "last_seen", ""),
        }))
    }

    async fn keyed(&self, ip: &str, api_key: &str) -> ProviderResult<Value> {
        let url = format!("{}/ip/{}", self.settings.base_url, ip);
        let request = self
            .http
            .inner()
            .get(&url)
            .header("key", api_key)
            .header("Accept", "application/json");
        let response = self.http.send_json(request).await?;

        Ok(json!({
            "seen": response["seen"].as_bool().unwrap_or(false),
            "classification": str_field(&response, "classification", "unknown"),
            "actor": str_field(&response, "actor", ""),
            "tags": response["tags"].clone(),
            "first_seen": str_field(&response, "first_seen", ""),
            "last_seen": str_field(&response, "last_seen", ""),
            "metadata": {
                "country": str_field(&response["metadata"], "country", ""),
                "city": str_field(&response["metadata"], "city", ""),
                "organization": str_field(&response["metadata"], "organization", ""),
                "asn": str_field(&response["metadata"], "asn", ""),
            },
        }))
    }
}

#[async_trait::async_trait]
impl Provider for GreyNoise {
    fn name(&self) -> &'static str {
        "greynoise"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        match self.settings.api_key.as_deref() {
            // Enterprise record, community as fallback when it fails.
            Some(key) => match self.keyed(value, key).await {
                Ok(payload) => Ok(payload),
                Err(_) => self.community(value).await,
            },
            None => self.community(value).await,
        }
    }
}
