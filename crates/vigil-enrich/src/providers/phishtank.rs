//! PhishTank
//!
//! Community phishing-URL database. Lookups POST the base64 of the URL.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct PhishTank {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl PhishTank {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }
}

#[async_trait::async_trait]
impl Provider for PhishTank {
    fn name(&self) -> &'static str {
        "phishtank"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Url]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        let url = format!("{}/checkurl/", self.settings.base_url);
        let request = self.http.inner().post(&url).form(&[
            ("url", encoded.as_str()),
            ("format", "json"),
            ("app_key", self.settings.api_key.as_deref().unwrap_or_default()),
        ]);

        let response = self.http.send_json(request).await?;
        let results = &response["results"];
        if !results.is_object() {
            return Ok(Value::Null);
        }

        Ok(json!({
            "in_database": results["in_database"].as_bool().unwrap_or(false),
            "phish_id": results["phish_id"].clone(),
            "phish_detail_url": str_field(results, "phish_detail_url", ""),
            "verified": results["verified"].as_bool().unwrap_or(false),
            "verified_at": str_field(results, "verified_at", ""),
            "valid": results["valid"].as_bool().unwrap_or(false),
        }))
    }
}
