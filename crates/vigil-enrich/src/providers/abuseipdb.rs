//! AbuseIPDB
//!
//! Community abuse reports for IP addresses. Free tier: 1,000 checks
//! per day.

use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct AbuseIpDb {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl AbuseIpDb {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }
}

#[async_trait::async_trait]
impl Provider for AbuseIpDb {
    fn name(&self) -> &'static str {
        "abuseipdb"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let url = format!("{}/check", self.settings.base_url);
        let request = self
            .http
            .inner()
            .get(&url)
            .query(&[("ipAddress", value), ("maxAgeInDays", "90"), ("verbose", "")])
            .header("Key", self.settings.api_key.as_deref().unwrap_or_default())
            .header("Accept", "application/json");

        let response = self.http.send_json(request).await?;
        let data = &response["data"];
        if !data.is_object() {
            return Ok(Value::Null);
        }

        Ok(json!({
            "abuse_confidence_score": data["abuseConfidenceScore"].as_u64().unwrap_or(0),
            "usage_type": str_field(data, "usageType", "Unknown"),
            "isp": str_field(data, "isp", "Unknown"),
            "domain": str_field(data, "domain", ""),
            "country_code": str_field(data, "countryCode", ""),
            "is_whitelisted": data["isWhitelisted"].as_bool().unwrap_or(false),
            "total_reports": data["totalReports"].as_u64().unwrap_or(0),
            "last_reported_at": data["lastReportedAt"].clone(),
        }))
    }
}
