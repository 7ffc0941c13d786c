//! Shodan
//!
//! Exposed ports, services and known vulnerabilities for an IP. A 404
//! from the host endpoint is an answer ("nothing indexed"), not a
//! failure, and is recorded as an informational payload.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::{ProviderError, ProviderResult};
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct Shodan {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl Shodan {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    fn summarize(response: &Value) -> Value {
        let mut ports = BTreeSet::new();
        let mut services = BTreeSet::new();
        let mut vulns = BTreeSet::new();

        for service in response["data"].as_array().into_iter().flatten() {
            if let Some(port) = service["port"].as_u64() {
                ports.insert(port);
            }
            if let Some(product) = service["product"].as_str() {
                services.insert(product.to_string());
            }
            if let Some(map) = service["vulns"].as_object() {
                vulns.extend(map.keys().cloned());
            }
        }

        json!({
            "org": str_field(response, "org", "Unknown"),
            "asn": str_field(response, "asn", ""),
            "isp": str_field(response, "isp", "Unknown"),
            "country_code": str_field(response, "country_code", ""),
            "city": str_field(response, "city", ""),
            "ports": ports.into_iter().collect::<Vec<_>>(),
            "services": services.into_iter().collect::<Vec<_>>(),
            "vulns": vulns.into_iter().collect::<Vec<_>>(),
            "hostnames": response["hostnames"].clone(),
            "os": response["os"].clone(),
            "last_update": response["last_update"].clone(),
        })
    }
}

#[async_trait::async_trait]
impl Provider for Shodan {
    fn name(&self) -> &'static str {
        "shodan"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, _entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let url = format!("{}/shodan/host/{}", self.settings.base_url, value);
        let request = self
            .http
            .inner()
            .get(&url)
            .query(&[("key", self.settings.api_key.as_deref().unwrap_or_default())]);

        match self.http.send_json(request).await {
            Ok(response) => Ok(Self::summarize(&response)),
            Err(ProviderError::Status(404)) => Ok(json!({
                "error": "No information available",
            })),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_dedups_services() {
        let response = json!({
            "org": "Evil Hosting",
            "data": [
                {"port": 22, "product": "OpenSSH"},
                {"port": 80, "product": "nginx", "vulns": {"CVE-2021-23017": {}}},
                {"port": 8080, "product": "nginx"},
            ],
        });
        let summary = Shodan::summarize(&response);
        assert_eq!(summary["ports"], json!([22, 80, 8080]));
        assert_eq!(summary["services"], json!(["OpenSSH", "nginx"]));
        assert_eq!(summary["vulns"], json!(["CVE-2021-23017"]));
    }
}
