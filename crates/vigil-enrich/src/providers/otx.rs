//! AlienVault OTX
//!
//! Pulse membership for IPs, domains and file hashes. Pulse names are
//! truncated to the first five; hash lookups additionally collect the
//! malware families named across those pulses.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

const PULSE_NAME_LIMIT: usize = 5;

pub struct AlienVaultOtx {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl AlienVaultOtx {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    async fn fetch(&self, endpoint: &str) -> ProviderResult<Value> {
        let url = format!("{}/{}", self.settings.base_url, endpoint);
        let request = self
            .http
            .inner()
            .get(&url)
            .header("X-OTX-API-KEY", self.settings.api_key.as_deref().unwrap_or_default())
            .header("Accept", "application/json");
        self.http.send_json(request).await
    }

    fn pulses(response: &Value) -> Vec<&Value> {
        response["pulse_info"]["pulses"]
            .as_array()
            .map(|pulses| pulses.iter().take(PULSE_NAME_LIMIT).collect())
            .unwrap_or_default()
    }

    fn threat_types(response: &Value) -> Vec<String> {
        Self::pulses(response)
            .iter()
            .map(|pulse| str_field(pulse, "name", "Unknown"))
            .collect()
    }
}

#[async_trait::async_trait]
impl Provider for AlienVaultOtx {
    fn name(&self) -> &'static str {
        "alienvault_otx"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip, EntityType::Domain, EntityType::Hash]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let response = match entity_type {
            EntityType::Ip => self.fetch(&format!("indicators/IPv4/{value}/general")).await?,
            EntityType::Domain => self.fetch(&format!("indicators/domain/{value}/general")).await?,
            EntityType::Hash => self.fetch(&format!("indicators/file/{value}/general")).await?,
            EntityType::Url => return Ok(Value::Null),
        };

        if !response.is_object() {
            return Ok(Value::Null);
        }

        let pulse_count = response["pulse_info"]["count"].as_u64().unwrap_or(0);
        let threat_types = Self::threat_types(&response);

        let payload = match entity_type {
            EntityType::Ip => json!({
                "pulse_count": pulse_count,
                "reputation": response["reputation"].as_i64().unwrap_or(0),
                "country_code": str_field(&response, "country_code", ""),
                "asn": str_field(&response, "asn", ""),
                "threat_types": threat_types,
            }),
            EntityType::Domain => json!({
                "pulse_count": pulse_count,
                "threat_types": threat_types,
                "alexa_rank": response["alexa"].clone(),
            }),
            EntityType::Hash => {
                let families: Vec<String> = Self::pulses(&response)
                    .iter()
                    .flat_map(|pulse| pulse["malware_families"].as_array().into_iter().flatten())
                    .filter_map(|f| f.as_str().or_else(|| f["display_name"].as_str()))
                    .map(String::from)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                json!({
                    "pulse_count": pulse_count,
                    "threat_types": threat_types,
                    "malware_families": families,
                })
            }
            EntityType::Url => unreachable!(),
        };

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_names_truncated() {
        let pulses: Vec<Value> = (0..8).map(|i| json!({"name": format!("pulse-{i}")})).collect();
        let response = json!({"pulse_info": {"count": 8, "pulses": pulses}});
        assert_eq!(AlienVaultOtx::threat_types(&response).len(), PULSE_NAME_LIMIT);
    }
}
