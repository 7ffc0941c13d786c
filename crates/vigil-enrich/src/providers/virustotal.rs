//! VirusTotal v3
//!
//! Analysis verdict counts for IPs, domains, URLs and file hashes.
//! Free tier: 4 requests per minute.

use std::sync::Arc;

use base64::Engine as _;
use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct VirusTotal {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl VirusTotal {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    async fn fetch(&self, endpoint: &str) -> ProviderResult<Value> {
        let url = format!("{}/{}", self.settings.base_url, endpoint);
        let request = self
            .http
            .inner()
            .get(&url)
            .header("x-apikey", self.settings.api_key.as_deref().unwrap_or_default());
        self.http.send_json(request).await
    }

    fn stats(attributes: &Value) -> Value {
        let stats = &attributes["last_analysis_stats"];
        json!({
            "malicious": stats["malicious"].as_u64().unwrap_or(0),
            "suspicious": stats["suspicious"].as_u64().unwrap_or(0),
            "harmless": stats["harmless"].as_u64().unwrap_or(0),
            "undetected": stats["undetected"].as_u64().unwrap_or(0),
        })
    }
}

#[async_trait::async_trait]
impl Provider for VirusTotal {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Ip, EntityType::Domain, EntityType::Url, EntityType::Hash]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled && self.settings.api_key.is_some()
    }

    async fn query(&self, entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        let response = match entity_type {
            EntityType::Ip => self.fetch(&format!("ip_addresses/{value}")).await?,
            EntityType::Domain => self.fetch(&format!("domains/{value}")).await?,
            EntityType::Url => {
                // VT addresses URLs by the unpadded url-safe base64 of
                // the URL itself.
                let id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(value);
                self.fetch(&format!("urls/{id}")).await?
            }
            EntityType::Hash => self.fetch(&format!("files/{value}")).await?,
        };

        let attributes = &response["data"]["attributes"];
        if !attributes.is_object() {
            return Ok(Value::Null);
        }

        let mut payload = Self::stats(attributes);
        match entity_type {
            EntityType::Ip => {
                payload["country"] = json!(str_field(attributes, "country", "Unknown"));
                payload["asn"] = attributes["asn"].clone();
                payload["as_owner"] = json!(str_field(attributes, "as_owner", "Unknown"));
                payload["reputation"] = json!(attributes["reputation"].as_i64().unwrap_or(0));
            }
            EntityType::Domain => {
                payload["reputation"] = json!(attributes["reputation"].as_i64().unwrap_or(0));
                payload["categories"] = attributes["categories"].clone();
                payload["creation_date"] = attributes["creation_date"].clone();
                payload["last_update_date"] = attributes["last_update_date"].clone();
            }
            EntityType::Url => {
                payload["categories"] = attributes["categories"].clone();
                payload["threat_names"] = attributes["threat_names"].clone();
            }
            EntityType::Hash => {
                payload["file_type"] = json!(str_field(attributes, "type_description", "Unknown"));
                payload["file_size"] = json!(attributes["size"].as_u64().unwrap_or(0));
                payload["tags"] = attributes["tags"].clone();
                payload["threat_label"] = json!(
                    attributes["popular_threat_classification"]["suggested_threat_label"]
                        .as_str()
                        .unwrap_or("Unknown")
                );
            }
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_id_is_base64url_without_padding() {
        let id = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode("http://evil-domain.xyz/drop.bin?x=1");
        assert!(!id.contains('='));
        assert!(!id.contains('+'));
        assert!(!id.contains('/'));
    }

    #[test]
    fn test_stats_defaults_to_zero() {
        let stats = VirusTotal::stats(&json!({"last_analysis_stats": {"malicious": 7}}));
        assert_eq!(stats["malicious"], 7);
        assert_eq!(stats["harmless"], 0);
    }
}
