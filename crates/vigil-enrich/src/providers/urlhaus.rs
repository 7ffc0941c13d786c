//! abuse.ch URLhaus
//!
//! Keyless malware-distribution lookups: URL status, host history and
//! payload records. Hash lookups accept MD5 and SHA-256 only; URLhaus
//! does not index SHA-1.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use vigil_common::config::ProviderSettings;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::http::HttpClient;
use crate::provider::Provider;
use crate::providers::str_field;

pub struct UrlHaus {
    settings: ProviderSettings,
    http: Arc<HttpClient>,
}

impl UrlHaus {
    pub fn new(settings: ProviderSettings, http: Arc<HttpClient>) -> Self {
        Self { settings, http }
    }

    async fn post(&self, endpoint: &str, form: &[(&str, &str)]) -> ProviderResult<Value> {
        let url = format!("{}{}", self.settings.base_url, endpoint);
        let request = self.http.inner().post(&url).form(form);
        self.http.send_json(request).await
    }

    fn dedup_strings(values: impl IntoIterator<Item = String>) -> Vec<String> {
        values.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
    }

    async fn lookup_url(&self, value: &str) -> ProviderResult<Value> {
        let response = self.post("url/", &[("url", value)]).await?;
        if response["query_status"].as_str() != Some("ok") {
            return Ok(Value::Null);
        }

        let families = Self::dedup_strings(
            response["payloads"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|p| p["signature"].as_str())
                .map(String::from),
        );

        Ok(json!({
            "url_status": str_field(&response, "url_status", ""),
            "threat": str_field(&response, "threat", ""),
            "tags": response["tags"].clone(),
            "urlhaus_reference": str_field(&response, "urlhaus_reference", ""),
            "date_added": str_field(&response, "date_added", ""),
            "reporter": str_field(&response, "reporter", ""),
            "malware_families": families,
        }))
    }

    async fn lookup_host(&self, value: &str) -> ProviderResult<Value> {
        let response = self.post("host/", &[("host", value)]).await?;
        if response["query_status"].as_str() != Some("ok") {
            return Ok(Value::Null);
        }

        let tags = Self::dedup_strings(
            response["urls"]
                .as_array()
                .into_iter()
                .flatten()
                .flat_map(|u| u["tags"].as_array().into_iter().flatten())
                .filter_map(|t| t.as_str())
                .map(String::from),
        );

        Ok(json!({
            "firstseen": str_field(&response, "firstseen", ""),
            "url_count": response["url_count"]
                .as_str()
                .and_then(|s| s.parse::<u64>().ok())
                .or_else(|| response["url_count"].as_u64())
                .unwrap_or(0),
            "blacklists": response["blacklists"].clone(),
            "tags": tags,
        }))
    }

    async fn lookup_payload(&self, value: &str) -> ProviderResult<Value> {
        let field = match value.len() {
            32 => "md5_hash",
            64 => "sha256_hash",
            _ => return Ok(Value::Null),
        };

        let response = self.post("payload/", &[(field, value)]).await?;
        if response["query_status"].as_str() != Some("ok") {
            return Ok(Value::Null);
        }

        Ok(json!({
            "file_type": str_field(&response, "file_type", ""),
            "file_size": response["file_size"]
                .as_str()
                .and_then(|s| s.parse::<u64>().ok())
                .or_else(|| response["file_size"].as_u64())
                .unwrap_or(0),
            "signature": str_field(&response, "signature", ""),
            "firstseen": str_field(&response, "firstseen", ""),
            "lastseen": str_field(&response, "lastseen", ""),
            "url_count": response["url_count"]
                .as_str()
                .and_then(|s| s.parse::<u64>().ok())
                .or_else(|| response["url_count"].as_u64())
                .unwrap_or(0),
            "virustotal": response["virustotal"].clone(),
        }))
    }
}

#[async_trait::async_trait]
impl Provider for UrlHaus {
    fn name(&self) -> &'static str {
        "urlhaus"
    }

    fn capabilities(&self) -> &'static [EntityType] {
        &[EntityType::Domain, EntityType::Url, EntityType::Hash]
    }

    fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    async fn query(&self, entity_type: EntityType, value: &str) -> ProviderResult<Value> {
        match entity_type {
            EntityType::Url => self.lookup_url(value).await,
            EntityType::Domain => self.lookup_host(value).await,
            EntityType::Hash => self.lookup_payload(value).await,
            EntityType::Ip => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_is_not_queryable() {
        // 40 hex chars has no URLhaus payload endpoint field.
        let sha1 = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        assert_eq!(sha1.len(), 40);
        assert!(!matches!(sha1.len(), 32 | 64));
    }

    #[test]
    fn test_family_dedup() {
        let families = UrlHaus::dedup_strings(
            ["CobaltStrike", "Emotet", "CobaltStrike"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(families, vec!["CobaltStrike".to_string(), "Emotet".to_string()]);
    }
}
