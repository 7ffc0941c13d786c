//! Enrichment records
//!
//! One record per entity, holding the union of every provider payload
//! that answered, tagged by provider name. Records expire by TTL;
//! an expired record is a cache miss.

use crate::entity::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Merged enrichment for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub entity_type: EntityType,
    pub value: String,
    /// provider name -> provider-specific payload
    pub providers: BTreeMap<String, serde_json::Value>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub ttl: Duration,
}

impl EnrichmentRecord {
    pub fn new(entity_type: EntityType, value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            entity_type,
            value: value.into(),
            providers: BTreeMap::new(),
            fetched_at: chrono::Utc::now(),
            ttl,
        }
    }

    /// Attach one provider's payload to the union.
    pub fn add_payload(&mut self, provider: impl Into<String>, payload: serde_json::Value) {
        self.providers.insert(provider.into(), payload);
    }

    pub fn payload(&self, provider: &str) -> Option<&serde_json::Value> {
        self.providers.get(provider)
    }

    /// True while `now - fetched_at < ttl`.
    pub fn is_fresh(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }

    pub fn is_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        !self.is_fresh(now)
    }

    /// Providers that contributed, in stable order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(|k| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_union() {
        let mut record = EnrichmentRecord::new(
            EntityType::Ip,
            "203.0.113.5",
            Duration::from_secs(86_400),
        );
        record.add_payload("abuseipdb", json!({"abuse_confidence_score": 90}));
        record.add_payload("greynoise", json!({"classification": "malicious"}));

        assert_eq!(record.provider_names(), vec!["abuseipdb", "greynoise"]);
        assert_eq!(
            record.payload("abuseipdb").and_then(|p| p["abuse_confidence_score"].as_u64()),
            Some(90)
        );
    }

    #[test]
    fn test_ttl_expiry() {
        let mut record =
            EnrichmentRecord::new(EntityType::Hash, "d41d8cd98f00b204e9800998ecf8427e", Duration::from_secs(60));
        let now = chrono::Utc::now();
        assert!(record.is_fresh(now));

        record.fetched_at = now - chrono::Duration::seconds(61);
        assert!(record.is_expired(now));
    }
}
