//! Enrichment risk summary
//!
//! Folds the merged provider payloads of one finding into a [0,100]
//! risk figure plus human-readable threat indicator strings. Each
//! provider signal contributes a capped amount so no single noisy
//! source dominates.

use serde_json::Value;
use vigil_common::enrichment::EnrichmentRecord;
use vigil_common::entity::EntityType;
use vigil_common::ioc::{IocSet, IocType};

#[derive(Debug, Clone, Default)]
pub struct RiskSummary {
    /// Risk in [0,100] derived from enrichment alone.
    pub score: f64,
    pub threat_indicators: Vec<String>,
}

/// Score the enrichment outcome for one finding.
pub fn summarize_risk(iocs: &IocSet, ioc_density: f64, records: &[EnrichmentRecord]) -> RiskSummary {
    let mut score = (ioc_density * 2.0).min(20.0);
    let mut indicators = Vec::new();

    if iocs.count(IocType::Hash) > 0 {
        indicators.push("File hashes detected".to_string());
    }
    if iocs.count(IocType::CryptoAddress) > 0 {
        indicators.push("Cryptocurrency addresses found".to_string());
    }
    if iocs.count(IocType::Cve) > 0 {
        indicators.push("CVE references detected".to_string());
    }

    for record in records {
        match record.entity_type {
            EntityType::Ip => {
                if let Some(payload) = record.payload("abuseipdb") {
                    let confidence = payload["abuse_confidence_score"].as_u64().unwrap_or(0) as f64;
                    score += (confidence / 2.0).min(25.0);
                }
                score += vt_malicious(record, 5.0, 15.0);
                if let Some(payload) = record.payload("greynoise") {
                    if payload["classification"].as_str() == Some("malicious") {
                        score += 10.0;
                    }
                }
            }
            EntityType::Domain => {
                score += vt_malicious(record, 5.0, 15.0);
                if let Some(payload) = record.payload("urlhaus") {
                    if payload["url_count"].as_u64().unwrap_or(0) > 0 {
                        score += 15.0;
                    }
                }
            }
            EntityType::Url => {
                if let Some(payload) = record.payload("phishtank") {
                    if payload["in_database"].as_bool().unwrap_or(false) {
                        score += 20.0;
                        push_unique(&mut indicators, "Known phishing URL".to_string());
                    }
                }
                if let Some(payload) = record.payload("urlhaus") {
                    if payload["url_status"].as_str() == Some("online") {
                        score += 15.0;
                    }
                    push_families(&mut indicators, &payload["malware_families"]);
                }
            }
            EntityType::Hash => {
                score += vt_malicious(record, 3.0, 20.0);
                if let Some(payload) = record.payload("threatfox") {
                    let confidence = payload["confidence_level"].as_u64().unwrap_or(0) as f64;
                    score += (confidence / 2.0).min(15.0);
                    if let Some(malware) = payload["malware"].as_str() {
                        if !malware.is_empty() {
                            push_unique(&mut indicators, format!("Known malware: {malware}"));
                        }
                    }
                }
            }
        }
    }

    RiskSummary {
        score: score.min(100.0),
        threat_indicators: indicators,
    }
}

fn vt_malicious(record: &EnrichmentRecord, per_hit: f64, cap: f64) -> f64 {
    record
        .payload("virustotal")
        .map(|payload| {
            let malicious = payload["malicious"].as_u64().unwrap_or(0) as f64;
            (malicious * per_hit).min(cap)
        })
        .unwrap_or(0.0)
}

fn push_families(indicators: &mut Vec<String>, families: &Value) {
    for family in families.as_array().into_iter().flatten() {
        if let Some(name) = family.as_str() {
            push_unique(indicators, format!("Known malware: {name}"));
        }
    }
}

fn push_unique(indicators: &mut Vec<String>, indicator: String) {
    if !indicators.contains(&indicator) {
        indicators.push(indicator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use vigil_common::ioc::IocType;

    fn record(entity_type: EntityType, value: &str) -> EnrichmentRecord {
        EnrichmentRecord::new(entity_type, value, Duration::from_secs(60))
    }

    #[test]
    fn test_no_enrichment_scores_density_only() {
        let mut iocs = IocSet::new();
        iocs.insert(IocType::Ip, "203.0.113.5");
        let summary = summarize_risk(&iocs, 4.0, &[]);
        assert_eq!(summary.score, 8.0);
        assert!(summary.threat_indicators.is_empty());
    }

    #[test]
    fn test_signal_caps_apply() {
        let mut rec = record(EntityType::Ip, "203.0.113.5");
        rec.add_payload("abuseipdb", json!({"abuse_confidence_score": 100}));
        rec.add_payload("virustotal", json!({"malicious": 40}));
        rec.add_payload("greynoise", json!({"classification": "malicious"}));

        let summary = summarize_risk(&IocSet::new(), 0.0, &[rec]);
        // 25 (abuse cap) + 15 (vt cap) + 10 (greynoise)
        assert_eq!(summary.score, 50.0);
    }

    #[test]
    fn test_phishing_and_malware_indicators() {
        let mut url_rec = record(EntityType::Url, "http://evil-domain.xyz/login");
        url_rec.add_payload("phishtank", json!({"in_database": true}));
        url_rec.add_payload(
            "urlhaus",
            json!({"url_status": "online", "malware_families": ["Emotet"]}),
        );

        let mut hash_rec = record(EntityType::Hash, "d41d8cd98f00b204e9800998ecf8427e");
        hash_rec.add_payload(
            "threatfox",
            json!({"confidence_level": 90, "malware": "Emotet"}),
        );

        let mut iocs = IocSet::new();
        iocs.insert(IocType::Hash, "d41d8cd98f00b204e9800998ecf8427e");

        let summary = summarize_risk(&iocs, 0.0, &[url_rec, hash_rec]);
        assert!(summary.score > 40.0);
        assert!(summary.threat_indicators.contains(&"Known phishing URL".to_string()));
        assert!(summary.threat_indicators.contains(&"File hashes detected".to_string()));
        // Family reported twice, recorded once.
        assert_eq!(
            summary
                .threat_indicators
                .iter()
                .filter(|i| i.as_str() == "Known malware: Emotet")
                .count(),
            1
        );
    }

    #[test]
    fn test_total_capped_at_100() {
        let mut records = Vec::new();
        for i in 0..6 {
            let mut rec = record(EntityType::Ip, &format!("203.0.113.{i}"));
            rec.add_payload("abuseipdb", json!({"abuse_confidence_score": 100}));
            rec.add_payload("virustotal", json!({"malicious": 40}));
            records.push(rec);
        }
        let summary = summarize_risk(&IocSet::new(), 50.0, &records);
        assert_eq!(summary.score, 100.0);
    }
}
