//! Entity reputation heuristics
//!
//! Every entity starts at 50 and moves down (or stays) through an
//! ordered list of per-type rules. History feeds back: an entity seen
//! malicious before scores worse on every later observation. The rules
//! run inside the store's entry lock so the prior counters they read
//! and the counters the store advances belong to the same observation.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use regex::Regex;
use tracing::debug;
use vigil_common::config::ReputationConfig;
use vigil_common::entity::{Entity, EntityType, ScoreContext};

use crate::store::ReputationStore;

const BASELINE: f64 = 50.0;
/// Points lost per prior malicious sighting.
const HISTORY_PENALTY: f64 = 5.0;

pub struct ReputationScorer {
    config: ReputationConfig,
    store: Arc<ReputationStore>,
    digit_run: Regex,
}

impl ReputationScorer {
    pub fn new(config: ReputationConfig, store: Arc<ReputationStore>) -> Self {
        Self {
            config,
            store,
            digit_run: Regex::new(r"\d{4,}").expect("Failed to compile digit-run pattern"),
        }
    }

    /// Score one observation and persist it. Returns the updated entity.
    pub fn score(&self, entity_type: EntityType, value: &str, context: ScoreContext) -> Entity {
        let entity = self
            .store
            .observe(entity_type, value, context.malicious, |prior| match entity_type {
                EntityType::Ip => self.score_ip(value, context, prior),
                EntityType::Domain => self.score_domain(value, context, prior),
                EntityType::Url => self.score_url(value, context, prior),
                EntityType::Hash => self.score_hash(value, context, prior),
            });

        debug!(
            entity_type = %entity_type,
            value,
            score = entity.score,
            classification = %entity.classification,
            "scored entity"
        );
        entity
    }

    fn score_ip(&self, ip: &str, context: ScoreContext, prior: &Entity) -> (f64, Vec<String>) {
        let Ok(addr) = ip.parse::<IpAddr>() else {
            return (0.0, vec!["invalid".to_string()]);
        };

        let mut score = BASELINE;
        let mut factors = Vec::new();

        let private = match addr {
            IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
            IpAddr::V6(v6) => v6.is_loopback(),
        };
        if private {
            score -= 40.0;
            factors.push("private_ip".to_string());
        }
        if context.malicious {
            score -= 30.0;
            factors.push("flagged_malicious".to_string());
        }
        if context.tor_exit_node {
            score -= 25.0;
            factors.push("tor_exit".to_string());
        }
        if context.vpn {
            score -= 15.0;
            factors.push("vpn".to_string());
        }
        if context.cloud_provider {
            score -= 5.0;
            factors.push("cloud_hosting".to_string());
        }
        if prior.malicious_count > 0 {
            score -= prior.malicious_count as f64 * HISTORY_PENALTY;
            factors.push("bad_history".to_string());
        }

        (score, factors)
    }

    fn score_domain(&self, domain: &str, context: ScoreContext, prior: &Entity) -> (f64, Vec<String>) {
        let domain = domain.trim().to_lowercase();
        let Some((_, tld)) = domain.rsplit_once('.') else {
            return (0.0, vec!["invalid".to_string()]);
        };

        let mut score = BASELINE;
        let mut factors = Vec::new();

        if self.config.suspicious_tlds.iter().any(|t| t == tld) {
            score -= 20.0;
            factors.push("suspicious_tld".to_string());
        }
        if self.digit_run.is_match(&domain) {
            score -= 15.0;
            factors.push("excessive_numbers".to_string());
        }
        if domain.len() > self.config.long_domain_len {
            score -= 10.0;
            factors.push("long_domain".to_string());
        }
        if let Some(word) = self
            .config
            .suspicious_keywords
            .iter()
            .find(|w| domain.contains(w.as_str()))
        {
            score -= 10.0;
            factors.push(format!("suspicious_keyword_{word}"));
        }
        if context.recently_registered {
            score -= 20.0;
            factors.push("new_domain".to_string());
        }
        if context.malicious {
            score -= 35.0;
            factors.push("flagged_malicious".to_string());
        }
        if prior.malicious_count > 0 {
            score -= prior.malicious_count as f64 * HISTORY_PENALTY;
            factors.push("bad_history".to_string());
        }

        (score, factors)
    }

    fn score_url(&self, url: &str, context: ScoreContext, prior: &Entity) -> (f64, Vec<String>) {
        let Some(parts) = UrlParts::split(url) else {
            return (0.0, vec!["invalid".to_string()]);
        };

        // A URL inherits its host's domain score, then loses points for
        // URL-specific signals.
        let host = parts.host_without_port();
        let (mut score, mut factors) = self.score_domain(host, context, prior);
        if factors.first().map(String::as_str) == Some("invalid") {
            // IP-based hosts fail the domain shape check but are still
            // scoreable URLs.
            score = BASELINE;
            factors.clear();
        }

        if parts.scheme.eq_ignore_ascii_case("http") {
            score -= 10.0;
            factors.push("no_https".to_string());
        }
        if self
            .config
            .suspicious_paths
            .iter()
            .any(|p| parts.path.to_lowercase().contains(p.as_str()))
        {
            score -= 5.0;
            factors.push("suspicious_path".to_string());
        }
        if parts.query.len() > self.config.long_query_len {
            score -= 5.0;
            factors.push("long_query_string".to_string());
        }
        if host.parse::<Ipv4Addr>().is_ok() {
            score -= 15.0;
            factors.push("ip_based_url".to_string());
        }

        (score, factors)
    }

    fn score_hash(&self, hash: &str, context: ScoreContext, prior: &Entity) -> (f64, Vec<String>) {
        let valid = (32..=64).contains(&hash.len()) && hash.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return (0.0, vec!["invalid".to_string()]);
        }

        let mut score = BASELINE;
        let mut factors = Vec::new();

        if context.malicious {
            score = 0.0;
            factors.push("known_malware".to_string());
        }
        if context.suspicious {
            score -= 30.0;
            factors.push("suspicious_behavior".to_string());
        }
        if prior.malicious_count > 0 {
            score = 0.0;
            factors.push("malware_history".to_string());
        }

        (score, factors)
    }
}

/// Minimal scheme/host/path/query split. Enough for the heuristics; a
/// malformed URL is simply invalid.
struct UrlParts<'a> {
    scheme: &'a str,
    host: &'a str,
    path: &'a str,
    query: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Option<UrlParts<'a>> {
        let (scheme, rest) = url.split_once("://")?;
        if scheme.is_empty() || rest.is_empty() {
            return None;
        }
        let (authority, tail) = match rest.find(['/', '?']) {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return None;
        }
        let (path, query) = match tail.split_once('?') {
            Some((p, q)) => (p, q),
            None => (tail, ""),
        };
        Some(UrlParts {
            scheme,
            host: authority,
            path,
            query,
        })
    }

    fn host_without_port(&self) -> &str {
        match self.host.rsplit_once(':') {
            Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
                host
            }
            _ => self.host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::entity::Classification;

    fn scorer() -> ReputationScorer {
        ReputationScorer::new(ReputationConfig::default(), Arc::new(ReputationStore::new()))
    }

    #[test]
    fn test_clean_public_ip_stays_neutral() {
        let entity = scorer().score(EntityType::Ip, "203.0.113.5", ScoreContext::default());
        assert_eq!(entity.score, 50.0);
        assert_eq!(entity.classification, Classification::Unknown);
        assert!(entity.factors.is_empty());
    }

    #[test]
    fn test_malicious_tor_ip_penalized() {
        let context = ScoreContext {
            malicious: true,
            tor_exit_node: true,
            ..Default::default()
        };
        let entity = scorer().score(EntityType::Ip, "198.51.100.1", context);
        // 50 - 30 - 25, clamped at 0
        assert_eq!(entity.score, 0.0);
        assert!(entity.factors.contains(&"flagged_malicious".to_string()));
        assert!(entity.factors.contains(&"tor_exit".to_string()));
    }

    #[test]
    fn test_history_lowers_repeat_score() {
        let scorer = scorer();
        let context = ScoreContext {
            malicious: true,
            ..Default::default()
        };
        let first = scorer.score(EntityType::Ip, "198.51.100.2", context);
        let second = scorer.score(EntityType::Ip, "198.51.100.2", context);
        assert!(second.score < first.score);
        assert!(second.factors.contains(&"bad_history".to_string()));
        assert_eq!(second.malicious_count, 2);
        assert_eq!(second.occurrences, 2);
    }

    #[test]
    fn test_suspicious_domain_shape() {
        let entity = scorer().score(
            EntityType::Domain,
            "secure-login-44321.xyz",
            ScoreContext::default(),
        );
        // -20 tld, -15 digits, -10 keyword
        assert_eq!(entity.score, 5.0);
        assert_eq!(entity.classification, Classification::Malicious);
        assert!(entity.factors.contains(&"suspicious_tld".to_string()));
        assert!(entity.factors.contains(&"excessive_numbers".to_string()));
        assert!(entity
            .factors
            .iter()
            .any(|f| f.starts_with("suspicious_keyword_")));
    }

    #[test]
    fn test_http_url_with_suspicious_path() {
        let entity = scorer().score(
            EntityType::Url,
            "http://example.net/verify/session",
            ScoreContext::default(),
        );
        // 50 - 10 http - 5 path
        assert_eq!(entity.score, 35.0);
        assert!(entity.factors.contains(&"no_https".to_string()));
        assert!(entity.factors.contains(&"suspicious_path".to_string()));
    }

    #[test]
    fn test_ip_based_url() {
        let entity = scorer().score(
            EntityType::Url,
            "https://203.0.113.7:8443/index",
            ScoreContext::default(),
        );
        assert!(entity.factors.contains(&"ip_based_url".to_string()));
        assert!(!entity.factors.contains(&"invalid".to_string()));
    }

    #[test]
    fn test_malicious_hash_zeroed_forever() {
        let scorer = scorer();
        let hash = "d41d8cd98f00b204e9800998ecf8427e";
        let context = ScoreContext {
            malicious: true,
            ..Default::default()
        };
        let first = scorer.score(EntityType::Hash, hash, context);
        assert_eq!(first.score, 0.0);

        // Later benign sighting still scores 0 through history.
        let second = scorer.score(EntityType::Hash, hash, ScoreContext::default());
        assert_eq!(second.score, 0.0);
        assert!(second.factors.contains(&"malware_history".to_string()));
    }

    #[test]
    fn test_invalid_values_zeroed() {
        let scorer = scorer();
        assert_eq!(
            scorer
                .score(EntityType::Ip, "not-an-ip", ScoreContext::default())
                .score,
            0.0
        );
        assert_eq!(
            scorer
                .score(EntityType::Hash, "zzzz", ScoreContext::default())
                .score,
            0.0
        );
        assert_eq!(
            scorer
                .score(EntityType::Url, "no-scheme-here", ScoreContext::default())
                .score,
            0.0
        );
    }
}
