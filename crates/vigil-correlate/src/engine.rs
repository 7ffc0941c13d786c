//! Pairwise correlation scan
//!
//! Every unordered pair in the supplied window is scored for
//! relatedness. The scan is O(n^2) in window size; the engine truncates
//! its input to the newest `max_window_entries` findings so a
//! scheduling gap cannot make a sweep unbounded.

use chrono::Duration;
use tracing::{debug, info};
use vigil_common::config::CorrelationConfig;
use vigil_common::correlation::CorrelationEdge;
use vigil_common::finding::Finding;
use vigil_common::ioc::IocType;

use crate::mitre::MitreMapper;

const IOC_TYPE_POINTS: f64 = 0.3;
const KEYWORD_POINTS: f64 = 0.1;
const SAME_SOURCE_POINTS: f64 = 0.2;
const NEAR_TIME_POINTS: f64 = 0.2;
const FAR_TIME_POINTS: f64 = 0.1;

pub struct CorrelationEngine {
    config: CorrelationConfig,
    mapper: MitreMapper,
}

impl CorrelationEngine {
    pub fn new(config: CorrelationConfig) -> Self {
        Self {
            config,
            mapper: MitreMapper::new(),
        }
    }

    /// Scan the window and return the retained edges (score above the
    /// retention threshold).
    pub fn correlate(&self, window: &[Finding]) -> Vec<CorrelationEdge> {
        let scan = self.bound_window(window);
        let mut edges = Vec::new();

        for (i, a) in scan.iter().enumerate() {
            for b in &scan[i + 1..] {
                let edge = self.score_pair(a, b);
                if edge.score > self.config.retention_threshold {
                    debug!(
                        finding_a = %edge.finding_a,
                        finding_b = %edge.finding_b,
                        score = edge.score,
                        "retained correlation edge"
                    );
                    edges.push(edge);
                }
            }
        }

        info!(
            window = scan.len(),
            correlations = edges.len(),
            "correlation sweep complete"
        );
        edges
    }

    /// Newest `max_window_entries` findings, bounding the O(n^2) pass.
    fn bound_window<'a>(&self, window: &'a [Finding]) -> Vec<&'a Finding> {
        let mut scan: Vec<&Finding> = window.iter().collect();
        if scan.len() > self.config.max_window_entries {
            scan.sort_by_key(|f| std::cmp::Reverse(f.timestamp));
            scan.truncate(self.config.max_window_entries);
        }
        scan
    }

    fn score_pair(&self, a: &Finding, b: &Finding) -> CorrelationEdge {
        let mut edge = CorrelationEdge::new(a.id, b.id);
        let mut score = 0.0;

        for ioc_type in IocType::ALL {
            let shared = a.iocs.intersection(&b.iocs, ioc_type);
            if !shared.is_empty() {
                score += IOC_TYPE_POINTS;
                edge.shared_iocs.insert(ioc_type, shared);
            }
        }

        // Multiple shared keywords compound.
        let keywords_b: Vec<String> = b.keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut shared_keywords: Vec<String> = a
            .keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter(|k| keywords_b.contains(k))
            .collect();
        shared_keywords.sort();
        shared_keywords.dedup();
        score += shared_keywords.len() as f64 * KEYWORD_POINTS;
        edge.shared_keywords = shared_keywords;

        if a.source == b.source {
            score += SAME_SOURCE_POINTS;
        }

        let gap = (a.timestamp - b.timestamp).abs();
        if gap < Duration::from_std(self.config.near_duration).unwrap_or(Duration::hours(1)) {
            score += NEAR_TIME_POINTS;
        } else if gap < Duration::from_std(self.config.far_duration).unwrap_or(Duration::hours(2)) {
            score += FAR_TIME_POINTS;
        }

        edge.score = score.min(1.0);
        if edge.score > self.config.retention_threshold {
            edge.mitre_techniques = self.mapper.pair_techniques(a, b);
        }
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::finding::RawFinding;

    fn finding(source: &str, title: &str, keywords: &[&str]) -> Finding {
        let mut raw = RawFinding::new(source, title, "");
        raw.keywords = keywords.iter().map(|k| k.to_string()).collect();
        Finding::from_raw(raw)
    }

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(CorrelationConfig::default())
    }

    #[test]
    fn test_shared_ioc_same_source_near_time_retained() {
        let mut a = finding("Pastebin", "dump one", &[]);
        a.iocs.insert(IocType::Ip, "203.0.113.5");
        let mut b = finding("Pastebin", "dump two", &[]);
        b.iocs.insert(IocType::Ip, "203.0.113.5");

        let edges = engine().correlate(&[a, b]);
        assert_eq!(edges.len(), 1);
        // 0.3 ioc + 0.2 source + 0.2 time
        assert!((edges[0].score - 0.7).abs() < 1e-9);
        assert_eq!(
            edges[0].shared_iocs.get(&IocType::Ip),
            Some(&vec!["203.0.113.5".to_string()])
        );
    }

    #[test]
    fn test_unrelated_pair_dropped() {
        let a = finding("Pastebin", "dump", &["breach"]);
        let mut b = finding("Reddit", "post", &["ransomware"]);
        b.timestamp = a.timestamp - Duration::hours(5);
        assert!(engine().correlate(&[a, b]).is_empty());
    }

    #[test]
    fn test_keywords_compound() {
        let mut a = finding("Pastebin", "x", &["breach", "dump", "combo"]);
        let mut b = finding("Reddit", "y", &["BREACH", "dump", "combo"]);
        // Move outside both time bonuses.
        b.timestamp = a.timestamp - Duration::hours(3);
        a.iocs.insert(IocType::Domain, "evil.example");
        b.iocs.insert(IocType::Domain, "evil.example");

        let edges = engine().correlate(&[a, b]);
        assert_eq!(edges.len(), 1);
        // 0.3 ioc + 3 * 0.1 keywords
        assert!((edges[0].score - 0.6).abs() < 1e-9);
        assert_eq!(edges[0].shared_keywords.len(), 3);
    }

    #[test]
    fn test_score_capped_at_one() {
        let mut a = finding("Pastebin", "x", &["breach", "dump", "combo", "leak", "hacked"]);
        let mut b = finding("Pastebin", "y", &["breach", "dump", "combo", "leak", "hacked"]);
        a.iocs.insert(IocType::Ip, "203.0.113.5");
        a.iocs.insert(IocType::Hash, "d41d8cd98f00b204e9800998ecf8427e");
        b.iocs.insert(IocType::Ip, "203.0.113.5");
        b.iocs.insert(IocType::Hash, "d41d8cd98f00b204e9800998ecf8427e");

        let edges = engine().correlate(&[a, b]);
        assert_eq!(edges[0].score, 1.0);
    }

    #[test]
    fn test_retained_edges_carry_pair_techniques() {
        let mut a = finding("Pastebin", "phishing campaign dump", &[]);
        a.iocs.insert(IocType::Url, "http://evil.example/login");
        let mut b = finding("Pastebin", "more phishing", &[]);
        b.iocs.insert(IocType::Url, "http://evil.example/login");

        let edges = engine().correlate(&[a, b]);
        assert!(edges[0].mitre_techniques.contains(&"T1566".to_string()));
    }

    #[test]
    fn test_window_truncated_to_newest() {
        let config = CorrelationConfig {
            max_window_entries: 2,
            ..Default::default()
        };
        let engine = CorrelationEngine::new(config);

        let mut old = finding("Pastebin", "old", &[]);
        old.timestamp = chrono::Utc::now() - Duration::hours(10);
        old.iocs.insert(IocType::Ip, "203.0.113.9");
        let mut new_a = finding("Pastebin", "a", &[]);
        new_a.iocs.insert(IocType::Ip, "203.0.113.9");
        let mut new_b = finding("Pastebin", "b", &[]);
        new_b.iocs.insert(IocType::Ip, "203.0.113.9");

        // Three mutually correlated findings would yield three edges;
        // the cap keeps only the newest two in the scan.
        let edges = engine.correlate(&[old, new_a, new_b]);
        assert_eq!(edges.len(), 1);
    }
}
