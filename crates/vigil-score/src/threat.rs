//! Composite threat scoring
//!
//! Six independent [0,100] sub-scores are fused into one weighted
//! composite. Keyword criticality takes the MAX matching term so
//! keyword stuffing cannot inflate it; the other signals are capped
//! sums. Confidence reflects agreement: the more the sub-scores
//! disagree, the less the composite is trusted.

use aho_corasick::AhoCorasick;
use chrono::Duration;
use regex::RegexBuilder;
use tracing::warn;
use vigil_common::config::ScoringConfig;
use vigil_common::finding::Finding;
use vigil_common::ioc::IocType;
use vigil_common::{clamp_score, severity_for_score, Severity};

/// Trailing window considered for temporal clustering.
const CLUSTER_WINDOW_HOURS: i64 = 24;
/// Points per shared indicator value against recent history.
const CORRELATION_POINTS: f64 = 10.0;

/// The six fused signals, each in [0,100].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubScores {
    pub keyword_criticality: f64,
    pub ioc_volume: f64,
    pub source_reputation: f64,
    pub temporal_clustering: f64,
    pub content_analysis: f64,
    pub correlation: f64,
}

impl SubScores {
    fn as_array(&self) -> [f64; 6] {
        [
            self.keyword_criticality,
            self.ioc_volume,
            self.source_reputation,
            self.temporal_clustering,
            self.content_analysis,
            self.correlation,
        ]
    }

    /// Population standard deviation across the six signals.
    fn stddev(&self) -> f64 {
        let values = self.as_array();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

#[derive(Debug, Clone)]
pub struct ThreatAssessment {
    pub threat_score: f64,
    pub severity: Severity,
    /// Signal agreement in [0,100].
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    pub subscores: SubScores,
}

pub struct ThreatScorer {
    config: ScoringConfig,
    /// Matcher over both keyword tiers; `keyword_points[i]` holds the
    /// score of pattern i.
    keyword_matcher: Option<AhoCorasick>,
    keyword_points: Vec<f64>,
    content_patterns: Vec<(regex::Regex, f64)>,
}

impl ThreatScorer {
    /// Compile the configured tables. An uncompilable pattern is logged
    /// and dropped; it contributes zero like any other failed rule.
    pub fn new(config: ScoringConfig) -> Self {
        let mut terms: Vec<&str> = Vec::new();
        let mut keyword_points = Vec::new();
        for (term, points) in config.critical_keywords.iter().chain(&config.high_keywords) {
            terms.push(term.as_str());
            keyword_points.push(*points);
        }
        let keyword_matcher = match AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&terms)
        {
            Ok(matcher) => Some(matcher),
            Err(err) => {
                warn!(error = %err, "keyword table failed to compile, criticality disabled");
                None
            }
        };

        let content_patterns = config
            .content_patterns
            .iter()
            .filter_map(|p| {
                match RegexBuilder::new(&p.pattern).case_insensitive(true).build() {
                    Ok(regex) => Some((regex, p.points)),
                    Err(err) => {
                        warn!(pattern = %p.pattern, error = %err, "content pattern skipped");
                        None
                    }
                }
            })
            .collect();

        Self {
            config,
            keyword_matcher,
            keyword_points,
            content_patterns,
        }
    }

    /// Score one finding against the recent history window.
    pub fn score_finding(&self, finding: &Finding, recent: &[Finding]) -> ThreatAssessment {
        let subscores = SubScores {
            keyword_criticality: self.keyword_criticality(finding),
            ioc_volume: self.ioc_volume(finding),
            source_reputation: self.source_reputation(finding),
            temporal_clustering: self.temporal_clustering(finding, recent),
            content_analysis: self.content_analysis(finding),
            correlation: self.correlation(finding, recent),
        };

        let weights = &self.config.weights;
        let composite = clamp_score(
            subscores.keyword_criticality * weights.keyword_criticality
                + subscores.ioc_volume * weights.ioc_volume
                + subscores.source_reputation * weights.source_reputation
                + subscores.temporal_clustering * weights.temporal_clustering
                + subscores.content_analysis * weights.content_analysis
                + subscores.correlation * weights.correlation,
        );

        ThreatAssessment {
            threat_score: composite,
            severity: severity_for_score(composite),
            confidence: clamp_score(100.0 - subscores.stddev() / 2.0),
            risk_factors: self.risk_factors(&subscores),
            subscores,
        }
    }

    /// MAX matching term across both tiers, not a sum.
    fn keyword_criticality(&self, finding: &Finding) -> f64 {
        let Some(matcher) = &self.keyword_matcher else {
            return 0.0;
        };
        let mut max = 0.0f64;
        for keyword in &finding.keywords {
            for hit in matcher.find_iter(keyword) {
                max = max.max(self.keyword_points[hit.pattern().as_usize()]);
            }
        }
        max
    }

    fn ioc_volume(&self, finding: &Finding) -> f64 {
        let weighted: f64 = IocType::ALL
            .iter()
            .map(|t| finding.iocs.count(*t) as f64 * self.config.ioc_weights.for_type(*t))
            .sum();
        (weighted * 2.0).min(100.0)
    }

    fn source_reputation(&self, finding: &Finding) -> f64 {
        let source = finding.source.to_lowercase();
        self.config
            .source_tiers
            .iter()
            .find(|(name, _)| source.contains(&name.to_lowercase()))
            .map(|(_, score)| *score)
            .unwrap_or(self.config.default_source_score)
    }

    /// Count of recent findings sharing at least one keyword within the
    /// trailing window.
    fn temporal_clustering(&self, finding: &Finding, recent: &[Finding]) -> f64 {
        if finding.keywords.is_empty() {
            return 0.0;
        }
        let cutoff = finding.timestamp - Duration::hours(CLUSTER_WINDOW_HOURS);
        let keywords: Vec<String> = finding.keywords.iter().map(|k| k.to_lowercase()).collect();

        let matches = recent
            .iter()
            .filter(|other| other.id != finding.id && other.timestamp >= cutoff)
            .filter(|other| {
                other
                    .keywords
                    .iter()
                    .any(|k| keywords.contains(&k.to_lowercase()))
            })
            .count();

        (matches as f64 * self.config.temporal_points).min(100.0)
    }

    fn content_analysis(&self, finding: &Finding) -> f64 {
        let text = finding.text();
        let mut score: f64 = self
            .content_patterns
            .iter()
            .filter(|(regex, _)| regex.is_match(&text))
            .map(|(_, points)| points)
            .sum();

        if finding.word_count() > self.config.long_content_words {
            score += self.config.long_content_points;
        }
        score.min(100.0)
    }

    /// Indicator overlap against recent history.
    fn correlation(&self, finding: &Finding, recent: &[Finding]) -> f64 {
        if finding.iocs.is_empty() {
            return 0.0;
        }
        let mut score = 0.0;
        for other in recent.iter().filter(|o| o.id != finding.id) {
            for ioc_type in IocType::ALL {
                let shared = finding.iocs.intersection(&other.iocs, ioc_type).len();
                score += shared as f64 * CORRELATION_POINTS;
            }
        }
        score.min(100.0)
    }

    fn risk_factors(&self, subscores: &SubScores) -> Vec<String> {
        let mut factors = Vec::new();
        if subscores.keyword_criticality >= 75.0 {
            factors.push("High-criticality keywords detected".to_string());
        }
        if subscores.ioc_volume >= 70.0 {
            factors.push("Large number of IOCs identified".to_string());
        }
        if subscores.source_reputation >= 80.0 {
            factors.push("High-risk source (Dark Web/Pastebin)".to_string());
        }
        if subscores.temporal_clustering >= 50.0 {
            factors.push("Part of active campaign (temporal clustering)".to_string());
        }
        if subscores.content_analysis >= 60.0 {
            factors.push("Dangerous content patterns detected".to_string());
        }
        if subscores.correlation >= 40.0 {
            factors.push("Correlated with previous threats".to_string());
        }
        factors
    }
}
