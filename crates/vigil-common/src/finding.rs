//! Findings
//!
//! A finding is one harvested text record. Collectors produce
//! [`RawFinding`]s; the pipeline turns each into a [`Finding`] carrying
//! extraction, enrichment, scoring, and MITRE annotations.

use crate::correlation::MitreTechnique;
use crate::enrichment::EnrichmentRecord;
use crate::ioc::IocSet;
use crate::Severity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a collector hands the pipeline. How it was obtained is the
/// collector's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFinding {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    /// Monitored keywords that matched during collection.
    pub keywords: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RawFinding {
    pub fn new(source: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            url: None,
            snippet: snippet.into(),
            keywords: Vec::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Title and snippet joined, the text surface all matching runs over.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.snippet)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    #[default]
    New,
    Reviewed,
    Dismissed,
}

/// A fully processed finding. Mutated once by the pipeline
/// (extraction -> enrichment -> scoring), immutable afterwards except
/// for correlation back-references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub keywords: Vec<String>,
    pub iocs: IocSet,
    /// Composite threat score in [0,100].
    pub threat_score: f64,
    pub severity: Severity,
    /// Agreement across scoring signals, [0,100].
    pub confidence: f64,
    pub risk_factors: Vec<String>,
    /// Merged provider data for the enriched indicators.
    pub enrichment: Vec<EnrichmentRecord>,
    /// Enrichment-derived risk summary in [0,100].
    pub enrichment_risk: f64,
    pub threat_indicators: Vec<String>,
    pub mitre_techniques: Vec<MitreTechnique>,
    /// Ids of findings this one was correlated with.
    pub related_findings: Vec<Uuid>,
    pub status: FindingStatus,
}

impl Finding {
    /// Start a finding from its raw form; scoring fields begin zeroed.
    pub fn from_raw(raw: RawFinding) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: raw.timestamp,
            source: raw.source,
            title: raw.title,
            url: raw.url,
            snippet: raw.snippet,
            keywords: raw.keywords,
            iocs: IocSet::new(),
            threat_score: 0.0,
            severity: Severity::Low,
            confidence: 0.0,
            risk_factors: Vec::new(),
            enrichment: Vec::new(),
            enrichment_risk: 0.0,
            threat_indicators: Vec::new(),
            mitre_techniques: Vec::new(),
            related_findings: Vec::new(),
            status: FindingStatus::New,
        }
    }

    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.snippet)
    }

    /// Word count of the analyzed text, used for IOC density.
    pub fn word_count(&self) -> usize {
        self.text().split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_defaults() {
        let raw = RawFinding::new("Pastebin", "dump", "credentials inside");
        let finding = Finding::from_raw(raw);
        assert_eq!(finding.status, FindingStatus::New);
        assert_eq!(finding.threat_score, 0.0);
        assert_eq!(finding.severity, Severity::Low);
        assert!(finding.iocs.is_empty());
    }

    #[test]
    fn test_text_joins_title_and_snippet() {
        let raw = RawFinding::new("Reddit", "leaked db", "see attached");
        assert_eq!(raw.text(), "leaked db see attached");
    }
}
