//! Vigil Common - Shared types for the threat-intelligence core
//!
//! This crate provides the data model shared by every pipeline stage:
//! - Findings (raw and scored) and their lifecycle status
//! - Typed indicators of compromise (IocType / IocSet)
//! - Reputation entities and their classification scale
//! - Enrichment records and correlation edges
//! - Immutable configuration structs injected at startup

use serde::{Deserialize, Serialize};

pub mod config;
pub mod correlation;
pub mod entity;
pub mod enrichment;
pub mod error;
pub mod finding;
pub mod ioc;

pub use config::*;
pub use correlation::*;
pub use entity::*;
pub use enrichment::*;
pub use error::*;
pub use finding::*;
pub use ioc::*;

// =============================================================================
// Severity Scale
// =============================================================================

/// Finding severity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low = 0,
    Medium = 1,
    High = 2,
    Critical = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical severity thresholds. Every place a [0,100] score is turned
/// into a severity tier goes through this one lookup.
pub fn severity_for_score(score: f64) -> Severity {
    if score >= 80.0 {
        Severity::Critical
    } else if score >= 60.0 {
        Severity::High
    } else if score >= 40.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Clamp a score into the canonical [0,100] range.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(severity_for_score(95.0), Severity::Critical);
        assert_eq!(severity_for_score(80.0), Severity::Critical);
        assert_eq!(severity_for_score(79.9), Severity::High);
        assert_eq!(severity_for_score(60.0), Severity::High);
        assert_eq!(severity_for_score(40.0), Severity::Medium);
        assert_eq!(severity_for_score(39.9), Severity::Low);
        assert_eq!(severity_for_score(0.0), Severity::Low);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-12.0), 0.0);
        assert_eq!(clamp_score(55.5), 55.5);
        assert_eq!(clamp_score(140.0), 100.0);
    }
}
