//! Correlation edges and MITRE annotations

use crate::ioc::IocType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One MITRE ATT&CK technique annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitreTechnique {
    /// Technique id, e.g. "T1566".
    pub technique_id: String,
    pub technique_name: String,
    /// Tactic slug, e.g. "initial-access".
    pub tactic: String,
    /// Kill-chain phase order (reconnaissance = 1 .. impact = 14).
    pub kill_chain_phase: u8,
}

/// Relationship between two findings, retained only above the
/// correlation threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationEdge {
    pub finding_a: Uuid,
    pub finding_b: Uuid,
    /// Relatedness in [0,1].
    pub score: f64,
    /// Shared indicator values, keyed by type. Empty types absent.
    pub shared_iocs: BTreeMap<IocType, Vec<String>>,
    pub shared_keywords: Vec<String>,
    /// De-duplicated technique ids tagged onto the pair.
    pub mitre_techniques: Vec<String>,
    pub detected_at: chrono::DateTime<chrono::Utc>,
}

impl CorrelationEdge {
    pub fn new(finding_a: Uuid, finding_b: Uuid) -> Self {
        Self {
            finding_a,
            finding_b,
            score: 0.0,
            shared_iocs: BTreeMap::new(),
            shared_keywords: Vec::new(),
            mitre_techniques: Vec::new(),
            detected_at: chrono::Utc::now(),
        }
    }

    /// Total shared indicator values across all types.
    pub fn shared_ioc_count(&self) -> usize {
        self.shared_iocs.values().map(|v| v.len()).sum()
    }
}
