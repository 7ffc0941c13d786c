//! Reputation entities
//!
//! An entity is one enrichable/scorable object identified by (type, value).
//! Its score is re-derived fresh on every observation; only the counters
//! accumulate.

use crate::ioc::IocType;
use serde::{Deserialize, Serialize};

/// Entity types that carry a reputation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Ip,
    Domain,
    Url,
    Hash,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Ip,
        EntityType::Domain,
        EntityType::Url,
        EntityType::Hash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Ip => "ip",
            EntityType::Domain => "domain",
            EntityType::Url => "url",
            EntityType::Hash => "hash",
        }
    }

    /// The indicator type this entity type is extracted from.
    pub fn ioc_type(&self) -> IocType {
        match self {
            EntityType::Ip => IocType::Ip,
            EntityType::Domain => IocType::Domain,
            EntityType::Url => IocType::Url,
            EntityType::Hash => IocType::Hash,
        }
    }

    /// Indicator types that have a reputation-bearing entity counterpart.
    pub fn from_ioc_type(ioc_type: IocType) -> Option<EntityType> {
        match ioc_type {
            IocType::Ip => Some(EntityType::Ip),
            IocType::Domain => Some(EntityType::Domain),
            IocType::Url => Some(EntityType::Url),
            IocType::Hash => Some(EntityType::Hash),
            IocType::Email | IocType::Cve | IocType::CryptoAddress | IocType::WindowsArtifact => {
                None
            }
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Store/cache key for an entity: `"{type}:{value}"`, value lowercased.
pub fn entity_key(entity_type: EntityType, value: &str) -> String {
    format!("{}:{}", entity_type.as_str(), value.to_lowercase())
}

/// Trust classification. A pure function of the score, never stored
/// independently of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Trusted,
    LikelySafe,
    Unknown,
    Suspicious,
    Malicious,
}

impl Classification {
    pub fn from_score(score: f64) -> Classification {
        if score >= 80.0 {
            Classification::Trusted
        } else if score >= 60.0 {
            Classification::LikelySafe
        } else if score >= 40.0 {
            Classification::Unknown
        } else if score >= 20.0 {
            Classification::Suspicious
        } else {
            Classification::Malicious
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Trusted => "trusted",
            Classification::LikelySafe => "likely_safe",
            Classification::Unknown => "unknown",
            Classification::Suspicious => "suspicious",
            Classification::Malicious => "malicious",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted reputation record for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub value: String,
    /// Always in [0,100]; overwritten on every observation.
    pub score: f64,
    pub classification: Classification,
    /// Monotonic observation counter.
    pub occurrences: u64,
    /// Monotonic counter of observations flagged malicious.
    pub malicious_count: u64,
    pub first_seen: chrono::DateTime<chrono::Utc>,
    pub last_seen: chrono::DateTime<chrono::Utc>,
    /// Heuristic tags that contributed to the latest score.
    pub factors: Vec<String>,
}

impl Entity {
    pub fn new(entity_type: EntityType, value: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            entity_type,
            value: value.into(),
            score: 50.0,
            classification: Classification::Unknown,
            occurrences: 0,
            malicious_count: 0,
            first_seen: now,
            last_seen: now,
            factors: Vec::new(),
        }
    }
}

/// Caller-supplied hints for a reputation observation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreContext {
    /// Entity was flagged malicious by the current finding.
    pub malicious: bool,
    /// Behavioral suspicion short of a malicious verdict (hashes).
    pub suspicious: bool,
    pub tor_exit_node: bool,
    pub vpn: bool,
    pub cloud_provider: bool,
    /// Domain registered recently.
    pub recently_registered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(Classification::from_score(85.0), Classification::Trusted);
        assert_eq!(Classification::from_score(80.0), Classification::Trusted);
        assert_eq!(Classification::from_score(65.0), Classification::LikelySafe);
        assert_eq!(Classification::from_score(50.0), Classification::Unknown);
        assert_eq!(Classification::from_score(25.0), Classification::Suspicious);
        assert_eq!(Classification::from_score(10.0), Classification::Malicious);
        assert_eq!(Classification::from_score(0.0), Classification::Malicious);
    }

    #[test]
    fn test_entity_key_lowercases() {
        assert_eq!(
            entity_key(EntityType::Domain, "EVIL.Example"),
            "domain:evil.example"
        );
    }

    #[test]
    fn test_entity_ioc_round_trip() {
        for entity_type in EntityType::ALL {
            assert_eq!(
                EntityType::from_ioc_type(entity_type.ioc_type()),
                Some(entity_type)
            );
        }
        assert_eq!(EntityType::from_ioc_type(IocType::Email), None);
    }
}
