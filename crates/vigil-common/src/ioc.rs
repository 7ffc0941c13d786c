//! Typed indicators of compromise

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Indicator type. Exhaustive; every extraction pattern maps to exactly
/// one variant. Serialized names match the reporting keys consumers
/// already expect ("ips", "domains", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IocType {
    #[serde(rename = "ips")]
    Ip,
    #[serde(rename = "domains")]
    Domain,
    #[serde(rename = "urls")]
    Url,
    #[serde(rename = "emails")]
    Email,
    #[serde(rename = "hashes")]
    Hash,
    #[serde(rename = "cves")]
    Cve,
    #[serde(rename = "crypto_addresses")]
    CryptoAddress,
    #[serde(rename = "windows_artifacts")]
    WindowsArtifact,
}

impl IocType {
    /// All variants, in reporting order.
    pub const ALL: [IocType; 8] = [
        IocType::Ip,
        IocType::Domain,
        IocType::Url,
        IocType::Email,
        IocType::Hash,
        IocType::Cve,
        IocType::CryptoAddress,
        IocType::WindowsArtifact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IocType::Ip => "ips",
            IocType::Domain => "domains",
            IocType::Url => "urls",
            IocType::Email => "emails",
            IocType::Hash => "hashes",
            IocType::Cve => "cves",
            IocType::CryptoAddress => "crypto_addresses",
            IocType::WindowsArtifact => "windows_artifacts",
        }
    }
}

impl std::fmt::Display for IocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hash algorithm, bucketed strictly by hex length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashKind {
    Md5,
    Sha1,
    Sha256,
}

impl HashKind {
    /// A candidate is exactly one kind; 64 hex chars are never also a
    /// 32-char match.
    pub fn from_len(len: usize) -> Option<HashKind> {
        match len {
            32 => Some(HashKind::Md5),
            40 => Some(HashKind::Sha1),
            64 => Some(HashKind::Sha256),
            _ => None,
        }
    }
}

/// Per-finding set of extracted indicators, keyed by type. Values are
/// deduplicated; types with no matches carry no entry at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IocSet {
    #[serde(flatten)]
    sets: HashMap<IocType, BTreeSet<String>>,
}

impl IocSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, deduplicating. Returns true if it was new.
    pub fn insert(&mut self, ioc_type: IocType, value: impl Into<String>) -> bool {
        self.sets.entry(ioc_type).or_default().insert(value.into())
    }

    /// Values for one type, empty slice view when absent.
    pub fn get(&self, ioc_type: IocType) -> Option<&BTreeSet<String>> {
        self.sets.get(&ioc_type)
    }

    pub fn contains(&self, ioc_type: IocType, value: &str) -> bool {
        self.sets
            .get(&ioc_type)
            .map(|s| s.contains(value))
            .unwrap_or(false)
    }

    pub fn count(&self, ioc_type: IocType) -> usize {
        self.sets.get(&ioc_type).map(|s| s.len()).unwrap_or(0)
    }

    /// Total indicators across all types.
    pub fn total(&self) -> usize {
        self.sets.values().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Types that have at least one value.
    pub fn types_present(&self) -> Vec<IocType> {
        IocType::ALL
            .iter()
            .copied()
            .filter(|t| self.count(*t) > 0)
            .collect()
    }

    /// Iterate (type, value) pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (IocType, &str)> {
        IocType::ALL.iter().flat_map(move |t| {
            self.sets
                .get(t)
                .into_iter()
                .flat_map(move |set| set.iter().map(move |v| (*t, v.as_str())))
        })
    }

    /// Values shared with another set for one type.
    pub fn intersection(&self, other: &IocSet, ioc_type: IocType) -> Vec<String> {
        match (self.sets.get(&ioc_type), other.sets.get(&ioc_type)) {
            (Some(a), Some(b)) => a.intersection(b).cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Drop any types whose set became empty. Serialized output must not
    /// carry empty entries.
    pub fn prune_empty(&mut self) {
        self.sets.retain(|_, set| !set.is_empty());
    }
}
