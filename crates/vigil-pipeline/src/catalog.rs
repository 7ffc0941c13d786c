//! Indicator catalog
//!
//! Every indicator ever observed, keyed by (type, value), with sighting
//! counters and the deduped set of sources that reported it. Read side
//! for hunting and export consumers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use vigil_common::ioc::{IocSet, IocType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IocSighting {
    pub ioc_type: IocType,
    pub value: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sources: BTreeSet<String>,
    pub sightings: u64,
}

#[derive(Default)]
pub struct IocCatalog {
    entries: DashMap<String, IocSighting>,
}

impl IocCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(ioc_type: IocType, value: &str) -> String {
        format!("{}:{}", ioc_type, value.to_lowercase())
    }

    /// Record one sighting of one indicator.
    pub fn record(&self, ioc_type: IocType, value: &str, source: &str) {
        let now = Utc::now();
        let mut entry = self
            .entries
            .entry(Self::key(ioc_type, value))
            .or_insert_with(|| IocSighting {
                ioc_type,
                value: value.to_string(),
                first_seen: now,
                last_seen: now,
                sources: BTreeSet::new(),
                sightings: 0,
            });
        entry.last_seen = now;
        entry.sightings += 1;
        entry.sources.insert(source.to_string());
    }

    /// Record every indicator of one finding.
    pub fn record_set(&self, iocs: &IocSet, source: &str) {
        for (ioc_type, value) in iocs.iter() {
            self.record(ioc_type, value, source);
        }
    }

    pub fn get(&self, ioc_type: IocType, value: &str) -> Option<IocSighting> {
        self.entries
            .get(&Self::key(ioc_type, value))
            .map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recently seen indicators, newest first.
    pub fn recent(&self, limit: usize) -> Vec<IocSighting> {
        let mut sightings: Vec<IocSighting> =
            self.entries.iter().map(|e| e.clone()).collect();
        sightings.sort_by_key(|s| std::cmp::Reverse(s.last_seen));
        sightings.truncate(limit);
        sightings
    }
}
