//! Concurrent reputation store
//!
//! Keyed by `"{type}:{value}"`. All mutation goes through [`observe`],
//! which runs the caller's rule evaluation and the counter merge under
//! one map entry so concurrent observations of the same entity never
//! lose an increment.
//!
//! [`observe`]: ReputationStore::observe

use dashmap::DashMap;
use vigil_common::entity::{entity_key, Classification, Entity, EntityType};
use vigil_common::clamp_score;

#[derive(Default)]
pub struct ReputationStore {
    entities: DashMap<String, Entity>,
}

impl ReputationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of an entity. `rules` sees the entity's
    /// prior state (counters not yet incremented) and returns the fresh
    /// score and contributing factors. The score is overwritten, never
    /// accumulated; `occurrences` always advances, `malicious_count`
    /// only when `malicious` is set.
    pub fn observe<F>(
        &self,
        entity_type: EntityType,
        value: &str,
        malicious: bool,
        rules: F,
    ) -> Entity
    where
        F: FnOnce(&Entity) -> (f64, Vec<String>),
    {
        let key = entity_key(entity_type, value);
        let mut entry = self
            .entities
            .entry(key)
            .or_insert_with(|| Entity::new(entity_type, value));

        let (score, factors) = rules(&entry);

        entry.occurrences += 1;
        if malicious {
            entry.malicious_count += 1;
        }
        entry.score = clamp_score(score);
        entry.classification = Classification::from_score(entry.score);
        entry.last_seen = chrono::Utc::now();
        entry.factors = factors;

        entry.clone()
    }

    pub fn get(&self, entity_type: EntityType, value: &str) -> Option<Entity> {
        self.entities
            .get(&entity_key(entity_type, value))
            .map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities at or below a score, worst first. Feed for watchlist
    /// consumers.
    pub fn worst(&self, max_score: f64, limit: usize) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .filter(|e| e.score <= max_score)
            .map(|e| e.clone())
            .collect();
        entities.sort_by(|a, b| a.score.total_cmp(&b.score));
        entities.truncate(limit);
        entities
    }
}
