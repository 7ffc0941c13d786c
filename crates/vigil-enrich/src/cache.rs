//! Enrichment record cache
//!
//! TTL-evicting cache keyed by `"{type}:{value}"`. Population goes
//! through a get-or-compute primitive so two concurrent misses for the
//! same entity never both reach the providers: the second caller waits
//! on the first caller's in-flight fetch.

use std::future::Future;
use std::time::Duration;

use vigil_common::enrichment::EnrichmentRecord;
use vigil_common::entity::{entity_key, EntityType};

pub struct EnrichmentCache {
    inner: moka::future::Cache<String, EnrichmentRecord>,
}

impl EnrichmentCache {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        Self {
            inner: moka::future::Cache::builder()
                .time_to_live(ttl)
                .max_capacity(max_entries)
                .build(),
        }
    }

    /// Non-expired record for the entity, if one is cached.
    pub async fn get(&self, entity_type: EntityType, value: &str) -> Option<EnrichmentRecord> {
        self.inner.get(&entity_key(entity_type, value)).await
    }

    /// Return the cached record or run `fetch` exactly once across all
    /// concurrent callers. `fetch` returning `None` (no provider
    /// contributed) caches nothing, so the next pass tries again.
    ///
    /// The boolean is true when the record came from the cache.
    pub async fn get_or_fetch<F>(
        &self,
        entity_type: EntityType,
        value: &str,
        fetch: F,
    ) -> (Option<EnrichmentRecord>, bool)
    where
        F: Future<Output = Option<EnrichmentRecord>>,
    {
        let key = entity_key(entity_type, value);
        match self.inner.entry(key).or_optionally_insert_with(fetch).await {
            Some(entry) => {
                let hit = !entry.is_fresh();
                (Some(entry.into_value()), hit)
            }
            None => (None, false),
        }
    }

    /// Drop one entity's record, forcing a refetch on next access.
    pub async fn invalidate(&self, entity_type: EntityType, value: &str) {
        self.inner.invalidate(&entity_key(entity_type, value)).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
