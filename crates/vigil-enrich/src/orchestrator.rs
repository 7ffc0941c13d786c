//! Enrichment orchestration
//!
//! Cache-first, then a concurrent fan-out to every enabled provider
//! capable of the entity's type. Rate-limited providers are skipped for
//! the pass, failing providers contribute nothing, and the per-entity
//! deadline turns a slow fan-out into a partial union instead of a
//! stall. The caller always gets a record back; degraded enrichment
//! shows up as a thinner payload, never as an error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use vigil_common::config::{EnrichmentCaps, EnrichmentConfig};
use vigil_common::enrichment::EnrichmentRecord;
use vigil_common::entity::EntityType;
use vigil_common::ioc::IocSet;

use crate::cache::EnrichmentCache;
use crate::provider::ProviderRegistry;
use crate::providers::default_registry;

const CACHE_MAX_ENTRIES: u64 = 100_000;

#[derive(Debug, Default)]
struct OrchestratorStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    provider_calls: AtomicU64,
    provider_errors: AtomicU64,
    rate_limit_skips: AtomicU64,
}

/// Point-in-time counters for observability surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub provider_calls: u64,
    pub provider_errors: u64,
    pub rate_limit_skips: u64,
}

pub struct EnrichmentOrchestrator {
    caps: EnrichmentCaps,
    ttl: Duration,
    entity_deadline: Duration,
    registry: ProviderRegistry,
    cache: EnrichmentCache,
    stats: OrchestratorStats,
}

impl EnrichmentOrchestrator {
    /// Standard orchestrator over the nine built-in providers.
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self::with_registry(config, default_registry(config))
    }

    /// Orchestrator over a caller-supplied registry. Tests use this to
    /// substitute counting or failing providers.
    pub fn with_registry(config: &EnrichmentConfig, registry: ProviderRegistry) -> Self {
        info!(
            providers = registry.len(),
            enabled = registry.enabled_count(),
            "initialized enrichment services"
        );
        Self {
            caps: config.caps,
            ttl: config.cache_ttl,
            entity_deadline: config.entity_deadline,
            registry,
            cache: EnrichmentCache::new(config.cache_ttl, CACHE_MAX_ENTRIES),
            stats: OrchestratorStats::default(),
        }
    }

    /// Enrich one entity. Never fails: a fully degraded pass yields an
    /// empty record. Cached records are returned without provider calls.
    pub async fn enrich(&self, entity_type: EntityType, value: &str) -> EnrichmentRecord {
        let (record, hit) = self
            .cache
            .get_or_fetch(entity_type, value, self.fan_out(entity_type, value))
            .await;

        if hit {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(%entity_type, value, "using cached enrichment");
        } else {
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        record.unwrap_or_else(|| EnrichmentRecord::new(entity_type, value, self.ttl))
    }

    /// Enrich a finding's indicator set under the per-type caps.
    /// Bounding fan-out preserves free-tier budget for upcoming
    /// findings. Only records with at least one contributing provider
    /// are returned.
    pub async fn enrich_iocs(&self, iocs: &IocSet) -> Vec<EnrichmentRecord> {
        let mut records = Vec::new();

        for entity_type in EntityType::ALL {
            let cap = self.caps.for_type(entity_type.ioc_type());
            if cap == 0 {
                continue;
            }
            let Some(values) = iocs.get(entity_type.ioc_type()) else {
                continue;
            };
            for value in values.iter().take(cap) {
                let record = self.enrich(entity_type, value).await;
                if !record.is_empty() {
                    records.push(record);
                }
            }
        }

        records
    }

    pub fn stats(&self) -> EnrichmentStatsSnapshot {
        EnrichmentStatsSnapshot {
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.stats.cache_misses.load(Ordering::Relaxed),
            provider_calls: self.stats.provider_calls.load(Ordering::Relaxed),
            provider_errors: self.stats.provider_errors.load(Ordering::Relaxed),
            rate_limit_skips: self.stats.rate_limit_skips.load(Ordering::Relaxed),
        }
    }

    /// Query every capable, enabled, in-budget provider concurrently
    /// and merge the answers. Returns `None` when nothing contributed
    /// so an empty pass is not cached as a fresh record.
    async fn fan_out(&self, entity_type: EntityType, value: &str) -> Option<EnrichmentRecord> {
        let mut tasks: JoinSet<(&'static str, crate::error::ProviderResult<Value>)> =
            JoinSet::new();

        for entry in self.registry.providers_for(entity_type) {
            let name = entry.provider.name();
            if !entry.limiter.try_acquire() {
                warn!(
                    provider = name,
                    retry_after = ?entry.limiter.retry_after(),
                    "rate limit reached, skipping enrichment"
                );
                self.stats.rate_limit_skips.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            self.stats.provider_calls.fetch_add(1, Ordering::Relaxed);
            let provider = entry.provider.clone();
            let value = value.to_string();
            tasks.spawn(async move {
                let result = provider.query(entity_type, &value).await;
                (provider.name(), result)
            });
        }

        let mut record = EnrichmentRecord::new(entity_type, value, self.ttl);
        let deadline = tokio::time::Instant::now() + self.entity_deadline;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((_, Ok(Value::Null))))) => {}
                Ok(Some(Ok((name, Ok(payload))))) => record.add_payload(name, payload),
                Ok(Some(Ok((name, Err(err))))) => {
                    error!(provider = name, error = %err, "provider query failed");
                    self.stats.provider_errors.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Some(Err(join_err))) => {
                    error!(error = %join_err, "provider task aborted");
                    self.stats.provider_errors.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => break,
                Err(_) => {
                    // Keep whatever already answered.
                    warn!(
                        %entity_type,
                        value,
                        providers = record.provider_names().len(),
                        "enrichment deadline hit, accepting partial result"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        if record.is_empty() {
            None
        } else {
            info!(
                %entity_type,
                value,
                providers = ?record.provider_names(),
                "stored merged enrichment"
            );
            Some(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderResult};
    use crate::provider::Provider;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    struct CountingProvider {
        name: &'static str,
        calls: Arc<AtomicU32>,
        response: Value,
    }

    #[async_trait::async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn capabilities(&self) -> &'static [EntityType] {
            &[EntityType::Ip]
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn query(&self, _entity_type: EntityType, _value: &str) -> ProviderResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn capabilities(&self) -> &'static [EntityType] {
            &[EntityType::Ip]
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn query(&self, _entity_type: EntityType, _value: &str) -> ProviderResult<Value> {
            Err(ProviderError::Status(500))
        }
    }

    fn orchestrator_with(providers: Vec<Arc<dyn Provider>>) -> EnrichmentOrchestrator {
        let config = EnrichmentConfig::default();
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider, 100, Duration::from_secs(60));
        }
        EnrichmentOrchestrator::with_registry(&config, registry)
    }

    #[tokio::test]
    async fn test_cached_entity_makes_no_provider_calls() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator_with(vec![Arc::new(CountingProvider {
            name: "counting",
            calls: calls.clone(),
            response: json!({"classification": "malicious"}),
        })]);

        let first = orchestrator.enrich(EntityType::Ip, "203.0.113.5").await;
        assert_eq!(first.provider_names(), vec!["counting"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = orchestrator.enrich(EntityType::Ip, "203.0.113.5").await;
        assert_eq!(second.provider_names(), vec!["counting"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = orchestrator.stats();
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.provider_calls, 1);
    }

    #[tokio::test]
    async fn test_failing_provider_does_not_block_others() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator_with(vec![
            Arc::new(FailingProvider),
            Arc::new(CountingProvider {
                name: "counting",
                calls: calls.clone(),
                response: json!({"noise": true}),
            }),
        ]);

        let record = orchestrator.enrich(EntityType::Ip, "198.51.100.7").await;
        assert_eq!(record.provider_names(), vec!["counting"]);
        assert_eq!(orchestrator.stats().provider_errors, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_provider_skipped_not_blocked() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = EnrichmentConfig::default();
        let mut registry = ProviderRegistry::new();
        registry.register(
            Arc::new(CountingProvider {
                name: "counting",
                calls: calls.clone(),
                response: json!({"noise": true}),
            }),
            1,
            Duration::from_secs(3600),
        );
        let orchestrator = EnrichmentOrchestrator::with_registry(&config, registry);

        orchestrator.enrich(EntityType::Ip, "203.0.113.1").await;
        // Second entity is a cache miss, but the budget is drained.
        let record = orchestrator.enrich(EntityType::Ip, "203.0.113.2").await;
        assert!(record.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.stats().rate_limit_skips, 1);
    }

    #[tokio::test]
    async fn test_enrich_iocs_honors_caps() {
        let calls = Arc::new(AtomicU32::new(0));
        let orchestrator = orchestrator_with(vec![Arc::new(CountingProvider {
            name: "counting",
            calls: calls.clone(),
            response: json!({"noise": true}),
        })]);

        let mut iocs = IocSet::new();
        for i in 0..6 {
            iocs.insert(vigil_common::ioc::IocType::Ip, format!("203.0.113.{i}"));
        }

        let records = orchestrator.enrich_iocs(&iocs).await;
        // Default cap is 3 IPs per finding.
        assert_eq!(records.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_fan_out_yields_empty_record() {
        let orchestrator = orchestrator_with(vec![]);
        let record = orchestrator.enrich(EntityType::Hash, "d41d8cd98f00b204e9800998ecf8427e").await;
        assert!(record.is_empty());
    }
}
