//! Provider trait and capability-indexed registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use vigil_common::entity::EntityType;

use crate::error::ProviderResult;
use crate::ratelimit::FixedWindowLimiter;

/// One external intelligence service.
///
/// `query` returns the provider's summarized payload for the indicator.
/// `Value::Null` means the provider answered but has nothing to say;
/// the orchestrator stores no entry for it.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Entity types this provider can answer for.
    fn capabilities(&self) -> &'static [EntityType];

    /// Disabled providers are skipped without logging noise. Typically
    /// false when the API key is missing.
    fn is_enabled(&self) -> bool;

    async fn query(&self, entity_type: EntityType, value: &str) -> ProviderResult<Value>;
}

pub struct RegisteredProvider {
    pub provider: Arc<dyn Provider>,
    pub limiter: FixedWindowLimiter,
}

/// Providers in registration order, with a per-type index. Fan-out for
/// an entity type follows registration order filtered by capability,
/// so insertion order is part of the registry's contract.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<RegisteredProvider>,
    by_type: HashMap<EntityType, Vec<usize>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>, rate_limit: u32, window: Duration) {
        let index = self.entries.len();
        for entity_type in provider.capabilities() {
            self.by_type.entry(*entity_type).or_default().push(index);
        }
        self.entries.push(RegisteredProvider {
            provider,
            limiter: FixedWindowLimiter::new(rate_limit, window),
        });
    }

    /// Enabled providers capable of answering for this entity type.
    pub fn providers_for(&self, entity_type: EntityType) -> Vec<&RegisteredProvider> {
        self.by_type
            .get(&entity_type)
            .map(|indices| {
                indices
                    .iter()
                    .map(|i| &self.entries[*i])
                    .filter(|entry| entry.provider.is_enabled())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of providers currently able to serve queries.
    pub fn enabled_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.provider.is_enabled())
            .count()
    }
}
