//! Finding persistence boundary
//!
//! The pipeline writes scored findings through this trait; any durable
//! backend with get/put semantics fits behind it. Write failures
//! surface as [`StoreError`] so the service can apply its bounded
//! retry-then-skip policy.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;
use vigil_common::error::{StoreError, StoreResult};
use vigil_common::finding::Finding;

#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Insert or overwrite one scored finding.
    async fn put(&self, finding: &Finding) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Finding>;

    async fn len(&self) -> usize;
}

/// In-process store backed by a concurrent map. The default backend for
/// tests and single-node deployments.
#[derive(Default)]
pub struct MemoryFindingStore {
    findings: DashMap<Uuid, Finding>,
}

impl MemoryFindingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FindingStore for MemoryFindingStore {
    async fn put(&self, finding: &Finding) -> StoreResult<()> {
        self.findings.insert(finding.id, finding.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Finding> {
        self.findings
            .get(&id)
            .map(|f| f.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn len(&self) -> usize {
        self.findings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::finding::RawFinding;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = MemoryFindingStore::new();
        let finding = Finding::from_raw(RawFinding::new("Reddit", "post", "text"));
        store.put(&finding).await.unwrap();

        let loaded = store.get(finding.id).await.unwrap();
        assert_eq!(loaded.title, "post");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_finding_is_not_found() {
        let store = MemoryFindingStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
