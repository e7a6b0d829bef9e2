//! Standalone rendezvous backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::backend::RendezvousBackend;
use super::protocol::{JoinRequest, JoinTicket, RendezvousRound, RoundObservation};
use super::store::RendezvousStore;
use crate::error::Result;

/// Backend over an in-process [`RendezvousStore`].
///
/// Used for single-host jobs. Clones share the same store, so several agents
/// in one process (as in tests) rendezvous with each other.
#[derive(Clone)]
pub struct LocalRendezvousBackend {
    store: Arc<RendezvousStore>,
}

impl LocalRendezvousBackend {
    pub fn new(lease_ttl: Duration) -> Self {
        Self::with_store(Arc::new(RendezvousStore::new(lease_ttl)))
    }

    pub fn with_store(store: Arc<RendezvousStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RendezvousStore> {
        &self.store
    }
}

#[async_trait]
impl RendezvousBackend for LocalRendezvousBackend {
    async fn join(&self, request: &JoinRequest) -> Result<JoinTicket> {
        self.store.join(request).await
    }

    async fn wait_round(
        &self,
        run_id: &str,
        node_id: &str,
        timeout: Duration,
    ) -> Result<RendezvousRound> {
        self.store.wait_round(run_id, node_id, timeout).await
    }

    async fn keep_alive(&self, run_id: &str, node_id: &str, version: u64) -> Result<bool> {
        self.store.keep_alive(run_id, node_id, version).await
    }

    async fn observe(&self, run_id: &str) -> Result<RoundObservation> {
        self.store.observe(run_id).await
    }

    async fn mark_complete(
        &self,
        run_id: &str,
        node_id: &str,
        version: u64,
    ) -> Result<(u32, u32)> {
        self.store.mark_complete(run_id, node_id, version).await
    }

    async fn leave(&self, run_id: &str, node_id: &str) -> Result<bool> {
        self.store.leave(run_id, node_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendezvous::NodeInfo;

    #[tokio::test]
    async fn test_join_round_through_trait() {
        let backend: Arc<dyn RendezvousBackend> =
            Arc::new(LocalRendezvousBackend::new(Duration::from_secs(30)));
        let request = JoinRequest {
            run_id: "job".to_string(),
            node: NodeInfo::new("a", "127.0.0.1", "trainer", 29500),
            min_nodes: 1,
            max_nodes: 1,
            last_call_timeout: Duration::ZERO,
        };

        let round = backend
            .join_round(&request, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round.position_of("a"), Some(0));

        let obs = backend.observe("job").await.unwrap();
        assert!(obs.complete);
        assert_eq!(obs.participants, 1);
    }

    #[tokio::test]
    async fn test_clones_share_store() {
        let backend = LocalRendezvousBackend::new(Duration::from_secs(30));
        let other = backend.clone();
        assert!(Arc::ptr_eq(backend.store(), other.store()));
    }
}
