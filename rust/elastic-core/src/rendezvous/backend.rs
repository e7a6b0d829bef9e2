//! Rendezvous backend abstraction.

use std::time::Duration;

use async_trait::async_trait;

use super::protocol::{JoinRequest, JoinTicket, RendezvousRound, RoundObservation};
use crate::error::Result;

/// Trait for rendezvous backend implementations.
///
/// A backend offers linearizable membership agreement for a run: concurrent
/// joins observe the same round or fail explicitly.
#[async_trait]
pub trait RendezvousBackend: Send + Sync {
    /// Register a node for the current joinable round, or put it on the
    /// waiting list for the next one. A participant of the current final
    /// round that joins again opens a new round. Idempotent.
    async fn join(&self, request: &JoinRequest) -> Result<JoinTicket>;

    /// Block until a final round containing the node exists.
    ///
    /// On timeout the node is withdrawn and `RendezvousTimeout` is returned.
    async fn wait_round(
        &self,
        run_id: &str,
        node_id: &str,
        timeout: Duration,
    ) -> Result<RendezvousRound>;

    /// Renew the node's liveness lease. Returns false once `version` is no
    /// longer the current round or the node is not part of it.
    async fn keep_alive(&self, run_id: &str, node_id: &str, version: u64) -> Result<bool>;

    /// Observe the current round without modifying it.
    async fn observe(&self, run_id: &str) -> Result<RoundObservation>;

    /// Record that the node's worker group finished successfully.
    ///
    /// Returns `(completed, participants)` for the round.
    async fn mark_complete(&self, run_id: &str, node_id: &str, version: u64)
        -> Result<(u32, u32)>;

    /// Leave the run. Returns false when the node was not registered.
    async fn leave(&self, run_id: &str, node_id: &str) -> Result<bool>;

    /// Join and wait for the resulting round in one call.
    async fn join_round(&self, request: &JoinRequest, timeout: Duration) -> Result<RendezvousRound> {
        self.join(request).await?;
        self.wait_round(&request.run_id, &request.node.node_id, timeout)
            .await
    }
}
