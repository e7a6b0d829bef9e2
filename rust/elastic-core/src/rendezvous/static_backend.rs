//! Static rendezvous backend.
//!
//! Membership is fixed up front: every node is told its rank, the node count
//! and the master endpoint. No coordination happens, so the round never
//! changes and is never superseded.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::backend::RendezvousBackend;
use super::protocol::{JoinRequest, JoinTicket, NodeInfo, RendezvousRound, RoundObservation};
use crate::error::{ElasticError, Result};

const STATIC_VERSION: u64 = 1;

pub struct StaticRendezvousBackend {
    node_rank: u32,
    nnodes: u32,
    master_addr: String,
    master_port: u16,
    /// Identity registered by the last join.
    local: RwLock<Option<NodeInfo>>,
}

impl StaticRendezvousBackend {
    pub fn new(
        node_rank: u32,
        nnodes: u32,
        master_addr: impl Into<String>,
        master_port: u16,
    ) -> Result<Self> {
        if nnodes == 0 || node_rank >= nnodes {
            return Err(ElasticError::config(format!(
                "node_rank {} is out of range for {} node(s)",
                node_rank, nnodes
            )));
        }
        Ok(Self {
            node_rank,
            nnodes,
            master_addr: master_addr.into(),
            master_port,
            local: RwLock::new(None),
        })
    }

    fn round(&self, run_id: &str, local: &NodeInfo) -> RendezvousRound {
        let nodes = (0..self.nnodes)
            .map(|rank| {
                let address = if rank == 0 {
                    self.master_addr.clone()
                } else if rank == self.node_rank {
                    local.address.clone()
                } else {
                    String::new()
                };
                let node_id = if rank == self.node_rank {
                    local.node_id.clone()
                } else {
                    format!("static-node-{}", rank)
                };
                NodeInfo::new(node_id, address, local.role.clone(), self.master_port)
            })
            .collect();

        RendezvousRound {
            run_id: run_id.to_string(),
            version: STATIC_VERSION,
            nodes,
        }
    }
}

#[async_trait]
impl RendezvousBackend for StaticRendezvousBackend {
    async fn join(&self, request: &JoinRequest) -> Result<JoinTicket> {
        if request.min_nodes != request.max_nodes || request.max_nodes != self.nnodes {
            return Err(ElasticError::rendezvous(
                request.run_id.as_str(),
                format!(
                    "static rendezvous needs a fixed node count of {}, got {}:{}",
                    self.nnodes, request.min_nodes, request.max_nodes
                ),
            ));
        }
        *self.local.write().await = Some(request.node.clone());
        Ok(JoinTicket {
            version: STATIC_VERSION,
            admitted: true,
        })
    }

    async fn wait_round(
        &self,
        run_id: &str,
        node_id: &str,
        _timeout: Duration,
    ) -> Result<RendezvousRound> {
        let local = self.local.read().await;
        match local.as_ref() {
            Some(node) if node.node_id == node_id => Ok(self.round(run_id, node)),
            _ => Err(ElasticError::rendezvous(
                run_id,
                format!("node {} has not joined", node_id),
            )),
        }
    }

    async fn keep_alive(&self, _run_id: &str, _node_id: &str, version: u64) -> Result<bool> {
        Ok(version == STATIC_VERSION)
    }

    async fn observe(&self, _run_id: &str) -> Result<RoundObservation> {
        Ok(RoundObservation {
            version: STATIC_VERSION,
            complete: true,
            participants: self.nnodes,
            nodes_waiting: 0,
            departed: Vec::new(),
            completed: 0,
        })
    }

    async fn mark_complete(
        &self,
        _run_id: &str,
        _node_id: &str,
        _version: u64,
    ) -> Result<(u32, u32)> {
        // Peers are unknown, so the exit barrier passes immediately.
        Ok((self.nnodes, self.nnodes))
    }

    async fn leave(&self, _run_id: &str, _node_id: &str) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(nnodes: u32) -> JoinRequest {
        JoinRequest {
            run_id: "job".to_string(),
            node: NodeInfo::new("self", "10.0.0.2", "trainer", 29500),
            min_nodes: nnodes,
            max_nodes: nnodes,
            last_call_timeout: Duration::ZERO,
        }
    }

    #[test]
    fn test_rank_out_of_range() {
        assert!(StaticRendezvousBackend::new(2, 2, "10.0.0.1", 29500).is_err());
        assert!(StaticRendezvousBackend::new(0, 0, "10.0.0.1", 29500).is_err());
    }

    #[tokio::test]
    async fn test_round_places_node_at_its_rank() {
        let backend = StaticRendezvousBackend::new(1, 3, "10.0.0.1", 29600).unwrap();
        let round = backend
            .join_round(&request(3), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(round.world_size(), 3);
        assert_eq!(round.position_of("self"), Some(1));
        assert_eq!(round.nodes[0].address, "10.0.0.1");
        assert_eq!(round.nodes[0].master_port, 29600);
        assert_eq!(round.nodes[1].address, "10.0.0.2");
    }

    #[tokio::test]
    async fn test_rank_zero_uses_master_addr() {
        let backend = StaticRendezvousBackend::new(0, 1, "10.0.0.9", 29500).unwrap();
        let round = backend
            .join_round(&request(1), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round.nodes[0].node_id, "self");
        assert_eq!(round.nodes[0].address, "10.0.0.9");
    }

    #[tokio::test]
    async fn test_wait_without_join_fails() {
        let backend = StaticRendezvousBackend::new(0, 1, "10.0.0.1", 29500).unwrap();
        assert!(backend
            .wait_round("job", "self", Duration::from_secs(1))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_rejects_elastic_bounds() {
        let backend = StaticRendezvousBackend::new(0, 2, "10.0.0.1", 29500).unwrap();
        let mut req = request(2);
        req.min_nodes = 1;
        assert!(backend.join(&req).await.is_err());
    }

    #[tokio::test]
    async fn test_never_superseded() {
        let backend = StaticRendezvousBackend::new(0, 2, "10.0.0.1", 29500).unwrap();
        let obs = backend.observe("job").await.unwrap();
        assert_eq!(obs.version, STATIC_VERSION);
        assert!(obs.departed.is_empty());
        assert_eq!(obs.nodes_waiting, 0);
        assert!(backend.keep_alive("job", "self", STATIC_VERSION).await.unwrap());
    }
}
