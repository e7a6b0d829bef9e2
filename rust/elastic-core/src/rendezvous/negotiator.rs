//! Per-node rendezvous negotiation.
//!
//! The negotiator walks one node through
//! `IDLE -> JOINING -> WAITING_FOR_QUORUM -> RENDEZVOUS_COMPLETE -> MONITORING`
//! and reports `SUPERSEDED` once the round it completed is no longer the one
//! the run is converging on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::backend::RendezvousBackend;
use super::protocol::{JoinRequest, NegotiatorState, NodeInfo, RendezvousRound};
use crate::config::RendezvousConfig;
use crate::error::{ElasticError, Result};
use crate::retry::{retry_transient, RetryConfig};

/// Timing and sizing parameters of a negotiator.
#[derive(Debug, Clone)]
pub struct NegotiatorSettings {
    pub run_id: String,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub join_timeout: Duration,
    pub last_call_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub exit_barrier_timeout: Duration,
}

impl NegotiatorSettings {
    pub fn from_config(config: &RendezvousConfig, exit_barrier_timeout: Duration) -> Self {
        Self {
            run_id: config.run_id.clone(),
            min_nodes: config.min_nodes,
            max_nodes: config.max_nodes,
            join_timeout: config.join_timeout(),
            last_call_timeout: config.last_call_timeout(),
            keep_alive_interval: config.keep_alive_interval(),
            exit_barrier_timeout,
        }
    }
}

/// Outcome of a membership check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipStatus {
    Current,
    Superseded { reason: String },
}

/// Background task renewing this node's lease while a round is active.
struct KeepAliveTask {
    backend: Arc<dyn RendezvousBackend>,
    run_id: String,
    node_id: String,
    version: u64,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl KeepAliveTask {
    async fn run(mut self) {
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.backend.keep_alive(&self.run_id, &self.node_id, self.version).await {
                        Ok(true) => {}
                        Ok(false) => {
                            tracing::debug!(
                                version = self.version,
                                "Lease renewal rejected, round is no longer current"
                            );
                            break;
                        }
                        Err(e) => tracing::warn!("Keep-alive failed: {}", e),
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

struct KeepAliveHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl KeepAliveHandle {
    async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Keep-alive task ended abnormally: {}", e);
        }
    }
}

/// Drives rendezvous for one node.
pub struct RendezvousNegotiator {
    backend: Arc<dyn RendezvousBackend>,
    settings: NegotiatorSettings,
    node: NodeInfo,
    retry: RetryConfig,
    state: NegotiatorState,
    round: Option<RendezvousRound>,
    keep_alive: Option<KeepAliveHandle>,
}

impl RendezvousNegotiator {
    pub fn new(
        backend: Arc<dyn RendezvousBackend>,
        settings: NegotiatorSettings,
        node: NodeInfo,
        retry: RetryConfig,
    ) -> Self {
        Self {
            backend,
            settings,
            node,
            retry,
            state: NegotiatorState::Idle,
            round: None,
            keep_alive: None,
        }
    }

    pub fn state(&self) -> NegotiatorState {
        self.state
    }

    pub fn node(&self) -> &NodeInfo {
        &self.node
    }

    pub fn run_id(&self) -> &str {
        &self.settings.run_id
    }

    fn set_state(&mut self, next: NegotiatorState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "Negotiator state change");
            self.state = next;
        }
    }

    /// Join the run and block until a round containing this node completes.
    ///
    /// Any previous round is abandoned first. A quorum that does not form
    /// within `join_timeout` is fatal.
    pub async fn next_round(&mut self) -> Result<RendezvousRound> {
        self.stop_keep_alive().await;
        self.round = None;
        let started = Instant::now();

        self.set_state(NegotiatorState::Joining);
        let request = JoinRequest {
            run_id: self.settings.run_id.clone(),
            node: self.node.clone(),
            min_nodes: self.settings.min_nodes,
            max_nodes: self.settings.max_nodes,
            last_call_timeout: self.settings.last_call_timeout,
        };
        let backend = self.backend.clone();
        let ticket = retry_transient(&self.retry, "join", || backend.join(&request)).await?;

        tracing::info!(
            run_id = %self.settings.run_id,
            node = %self.node,
            version = ticket.version,
            admitted = ticket.admitted,
            "Joined rendezvous"
        );

        self.set_state(NegotiatorState::WaitingForQuorum);
        let run_id = self.settings.run_id.clone();
        let node_id = self.node.node_id.clone();
        let join_timeout = self.settings.join_timeout;
        let round = retry_transient(&self.retry, "wait_round", || {
            let remaining = join_timeout.saturating_sub(started.elapsed());
            backend.wait_round(&run_id, &node_id, remaining)
        })
        .await
        .map_err(|e| match e {
            ElasticError::RendezvousTimeout { run_id, detail, .. } => {
                ElasticError::rendezvous_timeout(run_id, join_timeout, detail)
            }
            other => other,
        })?;

        if round.position_of(&self.node.node_id).is_none() {
            return Err(ElasticError::rendezvous(
                run_id,
                format!("round {} does not contain node {}", round.version, self.node),
            ));
        }

        self.set_state(NegotiatorState::RendezvousComplete);
        tracing::info!(
            run_id = %self.settings.run_id,
            version = round.version,
            world_size = round.world_size(),
            "Rendezvous complete"
        );

        self.start_keep_alive(round.version);
        self.round = Some(round.clone());
        Ok(round)
    }

    fn start_keep_alive(&mut self, version: u64) {
        let (shutdown, rx) = watch::channel(false);
        let task = KeepAliveTask {
            backend: self.backend.clone(),
            run_id: self.settings.run_id.clone(),
            node_id: self.node.node_id.clone(),
            version,
            interval: self.settings.keep_alive_interval,
            shutdown: rx,
        };
        self.keep_alive = Some(KeepAliveHandle {
            shutdown,
            task: tokio::spawn(task.run()),
        });
    }

    async fn stop_keep_alive(&mut self) {
        if let Some(handle) = self.keep_alive.take() {
            handle.stop().await;
        }
    }

    /// Check whether the current round has been superseded.
    ///
    /// The round is superseded when the run moved to a newer round, a
    /// participant departed, or nodes are waiting while the round has room.
    pub async fn check_membership(&mut self) -> Result<MembershipStatus> {
        let round = self.round.as_ref().ok_or_else(|| {
            ElasticError::rendezvous(
                self.settings.run_id.as_str(),
                "membership check without a completed round",
            )
        })?;
        let version = round.version;
        let participants = round.world_size() as u32;

        let backend = self.backend.clone();
        let run_id = self.settings.run_id.clone();
        let obs = retry_transient(&self.retry, "observe", || backend.observe(&run_id)).await?;

        let reason = if obs.version != version {
            Some(format!("round advanced from {} to {}", version, obs.version))
        } else if !obs.departed.is_empty() {
            Some(format!("node(s) departed: {}", obs.departed.join(", ")))
        } else if obs.nodes_waiting > 0 && participants < self.settings.max_nodes {
            Some(format!("{} node(s) waiting to join", obs.nodes_waiting))
        } else {
            None
        };

        match reason {
            Some(reason) => {
                self.set_state(NegotiatorState::Superseded);
                tracing::info!(run_id = %self.settings.run_id, version, reason = %reason, "Rendezvous round superseded");
                Ok(MembershipStatus::Superseded { reason })
            }
            None => {
                self.set_state(NegotiatorState::Monitoring);
                Ok(MembershipStatus::Current)
            }
        }
    }

    /// Wait for every participant of the current round to finish.
    ///
    /// Returns true if all participants completed before the barrier timed
    /// out. Failures here never fail the local node.
    pub async fn exit_barrier(&mut self) -> bool {
        let Some(round) = self.round.clone() else {
            return false;
        };
        let backend = self.backend.clone();
        let run_id = self.settings.run_id.clone();
        let node_id = self.node.node_id.clone();

        let marked = retry_transient(&self.retry, "mark_complete", || {
            backend.mark_complete(&run_id, &node_id, round.version)
        })
        .await;
        let (mut completed, participants) = match marked {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!("Could not enter exit barrier: {}", e);
                return false;
            }
        };

        let deadline = Instant::now() + self.settings.exit_barrier_timeout;
        let poll = self.settings.keep_alive_interval.min(Duration::from_secs(1));
        while completed < participants {
            if Instant::now() >= deadline {
                tracing::warn!(
                    completed,
                    participants,
                    "Exit barrier timed out waiting for peers"
                );
                return false;
            }
            tokio::time::sleep(poll).await;

            match retry_transient(&self.retry, "observe", || backend.observe(&run_id)).await {
                Ok(obs) if obs.version != round.version => {
                    tracing::warn!(version = round.version, "Round moved on during exit barrier");
                    return false;
                }
                Ok(obs) => completed = obs.completed,
                Err(e) => {
                    tracing::warn!("Exit barrier observe failed: {}", e);
                    return false;
                }
            }
        }

        tracing::info!(participants, "All nodes completed");
        true
    }

    /// Stop lease renewal and optionally leave the run so peers notice the
    /// departure without waiting for the lease to expire.
    pub async fn shutdown(&mut self, leave: bool) {
        self.stop_keep_alive().await;
        if leave {
            if let Err(e) = self
                .backend
                .leave(&self.settings.run_id, &self.node.node_id)
                .await
            {
                tracing::warn!("Failed to leave rendezvous: {}", e);
            }
        }
        self.round = None;
        self.set_state(NegotiatorState::Idle);
    }
}
