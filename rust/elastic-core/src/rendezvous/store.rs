//! In-memory rendezvous state.
//!
//! The store is the single authority for the rounds of every run it knows
//! about. It backs both the standalone backend and the `dtr-rendezvous`
//! server. All mutations go through one lock, so every operation is
//! linearizable.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use super::protocol::{JoinRequest, JoinTicket, NodeInfo, RendezvousRound, RoundObservation};
use crate::error::{ElasticError, Result};

/// Lifecycle of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Nodes may still join. The deadline is set once `min_nodes` joined.
    Joinable { last_call_deadline: Option<Instant> },
    /// Membership is fixed.
    Final,
}

/// State of one run.
#[derive(Debug)]
struct RunState {
    run_id: String,
    version: u64,
    phase: RoundPhase,
    min_nodes: u32,
    max_nodes: u32,
    last_call_timeout: Duration,
    /// Join order is node rank.
    participants: Vec<NodeInfo>,
    /// Nodes that arrived after the round became final.
    waiting: Vec<NodeInfo>,
    leases: HashMap<String, Instant>,
    /// Liveness of waiting nodes, renewed while they block in `wait_round`.
    waiting_leases: HashMap<String, Instant>,
    completed: HashSet<String>,
    departed: HashSet<String>,
}

impl RunState {
    fn new(request: &JoinRequest) -> Self {
        Self {
            run_id: request.run_id.clone(),
            version: 1,
            phase: RoundPhase::Joinable {
                last_call_deadline: None,
            },
            min_nodes: request.min_nodes,
            max_nodes: request.max_nodes,
            last_call_timeout: request.last_call_timeout,
            participants: Vec::new(),
            waiting: Vec::new(),
            leases: HashMap::new(),
            waiting_leases: HashMap::new(),
            completed: HashSet::new(),
            departed: HashSet::new(),
        }
    }

    fn is_participant(&self, node_id: &str) -> bool {
        self.participants.iter().any(|n| n.node_id == node_id)
    }

    fn is_waiting(&self, node_id: &str) -> bool {
        self.waiting.iter().any(|n| n.node_id == node_id)
    }

    fn add_waiting(&mut self, node: NodeInfo, now: Instant) {
        self.waiting_leases.insert(node.node_id.clone(), now);
        self.waiting.push(node);
    }

    fn add_participant(&mut self, node: NodeInfo, now: Instant) {
        self.leases.insert(node.node_id.clone(), now);
        self.participants.push(node);
        self.update_phase(now);
    }

    /// Move a joinable round forward. Returns true if the round became final.
    fn update_phase(&mut self, now: Instant) -> bool {
        let RoundPhase::Joinable { last_call_deadline } = self.phase else {
            return false;
        };

        let count = self.participants.len() as u32;
        let deadline = if count >= self.min_nodes {
            Some(last_call_deadline.unwrap_or(now + self.last_call_timeout))
        } else {
            None
        };

        if count >= self.max_nodes || matches!(deadline, Some(d) if now >= d) {
            self.finalize(now);
            return true;
        }

        self.phase = RoundPhase::Joinable {
            last_call_deadline: deadline,
        };
        false
    }

    fn finalize(&mut self, now: Instant) {
        self.phase = RoundPhase::Final;
        for node in &self.participants {
            self.leases.insert(node.node_id.clone(), now);
        }
        self.completed.clear();
        self.departed.clear();

        tracing::info!(
            run_id = %self.run_id,
            version = self.version,
            nodes = self.participants.len(),
            waiting = self.waiting.len(),
            "Rendezvous round is final"
        );
    }

    /// Open round `version + 1` with `first` as its first participant,
    /// carrying waiting nodes over up to `max_nodes`.
    fn open_next_round(&mut self, first: NodeInfo, now: Instant) {
        self.version += 1;
        self.phase = RoundPhase::Joinable {
            last_call_deadline: None,
        };
        self.participants.clear();
        self.leases.clear();
        self.completed.clear();
        self.departed.clear();

        self.leases.insert(first.node_id.clone(), now);
        self.participants.push(first);

        let free = (self.max_nodes as usize).saturating_sub(self.participants.len());
        let carried = self.waiting.len().min(free);
        for node in self.waiting.drain(..carried) {
            self.waiting_leases.remove(&node.node_id);
            self.leases.insert(node.node_id.clone(), now);
            self.participants.push(node);
        }

        tracing::info!(
            run_id = %self.run_id,
            version = self.version,
            carried_over = carried,
            "Opened new rendezvous round"
        );

        self.update_phase(now);
    }

    /// Remove a node that is not part of a final round. Returns true if the
    /// node was registered.
    fn withdraw(&mut self, node_id: &str, now: Instant) -> bool {
        if let Some(idx) = self.waiting.iter().position(|n| n.node_id == node_id) {
            self.waiting.remove(idx);
            self.waiting_leases.remove(node_id);
            return true;
        }
        if self.phase == RoundPhase::Final {
            return false;
        }
        match self.participants.iter().position(|n| n.node_id == node_id) {
            Some(idx) => {
                self.participants.remove(idx);
                self.leases.remove(node_id);
                self.update_phase(now);
                true
            }
            None => false,
        }
    }

    fn lease_expired(&self, node_id: &str, now: Instant, ttl: Duration) -> bool {
        self.leases
            .get(node_id)
            .map_or(true, |renewed| now.saturating_duration_since(*renewed) > ttl)
    }

    /// Drop waiting nodes that stopped renewing their lease. Returns their ids.
    fn purge_stale_waiters(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .waiting
            .iter()
            .map(|n| n.node_id.clone())
            .filter(|id| {
                self.waiting_leases
                    .get(id)
                    .map_or(true, |renewed| now.saturating_duration_since(*renewed) > ttl)
            })
            .collect();
        for id in &stale {
            self.withdraw(id, now);
        }
        if !stale.is_empty() {
            tracing::warn!(run_id = %self.run_id, nodes = ?stale, "Dropped waiting node(s) with expired lease");
        }
        stale
    }

    /// Apply lease expiry to participants and waiting nodes. Returns the
    /// nodes that expired just now.
    fn detect_departures(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        let mut expired: Vec<String> = self
            .participants
            .iter()
            .map(|n| n.node_id.clone())
            .filter(|id| !self.completed.contains(id) && !self.departed.contains(id))
            .filter(|id| self.lease_expired(id, now, ttl))
            .collect();

        match self.phase {
            RoundPhase::Final => {
                self.departed.extend(expired.iter().cloned());
            }
            RoundPhase::Joinable { .. } => {
                for id in &expired {
                    self.withdraw(id, now);
                }
            }
        }
        expired.extend(self.purge_stale_waiters(now, ttl));
        expired
    }

    fn round(&self) -> RendezvousRound {
        RendezvousRound {
            run_id: self.run_id.clone(),
            version: self.version,
            nodes: self.participants.clone(),
        }
    }

    fn observation(&self) -> RoundObservation {
        let mut departed: Vec<String> = self.departed.iter().cloned().collect();
        departed.sort();
        RoundObservation {
            version: self.version,
            complete: self.phase == RoundPhase::Final,
            participants: self.participants.len() as u32,
            nodes_waiting: self.waiting.len() as u32,
            departed,
            completed: self.completed.len() as u32,
        }
    }
}

/// Authoritative rendezvous state for any number of runs.
pub struct RendezvousStore {
    runs: Mutex<HashMap<String, RunState>>,
    /// Bumped on every state change to wake blocked `wait_round` calls.
    events: watch::Sender<u64>,
    lease_ttl: Duration,
}

impl RendezvousStore {
    pub fn new(lease_ttl: Duration) -> Self {
        let (events, _) = watch::channel(0);
        Self {
            runs: Mutex::new(HashMap::new()),
            events,
            lease_ttl,
        }
    }

    pub fn lease_ttl(&self) -> Duration {
        self.lease_ttl
    }

    fn notify(&self) {
        self.events.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Register a node. See [`RendezvousBackend::join`](super::RendezvousBackend::join).
    pub async fn join(&self, request: &JoinRequest) -> Result<JoinTicket> {
        let run_id = &request.run_id;
        let node_id = &request.node.node_id;
        if node_id.is_empty() {
            return Err(ElasticError::rendezvous(run_id.as_str(), "node_id must not be empty"));
        }
        if request.min_nodes == 0 || request.min_nodes > request.max_nodes {
            return Err(ElasticError::rendezvous(
                run_id.as_str(),
                format!(
                    "invalid node bounds min={} max={}",
                    request.min_nodes, request.max_nodes
                ),
            ));
        }

        let now = Instant::now();
        let mut runs = self.runs.lock().await;
        let run = runs
            .entry(run_id.clone())
            .or_insert_with(|| RunState::new(request));
        run.update_phase(now);
        // Dead waiters must not be carried into the next round.
        run.purge_stale_waiters(now, self.lease_ttl);

        let ticket = if run.is_participant(node_id) {
            if run.phase == RoundPhase::Final {
                tracing::info!(
                    run_id = %run_id,
                    node_id = %node_id,
                    previous_version = run.version,
                    "Participant rejoined a final round"
                );
                run.open_next_round(request.node.clone(), now);
            } else {
                run.leases.insert(node_id.clone(), now);
            }
            JoinTicket {
                version: run.version,
                admitted: true,
            }
        } else if run.is_waiting(node_id) {
            run.waiting_leases.insert(node_id.clone(), now);
            JoinTicket {
                version: run.version,
                admitted: false,
            }
        } else if run.phase == RoundPhase::Final {
            tracing::info!(
                run_id = %run_id,
                node_id = %node_id,
                version = run.version,
                "Node is waiting for the next round"
            );
            run.add_waiting(request.node.clone(), now);
            JoinTicket {
                version: run.version,
                admitted: false,
            }
        } else {
            tracing::debug!(run_id = %run_id, node_id = %node_id, version = run.version, "Node joined round");
            run.add_participant(request.node.clone(), now);
            JoinTicket {
                version: run.version,
                admitted: true,
            }
        };

        self.notify();
        Ok(ticket)
    }

    /// Block until a final round containing the node exists.
    pub async fn wait_round(
        &self,
        run_id: &str,
        node_id: &str,
        timeout: Duration,
    ) -> Result<RendezvousRound> {
        let deadline = Instant::now() + timeout;
        let tick = (self.lease_ttl / 3).max(Duration::from_millis(10));
        let mut events = self.events.subscribe();

        loop {
            let now = Instant::now();
            let wake = {
                let mut runs = self.runs.lock().await;
                let run = runs
                    .get_mut(run_id)
                    .ok_or_else(|| ElasticError::rendezvous(run_id, "unknown run"))?;

                if run.update_phase(now) {
                    self.notify();
                }

                let participant = run.is_participant(node_id);
                if participant && run.phase == RoundPhase::Final {
                    return Ok(run.round());
                }
                if !participant && !run.is_waiting(node_id) {
                    return Err(ElasticError::rendezvous(
                        run_id,
                        format!("node {} is not registered for round {}", node_id, run.version),
                    ));
                }

                if now >= deadline {
                    let detail = format!(
                        "{} of min {} node(s) joined round {}",
                        run.participants.len(),
                        run.min_nodes,
                        run.version
                    );
                    run.withdraw(node_id, now);
                    self.notify();
                    return Err(ElasticError::rendezvous_timeout(run_id, timeout, detail));
                }

                if participant {
                    run.leases.insert(node_id.to_string(), now);
                } else {
                    run.waiting_leases.insert(node_id.to_string(), now);
                }

                let mut wake = deadline.min(now + tick);
                if let RoundPhase::Joinable {
                    last_call_deadline: Some(last_call),
                } = run.phase
                {
                    wake = wake.min(last_call);
                }
                wake
            };

            tokio::select! {
                _ = events.changed() => {}
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    /// Renew a participant's lease for round `version`.
    pub async fn keep_alive(&self, run_id: &str, node_id: &str, version: u64) -> Result<bool> {
        let now = Instant::now();
        let mut runs = self.runs.lock().await;
        let Some(run) = runs.get_mut(run_id) else {
            return Ok(false);
        };
        if run.update_phase(now) {
            self.notify();
        }

        if run.version != version || !run.is_participant(node_id) || run.departed.contains(node_id)
        {
            return Ok(false);
        }
        run.leases.insert(node_id.to_string(), now);
        Ok(true)
    }

    pub async fn observe(&self, run_id: &str) -> Result<RoundObservation> {
        let now = Instant::now();
        let mut runs = self.runs.lock().await;
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| ElasticError::rendezvous(run_id, "unknown run"))?;

        let mut changed = run.update_phase(now);
        let departed = run.detect_departures(now, self.lease_ttl);
        if !departed.is_empty() {
            tracing::warn!(run_id = %run_id, nodes = ?departed, "Node lease expired");
            changed = true;
        }
        if changed {
            self.notify();
        }
        Ok(run.observation())
    }

    /// Record local success of a participant of round `version`.
    pub async fn mark_complete(
        &self,
        run_id: &str,
        node_id: &str,
        version: u64,
    ) -> Result<(u32, u32)> {
        let mut runs = self.runs.lock().await;
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| ElasticError::rendezvous(run_id, "unknown run"))?;

        if run.version != version || run.phase != RoundPhase::Final {
            return Err(ElasticError::rendezvous(
                run_id,
                format!(
                    "round {} is no longer current (current round is {})",
                    version, run.version
                ),
            ));
        }
        if !run.is_participant(node_id) {
            return Err(ElasticError::rendezvous(
                run_id,
                format!("node {} is not a participant of round {}", node_id, version),
            ));
        }

        run.completed.insert(node_id.to_string());
        let counts = (run.completed.len() as u32, run.participants.len() as u32);
        self.notify();
        Ok(counts)
    }

    pub async fn leave(&self, run_id: &str, node_id: &str) -> Result<bool> {
        let now = Instant::now();
        let mut runs = self.runs.lock().await;
        let Some(run) = runs.get_mut(run_id) else {
            return Ok(false);
        };

        let removed = if run.withdraw(node_id, now) {
            true
        } else if run.phase == RoundPhase::Final && run.is_participant(node_id) {
            if !run.completed.contains(node_id) {
                run.departed.insert(node_id.to_string());
            }
            true
        } else {
            false
        };

        if removed {
            tracing::info!(run_id = %run_id, node_id = %node_id, version = run.version, "Node left rendezvous");
            self.notify();
        }
        Ok(removed)
    }

    /// Apply lease expiry to every run. Returns `(run_id, node_id)` pairs that
    /// departed during this sweep.
    pub async fn expire_leases(&self) -> Vec<(String, String)> {
        let now = Instant::now();
        let mut runs = self.runs.lock().await;
        let mut expired = Vec::new();
        let mut changed = false;

        for (run_id, run) in runs.iter_mut() {
            changed |= run.update_phase(now);
            for node_id in run.detect_departures(now, self.lease_ttl) {
                expired.push((run_id.clone(), node_id));
            }
        }

        if changed || !expired.is_empty() {
            self.notify();
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(run_id: &str, node_id: &str, min: u32, max: u32, last_call_ms: u64) -> JoinRequest {
        JoinRequest {
            run_id: run_id.to_string(),
            node: NodeInfo::new(node_id, format!("host-{}", node_id), "trainer", 29500),
            min_nodes: min,
            max_nodes: max,
            last_call_timeout: Duration::from_millis(last_call_ms),
        }
    }

    fn node_ids(round: &RendezvousRound) -> Vec<&str> {
        round.nodes.iter().map(|n| n.node_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_single_node_round() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        let ticket = store.join(&request("job", "a", 1, 1, 0)).await.unwrap();
        assert_eq!(ticket, JoinTicket { version: 1, admitted: true });

        let round = store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round.version, 1);
        assert_eq!(node_ids(&round), vec!["a"]);
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();

        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.participants, 1);
        assert!(!obs.complete);
    }

    #[tokio::test]
    async fn test_two_nodes_observe_identical_round() {
        let store = Arc::new(RendezvousStore::new(Duration::from_secs(30)));
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_round("job", "a", Duration::from_secs(5)).await })
        };

        store.join(&request("job", "b", 2, 2, 0)).await.unwrap();
        let round_b = store
            .wait_round("job", "b", Duration::from_secs(5))
            .await
            .unwrap();
        let round_a = waiter.await.unwrap().unwrap();

        assert_eq!(round_a, round_b);
        assert_eq!(node_ids(&round_a), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_call_finalizes_below_max() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 1, 3, 50)).await.unwrap();

        let started = Instant::now();
        let round = store
            .wait_round("job", "a", Duration::from_secs(5))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(round.world_size(), 1);
    }

    #[tokio::test]
    async fn test_wait_timeout_withdraws_node() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();

        let err = store
            .wait_round("job", "a", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ElasticError::RendezvousTimeout { .. }));
        assert!(err.to_string().contains("1 of min 2"));

        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.participants, 0);
    }

    #[tokio::test]
    async fn test_late_node_waits_and_rejoin_carries_it_over() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        let first = store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(first.version, 1);

        let ticket = store.join(&request("job", "b", 1, 2, 0)).await.unwrap();
        assert!(!ticket.admitted);
        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.nodes_waiting, 1);
        assert_eq!(obs.participants, 1);

        // The existing participant rejoins and opens the next round.
        let ticket = store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        assert_eq!(ticket, JoinTicket { version: 2, admitted: true });

        let round_b = store
            .wait_round("job", "b", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round_b.version, 2);
        assert_eq!(node_ids(&round_b), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dead_waiter_is_dropped() {
        let store = RendezvousStore::new(Duration::from_millis(200));
        store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();

        // b registers for the next round and never comes back.
        let ticket = store.join(&request("job", "b", 1, 2, 0)).await.unwrap();
        assert!(!ticket.admitted);
        assert_eq!(store.observe("job").await.unwrap().nodes_waiting, 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.keep_alive("job", "a", 1).await.unwrap());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.keep_alive("job", "a", 1).await.unwrap());

        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.nodes_waiting, 0);
        assert!(obs.departed.is_empty());

        // A later round does not count the dead node.
        store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        let round = store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(round.version, 2);
        assert_eq!(node_ids(&round), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_waiter_keeps_its_place() {
        let store = Arc::new(RendezvousStore::new(Duration::from_millis(200)));
        store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();

        store.join(&request("job", "b", 1, 2, 0)).await.unwrap();
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.wait_round("job", "b", Duration::from_secs(10)).await })
        };

        // Well past the lease, but b renews it while blocked.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.expire_leases().await, vec![("job".to_string(), "a".to_string())]);
        assert_eq!(store.observe("job").await.unwrap().nodes_waiting, 1);

        store.join(&request("job", "a", 1, 2, 0)).await.unwrap();
        let round = waiter.await.unwrap().unwrap();
        assert_eq!(round.version, 2);
        assert_eq!(node_ids(&round), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_keep_alive_rejects_stale_round() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 1, 1, 0)).await.unwrap();
        store
            .wait_round("job", "a", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(store.keep_alive("job", "a", 1).await.unwrap());
        store.join(&request("job", "a", 1, 1, 0)).await.unwrap();
        assert!(!store.keep_alive("job", "a", 1).await.unwrap());
        assert!(!store.keep_alive("other", "a", 1).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lease_marks_departure() {
        let store = RendezvousStore::new(Duration::from_millis(50));
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();
        store.join(&request("job", "b", 2, 2, 0)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.keep_alive("job", "a", 1).await.unwrap());

        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.departed, vec!["b".to_string()]);

        let expired = store.expire_leases().await;
        assert!(expired.is_empty(), "departure is reported once");
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_node_is_not_departed() {
        let store = RendezvousStore::new(Duration::from_millis(50));
        store.join(&request("job", "a", 1, 1, 0)).await.unwrap();

        assert_eq!(store.mark_complete("job", "a", 1).await.unwrap(), (1, 1));
        assert!(store.leave("job", "a").await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;
        let obs = store.observe("job").await.unwrap();
        assert!(obs.departed.is_empty());
        assert_eq!(obs.completed, 1);
    }

    #[tokio::test]
    async fn test_leave_final_round_marks_departure() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 2, 2, 0)).await.unwrap();
        store.join(&request("job", "b", 2, 2, 0)).await.unwrap();

        assert!(store.leave("job", "b").await.unwrap());
        assert!(!store.leave("job", "c").await.unwrap());

        let obs = store.observe("job").await.unwrap();
        assert_eq!(obs.departed, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_mark_complete_rejects_stale_round() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        store.join(&request("job", "a", 1, 1, 0)).await.unwrap();
        store.join(&request("job", "a", 1, 1, 0)).await.unwrap();

        let err = store.mark_complete("job", "a", 1).await.unwrap_err();
        assert!(err.to_string().contains("no longer current"));
        assert_eq!(store.mark_complete("job", "a", 2).await.unwrap(), (1, 1));
    }

    #[tokio::test]
    async fn test_invalid_bounds_rejected() {
        let store = RendezvousStore::new(Duration::from_secs(30));
        assert!(store.join(&request("job", "a", 3, 2, 0)).await.is_err());
        assert!(store.join(&request("job", "", 1, 1, 0)).await.is_err());
        assert!(store.observe("job").await.is_err());
    }
}
