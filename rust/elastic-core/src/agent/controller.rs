//! Restart state machine.
//!
//! The controller owns the current round and worker group of this node. It
//! drives `INIT -> NEGOTIATING -> RUNNING` and from there either
//! `SUCCEEDED`, or `FAILED_RETRY -> NEGOTIATING` after a worker failure or a
//! superseded round, or `FAILED_FATAL` once restarts are exhausted or
//! rendezvous fails.

use std::sync::Arc;

use tokio::sync::watch;

use super::ranks::assign_ranks;
use super::supervisor::{GroupState, LocalWorkerSupervisor, WorkerGroupHandle};
use super::worker::{WorkerCommand, WorkerGroup};
use crate::config::{AgentConfig, MembershipChangePolicy, WorkerConfig};
use crate::error::{ElasticError, Result};
use crate::rendezvous::{
    local_hostname, MembershipStatus, NegotiatorSettings, NodeInfo, RendezvousBackend,
    RendezvousNegotiator,
};
use crate::retry::RetryConfig;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Negotiating,
    Running,
    FailedRetry,
    Succeeded,
    FailedFatal,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Negotiating => "NEGOTIATING",
            Self::Running => "RUNNING",
            Self::FailedRetry => "FAILED_RETRY",
            Self::Succeeded => "SUCCEEDED",
            Self::FailedFatal => "FAILED_FATAL",
        };
        f.write_str(name)
    }
}

/// Restart accounting. Each teardown yields a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartState {
    pub restarts_used: u32,
    pub max_restarts: u32,
}

impl RestartState {
    pub fn new(max_restarts: u32) -> Self {
        Self {
            restarts_used: 0,
            max_restarts,
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self {
            restarts_used: self.restarts_used + 1,
            ..self
        }
    }

    pub fn exhausted(&self) -> bool {
        self.restarts_used > self.max_restarts
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub restarts_used: u32,
    pub round_version: u64,
    pub group_rank: u32,
    pub world_size: u32,
    pub exit_codes: Vec<i32>,
}

enum MonitorOutcome {
    Succeeded(Vec<i32>),
    /// `WorkerProcessFailure` or `MembershipSuperseded`.
    Restart(ElasticError),
}

/// Resolves once `abort` reads true. Never resolves if the sender is gone.
async fn wait_for_abort(abort: &mut watch::Receiver<bool>) {
    loop {
        let aborted = *abort.borrow();
        if aborted {
            return;
        }
        if abort.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Identity this node presents to the rendezvous.
///
/// The node id is random per agent process. The advertised master port is
/// the configured one, or a free local port when it is 0.
pub fn local_node(config: &AgentConfig) -> Result<NodeInfo> {
    let address = config
        .rendezvous
        .local_addr
        .clone()
        .unwrap_or_else(local_hostname);
    let master_port = match config.rendezvous.master_port {
        0 => std::net::TcpListener::bind(("0.0.0.0", 0))
            .and_then(|l| l.local_addr())
            .map(|a| a.port())
            .map_err(|e| ElasticError::config_with_source("failed to pick a free master port", e))?,
        port => port,
    };
    Ok(NodeInfo::new(
        uuid::Uuid::new_v4().to_string(),
        address,
        config.worker.role.clone(),
        master_port,
    ))
}

pub struct RestartController {
    negotiator: RendezvousNegotiator,
    supervisor: LocalWorkerSupervisor,
    command: WorkerCommand,
    worker: WorkerConfig,
    abort: watch::Receiver<bool>,
    state: ControllerState,
    restart: RestartState,
    attempts: u32,
    transitions: Vec<ControllerState>,
}

impl RestartController {
    pub fn new(
        negotiator: RendezvousNegotiator,
        supervisor: LocalWorkerSupervisor,
        command: WorkerCommand,
        worker: WorkerConfig,
        abort: watch::Receiver<bool>,
    ) -> Self {
        let restart = RestartState::new(worker.max_restarts);
        Self {
            negotiator,
            supervisor,
            command,
            worker,
            abort,
            state: ControllerState::Init,
            restart,
            attempts: 0,
            transitions: vec![ControllerState::Init],
        }
    }

    /// Build a controller for `node` from an agent configuration.
    pub fn from_config(
        config: &AgentConfig,
        backend: Arc<dyn RendezvousBackend>,
        node: NodeInfo,
        command: WorkerCommand,
        abort: watch::Receiver<bool>,
    ) -> Result<Self> {
        let settings =
            NegotiatorSettings::from_config(&config.rendezvous, config.worker.exit_barrier_timeout());
        let negotiator =
            RendezvousNegotiator::new(backend, settings, node, RetryConfig::from(&config.retry));
        let supervisor =
            LocalWorkerSupervisor::from_config(&config.logging, &config.rendezvous.run_id)?;
        Ok(Self::new(
            negotiator,
            supervisor,
            command,
            config.worker.clone(),
            abort,
        ))
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn restart_state(&self) -> RestartState {
        self.restart
    }

    /// Every state entered so far, in order.
    pub fn transitions(&self) -> &[ControllerState] {
        &self.transitions
    }

    fn transition(&mut self, next: ControllerState) {
        tracing::debug!(from = %self.state, to = %next, "Controller state change");
        self.state = next;
        self.transitions.push(next);
    }

    /// Run the worker group to completion.
    ///
    /// Returns the summary on success. Fatal outcomes return the error, whose
    /// [`exit_code`](ElasticError::exit_code) is the process exit code.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let result = self.run_inner().await;
        match &result {
            Ok(summary) => {
                tracing::info!(
                    restarts_used = summary.restarts_used,
                    world_size = summary.world_size,
                    "Worker group succeeded"
                );
            }
            Err(e) => {
                self.transition(ControllerState::FailedFatal);
                tracing::error!(
                    restarts_used = self.restart.restarts_used,
                    max_restarts = self.restart.max_restarts,
                    "Worker group failed: {}",
                    e
                );
                self.negotiator.shutdown(true).await;
            }
        }
        result
    }

    async fn run_inner(&mut self) -> Result<RunSummary> {
        let grace = self.worker.termination_grace();

        loop {
            self.transition(ControllerState::Negotiating);
            let round = tokio::select! {
                round = self.negotiator.next_round() => round?,
                _ = wait_for_abort(&mut self.abort) => {
                    return Err(ElasticError::aborted("shutdown requested during rendezvous"));
                }
            };

            let node_id = self.negotiator.node().node_id.clone();
            let position = round.position_of(&node_id).ok_or_else(|| {
                ElasticError::rendezvous(
                    round.run_id.as_str(),
                    format!("node {} missing from round {}", node_id, round.version),
                )
            })?;
            let assignment = assign_ranks(&round.nodes, position, self.worker.local_world_size)?;
            let group = WorkerGroup::new(
                self.negotiator.run_id(),
                round.version,
                self.restart.restarts_used,
                self.restart.max_restarts,
                self.attempts,
                self.command.clone(),
                assignment,
            );
            self.attempts += 1;

            let mut handle = self.supervisor.start(&group).await?;
            self.transition(ControllerState::Running);

            let cause = match self.monitor(&mut handle).await {
                Ok(MonitorOutcome::Succeeded(exit_codes)) => {
                    self.supervisor.terminate(handle, grace).await;
                    self.transition(ControllerState::Succeeded);
                    self.negotiator.exit_barrier().await;
                    self.negotiator.shutdown(true).await;
                    return Ok(RunSummary {
                        restarts_used: self.restart.restarts_used,
                        round_version: round.version,
                        group_rank: group.assignment.group_rank,
                        world_size: group.assignment.world_size,
                        exit_codes,
                    });
                }
                Ok(MonitorOutcome::Restart(cause)) => cause,
                Err(e) => {
                    self.supervisor.terminate(handle, grace).await;
                    return Err(e);
                }
            };

            // The old group is gone before the next join.
            self.supervisor.terminate(handle, grace).await;
            self.transition(ControllerState::FailedRetry);
            self.account(cause)?;
        }
    }

    async fn monitor(&mut self, handle: &mut WorkerGroupHandle) -> Result<MonitorOutcome> {
        let interval = self.worker.monitor_interval();

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = wait_for_abort(&mut self.abort) => {
                    return Err(ElasticError::aborted("shutdown requested"));
                }
            }

            match self.supervisor.poll(handle)? {
                GroupState::Succeeded { exit_codes } => {
                    return Ok(MonitorOutcome::Succeeded(exit_codes));
                }
                GroupState::Failed(failure) => {
                    tracing::warn!("Worker failure: {}", failure);
                    return Ok(MonitorOutcome::Restart(failure.into()));
                }
                GroupState::Running => {}
            }

            let status = tokio::select! {
                status = self.negotiator.check_membership() => status?,
                _ = wait_for_abort(&mut self.abort) => {
                    return Err(ElasticError::aborted("shutdown requested"));
                }
            };
            if let MembershipStatus::Superseded { reason } = status {
                return Ok(MonitorOutcome::Restart(ElasticError::membership_superseded(reason)));
            }
        }
    }

    /// Charge a teardown against the restart budget.
    fn account(&mut self, cause: ElasticError) -> Result<()> {
        if let ElasticError::MembershipSuperseded { reason } = &cause {
            if self.worker.membership_changes == MembershipChangePolicy::Exempt {
                tracing::info!(reason = %reason, "Restarting after membership change without consuming a restart");
                return Ok(());
            }
        }

        self.restart = self.restart.next();
        if self.restart.exhausted() {
            return Err(ElasticError::RestartsExhausted {
                restarts_used: self.restart.restarts_used,
                max_restarts: self.restart.max_restarts,
                last_failure: Box::new(cause),
            });
        }

        tracing::info!(
            restarts_used = self.restart.restarts_used,
            max_restarts = self.restart.max_restarts,
            cause = %cause,
            "Restarting worker group"
        );
        Ok(())
    }
}
