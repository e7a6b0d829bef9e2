//! Worker group definition and the worker environment contract.

use std::collections::BTreeMap;

use super::ranks::{RankAssignment, WorkerSpec};

pub const ENV_LOCAL_RANK: &str = "LOCAL_RANK";
pub const ENV_RANK: &str = "RANK";
pub const ENV_GROUP_RANK: &str = "GROUP_RANK";
pub const ENV_ROLE_RANK: &str = "ROLE_RANK";
pub const ENV_ROLE_NAME: &str = "ROLE_NAME";
pub const ENV_LOCAL_WORLD_SIZE: &str = "LOCAL_WORLD_SIZE";
pub const ENV_WORLD_SIZE: &str = "WORLD_SIZE";
pub const ENV_ROLE_WORLD_SIZE: &str = "ROLE_WORLD_SIZE";
pub const ENV_GROUP_WORLD_SIZE: &str = "GROUP_WORLD_SIZE";
pub const ENV_MASTER_ADDR: &str = "MASTER_ADDR";
pub const ENV_MASTER_PORT: &str = "MASTER_PORT";
pub const ENV_RESTART_COUNT: &str = "DTR_RESTART_COUNT";
pub const ENV_MAX_RESTARTS: &str = "DTR_MAX_RESTARTS";
pub const ENV_RUN_ID: &str = "DTR_RUN_ID";

/// The program every local worker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Extra variables set for every worker, below the rank contract.
    pub env: BTreeMap<String, String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// One worker of a group together with its environment.
#[derive(Debug, Clone)]
pub struct Worker {
    pub spec: WorkerSpec,
    pub env: BTreeMap<String, String>,
}

/// The workers this node runs for one round.
///
/// Built once per round and never mutated. A restart builds a new group.
#[derive(Debug, Clone)]
pub struct WorkerGroup {
    pub run_id: String,
    pub round_version: u64,
    /// Restarts consumed before this group was started.
    pub restart_count: u32,
    pub max_restarts: u32,
    /// Sequence number of this start, used to separate log directories.
    pub attempt: u32,
    pub command: WorkerCommand,
    pub assignment: RankAssignment,
    pub workers: Vec<Worker>,
}

impl WorkerGroup {
    pub fn new(
        run_id: impl Into<String>,
        round_version: u64,
        restart_count: u32,
        max_restarts: u32,
        attempt: u32,
        command: WorkerCommand,
        assignment: RankAssignment,
    ) -> Self {
        let run_id = run_id.into();
        let workers = assignment
            .workers
            .iter()
            .map(|spec| Worker {
                env: worker_env(&run_id, restart_count, max_restarts, &command, &assignment, spec),
                spec: spec.clone(),
            })
            .collect();

        Self {
            run_id,
            round_version,
            restart_count,
            max_restarts,
            attempt,
            command,
            assignment,
            workers,
        }
    }

    pub fn local_world_size(&self) -> u32 {
        self.assignment.local_world_size
    }
}

fn worker_env(
    run_id: &str,
    restart_count: u32,
    max_restarts: u32,
    command: &WorkerCommand,
    assignment: &RankAssignment,
    spec: &WorkerSpec,
) -> BTreeMap<String, String> {
    let mut env = command.env.clone();
    let contract = [
        (ENV_LOCAL_RANK, spec.local_rank.to_string()),
        (ENV_RANK, spec.global_rank.to_string()),
        (ENV_GROUP_RANK, assignment.group_rank.to_string()),
        (ENV_ROLE_RANK, spec.role_rank.to_string()),
        (ENV_ROLE_NAME, spec.role.clone()),
        (ENV_LOCAL_WORLD_SIZE, assignment.local_world_size.to_string()),
        (ENV_WORLD_SIZE, assignment.world_size.to_string()),
        (ENV_ROLE_WORLD_SIZE, spec.role_world_size.to_string()),
        (ENV_GROUP_WORLD_SIZE, assignment.group_world_size.to_string()),
        (ENV_MASTER_ADDR, assignment.master_addr.clone()),
        (ENV_MASTER_PORT, assignment.master_port.to_string()),
        (ENV_RESTART_COUNT, restart_count.to_string()),
        (ENV_MAX_RESTARTS, max_restarts.to_string()),
        (ENV_RUN_ID, run_id.to_string()),
    ];
    for (key, value) in contract {
        env.insert(key.to_string(), value);
    }
    env
}
