//! Local worker-group agent.
//!
//! Everything that happens on one node once a rendezvous round is known:
//!
//! - Rank assignment from the round's ordered node list
//! - The worker group and its environment contract
//! - Spawning, polling and terminating worker processes
//! - The restart state machine tying rendezvous and supervision together

mod controller;
pub mod ranks;
pub mod redirects;
mod supervisor;
pub mod worker;

pub use controller::{local_node, ControllerState, RestartController, RestartState, RunSummary};
pub use ranks::{assign_ranks, RankAssignment, WorkerSpec};
pub use redirects::{Redirects, Std};
pub use supervisor::{GroupState, LocalWorkerSupervisor, WorkerFailure, WorkerGroupHandle};
pub use worker::{WorkerCommand, WorkerGroup};
