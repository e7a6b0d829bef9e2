// rust/elastic-core/src/lib.rs

//! Elastic worker-group agent - Core Library
//!
//! This crate coordinates a dynamically-sized group of worker processes
//! spread across nodes: it negotiates membership through a rendezvous
//! backend, assigns ranks, spawns and supervises the local workers, and
//! restarts the whole group on failure or membership change up to a bounded
//! number of restarts.

pub mod config;
pub mod error;
pub mod retry;

// Re-export commonly used types for convenience
pub use config::{AgentConfig, MembershipChangePolicy, RendezvousBackendType};
pub use error::{ElasticError, Result};
pub use retry::RetryConfig;

pub mod rendezvous;
pub use rendezvous::{
    LocalRendezvousBackend, NodeInfo, RendezvousBackend, RendezvousNegotiator, RendezvousRound,
    RendezvousStore, StaticRendezvousBackend,
};

#[cfg(feature = "grpc")]
pub use rendezvous::GrpcRendezvousClient;

pub mod agent;
pub use agent::{
    assign_ranks, ControllerState, LocalWorkerSupervisor, RestartController, RestartState,
    RunSummary, WorkerCommand, WorkerGroup,
};
