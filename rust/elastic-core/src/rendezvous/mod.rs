//! Elastic rendezvous.
//!
//! Nodes of a run agree on an ordered membership list through a shared
//! backend. This module provides:
//!
//! - The backend abstraction and its implementations (in-process store,
//!   gRPC client, static membership)
//! - The authoritative rendezvous store used by the standalone backend and
//!   the `dtr-rendezvous` server
//! - The negotiator that drives join, quorum wait, lease keep-alive and
//!   membership monitoring for one node
//!
//! # Feature
//!
//! The gRPC client and the generated protobuf code require the `grpc`
//! feature.

mod backend;
mod local;
mod negotiator;
pub mod protocol;
mod static_backend;
pub mod store;

#[cfg(feature = "grpc")]
mod client;

// Include generated protobuf code
#[cfg(feature = "grpc")]
pub mod proto {
    include!("proto/dtr.rendezvous.rs");
}

// Re-exports
pub use backend::RendezvousBackend;
pub use local::LocalRendezvousBackend;
pub use negotiator::{MembershipStatus, NegotiatorSettings, RendezvousNegotiator};
pub use protocol::{
    local_hostname, JoinRequest, JoinTicket, NegotiatorState, NodeInfo, RendezvousRound,
    RoundObservation,
};
pub use static_backend::StaticRendezvousBackend;
pub use store::RendezvousStore;

#[cfg(feature = "grpc")]
pub use client::GrpcRendezvousClient;
