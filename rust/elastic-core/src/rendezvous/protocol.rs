//! Protocol types for rendezvous.
//!
//! This module provides the Rust-side types exchanged with a rendezvous
//! backend, with conversion traits to and from the generated protobuf
//! messages when the `grpc` feature is enabled.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "grpc")]
use crate::error::{ElasticError, Result};

#[cfg(feature = "grpc")]
pub(crate) use super::proto;

/// Identity a node presents when joining a rendezvous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Unique id of the agent process, stable across restarts.
    pub node_id: String,
    /// Address other nodes use to reach this node.
    pub address: String,
    /// Role of the workers hosted by this node.
    pub role: String,
    /// Port this node would serve as master on if it becomes group rank 0.
    pub master_port: u16,
}

impl NodeInfo {
    pub fn new(
        node_id: impl Into<String>,
        address: impl Into<String>,
        role: impl Into<String>,
        master_port: u16,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            address: address.into(),
            role: role.into(),
            master_port,
        }
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.address)
    }
}

/// A completed rendezvous round.
///
/// Immutable once produced: every node completing the same round observes the
/// same ordered node list, and a node's group rank is its index in that list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousRound {
    pub run_id: String,
    /// Round token. Strictly increases each time a new round opens.
    pub version: u64,
    pub nodes: Vec<NodeInfo>,
}

impl RendezvousRound {
    /// Number of nodes in the round.
    pub fn world_size(&self) -> usize {
        self.nodes.len()
    }

    /// Index of a node in the round, which is its group rank.
    pub fn position_of(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.node_id == node_id)
    }

    /// The group rank 0 node.
    pub fn master(&self) -> Option<&NodeInfo> {
        self.nodes.first()
    }
}

/// Parameters of a join call.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub run_id: String,
    pub node: NodeInfo,
    pub min_nodes: u32,
    pub max_nodes: u32,
    pub last_call_timeout: Duration,
}

/// Result of a join call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinTicket {
    /// Version of the round the node was registered against.
    pub version: u64,
    /// False when the node was put on the waiting list for the next round.
    pub admitted: bool,
}

/// Snapshot of a run's current round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundObservation {
    pub version: u64,
    /// True once the round is final.
    pub complete: bool,
    pub participants: u32,
    /// Nodes registered for the next round.
    pub nodes_waiting: u32,
    /// Participants that left or whose lease expired.
    pub departed: Vec<String>,
    /// Participants whose worker group finished successfully.
    pub completed: u32,
}

/// Negotiator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiatorState {
    #[default]
    Idle,
    Joining,
    WaitingForQuorum,
    RendezvousComplete,
    Monitoring,
    Superseded,
}

impl fmt::Display for NegotiatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Joining => "JOINING",
            Self::WaitingForQuorum => "WAITING_FOR_QUORUM",
            Self::RendezvousComplete => "RENDEZVOUS_COMPLETE",
            Self::Monitoring => "MONITORING",
            Self::Superseded => "SUPERSEDED",
        };
        f.write_str(name)
    }
}

/// Hostname of this machine, used as the default node address.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

// Hostname utility
mod hostname {
    use std::ffi::OsString;

    pub fn get() -> std::io::Result<OsString> {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStringExt;
            let mut buf = vec![0u8; 256];
            // SAFETY: gethostname writes at most buf.len() bytes into buf
            let ret = unsafe {
                ::libc::gethostname(buf.as_mut_ptr() as *mut ::libc::c_char, buf.len())
            };
            if ret != 0 {
                return Err(std::io::Error::last_os_error());
            }
            let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            buf.truncate(len);
            Ok(OsString::from_vec(buf))
        }

        #[cfg(not(unix))]
        {
            Ok(OsString::from("localhost"))
        }
    }
}

#[cfg(feature = "grpc")]
impl From<NodeInfo> for proto::NodeInfo {
    fn from(node: NodeInfo) -> Self {
        Self {
            node_id: node.node_id,
            address: node.address,
            role: node.role,
            master_port: u32::from(node.master_port),
        }
    }
}

#[cfg(feature = "grpc")]
impl TryFrom<proto::NodeInfo> for NodeInfo {
    type Error = ElasticError;

    fn try_from(node: proto::NodeInfo) -> Result<Self> {
        let master_port = u16::try_from(node.master_port).map_err(|_| {
            ElasticError::config(format!(
                "node {} advertised invalid master port {}",
                node.node_id, node.master_port
            ))
        })?;
        Ok(Self {
            node_id: node.node_id,
            address: node.address,
            role: node.role,
            master_port,
        })
    }
}

#[cfg(feature = "grpc")]
impl From<RendezvousRound> for proto::RoundInfo {
    fn from(round: RendezvousRound) -> Self {
        Self {
            run_id: round.run_id,
            version: round.version,
            nodes: round.nodes.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(feature = "grpc")]
impl TryFrom<proto::RoundInfo> for RendezvousRound {
    type Error = ElasticError;

    fn try_from(round: proto::RoundInfo) -> Result<Self> {
        let nodes = round
            .nodes
            .into_iter()
            .map(NodeInfo::try_from)
            .collect::<Result<Vec<_>>>()?;
        if nodes.is_empty() {
            return Err(ElasticError::rendezvous(
                round.run_id,
                format!("round {} has no nodes", round.version),
            ));
        }
        Ok(Self {
            run_id: round.run_id,
            version: round.version,
            nodes,
        })
    }
}

#[cfg(feature = "grpc")]
impl From<JoinRequest> for proto::JoinRequest {
    fn from(req: JoinRequest) -> Self {
        Self {
            run_id: req.run_id,
            node: Some(req.node.into()),
            min_nodes: req.min_nodes,
            max_nodes: req.max_nodes,
            last_call_timeout_ms: req.last_call_timeout.as_millis() as u64,
        }
    }
}

#[cfg(feature = "grpc")]
impl TryFrom<proto::JoinRequest> for JoinRequest {
    type Error = ElasticError;

    fn try_from(req: proto::JoinRequest) -> Result<Self> {
        let node = req
            .node
            .ok_or_else(|| ElasticError::rendezvous(req.run_id.clone(), "join request without node"))?;
        Ok(Self {
            run_id: req.run_id,
            node: NodeInfo::try_from(node)?,
            min_nodes: req.min_nodes,
            max_nodes: req.max_nodes,
            last_call_timeout: Duration::from_millis(req.last_call_timeout_ms),
        })
    }
}

#[cfg(feature = "grpc")]
impl From<proto::JoinResponse> for JoinTicket {
    fn from(resp: proto::JoinResponse) -> Self {
        Self {
            version: resp.version,
            admitted: resp.admitted,
        }
    }
}

#[cfg(feature = "grpc")]
impl From<JoinTicket> for proto::JoinResponse {
    fn from(ticket: JoinTicket) -> Self {
        Self {
            version: ticket.version,
            admitted: ticket.admitted,
        }
    }
}

#[cfg(feature = "grpc")]
impl From<proto::RoundObservation> for RoundObservation {
    fn from(obs: proto::RoundObservation) -> Self {
        Self {
            version: obs.version,
            complete: obs.complete,
            participants: obs.participants,
            nodes_waiting: obs.nodes_waiting,
            departed: obs.departed_nodes,
            completed: obs.completed_nodes,
        }
    }
}

#[cfg(feature = "grpc")]
impl From<RoundObservation> for proto::RoundObservation {
    fn from(obs: RoundObservation) -> Self {
        Self {
            version: obs.version,
            complete: obs.complete,
            participants: obs.participants,
            nodes_waiting: obs.nodes_waiting,
            departed_nodes: obs.departed,
            completed_nodes: obs.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> RendezvousRound {
        RendezvousRound {
            run_id: "job".to_string(),
            version: 3,
            nodes: vec![
                NodeInfo::new("a", "host-a", "trainer", 29500),
                NodeInfo::new("b", "host-b", "trainer", 29501),
            ],
        }
    }

    #[test]
    fn test_round_positions() {
        let round = round();
        assert_eq!(round.world_size(), 2);
        assert_eq!(round.position_of("b"), Some(1));
        assert_eq!(round.position_of("c"), None);
        assert_eq!(round.master().map(|n| n.address.as_str()), Some("host-a"));
    }

    #[test]
    fn test_negotiator_state_display() {
        assert_eq!(NegotiatorState::default(), NegotiatorState::Idle);
        assert_eq!(
            NegotiatorState::WaitingForQuorum.to_string(),
            "WAITING_FOR_QUORUM"
        );
    }

    #[test]
    fn test_local_hostname_not_empty() {
        assert!(!local_hostname().is_empty());
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn test_proto_round_conversion() {
        let proto_round = proto::RoundInfo::from(round());
        assert_eq!(proto_round.nodes[1].master_port, 29501);
        let back = RendezvousRound::try_from(proto_round).unwrap();
        assert_eq!(back, round());
    }

    #[cfg(feature = "grpc")]
    #[test]
    fn test_proto_node_rejects_bad_port() {
        let node = proto::NodeInfo {
            node_id: "a".to_string(),
            address: "host-a".to_string(),
            role: "trainer".to_string(),
            master_port: 70_000,
        };
        assert!(NodeInfo::try_from(node).is_err());
    }
}
