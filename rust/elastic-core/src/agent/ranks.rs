//! Rank assignment.
//!
//! Expands a completed round into the ranks of the local workers. The
//! expansion is a pure function of the ordered node list, this node's
//! position in it and the per-node worker count, so every node computes a
//! consistent global layout without further coordination.

use crate::error::{ElasticError, Result};
use crate::rendezvous::NodeInfo;

/// Ranks of a single local worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub local_rank: u32,
    pub global_rank: u32,
    pub role_rank: u32,
    pub role_world_size: u32,
    pub role: String,
}

/// Rank layout of this node's worker group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    /// Position of this node in the round.
    pub group_rank: u32,
    /// Number of nodes in the round.
    pub group_world_size: u32,
    pub local_world_size: u32,
    /// Total number of workers across all nodes.
    pub world_size: u32,
    pub master_addr: String,
    pub master_port: u16,
    pub workers: Vec<WorkerSpec>,
}

/// Assign ranks for the node at `position` in `nodes`.
///
/// With `L = local_world_size`: `group_rank = position`,
/// `world_size = nodes.len() * L` and worker `i` gets `global_rank =
/// position * L + i`. Role ranks follow the same rule over the nodes that
/// share this node's role, in round order.
pub fn assign_ranks(
    nodes: &[NodeInfo],
    position: usize,
    local_world_size: u32,
) -> Result<RankAssignment> {
    let node = nodes.get(position).ok_or_else(|| {
        ElasticError::config(format!(
            "node position {} is outside a round of {} node(s)",
            position,
            nodes.len()
        ))
    })?;
    if local_world_size == 0 {
        return Err(ElasticError::config("local_world_size must be greater than 0"));
    }

    let master = &nodes[0];
    let group_rank = position as u32;
    let group_world_size = nodes.len() as u32;

    let role_position = nodes[..position]
        .iter()
        .filter(|n| n.role == node.role)
        .count() as u32;
    let role_nodes = nodes.iter().filter(|n| n.role == node.role).count() as u32;

    let workers = (0..local_world_size)
        .map(|local_rank| WorkerSpec {
            local_rank,
            global_rank: group_rank * local_world_size + local_rank,
            role_rank: role_position * local_world_size + local_rank,
            role_world_size: role_nodes * local_world_size,
            role: node.role.clone(),
        })
        .collect();

    Ok(RankAssignment {
        group_rank,
        group_world_size,
        local_world_size,
        world_size: group_world_size * local_world_size,
        master_addr: master.address.clone(),
        master_port: master.master_port,
        workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn nodes(roles: &[&str]) -> Vec<NodeInfo> {
        roles
            .iter()
            .enumerate()
            .map(|(i, role)| NodeInfo::new(format!("n{}", i), format!("host-{}", i), *role, 29500 + i as u16))
            .collect()
    }

    #[test]
    fn test_single_node_four_workers() {
        let assignment = assign_ranks(&nodes(&["trainer"]), 0, 4).unwrap();

        assert_eq!(assignment.world_size, 4);
        assert_eq!(assignment.group_rank, 0);
        assert_eq!(assignment.master_addr, "host-0");
        let ranks: Vec<u32> = assignment.workers.iter().map(|w| w.global_rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_two_nodes_two_workers() {
        let round = nodes(&["trainer", "trainer"]);
        let a = assign_ranks(&round, 0, 2).unwrap();
        let b = assign_ranks(&round, 1, 2).unwrap();

        assert_eq!(a.group_rank, 0);
        assert_eq!(b.group_rank, 1);
        assert_eq!(a.workers.iter().map(|w| w.global_rank).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(b.workers.iter().map(|w| w.global_rank).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(a.world_size, 4);
        assert_eq!(b.world_size, 4);
        assert_eq!(b.master_addr, "host-0");
        assert_eq!(b.master_port, 29500);
    }

    #[test]
    fn test_role_ranks_restricted_to_role() {
        let round = nodes(&["trainer", "evaluator", "trainer"]);
        let third = assign_ranks(&round, 2, 2).unwrap();

        assert_eq!(third.workers[0].global_rank, 4);
        assert_eq!(third.workers[0].role_rank, 2);
        assert_eq!(third.workers[1].role_rank, 3);
        assert_eq!(third.workers[0].role_world_size, 4);

        let evaluator = assign_ranks(&round, 1, 2).unwrap();
        assert_eq!(evaluator.workers[1].role_rank, 1);
        assert_eq!(evaluator.workers[1].role_world_size, 2);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(assign_ranks(&nodes(&["trainer"]), 1, 2).is_err());
        assert!(assign_ranks(&nodes(&["trainer"]), 0, 0).is_err());
        assert!(assign_ranks(&[], 0, 1).is_err());
    }

    proptest! {
        #[test]
        fn prop_global_ranks_are_a_permutation(n in 1usize..16, l in 1u32..9) {
            let round: Vec<NodeInfo> = (0..n)
                .map(|i| NodeInfo::new(format!("n{}", i), "h", "trainer", 29500))
                .collect();

            let mut ranks: Vec<u32> = (0..n)
                .flat_map(|p| assign_ranks(&round, p, l).unwrap().workers)
                .map(|w| w.global_rank)
                .collect();
            ranks.sort_unstable();

            let expected: Vec<u32> = (0..n as u32 * l).collect();
            prop_assert_eq!(ranks, expected);
        }

        #[test]
        fn prop_assignment_is_deterministic(
            roles in proptest::collection::vec(prop_oneof![Just("a"), Just("b")], 1..10),
            l in 1u32..5,
            pick in any::<prop::sample::Index>(),
        ) {
            let round = nodes(&roles);
            let position = pick.index(round.len());
            let first = assign_ranks(&round, position, l).unwrap();
            let second = assign_ranks(&round, position, l).unwrap();
            prop_assert_eq!(&first, &second);

            for worker in &first.workers {
                prop_assert!(worker.role_rank < worker.role_world_size);
                prop_assert!(worker.global_rank < first.world_size);
            }
        }
    }
}
