//! Aggregation input snapshots sourced from the authoritative world state.

use skillweave_core::{BoardStatsInputs, PurchasedNodeStats, StatsInputs};

use crate::World;

/// Captures the stat fields of every purchased node across all boards.
///
/// Boards are visited in handle-allocation order and nodes in cell order,
/// but consumers must not depend on either: consolidation sums per key, so
/// any traversal order yields the same totals.
pub(crate) fn stats_inputs(world: &World) -> StatsInputs {
    let boards = world
        .boards
        .iter()
        .map(|board| BoardStatsInputs {
            board: board.id,
            nodes: board
                .nodes
                .values()
                .filter(|node| node.purchased)
                .map(|node| PurchasedNodeStats {
                    id: node.id.clone(),
                    node_kind: node.kind,
                    node_cost: node.cost,
                    fields: node.stat_fields.clone(),
                })
                .collect(),
        })
        .collect();
    StatsInputs::new(boards)
}
