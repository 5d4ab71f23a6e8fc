//! Cross-board coordinate mapping and extension mirroring.
//!
//! Two boards stitched together at a shared edge disagree about local
//! coordinates: a cell on the north edge of one board corresponds to the
//! same column on the *south* edge of its northern neighbour. The helpers
//! here translate cells and socket names across that seam, and
//! [`mirror_extension_allocation`] walks every cardinal neighbour of a
//! purchased extension node, free-allocating the mirrored cells.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use skillweave_core::{BoardId, CellCoord, Direction, Event, GridPos, MirrorSkip, NodeKind};

use crate::boards::ExtensionPointState;
use crate::World;

/// Scans the unit offsets around `position` for registered boards.
///
/// `cardinal_only` restricts the scan to the four cardinal offsets; the
/// position itself is never reported even when the scan wraps degenerately
/// at the numeric limits of the grid.
#[must_use]
pub fn adjacent_board_positions(
    world: &World,
    position: GridPos,
    cardinal_only: bool,
) -> Vec<GridPos> {
    let directions: &[Direction] = if cardinal_only {
        &Direction::CARDINAL
    } else {
        &Direction::ALL
    };

    directions
        .iter()
        .filter_map(|direction| {
            let (delta_x, delta_y) = direction.offset();
            let candidate = position.translated(delta_x, delta_y);
            (candidate != position && world.boards.board_at(candidate).is_some())
                .then_some(candidate)
        })
        .collect()
}

/// Maps a cell onto the facing edge of the neighbour board in `direction`.
///
/// Cardinal directions preserve the off-axis coordinate; diagonal directions
/// collapse to the facing corner of the neighbour, discarding both original
/// coordinates.
#[must_use]
pub fn corresponding_cell(
    origin: CellCoord,
    direction: Direction,
    target_columns: u32,
    target_rows: u32,
) -> CellCoord {
    let last_column = target_columns.saturating_sub(1);
    let last_row = target_rows.saturating_sub(1);
    match direction {
        Direction::North => CellCoord::new(origin.column(), 0),
        Direction::South => CellCoord::new(origin.column(), last_row),
        Direction::East => CellCoord::new(0, origin.row()),
        Direction::West => CellCoord::new(last_column, origin.row()),
        Direction::NorthEast => CellCoord::new(0, 0),
        Direction::SouthEast => CellCoord::new(0, last_row),
        Direction::SouthWest => CellCoord::new(last_column, last_row),
        Direction::NorthWest => CellCoord::new(last_column, 0),
    }
}

/// Derives the socket name expected on the far side of the seam.
///
/// The cardinal label in the name is swapped for its opposite. Diagonal
/// directions degrade to the vertical cardinal pair, mirroring the corner
/// collapse of [`corresponding_cell`].
#[must_use]
pub fn corresponding_point_name(original: &str, direction: Direction) -> String {
    let (from, to) = match direction {
        Direction::North | Direction::NorthEast | Direction::NorthWest => ("north", "south"),
        Direction::South | Direction::SouthEast | Direction::SouthWest => ("south", "north"),
        Direction::East => ("east", "west"),
        Direction::West => ("west", "east"),
    };
    original.replace(from, to)
}

struct SeamEnd {
    name: String,
    position: GridPos,
    socket_id: Option<String>,
    socket_budget: bool,
}

fn seam_end(world: &World, board: BoardId, cell: CellCoord) -> Option<SeamEnd> {
    let board = world.boards.get(board)?;
    let socket = board.extension_point(cell);
    Some(SeamEnd {
        name: board.name.clone(),
        position: board.position,
        socket_id: socket.map(|point| point.id.clone()),
        socket_budget: socket.map_or(true, ExtensionPointState::has_budget),
    })
}

/// Mirrors a purchased extension node onto every cardinal neighbour board.
///
/// Each mirrored allocation is free and may itself be an extension node, in
/// which case mirroring continues from the mirrored cell. The walk carries a
/// visited set so a closed loop of boards cannot re-enter the cascade, and a
/// missing neighbour cell only skips that neighbour, never the originating
/// allocation.
pub(crate) fn mirror_extension_allocation(
    world: &mut World,
    source_board: BoardId,
    source_cell: CellCoord,
    out_events: &mut Vec<Event>,
) {
    let mut queue: VecDeque<(BoardId, CellCoord)> = VecDeque::new();
    queue.push_back((source_board, source_cell));
    let mut visited: BTreeSet<(BoardId, CellCoord)> = BTreeSet::new();

    while let Some((board_id, cell)) = queue.pop_front() {
        if !visited.insert((board_id, cell)) {
            continue;
        }

        for direction in Direction::CARDINAL {
            // Re-read the source socket each pass; a link recorded for an
            // earlier direction consumes connection budget.
            let Some(origin) = seam_end(world, board_id, cell) else {
                break;
            };

            let (delta_x, delta_y) = direction.offset();
            let neighbour_position = origin.position.translated(delta_x, delta_y);
            if neighbour_position == origin.position {
                continue;
            }
            let Some(target_id) = world.boards.board_at(neighbour_position) else {
                out_events.push(Event::ExtensionMirrorSkipped {
                    source_board: board_id,
                    direction,
                    reason: MirrorSkip::NoAdjacentBoard,
                });
                continue;
            };

            let Some(target) = world.boards.get(target_id) else {
                continue;
            };
            let mapped = corresponding_cell(cell, direction, target.columns, target.rows);
            let target_name = target.name.clone();
            let node = target.node(mapped);
            let node_exists = node.is_some();
            let node_purchased = node.is_some_and(|node| node.purchased);
            let target_socket_id = target.extension_point(mapped).map(|point| point.id.clone());
            let target_socket_budget = target
                .extension_point(mapped)
                .map_or(true, ExtensionPointState::has_budget);

            if !node_exists {
                warn!(
                    board = %target_name,
                    cell = ?mapped,
                    "extension mirror target cell missing, skipping neighbour"
                );
                out_events.push(Event::ExtensionMirrorSkipped {
                    source_board: board_id,
                    direction,
                    reason: MirrorSkip::NoMatchingCell,
                });
                continue;
            }
            if node_purchased {
                out_events.push(Event::ExtensionMirrorSkipped {
                    source_board: board_id,
                    direction,
                    reason: MirrorSkip::AlreadyPurchased,
                });
                continue;
            }
            // An unpurchased target needs connection budget on both sockets.
            if !origin.socket_budget {
                out_events.push(Event::ExtensionMirrorSkipped {
                    source_board: board_id,
                    direction,
                    reason: MirrorSkip::ConnectionLimit,
                });
                continue;
            }
            if !target_socket_budget {
                out_events.push(Event::ExtensionMirrorSkipped {
                    source_board: board_id,
                    direction,
                    reason: MirrorSkip::ConnectionLimit,
                });
                continue;
            }

            if let (Some(source_socket), Some(target_socket)) =
                (origin.socket_id.as_deref(), target_socket_id.as_deref())
            {
                let expected = corresponding_point_name(source_socket, direction);
                if expected != target_socket {
                    debug!(
                        expected = %expected,
                        found = %target_socket,
                        "extension socket names disagree across the seam"
                    );
                }
            }

            let Some(kind) = crate::free_allocate(world, target_id, mapped, out_events) else {
                continue;
            };
            out_events.push(Event::ExtensionMirrored {
                source_board: board_id,
                source_cell: cell,
                target_board: target_id,
                target_cell: mapped,
            });

            if let Some(board) = world.boards.get_mut(board_id) {
                if let Some(socket) = board.extension_point_mut(cell) {
                    socket.record_link(&target_name);
                }
            }
            if let Some(board) = world.boards.get_mut(target_id) {
                if let Some(socket) = board.extension_point_mut(mapped) {
                    socket.record_link(&origin.name);
                }
            }

            if kind == NodeKind::Extension {
                queue.push_back((target_id, mapped));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{corresponding_cell, corresponding_point_name};
    use skillweave_core::{CellCoord, Direction};

    #[test]
    fn cardinal_mapping_lands_on_the_facing_edge() {
        let origin = CellCoord::new(3, 6);
        let columns = 7;
        let rows = 7;

        assert_eq!(
            corresponding_cell(origin, Direction::North, columns, rows),
            CellCoord::new(3, 0)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::South, columns, rows),
            CellCoord::new(3, 6)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::East, columns, rows),
            CellCoord::new(0, 6)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::West, columns, rows),
            CellCoord::new(6, 6)
        );
    }

    #[test]
    fn diagonal_mapping_collapses_to_the_facing_corner() {
        let origin = CellCoord::new(2, 5);

        assert_eq!(
            corresponding_cell(origin, Direction::NorthEast, 7, 7),
            CellCoord::new(0, 0)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::SouthEast, 7, 7),
            CellCoord::new(0, 6)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::SouthWest, 7, 7),
            CellCoord::new(6, 6)
        );
        assert_eq!(
            corresponding_cell(origin, Direction::NorthWest, 7, 7),
            CellCoord::new(6, 0)
        );
    }

    #[test]
    fn point_names_swap_to_the_opposite_cardinal() {
        assert_eq!(
            corresponding_point_name("north-2", Direction::North),
            "south-2"
        );
        assert_eq!(
            corresponding_point_name("east-gate", Direction::East),
            "west-gate"
        );
        assert_eq!(corresponding_point_name("west", Direction::West), "east");
    }

    #[test]
    fn diagonal_point_names_degrade_to_the_vertical_pair() {
        assert_eq!(
            corresponding_point_name("north-corner", Direction::NorthEast),
            "south-corner"
        );
        assert_eq!(
            corresponding_point_name("south-corner", Direction::SouthWest),
            "north-corner"
        );
    }
}
