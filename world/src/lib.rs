#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative passive-tree state management for Skillweave.
//!
//! The world owns every placed board, the tier/theme selection registry and
//! the available point pool. Adapters and systems mutate it exclusively
//! through [`apply`], which executes one [`Command`] and appends the
//! resulting [`Event`]s in a deterministic order. Business-rule violations
//! surface as rejection events carrying a reason; only genuinely invalid
//! input (stale handles, unknown cells) is additionally logged.

use tracing::{error, warn};

use skillweave_core::{
    AllocationError, BoardId, BoardTemplate, CellCoord, Command, Direction, Event, GridPos,
    NodeKind, PlacementError, SelectionError, Theme, Tier,
};

pub mod adjacency;
mod boards;
mod selection;
mod stats;

use boards::{BoardRegistry, BoardState};
use selection::SelectionRegistry;

/// Represents the authoritative Skillweave world state.
#[derive(Debug, Default)]
pub struct World {
    pub(crate) boards: BoardRegistry,
    pub(crate) selection: SelectionRegistry,
    pub(crate) available_points: u32,
}

impl World {
    /// Creates an empty world with no boards and no allocation points.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boards: BoardRegistry::new(),
            selection: SelectionRegistry::new(),
            available_points: 0,
        }
    }

    fn select_board(&mut self, name: String, tier: Tier, theme: Theme, out_events: &mut Vec<Event>) {
        match self.selection.select(&name, tier, theme) {
            Ok(()) => out_events.push(Event::BoardSelected { name, tier, theme }),
            Err(reason) => out_events.push(Event::SelectionRejected {
                name,
                tier,
                theme,
                reason,
            }),
        }
    }

    fn deselect_board(&mut self, name: String, out_events: &mut Vec<Event>) {
        match self.selection.deselect(&name) {
            Ok((tier, theme)) => out_events.push(Event::BoardDeselected { name, tier, theme }),
            Err(reason) => out_events.push(Event::DeselectionRejected { name, reason }),
        }
    }

    fn place_board(
        &mut self,
        template: BoardTemplate,
        position: GridPos,
        out_events: &mut Vec<Event>,
    ) {
        if template.start_node().is_none() {
            warn!(board = %template.name, "board template declares no start node");
            out_events.push(Event::PlacementRejected {
                name: template.name,
                position,
                reason: PlacementError::MissingStart,
            });
            return;
        }
        if self.boards.board_at(position).is_some() {
            out_events.push(Event::PlacementRejected {
                name: template.name,
                position,
                reason: PlacementError::PositionOccupied,
            });
            return;
        }
        if self.selection.is_placed(&template.name) {
            out_events.push(Event::PlacementRejected {
                name: template.name,
                position,
                reason: PlacementError::SelectionRuleViolated(SelectionError::NameTaken),
            });
            return;
        }

        // Placement is the register-created phase: a reservation made in the
        // selection UI is honoured, an unreserved name is claimed on the
        // spot under the same first-come-first-served rule.
        let slot_owner = self
            .selection
            .selected_for(template.tier, template.theme)
            .map(str::to_owned);
        match slot_owner {
            Some(owner) if owner == template.name => {}
            Some(_) => {
                out_events.push(Event::PlacementRejected {
                    name: template.name,
                    position,
                    reason: PlacementError::SelectionRuleViolated(SelectionError::ThemeTaken),
                });
                return;
            }
            None => match self
                .selection
                .select(&template.name, template.tier, template.theme)
            {
                Ok(()) => out_events.push(Event::BoardSelected {
                    name: template.name.clone(),
                    tier: template.tier,
                    theme: template.theme,
                }),
                Err(reason) => {
                    out_events.push(Event::PlacementRejected {
                        name: template.name,
                        position,
                        reason: PlacementError::SelectionRuleViolated(reason),
                    });
                    return;
                }
            },
        }

        let Some(board_id) = self.boards.insert(&template, position) else {
            out_events.push(Event::PlacementRejected {
                name: template.name,
                position,
                reason: PlacementError::MissingStart,
            });
            return;
        };
        self.selection.register_placed(&template.name);
        out_events.push(Event::BoardPlaced {
            board: board_id,
            name: template.name.clone(),
            position,
        });

        if let Some(board) = self.boards.get_mut(board_id) {
            let start = board.start;
            unlock_neighbours(board, start, out_events);
        }
    }

    fn remove_board(&mut self, board_id: BoardId, out_events: &mut Vec<Event>) {
        match self.boards.remove(board_id) {
            Some(board) => {
                self.selection.unregister_placed(&board.name);
                out_events.push(Event::BoardRemoved {
                    board: board_id,
                    name: board.name,
                    position: board.position,
                });
            }
            None => error!(board = board_id.get(), "removal targeted an unknown board"),
        }
    }

    fn allocate_node(&mut self, board_id: BoardId, cell: CellCoord, out_events: &mut Vec<Event>) {
        let points = self.available_points;
        let Some(board) = self.boards.get_mut(board_id) else {
            error!(board = board_id.get(), "allocation targeted an unknown board");
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::UnknownBoard,
            });
            return;
        };
        let Some(node) = board.node_mut(cell) else {
            error!(
                board = board_id.get(),
                cell = ?cell,
                "allocation targeted a cell with no node"
            );
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::UnknownNode,
            });
            return;
        };

        let rejection = if node.kind == NodeKind::Start {
            Some(AllocationError::StartImmutable)
        } else if node.purchased {
            Some(AllocationError::AlreadyPurchased)
        } else if !node.unlocked {
            Some(AllocationError::Locked)
        } else if points < node.cost {
            Some(AllocationError::InsufficientPoints)
        } else {
            None
        };
        if let Some(reason) = rejection {
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason,
            });
            return;
        }

        node.mark_purchased();
        let node_id = node.id.clone();
        let cost = node.cost;
        let kind = node.kind;
        out_events.push(Event::NodeAllocated {
            board: board_id,
            cell,
            node_id,
            cost_paid: cost,
        });
        unlock_neighbours(board, cell, out_events);
        if let Some(socket) = board.extension_point_mut(cell) {
            socket.preview_allocated = false;
        }

        self.available_points = self.available_points.saturating_sub(cost);
        out_events.push(Event::PointsChanged {
            available: self.available_points,
        });

        if kind == NodeKind::Extension {
            adjacency::mirror_extension_allocation(self, board_id, cell, out_events);
        }
    }

    fn deallocate_node(&mut self, board_id: BoardId, cell: CellCoord, out_events: &mut Vec<Event>) {
        let Some(board) = self.boards.get_mut(board_id) else {
            error!(
                board = board_id.get(),
                "deallocation targeted an unknown board"
            );
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::UnknownBoard,
            });
            return;
        };
        let Some(node) = board.node_mut(cell) else {
            error!(
                board = board_id.get(),
                cell = ?cell,
                "deallocation targeted a cell with no node"
            );
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::UnknownNode,
            });
            return;
        };

        if node.kind == NodeKind::Start {
            warn!(node = %node.id, "start node can never be deallocated");
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::StartImmutable,
            });
            return;
        }
        if !node.purchased {
            out_events.push(Event::AllocationRejected {
                board: board_id,
                cell,
                reason: AllocationError::NotPurchased,
            });
            return;
        }

        // Downstream nodes keep their unlocked state; callers that want
        // strict tree connectivity re-validate reachability themselves.
        node.purchased = false;
        node.current_rank = 0;
        node.available = true;
        let node_id = node.id.clone();
        let refund = node.cost;
        out_events.push(Event::NodeDeallocated {
            board: board_id,
            cell,
            node_id,
            refund,
        });

        self.available_points = self.available_points.saturating_add(refund);
        out_events.push(Event::PointsChanged {
            available: self.available_points,
        });
    }

    fn restore_allocation(
        &mut self,
        board_id: BoardId,
        node_id: String,
        out_events: &mut Vec<Event>,
    ) {
        let Some(cell) = self
            .boards
            .get(board_id)
            .and_then(|board| board.cell_of(&node_id))
        else {
            warn!(
                board = board_id.get(),
                node = %node_id,
                "restored allocation does not match any node, skipping"
            );
            return;
        };
        if let Some(kind) = free_allocate(self, board_id, cell, out_events) {
            if kind == NodeKind::Extension {
                adjacency::mirror_extension_allocation(self, board_id, cell, out_events);
            }
        }
    }

    fn grant_points(&mut self, amount: u32, out_events: &mut Vec<Event>) {
        self.available_points = self.available_points.saturating_add(amount);
        out_events.push(Event::PointsChanged {
            available: self.available_points,
        });
    }

    fn set_available_points(&mut self, points: u32, out_events: &mut Vec<Event>) {
        self.available_points = points;
        out_events.push(Event::PointsChanged {
            available: self.available_points,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SelectBoard { name, tier, theme } => {
            world.select_board(name, tier, theme, out_events);
        }
        Command::DeselectBoard { name } => world.deselect_board(name, out_events),
        Command::PlaceBoard { template, position } => {
            world.place_board(template, position, out_events);
        }
        Command::RemoveBoard { board } => world.remove_board(board, out_events),
        Command::AllocateNode { board, cell } => world.allocate_node(board, cell, out_events),
        Command::DeallocateNode { board, cell } => world.deallocate_node(board, cell, out_events),
        Command::RestoreAllocation { board, node_id } => {
            world.restore_allocation(board, node_id, out_events);
        }
        Command::GrantPoints { amount } => world.grant_points(amount, out_events),
        Command::SetAvailablePoints { points } => world.set_available_points(points, out_events),
        Command::Tick { dt } => out_events.push(Event::TimeAdvanced { dt }),
        // The aggregation system observes this command directly.
        Command::RequestStatsRefresh => {}
    }
}

/// Purchases a node without charging points, unlocking its neighbours.
///
/// Shared by extension mirroring and persisted-state restoration; a node
/// that is already purchased (or missing) is left untouched.
pub(crate) fn free_allocate(
    world: &mut World,
    board_id: BoardId,
    cell: CellCoord,
    out_events: &mut Vec<Event>,
) -> Option<NodeKind> {
    let board = world.boards.get_mut(board_id)?;
    let node = board.node_mut(cell)?;
    if node.purchased {
        return None;
    }

    node.mark_purchased();
    let node_id = node.id.clone();
    let kind = node.kind;
    out_events.push(Event::NodeAllocated {
        board: board_id,
        cell,
        node_id,
        cost_paid: 0,
    });
    unlock_neighbours(board, cell, out_events);
    if let Some(socket) = board.extension_point_mut(cell) {
        socket.preview_allocated = false;
    }
    Some(kind)
}

/// Unlocks the orthogonal unpurchased neighbours of a purchased cell.
fn unlock_neighbours(board: &mut BoardState, cell: CellCoord, out_events: &mut Vec<Event>) {
    let board_id = board.id;
    let columns = board.columns;
    let rows = board.rows;

    for direction in Direction::CARDINAL {
        let (delta_x, delta_y) = direction.offset();
        let Some(neighbour) = cell.offset_by(delta_x, delta_y) else {
            continue;
        };
        if neighbour.column() >= columns || neighbour.row() >= rows {
            continue;
        }

        let Some(node) = board.node_mut(neighbour) else {
            continue;
        };
        if node.purchased || node.unlocked {
            continue;
        }
        node.unlocked = true;
        node.available = true;
        let armed_socket = node.kind == NodeKind::Extension;
        out_events.push(Event::NodeUnlocked {
            board: board_id,
            cell: neighbour,
        });
        if armed_socket {
            if let Some(socket) = board.extension_point_mut(neighbour) {
                socket.preview_allocated = true;
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use skillweave_core::{
        BoardId, BoardTemplate, CellCoord, GridPos, NodeKind, StatsInputs, Theme, Tier,
    };

    use super::World;

    /// Points currently available for allocation.
    #[must_use]
    pub fn available_points(world: &World) -> u32 {
        world.available_points
    }

    /// Handles of every placed board in allocation order.
    #[must_use]
    pub fn board_handles(world: &World) -> Vec<BoardId> {
        world.boards.iter().map(|board| board.id).collect()
    }

    /// Handle of the board occupying a world-grid position, if any.
    #[must_use]
    pub fn board_at(world: &World, position: GridPos) -> Option<BoardId> {
        world.boards.board_at(position)
    }

    /// Handle of the placed board built from the named template, if any.
    #[must_use]
    pub fn board_by_name(world: &World, name: &str) -> Option<BoardId> {
        world.boards.by_name(name)
    }

    /// Captures a read-only view of a placed board.
    #[must_use]
    pub fn board_view(world: &World, board: BoardId) -> Option<BoardView> {
        let board = world.boards.get(board)?;
        Some(BoardView {
            id: board.id,
            name: board.name.clone(),
            theme: board.theme,
            tier: board.tier,
            columns: board.columns,
            rows: board.rows,
            position: board.position,
            start: board.start,
            nodes: board
                .nodes
                .iter()
                .map(|(cell, node)| node_snapshot_from(*cell, node))
                .collect(),
            extension_points: board
                .extension_points
                .iter()
                .map(|point| ExtensionPointSnapshot {
                    id: point.id.clone(),
                    cell: point.cell,
                    max_connections: point.max_connections,
                    current_connections: point.current_connections,
                    linked_board: point.linked_board.clone(),
                    preview_allocated: point.preview_allocated,
                })
                .collect(),
        })
    }

    /// Captures a read-only snapshot of a single node.
    #[must_use]
    pub fn node_snapshot(world: &World, board: BoardId, cell: CellCoord) -> Option<NodeSnapshot> {
        let board = world.boards.get(board)?;
        board.node(cell).map(|node| node_snapshot_from(cell, node))
    }

    /// Locates a node across all placed boards by its stable identifier.
    #[must_use]
    pub fn find_node(world: &World, node_id: &str) -> Option<(BoardId, CellCoord)> {
        world.boards.iter().find_map(|board| {
            board.cell_of(node_id).map(|cell| (board.id, cell))
        })
    }

    /// Reports whether an allocation request for the node would succeed.
    #[must_use]
    pub fn can_allocate(world: &World, board: BoardId, cell: CellCoord) -> bool {
        world.boards.get(board).and_then(|board| board.node(cell)).is_some_and(|node| {
            node.kind != NodeKind::Start
                && node.unlocked
                && !node.purchased
                && world.available_points >= node.cost
        })
    }

    /// Read-only form of the placement precondition for a named template.
    #[must_use]
    pub fn can_create_board(world: &World, name: &str, tier: Tier, theme: Theme) -> bool {
        if world.selection.is_placed(name) {
            return false;
        }
        match world.selection.selected_for(tier, theme) {
            Some(owner) => owner == name,
            None => world.selection.can_select(name, tier, theme).is_ok(),
        }
    }

    /// Name reserved for the tier/theme slot, if any.
    #[must_use]
    pub fn selected_board(world: &World, tier: Tier, theme: Theme) -> Option<String> {
        world.selection.selected_for(tier, theme).map(str::to_owned)
    }

    /// Reports whether the named template is currently reserved.
    #[must_use]
    pub fn is_board_selected(world: &World, name: &str) -> bool {
        world.selection.is_selected(name)
    }

    /// Filters candidate templates down to those still selectable.
    ///
    /// Already-reserved names are always dropped; when a tier is provided,
    /// candidates whose theme slot is taken for that tier are dropped too.
    #[must_use]
    pub fn available_boards<'a>(
        world: &World,
        candidates: &'a [BoardTemplate],
        tier: Option<Tier>,
    ) -> Vec<&'a BoardTemplate> {
        candidates
            .iter()
            .filter(|template| {
                if world.selection.is_selected(&template.name) {
                    return false;
                }
                match tier {
                    Some(tier) => world
                        .selection
                        .can_select(&template.name, tier, template.theme)
                        .is_ok(),
                    None => true,
                }
            })
            .collect()
    }

    /// Captures the aggregation inputs for the stats system.
    #[must_use]
    pub fn stats_inputs(world: &World) -> StatsInputs {
        super::stats::stats_inputs(world)
    }

    /// Stable identifiers of every purchased node across all boards.
    #[must_use]
    pub fn allocated_node_ids(world: &World) -> Vec<String> {
        world
            .boards
            .iter()
            .flat_map(|board| {
                board
                    .nodes
                    .values()
                    .filter(|node| node.purchased)
                    .map(|node| node.id.clone())
            })
            .collect()
    }

    /// Names of every placed board in handle-allocation order.
    #[must_use]
    pub fn placed_board_names(world: &World) -> Vec<String> {
        world.boards.iter().map(|board| board.name.clone()).collect()
    }

    /// Extension-point links recorded across all placed boards.
    #[must_use]
    pub fn board_connections(world: &World) -> Vec<BoardConnection> {
        world
            .boards
            .iter()
            .flat_map(|board| {
                board.extension_points.iter().filter_map(|point| {
                    point.linked_board.as_ref().map(|linked| BoardConnection {
                        board: board.name.clone(),
                        extension_point: point.id.clone(),
                        linked_board: linked.clone(),
                    })
                })
            })
            .collect()
    }

    fn node_snapshot_from(cell: CellCoord, node: &super::boards::NodeState) -> NodeSnapshot {
        NodeSnapshot {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            cell,
            cost: node.cost,
            max_rank: node.max_rank,
            current_rank: node.current_rank,
            is_unlocked: node.unlocked,
            is_available: node.available,
            is_purchased: node.purchased,
        }
    }

    /// Read-only view of a placed board.
    #[derive(Clone, Debug)]
    pub struct BoardView {
        /// Handle of the board.
        pub id: BoardId,
        /// Name of the template the board was built from.
        pub name: String,
        /// Thematic category of the board.
        pub theme: Theme,
        /// Progression tier of the board.
        pub tier: Tier,
        /// Number of columns in the board grid.
        pub columns: u32,
        /// Number of rows in the board grid.
        pub rows: u32,
        /// World-grid position the board occupies.
        pub position: GridPos,
        /// Cell of the board's start node.
        pub start: CellCoord,
        /// Snapshots of every node in cell order.
        pub nodes: Vec<NodeSnapshot>,
        /// Snapshots of every extension socket.
        pub extension_points: Vec<ExtensionPointSnapshot>,
    }

    /// Immutable representation of a single node's state used for queries.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct NodeSnapshot {
        /// Stable identifier of the node.
        pub id: String,
        /// Display name of the node.
        pub name: String,
        /// Classification of the node.
        pub kind: NodeKind,
        /// Local grid position of the node.
        pub cell: CellCoord,
        /// Points required to purchase the node.
        pub cost: u32,
        /// Maximum rank the node supports.
        pub max_rank: u32,
        /// Rank currently held by the player.
        pub current_rank: u32,
        /// Whether an adjacent purchase has unlocked the node.
        pub is_unlocked: bool,
        /// Whether the node is presented as purchasable.
        pub is_available: bool,
        /// Whether the node has been purchased.
        pub is_purchased: bool,
    }

    /// Immutable representation of an extension socket's state.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ExtensionPointSnapshot {
        /// Stable identifier of the socket.
        pub id: String,
        /// Local grid position of the socket.
        pub cell: CellCoord,
        /// Maximum number of boards the socket may link to.
        pub max_connections: u32,
        /// Number of boards currently linked through the socket.
        pub current_connections: u32,
        /// Name of the board the socket most recently linked to.
        pub linked_board: Option<String>,
        /// Whether the socket is armed for a pending extension purchase.
        pub preview_allocated: bool,
    }

    /// A recorded link between an extension socket and a neighbour board.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BoardConnection {
        /// Name of the board owning the socket.
        pub board: String,
        /// Identifier of the socket the link runs through.
        pub extension_point: String,
        /// Name of the board on the far side of the link.
        pub linked_board: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillweave_core::{NodeTemplate, Theme, Tier};
    use std::collections::BTreeMap;

    fn small_template(name: &str, theme: Theme, tier: Tier) -> BoardTemplate {
        BoardTemplate {
            name: name.to_owned(),
            theme,
            tier,
            columns: 3,
            rows: 3,
            nodes: vec![
                NodeTemplate {
                    id: format!("{name}-start"),
                    name: "Start".to_owned(),
                    kind: NodeKind::Start,
                    cell: CellCoord::new(1, 1),
                    cost: 0,
                    max_rank: 1,
                    stat_fields: BTreeMap::new(),
                },
                NodeTemplate {
                    id: format!("{name}-a"),
                    name: "Travel".to_owned(),
                    kind: NodeKind::Travel,
                    cell: CellCoord::new(0, 1),
                    cost: 1,
                    max_rank: 1,
                    stat_fields: BTreeMap::new(),
                },
            ],
            extension_points: Vec::new(),
        }
    }

    #[test]
    fn placement_claims_the_selection_slot() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceBoard {
                template: small_template("ember-field", Theme::Fire, Tier::new(1)),
                position: GridPos::new(0, 0),
            },
            &mut events,
        );

        assert!(events.iter().any(|event| matches!(
            event,
            Event::BoardSelected { name, .. } if name == "ember-field"
        )));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::BoardPlaced { name, .. } if name == "ember-field"
        )));
        assert!(query::is_board_selected(&world, "ember-field"));
        assert!(!query::can_create_board(
            &world,
            "ember-field",
            Tier::new(1),
            Theme::Fire
        ));
    }

    #[test]
    fn placement_rejects_an_occupied_position() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::PlaceBoard {
                template: small_template("ember-field", Theme::Fire, Tier::new(1)),
                position: GridPos::new(0, 0),
            },
            &mut events,
        );
        events.clear();

        apply(
            &mut world,
            Command::PlaceBoard {
                template: small_template("frost-reach", Theme::Cold, Tier::new(1)),
                position: GridPos::new(0, 0),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::PlacementRejected {
                name: "frost-reach".to_owned(),
                position: GridPos::new(0, 0),
                reason: PlacementError::PositionOccupied,
            }]
        );
        assert!(query::board_by_name(&world, "frost-reach").is_none());
    }

    #[test]
    fn granting_points_announces_the_new_pool() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(&mut world, Command::GrantPoints { amount: 3 }, &mut events);
        apply(
            &mut world,
            Command::SetAvailablePoints { points: 7 },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::PointsChanged { available: 3 },
                Event::PointsChanged { available: 7 },
            ]
        );
        assert_eq!(query::available_points(&world), 7);
    }

    #[test]
    fn available_boards_filters_reserved_names_and_taken_slots() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SelectBoard {
                name: "ember-field".to_owned(),
                tier: Tier::new(1),
                theme: Theme::Fire,
            },
            &mut events,
        );

        let candidates = vec![
            small_template("ember-field", Theme::Fire, Tier::new(1)),
            small_template("cinder-wastes", Theme::Fire, Tier::new(1)),
            small_template("frost-reach", Theme::Cold, Tier::new(1)),
        ];

        let unfiltered = query::available_boards(&world, &candidates, None);
        assert_eq!(unfiltered.len(), 2);

        let tiered = query::available_boards(&world, &candidates, Some(Tier::new(1)));
        let names: Vec<&str> = tiered
            .iter()
            .map(|template| template.name.as_str())
            .collect();
        assert_eq!(names, vec!["frost-reach"]);
    }

    #[test]
    fn removal_invalidates_the_board_handle() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceBoard {
                template: small_template("ember-field", Theme::Fire, Tier::new(1)),
                position: GridPos::new(0, 0),
            },
            &mut events,
        );
        let board = query::board_by_name(&world, "ember-field").expect("board placed");
        events.clear();

        apply(&mut world, Command::RemoveBoard { board }, &mut events);

        assert!(events.iter().any(|event| matches!(
            event,
            Event::BoardRemoved { name, .. } if name == "ember-field"
        )));
        assert!(query::board_view(&world, board).is_none());
        // The reservation survives removal; only the placed mark is cleared.
        assert!(query::is_board_selected(&world, "ember-field"));

        events.clear();
        apply(
            &mut world,
            Command::AllocateNode {
                board,
                cell: CellCoord::new(0, 1),
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::AllocationRejected {
                board,
                cell: CellCoord::new(0, 1),
                reason: AllocationError::UnknownBoard,
            }]
        );
    }
}
