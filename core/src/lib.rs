#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skillweave engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing consolidated stat snapshots for changes.
pub const STAT_EPSILON: f64 = 0.001;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Reserves a board name for a tier/theme slot ahead of materialisation.
    SelectBoard {
        /// Name of the board template being reserved.
        name: String,
        /// Progression tier the board is reserved for.
        tier: Tier,
        /// Thematic slot the board occupies within the tier.
        theme: Theme,
    },
    /// Releases a previously reserved board name.
    DeselectBoard {
        /// Name of the board template being released.
        name: String,
    },
    /// Materialises a board template at a world-grid position.
    PlaceBoard {
        /// Template describing the board's grid, nodes and extension points.
        template: BoardTemplate,
        /// World-grid position the board should occupy.
        position: GridPos,
    },
    /// Removes a placed board from the world.
    RemoveBoard {
        /// Handle of the board targeted for removal.
        board: BoardId,
    },
    /// Requests that a node be purchased with available points.
    AllocateNode {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Local grid position of the node.
        cell: CellCoord,
    },
    /// Requests that a purchased node be reverted and its cost refunded.
    DeallocateNode {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Local grid position of the node.
        cell: CellCoord,
    },
    /// Re-applies a persisted allocation without charging points.
    RestoreAllocation {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Stable identifier of the node being restored.
        node_id: String,
    },
    /// Credits the player with additional allocation points.
    GrantPoints {
        /// Number of points to add to the available pool.
        amount: u32,
    },
    /// Overwrites the available allocation point pool.
    SetAvailablePoints {
        /// New size of the available pool.
        points: u32,
    },
    /// Advances the engine clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Forces the aggregation system to re-consolidate on its next pass.
    RequestStatsRefresh,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that a board name was reserved for a tier/theme slot.
    BoardSelected {
        /// Name of the reserved board template.
        name: String,
        /// Tier the reservation belongs to.
        tier: Tier,
        /// Theme slot claimed by the reservation.
        theme: Theme,
    },
    /// Confirms that a board reservation was released.
    BoardDeselected {
        /// Name of the released board template.
        name: String,
        /// Tier the reservation belonged to.
        tier: Tier,
        /// Theme slot freed by the release.
        theme: Theme,
    },
    /// Reports that a board reservation request was rejected.
    SelectionRejected {
        /// Name of the board template in the rejected request.
        name: String,
        /// Tier supplied with the request.
        tier: Tier,
        /// Theme supplied with the request.
        theme: Theme,
        /// Specific reason the reservation failed.
        reason: SelectionError,
    },
    /// Reports that a board release request was rejected.
    DeselectionRejected {
        /// Name of the board template in the rejected request.
        name: String,
        /// Specific reason the release failed.
        reason: SelectionError,
    },
    /// Confirms that a board was materialised into the world.
    BoardPlaced {
        /// Handle allocated to the board by the world.
        board: BoardId,
        /// Name of the template the board was built from.
        name: String,
        /// World-grid position the board occupies.
        position: GridPos,
    },
    /// Confirms that a board was removed from the world.
    BoardRemoved {
        /// Handle of the board that was removed.
        board: BoardId,
        /// Name of the template the board was built from.
        name: String,
        /// World-grid position the board previously occupied.
        position: GridPos,
    },
    /// Reports that a board placement request was rejected.
    PlacementRejected {
        /// Name of the template in the rejected request.
        name: String,
        /// World-grid position supplied with the request.
        position: GridPos,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a node was purchased.
    NodeAllocated {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Local grid position of the node.
        cell: CellCoord,
        /// Stable identifier of the purchased node.
        node_id: String,
        /// Points deducted for the purchase; zero for mirrored allocations.
        cost_paid: u32,
    },
    /// Confirms that a purchased node was reverted.
    NodeDeallocated {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Local grid position of the node.
        cell: CellCoord,
        /// Stable identifier of the reverted node.
        node_id: String,
        /// Points credited back to the available pool.
        refund: u32,
    },
    /// Announces that a locked node became purchasable.
    NodeUnlocked {
        /// Handle of the board containing the node.
        board: BoardId,
        /// Local grid position of the node.
        cell: CellCoord,
    },
    /// Reports that an allocation or deallocation request was rejected.
    AllocationRejected {
        /// Handle of the board supplied with the request.
        board: BoardId,
        /// Local grid position supplied with the request.
        cell: CellCoord,
        /// Specific reason the request failed.
        reason: AllocationError,
    },
    /// Confirms that an extension allocation was mirrored onto a neighbour.
    ExtensionMirrored {
        /// Board containing the purchased extension node.
        source_board: BoardId,
        /// Cell of the purchased extension node.
        source_cell: CellCoord,
        /// Neighbour board that received the mirrored allocation.
        target_board: BoardId,
        /// Cell on the neighbour board that was allocated for free.
        target_cell: CellCoord,
    },
    /// Reports that mirroring onto one neighbour was skipped.
    ExtensionMirrorSkipped {
        /// Board containing the purchased extension node.
        source_board: BoardId,
        /// Direction toward the neighbour that was skipped.
        direction: Direction,
        /// Specific reason the neighbour was skipped.
        reason: MirrorSkip,
    },
    /// Announces the new size of the available point pool.
    PointsChanged {
        /// Points available for allocation after the change.
        available: u32,
    },
    /// Indicates that the engine clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Publishes a consolidated stat snapshot that differs from the cache.
    StatsUpdated {
        /// Totals summed over every purchased node across all boards.
        totals: StatsTotals,
    },
    /// Announces a change in the number of purchased nodes.
    AllocatedNodesChanged {
        /// Total purchased nodes across all placed boards.
        count: u32,
    },
}

/// Reasons a board reservation request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionError {
    /// Another board already occupies the requested tier/theme slot.
    ThemeTaken,
    /// The board name is already reserved elsewhere.
    NameTaken,
    /// The board name was not reserved, so it cannot be released.
    NotSelected,
}

/// Reasons a board placement request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The selection rule rejected the board name for the tier/theme slot.
    SelectionRuleViolated(SelectionError),
    /// Another board already occupies the requested world-grid position.
    PositionOccupied,
    /// The template does not declare a start node.
    MissingStart,
}

/// Reasons an allocation request may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationError {
    /// No placed board matches the provided handle.
    UnknownBoard,
    /// The board has no node at the provided cell.
    UnknownNode,
    /// The node has not been unlocked by an adjacent purchase.
    Locked,
    /// The node is already purchased.
    AlreadyPurchased,
    /// The node is not purchased, so it cannot be reverted.
    NotPurchased,
    /// The available point pool cannot cover the node cost.
    InsufficientPoints,
    /// The start node can never be allocated or deallocated by the player.
    StartImmutable,
}

/// Reasons extension mirroring may skip a neighbour board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorSkip {
    /// No board is registered at the adjacent world-grid position.
    NoAdjacentBoard,
    /// The neighbour board has no node at the mirrored cell.
    NoMatchingCell,
    /// The mirrored node is already purchased.
    AlreadyPurchased,
    /// The extension point exhausted its connection budget.
    ConnectionLimit,
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Row zero is a board's south edge and column zero its west edge; rows grow
/// northward and columns grow eastward, matching the world grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Offsets the cell by signed deltas, rejecting out-of-range results.
    #[must_use]
    pub fn offset_by(self, delta_column: i32, delta_row: i32) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(delta_column)?;
        let row = self.row.checked_add_signed(delta_row)?;
        Some(CellCoord::new(column, row))
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }
}

/// Signed position of a board on the world grid of connected boards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    x: i32,
    y: i32,
}

impl GridPos {
    /// Creates a new world-grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Eastward coordinate of the position.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Northward coordinate of the position.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the position shifted by the provided unit offsets.
    #[must_use]
    pub const fn translated(self, delta_x: i32, delta_y: i32) -> GridPos {
        GridPos::new(
            self.x.saturating_add(delta_x),
            self.y.saturating_add(delta_y),
        )
    }
}

/// Unique handle assigned to a placed board.
///
/// Handles are allocated monotonically and never reused; after a board is
/// removed its handle simply fails every lookup instead of dangling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoardId(u32);

impl BoardId {
    /// Creates a new board handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Progression band a board belongs to; at most one board per theme may be
/// active within a tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier(u8);

impl Tier {
    /// Creates a new tier wrapper.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Retrieves the underlying tier index.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Thematic category used for tier-level board deduplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Theme {
    /// Fire damage and ignite boards.
    Fire,
    /// Cold damage and freeze boards.
    Cold,
    /// Lightning damage and shock boards.
    Lightning,
    /// Physical damage and bleed boards.
    Physical,
    /// Chaos damage and decay boards.
    Chaos,
    /// Life and recovery boards.
    Life,
    /// Armour and block boards.
    Guard,
    /// Minion and summoning boards.
    Minion,
    /// Critical strike boards.
    Critical,
    /// Unthemed utility boards.
    General,
}

/// Classification of a node on a board's grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The permanently purchased root of a board.
    Start,
    /// A plain pathing node with no stats of note.
    Travel,
    /// An edge node that mirrors its allocation onto an adjacent board.
    Extension,
    /// A named node carrying significant stats.
    Notable,
    /// A minor stat node.
    Small,
    /// A build-defining node with unique effects.
    Keystone,
}

/// Unit direction between adjacent world-grid positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward increasing y.
    North,
    /// Toward increasing x and y.
    NorthEast,
    /// Toward increasing x.
    East,
    /// Toward increasing x, decreasing y.
    SouthEast,
    /// Toward decreasing y.
    South,
    /// Toward decreasing x and y.
    SouthWest,
    /// Toward decreasing x.
    West,
    /// Toward decreasing x, increasing y.
    NorthWest,
}

impl Direction {
    /// The four cardinal directions in clockwise order.
    pub const CARDINAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// All eight directions in clockwise order.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Unit world-grid offset for the direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::NorthEast => (1, 1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, -1),
            Direction::South => (0, -1),
            Direction::SouthWest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, 1),
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    /// Reports whether the direction is one of the four cardinals.
    #[must_use]
    pub const fn is_cardinal(self) -> bool {
        matches!(
            self,
            Direction::North | Direction::East | Direction::South | Direction::West
        )
    }

    /// Derives the sign-normalised direction between two grid positions.
    ///
    /// Returns `None` when both positions coincide.
    #[must_use]
    pub fn between(from: GridPos, to: GridPos) -> Option<Direction> {
        let delta = ((to.x() - from.x()).signum(), (to.y() - from.y()).signum());
        match delta {
            (0, 1) => Some(Direction::North),
            (1, 1) => Some(Direction::NorthEast),
            (1, 0) => Some(Direction::East),
            (1, -1) => Some(Direction::SouthEast),
            (0, -1) => Some(Direction::South),
            (-1, -1) => Some(Direction::SouthWest),
            (-1, 0) => Some(Direction::West),
            (-1, 1) => Some(Direction::NorthWest),
            _ => None,
        }
    }
}

/// Designer-authored definition of a board's grid, nodes and sockets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardTemplate {
    /// Unique template name used by the selection registry.
    pub name: String,
    /// Thematic category of the board.
    pub theme: Theme,
    /// Progression tier the board belongs to.
    pub tier: Tier,
    /// Number of columns in the board grid.
    pub columns: u32,
    /// Number of rows in the board grid.
    pub rows: u32,
    /// Nodes laid out on the grid.
    pub nodes: Vec<NodeTemplate>,
    /// Extension sockets along the board edges.
    pub extension_points: Vec<ExtensionPointTemplate>,
}

impl BoardTemplate {
    /// Locates the template's start node, if it declares one.
    #[must_use]
    pub fn start_node(&self) -> Option<&NodeTemplate> {
        self.nodes.iter().find(|node| node.kind == NodeKind::Start)
    }

    /// Reports whether the cell lies within the board grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the cell lies on the board's outer edge.
    #[must_use]
    pub fn is_edge(&self, cell: CellCoord) -> bool {
        self.contains(cell)
            && (cell.column() == 0
                || cell.row() == 0
                || cell.column() == self.columns.saturating_sub(1)
                || cell.row() == self.rows.saturating_sub(1))
    }
}

/// Definition of a single node within a board template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTemplate {
    /// Stable identifier unique across all boards.
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
    /// Sparse raw stat fields attached to the node.
    #[serde(default)]
    pub stat_fields: BTreeMap<String, f64>,
}

/// Definition of an extension socket within a board template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionPointTemplate {
    /// Stable identifier of the socket.
    pub id: String,
    /// Local grid position of the socket; must lie on a board edge.
    pub cell: CellCoord,
    /// Maximum number of boards the socket may link to.
    pub max_connections: u32,
}

/// Consolidated stat totals summed over every purchased node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsTotals {
    totals: BTreeMap<String, f64>,
    purchased_nodes: u32,
}

impl StatsTotals {
    /// Creates a snapshot from summed totals and a purchased-node count.
    #[must_use]
    pub fn new(totals: BTreeMap<String, f64>, purchased_nodes: u32) -> Self {
        Self {
            totals,
            purchased_nodes,
        }
    }

    /// Ordered map of stat name to summed value.
    #[must_use]
    pub fn totals(&self) -> &BTreeMap<String, f64> {
        &self.totals
    }

    /// Total purchased nodes across all placed boards.
    #[must_use]
    pub const fn purchased_nodes(&self) -> u32 {
        self.purchased_nodes
    }

    /// Looks up a stat total, defaulting to zero for absent keys.
    #[must_use]
    pub fn get(&self, name: &str) -> f64 {
        self.totals.get(name).copied().unwrap_or(0.0)
    }

    /// Compares two snapshots key-by-key within the provided tolerance.
    ///
    /// Differing key sets or purchased-node counts always report inequality.
    #[must_use]
    pub fn approx_eq(&self, other: &StatsTotals, epsilon: f64) -> bool {
        if self.purchased_nodes != other.purchased_nodes {
            return false;
        }
        if self.totals.len() != other.totals.len() {
            return false;
        }
        self.totals.iter().all(|(name, value)| {
            other
                .totals
                .get(name)
                .is_some_and(|candidate| (candidate - value).abs() <= epsilon)
        })
    }
}

/// Capability interface over node data regardless of its backing store.
///
/// Implemented by the world's board-grid-backed purchased-node captures and
/// by the content crate's raw JSON-backed records, so stat extraction works
/// identically over both.
pub trait NodeData {
    /// Stable identifier of the node.
    fn node_id(&self) -> &str;

    /// Classification of the node.
    fn kind(&self) -> NodeKind;

    /// Points required to purchase the node.
    fn cost(&self) -> u32;

    /// Sparse raw stat fields attached to the node.
    fn stat_fields(&self) -> &BTreeMap<String, f64>;
}

/// Full set of aggregation inputs captured from the world.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsInputs {
    boards: Vec<BoardStatsInputs>,
}

impl StatsInputs {
    /// Creates aggregation inputs from per-board node captures.
    #[must_use]
    pub fn new(boards: Vec<BoardStatsInputs>) -> Self {
        Self { boards }
    }

    /// Iterator over the captured boards.
    pub fn boards(&self) -> impl Iterator<Item = &BoardStatsInputs> {
        self.boards.iter()
    }
}

/// Purchased-node stat capture for a single placed board.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardStatsInputs {
    /// Handle of the captured board.
    pub board: BoardId,
    /// Stat data for every purchased node on the board.
    pub nodes: Vec<PurchasedNodeStats>,
}

/// Board-grid-backed stat data for one purchased node.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchasedNodeStats {
    /// Stable identifier of the node.
    pub id: String,
    /// Classification of the node.
    pub node_kind: NodeKind,
    /// Points that were required to purchase the node.
    pub node_cost: u32,
    /// Sparse raw stat fields attached to the node.
    pub fields: BTreeMap<String, f64>,
}

impl NodeData for PurchasedNodeStats {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        self.node_kind
    }

    fn cost(&self) -> u32 {
        self.node_cost
    }

    fn stat_fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AllocationError, BoardId, CellCoord, Direction, GridPos, NodeKind, SelectionError,
        StatsTotals, Theme, Tier, STAT_EPSILON,
    };
    use serde::{de::DeserializeOwned, Serialize};
    use std::collections::BTreeMap;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn cell_offset_rejects_underflow() {
        let cell = CellCoord::new(0, 2);
        assert_eq!(cell.offset_by(-1, 0), None);
        assert_eq!(cell.offset_by(2, -2), Some(CellCoord::new(2, 0)));
    }

    #[test]
    fn directions_invert_through_opposite() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            let (dx, dy) = direction.offset();
            let (ox, oy) = direction.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn cardinal_set_matches_the_classification() {
        for direction in Direction::ALL {
            let listed = Direction::CARDINAL.contains(&direction);
            assert_eq!(direction.is_cardinal(), listed);
        }
    }

    #[test]
    fn direction_between_normalises_signs() {
        let origin = GridPos::new(0, 0);
        assert_eq!(
            Direction::between(origin, GridPos::new(0, -1)),
            Some(Direction::South)
        );
        assert_eq!(
            Direction::between(origin, GridPos::new(1, 1)),
            Some(Direction::NorthEast)
        );
        assert_eq!(Direction::between(origin, origin), None);
    }

    #[test]
    fn stats_totals_compare_within_epsilon() {
        let mut left = BTreeMap::new();
        let _ = left.insert("Strength".to_owned(), 10.0);
        let mut right = BTreeMap::new();
        let _ = right.insert("Strength".to_owned(), 10.0005);

        let first = StatsTotals::new(left, 3);
        let second = StatsTotals::new(right.clone(), 3);
        assert!(first.approx_eq(&second, STAT_EPSILON));

        let drifted = StatsTotals::new(
            right
                .into_iter()
                .map(|(name, value)| (name, value + 0.01))
                .collect(),
            3,
        );
        assert!(!first.approx_eq(&drifted, STAT_EPSILON));
    }

    #[test]
    fn stats_totals_compare_key_sets_and_counts() {
        let mut populated = BTreeMap::new();
        let _ = populated.insert("Max Health".to_owned(), 12.0);
        let snapshot = StatsTotals::new(populated, 1);

        assert!(!snapshot.approx_eq(&StatsTotals::default(), STAT_EPSILON));
        assert!(!snapshot.approx_eq(
            &StatsTotals::new(snapshot.totals().clone(), 2),
            STAT_EPSILON
        ));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn board_id_round_trips_through_bincode() {
        assert_round_trip(&BoardId::new(42));
    }

    #[test]
    fn grid_pos_round_trips_through_bincode() {
        assert_round_trip(&GridPos::new(-3, 7));
    }

    #[test]
    fn theme_and_tier_round_trip_through_bincode() {
        assert_round_trip(&Theme::Cold);
        assert_round_trip(&Tier::new(3));
    }

    #[test]
    fn node_kind_round_trips_through_bincode() {
        assert_round_trip(&NodeKind::Extension);
    }

    #[test]
    fn rejection_reasons_round_trip_through_bincode() {
        assert_round_trip(&SelectionError::ThemeTaken);
        assert_round_trip(&AllocationError::InsufficientPoints);
    }
}
