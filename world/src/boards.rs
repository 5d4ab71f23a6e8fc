//! Authoritative board state storage and handle allocation.

use std::collections::BTreeMap;

use skillweave_core::{
    BoardId, BoardTemplate, CellCoord, GridPos, NodeKind, NodeTemplate, Theme, Tier,
};

/// State of a single node stored inside a placed board.
#[derive(Clone, Debug)]
pub(crate) struct NodeState {
    /// Stable identifier unique across all boards.
    pub(crate) id: String,
    /// Display name of the node.
    pub(crate) name: String,
    /// Classification of the node.
    pub(crate) kind: NodeKind,
    /// Points required to purchase the node.
    pub(crate) cost: u32,
    /// Maximum rank the node supports.
    pub(crate) max_rank: u32,
    /// Rank currently held by the player.
    pub(crate) current_rank: u32,
    /// Whether an adjacent purchase has unlocked the node.
    pub(crate) unlocked: bool,
    /// Whether the node is presented as purchasable.
    pub(crate) available: bool,
    /// Whether the node has been purchased.
    pub(crate) purchased: bool,
    /// Sparse raw stat fields attached to the node.
    pub(crate) stat_fields: BTreeMap<String, f64>,
}

impl NodeState {
    fn from_template(template: &NodeTemplate) -> Self {
        Self {
            id: template.id.clone(),
            name: template.name.clone(),
            kind: template.kind,
            cost: template.cost,
            max_rank: template.max_rank.max(1),
            current_rank: 0,
            unlocked: false,
            available: false,
            purchased: false,
            stat_fields: template.stat_fields.clone(),
        }
    }

    /// Marks the node purchased, raising its rank to at least one.
    pub(crate) fn mark_purchased(&mut self) {
        self.purchased = true;
        self.unlocked = true;
        self.available = false;
        self.current_rank = self.current_rank.max(1);
    }
}

/// State of an extension socket stored inside a placed board.
#[derive(Clone, Debug)]
pub(crate) struct ExtensionPointState {
    /// Stable identifier of the socket.
    pub(crate) id: String,
    /// Local grid position of the socket.
    pub(crate) cell: CellCoord,
    /// Maximum number of boards the socket may link to.
    pub(crate) max_connections: u32,
    /// Number of boards currently linked through the socket.
    pub(crate) current_connections: u32,
    /// Name of the board the socket most recently linked to.
    pub(crate) linked_board: Option<String>,
    /// Whether the socket is armed for a pending extension purchase.
    pub(crate) preview_allocated: bool,
}

impl ExtensionPointState {
    /// Reports whether the socket may accept another connection.
    pub(crate) fn has_budget(&self) -> bool {
        self.current_connections < self.max_connections
    }

    /// Records a completed link to the named board.
    pub(crate) fn record_link(&mut self, board_name: &str) {
        self.current_connections = self
            .current_connections
            .saturating_add(1)
            .min(self.max_connections);
        self.linked_board = Some(board_name.to_owned());
        self.preview_allocated = false;
    }
}

/// A board materialised into the world from a template.
#[derive(Clone, Debug)]
pub(crate) struct BoardState {
    pub(crate) id: BoardId,
    pub(crate) name: String,
    pub(crate) theme: Theme,
    pub(crate) tier: Tier,
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) position: GridPos,
    pub(crate) start: CellCoord,
    pub(crate) nodes: BTreeMap<CellCoord, NodeState>,
    pub(crate) extension_points: Vec<ExtensionPointState>,
}

impl BoardState {
    /// Builds board state from a template, marking the start node purchased.
    ///
    /// Returns `None` when the template declares no start node; placement
    /// validation rejects such templates before instantiation.
    pub(crate) fn instantiate(
        id: BoardId,
        template: &BoardTemplate,
        position: GridPos,
    ) -> Option<Self> {
        let start = template.start_node()?.cell;
        let mut nodes = BTreeMap::new();
        for node in &template.nodes {
            let _ = nodes.insert(node.cell, NodeState::from_template(node));
        }

        let extension_points = template
            .extension_points
            .iter()
            .map(|point| ExtensionPointState {
                id: point.id.clone(),
                cell: point.cell,
                max_connections: point.max_connections.max(1),
                current_connections: 0,
                linked_board: None,
                preview_allocated: false,
            })
            .collect();

        let mut board = Self {
            id,
            name: template.name.clone(),
            theme: template.theme,
            tier: template.tier,
            columns: template.columns,
            rows: template.rows,
            position,
            start,
            nodes,
            extension_points,
        };

        if let Some(node) = board.nodes.get_mut(&start) {
            node.mark_purchased();
        }
        Some(board)
    }

    pub(crate) fn node(&self, cell: CellCoord) -> Option<&NodeState> {
        self.nodes.get(&cell)
    }

    pub(crate) fn node_mut(&mut self, cell: CellCoord) -> Option<&mut NodeState> {
        self.nodes.get_mut(&cell)
    }

    /// Locates a node's cell by its stable identifier.
    pub(crate) fn cell_of(&self, node_id: &str) -> Option<CellCoord> {
        self.nodes
            .iter()
            .find(|(_, node)| node.id == node_id)
            .map(|(cell, _)| *cell)
    }

    pub(crate) fn extension_point(&self, cell: CellCoord) -> Option<&ExtensionPointState> {
        self.extension_points.iter().find(|point| point.cell == cell)
    }

    pub(crate) fn extension_point_mut(
        &mut self,
        cell: CellCoord,
    ) -> Option<&mut ExtensionPointState> {
        self.extension_points
            .iter_mut()
            .find(|point| point.cell == cell)
    }
}

/// Registry that stores placed boards and manages handle allocation.
#[derive(Debug, Default)]
pub(crate) struct BoardRegistry {
    entries: BTreeMap<BoardId, BoardState>,
    by_position: BTreeMap<GridPos, BoardId>,
    next_board_id: u32,
}

impl BoardRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Materialises the template, returning the allocated handle.
    ///
    /// Callers validate the template and position before insertion; a
    /// template without a start node is rejected with `None`.
    pub(crate) fn insert(
        &mut self,
        template: &BoardTemplate,
        position: GridPos,
    ) -> Option<BoardId> {
        let id = BoardId::new(self.next_board_id);
        let board = BoardState::instantiate(id, template, position)?;
        self.next_board_id = self.next_board_id.saturating_add(1);
        let _ = self.by_position.insert(position, id);
        let _ = self.entries.insert(id, board);
        Some(id)
    }

    /// Removes a board, invalidating its handle for all future lookups.
    pub(crate) fn remove(&mut self, id: BoardId) -> Option<BoardState> {
        let board = self.entries.remove(&id)?;
        let _ = self.by_position.remove(&board.position);
        Some(board)
    }

    pub(crate) fn get(&self, id: BoardId) -> Option<&BoardState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: BoardId) -> Option<&mut BoardState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn board_at(&self, position: GridPos) -> Option<BoardId> {
        self.by_position.get(&position).copied()
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<BoardId> {
        self.entries
            .values()
            .find(|board| board.name == name)
            .map(|board| board.id)
    }

    /// Iterator over placed boards in handle-allocation order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &BoardState> {
        self.entries.values()
    }
}
