#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Board record ingestion for Skillweave.
//!
//! The upstream data pipeline hands this crate parsed node and extension
//! point records; everything here is about turning those records into
//! validated [`BoardTemplate`]s. Loading is best-effort: a malformed record
//! is logged and skipped, and only a board left without a usable grid or
//! start node fails as a whole.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use skillweave_core::{
    BoardTemplate, CellCoord, ExtensionPointTemplate, NodeData, NodeKind, NodeTemplate, Theme,
    Tier,
};

/// Errors raised while decoding a board payload.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The payload was not valid JSON or lacked the board envelope.
    #[error("could not parse board payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Errors raised while building a template from a decoded board record.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The board declares a grid with zero columns or rows.
    #[error("board '{0}' declares an empty grid")]
    EmptyGrid(String),
    /// No usable start node survived record validation.
    #[error("board '{0}' declares no usable start node")]
    MissingStart(String),
    /// A template with the same name is already catalogued.
    #[error("board '{0}' is already present in the catalog")]
    DuplicateName(String),
}

/// Grid position as serialised by the data pipeline, row first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct CellRecord {
    /// Zero-based row index.
    pub row: i64,
    /// Zero-based column index.
    pub col: i64,
}

/// One node as produced by the upstream parser.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Stable identifier of the node.
    pub id: String,
    /// Display name of the node.
    #[serde(default)]
    pub name: String,
    /// Flavour text shown in tooltips.
    #[serde(default)]
    pub description: String,
    /// Grid position of the node.
    pub position: CellRecord,
    /// Free-form classification tag; unknown tags degrade to `Travel`.
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Sparse raw stat fields attached to the node.
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    /// Maximum rank the node supports.
    #[serde(default = "default_rank")]
    pub max_rank: u32,
    /// Rank recorded by the pipeline; runtime state, ignored here.
    #[serde(default)]
    pub current_rank: u32,
    /// Points required to purchase the node.
    #[serde(default = "default_cost")]
    pub cost: u32,
    /// Identifiers of nodes named as prerequisites by the pipeline.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Identifiers of nodes the pipeline draws connector lines to.
    #[serde(default)]
    pub connections: Vec<String>,
}

impl NodeRecord {
    /// Classification parsed from the record's type tag.
    ///
    /// Unknown tags degrade to [`NodeKind::Travel`], matching the engine's
    /// treatment of unparseable type tags.
    #[must_use]
    pub fn parsed_kind(&self) -> NodeKind {
        parse_node_kind(&self.node_type).unwrap_or(NodeKind::Travel)
    }
}

impl NodeData for NodeRecord {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> NodeKind {
        self.parsed_kind()
    }

    fn cost(&self) -> u32 {
        self.cost
    }

    fn stat_fields(&self) -> &BTreeMap<String, f64> {
        &self.stats
    }
}

/// One extension point as produced by the upstream parser.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionPointRecord {
    /// Stable identifier of the socket.
    pub id: String,
    /// Grid position of the socket.
    pub position: CellRecord,
    /// Template names the pipeline offers for linking through this socket.
    #[serde(default)]
    pub available_boards: Vec<String>,
    /// Maximum number of boards the socket may link to.
    #[serde(default = "default_rank")]
    pub max_connections: u32,
    /// Connections recorded by the pipeline; runtime state, ignored here.
    #[serde(default)]
    pub current_connections: u32,
}

/// A whole board as decoded from one payload.
#[derive(Clone, Debug)]
pub struct BoardRecord {
    /// Unique template name.
    pub name: String,
    /// Free-form theme tag; unknown tags degrade to `General`.
    pub theme: String,
    /// Progression tier of the board.
    pub tier: u8,
    /// Number of columns in the board grid.
    pub columns: u32,
    /// Number of rows in the board grid.
    pub rows: u32,
    /// Node records that survived per-record decoding.
    pub nodes: Vec<NodeRecord>,
    /// Extension point records that survived per-record decoding.
    pub extension_points: Vec<ExtensionPointRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoardEnvelope {
    name: String,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    tier: u8,
    columns: u32,
    rows: u32,
    #[serde(default)]
    nodes: Vec<serde_json::Value>,
    #[serde(default)]
    extension_points: Vec<serde_json::Value>,
}

/// Decodes a board payload, skipping malformed node and socket records.
///
/// Only a payload whose outer envelope fails to parse is an error; every
/// inner record is decoded independently so one bad entry cannot take the
/// rest of the board with it.
pub fn decode_board(payload: &str) -> Result<BoardRecord, RecordError> {
    let envelope: BoardEnvelope = serde_json::from_str(payload)?;

    let nodes = envelope
        .nodes
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<NodeRecord>(value) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(board = %envelope.name, %error, "skipping malformed node record");
                None
            }
        })
        .collect();

    let extension_points = envelope
        .extension_points
        .into_iter()
        .filter_map(
            |value| match serde_json::from_value::<ExtensionPointRecord>(value) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(
                        board = %envelope.name,
                        %error,
                        "skipping malformed extension point record"
                    );
                    None
                }
            },
        )
        .collect();

    Ok(BoardRecord {
        name: envelope.name,
        theme: envelope.theme,
        tier: envelope.tier,
        columns: envelope.columns,
        rows: envelope.rows,
        nodes,
        extension_points,
    })
}

/// Builds a validated template from a decoded board record.
///
/// Individual records that do not fit the grid are logged and dropped;
/// duplicate start nodes are demoted to travel nodes so the one-start
/// invariant holds. A board with no grid or no start node is rejected.
pub fn build_template(record: &BoardRecord) -> Result<BoardTemplate, TemplateError> {
    if record.columns == 0 || record.rows == 0 {
        return Err(TemplateError::EmptyGrid(record.name.clone()));
    }

    let mut template = BoardTemplate {
        name: record.name.clone(),
        theme: parse_theme(&record.theme, &record.name),
        tier: Tier::new(record.tier),
        columns: record.columns,
        rows: record.rows,
        nodes: Vec::with_capacity(record.nodes.len()),
        extension_points: Vec::with_capacity(record.extension_points.len()),
    };

    let mut used_cells: BTreeSet<CellCoord> = BTreeSet::new();
    let mut used_ids: BTreeSet<String> = BTreeSet::new();
    let mut start_seen = false;

    for node in &record.nodes {
        let Some(cell) = cell_in_grid(node.position, record.columns, record.rows) else {
            warn!(
                board = %record.name,
                node = %node.id,
                row = node.position.row,
                col = node.position.col,
                "node record position has no matching board cell, skipping"
            );
            continue;
        };
        if !used_cells.insert(cell) {
            warn!(board = %record.name, node = %node.id, "duplicate node cell, skipping");
            continue;
        }
        if !used_ids.insert(node.id.clone()) {
            warn!(board = %record.name, node = %node.id, "duplicate node id, skipping");
            continue;
        }

        let mut kind = match parse_node_kind(&node.node_type) {
            Some(kind) => kind,
            None => {
                warn!(
                    board = %record.name,
                    node = %node.id,
                    tag = %node.node_type,
                    "unknown node type tag, defaulting to travel"
                );
                NodeKind::Travel
            }
        };
        if kind == NodeKind::Start {
            if start_seen {
                warn!(
                    board = %record.name,
                    node = %node.id,
                    "extra start node demoted to travel"
                );
                kind = NodeKind::Travel;
            } else {
                start_seen = true;
            }
        }

        template.nodes.push(NodeTemplate {
            id: node.id.clone(),
            name: if node.name.is_empty() {
                node.id.clone()
            } else {
                node.name.clone()
            },
            kind,
            cell,
            cost: node.cost,
            max_rank: node.max_rank.max(1),
            stat_fields: node.stats.clone(),
        });
    }

    if !start_seen {
        return Err(TemplateError::MissingStart(record.name.clone()));
    }

    let mut used_socket_ids: BTreeSet<String> = BTreeSet::new();
    for point in &record.extension_points {
        let Some(cell) = cell_in_grid(point.position, record.columns, record.rows) else {
            warn!(
                board = %record.name,
                socket = %point.id,
                "extension point lies outside the grid, skipping"
            );
            continue;
        };
        if !template.is_edge(cell) {
            warn!(
                board = %record.name,
                socket = %point.id,
                "extension point must lie on a board edge, skipping"
            );
            continue;
        }
        if !used_socket_ids.insert(point.id.clone()) {
            warn!(board = %record.name, socket = %point.id, "duplicate socket id, skipping");
            continue;
        }
        template.extension_points.push(ExtensionPointTemplate {
            id: point.id.clone(),
            cell,
            max_connections: point.max_connections.max(1),
        });
    }

    Ok(template)
}

/// Name-keyed store of validated board templates.
#[derive(Debug, Default)]
pub struct Catalog {
    templates: BTreeMap<String, BoardTemplate>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, rejecting duplicate names.
    pub fn insert(&mut self, template: BoardTemplate) -> Result<(), TemplateError> {
        if self.templates.contains_key(&template.name) {
            return Err(TemplateError::DuplicateName(template.name));
        }
        let _ = self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoardTemplate> {
        self.templates.get(name)
    }

    /// Names of every catalogued template in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Iterator over the catalogued templates in name order.
    pub fn iter(&self) -> impl Iterator<Item = &BoardTemplate> {
        self.templates.values()
    }

    /// Number of catalogued templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Reports whether the catalog holds no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn cell_in_grid(position: CellRecord, columns: u32, rows: u32) -> Option<CellCoord> {
    let column = u32::try_from(position.col).ok()?;
    let row = u32::try_from(position.row).ok()?;
    (column < columns && row < rows).then(|| CellCoord::new(column, row))
}

fn parse_node_kind(tag: &str) -> Option<NodeKind> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "start" => Some(NodeKind::Start),
        "travel" => Some(NodeKind::Travel),
        "extension" => Some(NodeKind::Extension),
        "notable" => Some(NodeKind::Notable),
        "small" => Some(NodeKind::Small),
        "keystone" => Some(NodeKind::Keystone),
        _ => None,
    }
}

fn parse_theme(tag: &str, board: &str) -> Theme {
    match tag.trim().to_ascii_lowercase().as_str() {
        "fire" => Theme::Fire,
        "cold" => Theme::Cold,
        "lightning" => Theme::Lightning,
        "physical" => Theme::Physical,
        "chaos" => Theme::Chaos,
        "life" => Theme::Life,
        "guard" => Theme::Guard,
        "minion" => Theme::Minion,
        "critical" => Theme::Critical,
        "general" => Theme::General,
        other => {
            if !other.is_empty() {
                warn!(board = %board, theme = %other, "unknown theme tag, defaulting to general");
            }
            Theme::General
        }
    }
}


const fn default_rank() -> u32 {
    1
}

const fn default_cost() -> u32 {
    1
}
