#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Character profile persistence for the passive tree.
//!
//! A profile is a small key/value blob: the allocated node ids, the names of
//! the connected boards, the extension links between them, the available
//! point pool and the last consolidated stat cache. Board positions are not
//! persisted; [`restore`] re-derives them by walking the recorded links
//! outward from the first connected board. Loading always re-asserts the
//! start-node invariant, so a corrupted or partial blob still produces a
//! usable tree.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use skillweave_core::{BoardTemplate, CellCoord, Command, Direction, Event, GridPos, StatsTotals};
use skillweave_world::{self as world, query, World};

const SNAPSHOT_DOMAIN: &str = "skillweave";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "skillweave:v1";
/// Delimiter used to separate the prefix, version and payload.
const FIELD_DELIMITER: char = ':';

/// Persisted passive-tree state for one character.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassiveSnapshot {
    /// Stable identifiers of every purchased node.
    pub allocated_nodes: Vec<String>,
    /// Names of the placed boards, first board at the world origin.
    pub connected_boards: Vec<String>,
    /// Extension links recorded between the placed boards.
    pub board_connections: Vec<BoardLink>,
    /// Points left in the allocation pool.
    pub available_points: u32,
    /// Consolidated stat totals cached at save time.
    #[serde(default)]
    pub cached_stats: BTreeMap<String, f64>,
}

/// One persisted extension link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardLink {
    /// Identifier of the socket the link runs through.
    pub extension_point: String,
    /// Name of the board on the far side of the link.
    pub board: String,
}

impl PassiveSnapshot {
    /// Encodes the snapshot into a single-line string for blob storage.
    #[must_use]
    pub fn encode(&self) -> String {
        let json =
            serde_json::to_vec(self).expect("passive snapshot serialization never fails");
        let encoded = STANDARD_NO_PAD.encode(json);
        format!("{SNAPSHOT_HEADER}{FIELD_DELIMITER}{encoded}")
    }

    /// Decodes a snapshot from its single-line string representation.
    pub fn decode(value: &str) -> Result<Self, SnapshotError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SnapshotError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(SnapshotError::MissingPrefix)?;
        let version = parts.next().ok_or(SnapshotError::MissingVersion)?;
        let payload = parts.next().ok_or(SnapshotError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(SnapshotError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(version.to_owned()));
        }

        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SnapshotError::InvalidEncoding)?;
        let decoded: PassiveSnapshot =
            serde_json::from_slice(&bytes).map_err(SnapshotError::InvalidPayload)?;
        Ok(decoded)
    }
}

/// Errors that can occur while decoding persisted snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The stored blob was empty or contained only whitespace.
    #[error("stored profile blob was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    #[error("profile blob is missing the prefix")]
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    #[error("profile blob is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include the payload segment.
    #[error("profile blob is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("profile prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("profile version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode profile payload: {0}")]
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse profile payload: {0}")]
    InvalidPayload(serde_json::Error),
}

/// Key/value blob store the profiles are persisted into.
pub trait ProfileStore {
    /// Reads the blob stored under the key, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Stores the blob under the key, replacing any previous value.
    fn write(&mut self, key: &str, value: String);
}

/// In-memory profile store used by tests and headless tooling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: String) {
        let _ = self.entries.insert(key.to_owned(), value);
    }
}

/// Store key under which a character's passive profile lives.
#[must_use]
pub fn profile_key(character: &str) -> String {
    format!("passives/{character}")
}

/// Encodes and writes a character's snapshot into the store.
pub fn save_profile(
    store: &mut impl ProfileStore,
    character: &str,
    snapshot: &PassiveSnapshot,
) {
    store.write(&profile_key(character), snapshot.encode());
}

/// Reads and decodes a character's snapshot from the store.
///
/// A missing key yields `Ok(None)`; a present but corrupt blob is an error
/// so callers can decide between starting fresh and surfacing the problem.
pub fn load_profile(
    store: &impl ProfileStore,
    character: &str,
) -> Result<Option<PassiveSnapshot>, SnapshotError> {
    match store.read(&profile_key(character)) {
        Some(blob) => PassiveSnapshot::decode(&blob).map(Some),
        None => Ok(None),
    }
}

/// Captures the current world state into a persistable snapshot.
#[must_use]
pub fn capture(world_state: &World, cached_stats: &StatsTotals) -> PassiveSnapshot {
    PassiveSnapshot {
        allocated_nodes: query::allocated_node_ids(world_state),
        connected_boards: query::placed_board_names(world_state),
        board_connections: query::board_connections(world_state)
            .into_iter()
            .map(|connection| BoardLink {
                extension_point: connection.extension_point,
                board: connection.linked_board,
            })
            .collect(),
        available_points: query::available_points(world_state),
        cached_stats: cached_stats.totals().clone(),
    }
}

/// Replays a snapshot into the world, healing the start-node invariant.
///
/// Boards are placed first (the first connected board at the origin, the
/// rest positioned by walking the recorded links), allocations re-applied
/// through the free restoration path, and the point pool set last. Every
/// unresolvable entry is logged and skipped; restoration never fails as a
/// whole.
pub fn restore<'a, F>(
    world_state: &mut World,
    snapshot: &PassiveSnapshot,
    lookup: F,
    out_events: &mut Vec<Event>,
) where
    F: Fn(&str) -> Option<&'a BoardTemplate>,
{
    let templates: Vec<&BoardTemplate> = snapshot
        .connected_boards
        .iter()
        .filter_map(|name| match lookup(name) {
            Some(template) => Some(template),
            None => {
                warn!(board = %name, "saved board has no catalogued template, skipping");
                None
            }
        })
        .collect();

    let positions = resolve_positions(&templates, &snapshot.board_connections);
    for template in &templates {
        let Some(position) = positions.get(&template.name) else {
            warn!(
                board = %template.name,
                "saved board is not reachable through any recorded link, skipping"
            );
            continue;
        };
        world::apply(
            world_state,
            Command::PlaceBoard {
                template: (*template).clone(),
                position: *position,
            },
            out_events,
        );
    }

    // The start ids are re-inserted up front so a truncated allocation list
    // still restores every board root.
    let mut allocated: Vec<String> = templates
        .iter()
        .filter_map(|template| template.start_node().map(|node| node.id.clone()))
        .collect();
    for node_id in &snapshot.allocated_nodes {
        if !allocated.contains(node_id) {
            allocated.push(node_id.clone());
        }
    }

    for node_id in allocated {
        let Some((board, _)) = query::find_node(world_state, &node_id) else {
            warn!(node = %node_id, "saved allocation has no matching node, skipping");
            continue;
        };
        world::apply(
            world_state,
            Command::RestoreAllocation { board, node_id },
            out_events,
        );
    }

    world::apply(
        world_state,
        Command::SetAvailablePoints {
            points: snapshot.available_points,
        },
        out_events,
    );
}

/// Walks the recorded links outward from the root board, assigning a world
/// position to every board reachable through them.
fn resolve_positions(
    templates: &[&BoardTemplate],
    links: &[BoardLink],
) -> BTreeMap<String, GridPos> {
    let mut positions: BTreeMap<String, GridPos> = BTreeMap::new();
    let Some(root) = templates.first() else {
        return positions;
    };
    let _ = positions.insert(root.name.clone(), GridPos::new(0, 0));

    loop {
        let mut progressed = false;
        for link in links {
            if positions.contains_key(&link.board) {
                continue;
            }
            if !templates.iter().any(|template| template.name == link.board) {
                continue;
            }
            let Some((owner, socket_cell)) = templates.iter().find_map(|template| {
                positions.contains_key(&template.name).then(|| {
                    template
                        .extension_points
                        .iter()
                        .find(|point| point.id == link.extension_point)
                        .map(|point| (*template, point.cell))
                })?
            }) else {
                continue;
            };
            let Some(direction) = edge_direction(owner, socket_cell) else {
                warn!(
                    board = %owner.name,
                    socket = %link.extension_point,
                    "linked socket does not lie on a board edge, skipping link"
                );
                continue;
            };

            let (delta_x, delta_y) = direction.offset();
            let position = positions[&owner.name].translated(delta_x, delta_y);
            if positions.values().any(|taken| *taken == position) {
                warn!(
                    board = %link.board,
                    "derived position is already occupied, skipping link"
                );
                continue;
            }
            let _ = positions.insert(link.board.clone(), position);
            progressed = true;
        }
        if !progressed {
            break;
        }
    }

    positions
}

/// Direction a board edge faces; corners resolve vertically first.
fn edge_direction(template: &BoardTemplate, cell: CellCoord) -> Option<Direction> {
    if cell.row() == 0 {
        Some(Direction::South)
    } else if cell.row() == template.rows.saturating_sub(1) {
        Some(Direction::North)
    } else if cell.column() == 0 {
        Some(Direction::West)
    } else if cell.column() == template.columns.saturating_sub(1) {
        Some(Direction::East)
    } else {
        None
    }
}
