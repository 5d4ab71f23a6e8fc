#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives the Skillweave passive tree.
//!
//! Loads board templates from a directory of JSON payloads, restores the
//! character's saved tree (or runs a short demo allocation walk on a fresh
//! character), publishes consolidated stat totals, and saves the profile
//! back into a directory-backed blob store.

mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skillweave_content::{build_template, decode_board, Catalog};
use skillweave_core::{BoardId, CellCoord, Command, Event, GridPos};
use skillweave_system_aggregation::Aggregation;
use skillweave_system_persistence::{capture, load_profile, restore, save_profile};
use skillweave_world::{self as world, query, World};

use store::DirStore;

#[derive(Debug, Parser)]
#[command(
    name = "skillweave",
    about = "Drive the multi-board passive tree from the command line"
)]
struct Args {
    /// Directory containing board template payloads (*.json).
    #[arg(long, default_value = "boards")]
    boards: PathBuf,

    /// Directory the character profiles are persisted into.
    #[arg(long, default_value = "profiles")]
    profiles: PathBuf,

    /// Character whose passive tree is loaded and saved.
    #[arg(long, default_value = "weaver")]
    character: String,

    /// Points granted when the character starts fresh.
    #[arg(long, default_value_t = 12)]
    points: u32,
}

/// Entry point for the Skillweave command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let catalog = load_catalog(&args.boards)?;
    info!(boards = catalog.len(), "board catalog loaded");

    let mut store = DirStore::new(args.profiles.clone());
    let mut session = Session::new();

    match load_profile(&store, &args.character) {
        Ok(Some(snapshot)) => {
            info!(character = %args.character, "restoring saved passive tree");
            let mut events = Vec::new();
            restore(
                &mut session.world,
                &snapshot,
                |name| catalog.get(name),
                &mut events,
            );
            let mut published = Vec::new();
            session.aggregation.handle(
                &events,
                &[],
                || query::stats_inputs(&session.world),
                &mut published,
            );
        }
        Ok(None) => {
            info!(character = %args.character, "no saved profile, running the demo walk");
            run_demo(&mut session, &catalog, args.points);
        }
        Err(error) => {
            warn!(%error, "saved profile was unreadable, starting fresh");
            run_demo(&mut session, &catalog, args.points);
        }
    }

    // A couple of idle ticks let the aggregation safety net settle.
    for _ in 0..2 {
        let _ = session.pump(Command::Tick {
            dt: Duration::from_secs(3),
        });
    }

    print_totals(&session);

    let snapshot = capture(&session.world, session.aggregation.cached_totals());
    save_profile(&mut store, &args.character, &snapshot);
    info!(character = %args.character, "profile saved");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// World plus aggregation wired through one command pump.
struct Session {
    world: World,
    aggregation: Aggregation,
}

impl Session {
    fn new() -> Self {
        Self {
            world: World::new(),
            aggregation: Aggregation::new(),
        }
    }

    /// Applies one command and feeds the fallout through the aggregation
    /// system, returning the world events followed by anything published.
    fn pump(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        let commands = [command.clone()];
        world::apply(&mut self.world, command, &mut events);

        let mut published = Vec::new();
        self.aggregation.handle(
            &events,
            &commands,
            || query::stats_inputs(&self.world),
            &mut published,
        );
        events.extend(published);
        events
    }
}

fn load_catalog(dir: &Path) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading board directory {}", dir.display()))?;

    for entry in entries {
        let path = entry.context("reading board directory entry")?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        let payload = fs::read_to_string(&path)
            .with_context(|| format!("reading board payload {}", path.display()))?;

        let record = match decode_board(&payload) {
            Ok(record) => record,
            Err(error) => {
                warn!(file = %path.display(), %error, "skipping unreadable board payload");
                continue;
            }
        };
        match build_template(&record) {
            Ok(template) => {
                if let Err(error) = catalog.insert(template) {
                    warn!(file = %path.display(), %error, "skipping duplicate board");
                }
            }
            Err(error) => {
                warn!(file = %path.display(), %error, "skipping invalid board");
            }
        }
    }

    ensure!(
        !catalog.is_empty(),
        "no usable board templates in {}",
        dir.display()
    );
    Ok(catalog)
}

/// Places up to three boards in a west-to-east row and spends the granted
/// points greedily, so adjacent extension gates get a chance to mirror.
fn run_demo(session: &mut Session, catalog: &Catalog, points: u32) {
    for (index, template) in catalog.iter().take(3).enumerate() {
        let _ = session.pump(Command::PlaceBoard {
            template: template.clone(),
            position: GridPos::new(index as i32, 0),
        });
    }
    let _ = session.pump(Command::GrantPoints { amount: points });

    let mut purchases = 0usize;
    while let Some((board, cell)) = next_affordable(&session.world) {
        let events = session.pump(Command::AllocateNode { board, cell });
        for event in &events {
            if let Event::ExtensionMirrored { target_board, .. } = event {
                info!(
                    target = target_board.get(),
                    "extension gate mirrored onto a neighbouring board"
                );
            }
        }
        purchases += 1;
        if purchases >= 32 {
            break;
        }
    }
    info!(purchases, "demo allocation walk finished");
}

fn next_affordable(world_state: &World) -> Option<(BoardId, CellCoord)> {
    for board in query::board_handles(world_state) {
        let Some(view) = query::board_view(world_state, board) else {
            continue;
        };
        for node in &view.nodes {
            if query::can_allocate(world_state, board, node.cell) {
                return Some((board, node.cell));
            }
        }
    }
    None
}

fn print_totals(session: &Session) {
    let totals = session.aggregation.cached_totals();
    println!(
        "Allocated {} nodes across {} boards.",
        totals.purchased_nodes(),
        query::board_handles(&session.world).len()
    );
    for (name, value) in totals.totals() {
        println!("  {name:<24} {value:+.1}");
    }
    println!(
        "Available points: {}",
        query::available_points(&session.world)
    );
}
