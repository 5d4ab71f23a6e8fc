use std::collections::BTreeMap;
use std::time::Duration;

use skillweave_core::{
    BoardTemplate, CellCoord, Command, Event, NodeKind, NodeTemplate, Theme, Tier,
};
use skillweave_system_aggregation::Aggregation;
use skillweave_world::{self as world, query, World};

fn stat_board() -> BoardTemplate {
    let mut strength = BTreeMap::new();
    let _ = strength.insert("strength".to_owned(), 10.0);
    let mut legacy_life = BTreeMap::new();
    let _ = legacy_life.insert("maxLifeIncrease".to_owned(), 12.0);

    BoardTemplate {
        name: "ember-field".to_owned(),
        theme: Theme::Fire,
        tier: Tier::new(1),
        columns: 3,
        rows: 3,
        nodes: vec![
            NodeTemplate {
                id: "ember-start".to_owned(),
                name: "Start".to_owned(),
                kind: NodeKind::Start,
                cell: CellCoord::new(1, 1),
                cost: 0,
                max_rank: 1,
                stat_fields: BTreeMap::new(),
            },
            NodeTemplate {
                id: "ember-str".to_owned(),
                name: "Brawn".to_owned(),
                kind: NodeKind::Small,
                cell: CellCoord::new(0, 1),
                cost: 1,
                max_rank: 1,
                stat_fields: strength,
            },
            NodeTemplate {
                id: "ember-life".to_owned(),
                name: "Vigour".to_owned(),
                kind: NodeKind::Notable,
                cell: CellCoord::new(2, 1),
                cost: 1,
                max_rank: 1,
                stat_fields: legacy_life,
            },
        ],
        extension_points: Vec::new(),
    }
}

fn pump(
    world_state: &mut World,
    aggregation: &mut Aggregation,
    command: Command,
) -> Vec<Event> {
    let mut events = Vec::new();
    let commands = vec![command.clone()];
    world::apply(world_state, command, &mut events);
    let mut published = Vec::new();
    aggregation.handle(
        &events,
        &commands,
        || query::stats_inputs(world_state),
        &mut published,
    );
    published
}

#[test]
fn placement_and_allocation_flow_into_published_totals() {
    let mut world_state = World::new();
    let mut aggregation = Aggregation::new();

    // The start node counts as purchased the moment the board lands.
    let published = pump(
        &mut world_state,
        &mut aggregation,
        Command::PlaceBoard {
            template: stat_board(),
            position: skillweave_core::GridPos::new(0, 0),
        },
    );
    assert!(published
        .iter()
        .any(|event| matches!(event, Event::AllocatedNodesChanged { count: 1 })));

    let board = query::board_by_name(&world_state, "ember-field").expect("placed");
    let _ = pump(
        &mut world_state,
        &mut aggregation,
        Command::GrantPoints { amount: 2 },
    );

    let published = pump(
        &mut world_state,
        &mut aggregation,
        Command::AllocateNode {
            board,
            cell: CellCoord::new(0, 1),
        },
    );
    let totals = published
        .iter()
        .find_map(|event| match event {
            Event::StatsUpdated { totals } => Some(totals.clone()),
            _ => None,
        })
        .expect("stats published");
    assert_eq!(totals.get("Strength"), 10.0);
    assert_eq!(totals.purchased_nodes(), 2);

    // A legacy-named field lands on the same display key table.
    let published = pump(
        &mut world_state,
        &mut aggregation,
        Command::AllocateNode {
            board,
            cell: CellCoord::new(2, 1),
        },
    );
    let totals = published
        .iter()
        .find_map(|event| match event {
            Event::StatsUpdated { totals } => Some(totals.clone()),
            _ => None,
        })
        .expect("stats published");
    assert_eq!(totals.get("Max Health"), 12.0);
    assert_eq!(totals.get("Strength"), 10.0);
}

#[test]
fn deallocation_retracts_published_totals() {
    let mut world_state = World::new();
    let mut aggregation = Aggregation::new();
    let _ = pump(
        &mut world_state,
        &mut aggregation,
        Command::PlaceBoard {
            template: stat_board(),
            position: skillweave_core::GridPos::new(0, 0),
        },
    );
    let board = query::board_by_name(&world_state, "ember-field").expect("placed");
    let _ = pump(
        &mut world_state,
        &mut aggregation,
        Command::GrantPoints { amount: 1 },
    );
    let _ = pump(
        &mut world_state,
        &mut aggregation,
        Command::AllocateNode {
            board,
            cell: CellCoord::new(0, 1),
        },
    );

    let published = pump(
        &mut world_state,
        &mut aggregation,
        Command::DeallocateNode {
            board,
            cell: CellCoord::new(0, 1),
        },
    );

    let totals = published
        .iter()
        .find_map(|event| match event {
            Event::StatsUpdated { totals } => Some(totals.clone()),
            _ => None,
        })
        .expect("stats published");
    assert_eq!(totals.get("Strength"), 0.0);
    assert_eq!(totals.purchased_nodes(), 1);
}

#[test]
fn ticks_alone_never_publish_when_nothing_changed() {
    let mut world_state = World::new();
    let mut aggregation = Aggregation::with_rescan_interval(Duration::from_secs(1));
    let _ = pump(
        &mut world_state,
        &mut aggregation,
        Command::PlaceBoard {
            template: stat_board(),
            position: skillweave_core::GridPos::new(0, 0),
        },
    );

    for _ in 0..8 {
        let published = pump(
            &mut world_state,
            &mut aggregation,
            Command::Tick {
                dt: Duration::from_millis(400),
            },
        );
        assert!(published.is_empty());
    }
}
