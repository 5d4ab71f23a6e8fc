#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Stat aggregation system with change detection and a periodic re-scan.
//!
//! Allocation and board events mark the consolidated totals dirty; every
//! dirty pass re-sums the stats of all purchased nodes from scratch and
//! publishes [`Event::StatsUpdated`] only when the result drifts from the
//! cached snapshot by more than the shared epsilon. A low-frequency forced
//! re-scan backstops any update that reached the world without flowing
//! through this system's event feed.

use std::collections::BTreeMap;
use std::time::Duration;

use skillweave_core::{Command, Event, NodeData, StatsInputs, StatsTotals, STAT_EPSILON};

/// Interval between forced re-consolidations when no event arrives.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Canonical stat field names and the display keys they project onto.
const STAT_NAME_TABLE: &[(&str, &str)] = &[
    ("strength", "Strength"),
    ("dexterity", "Dexterity"),
    ("intelligence", "Intelligence"),
    ("maxHealthIncrease", "Max Health"),
    ("maxManaIncrease", "Max Mana"),
    ("healthRegen", "Health Regeneration"),
    ("manaRegen", "Mana Regeneration"),
    ("armourIncrease", "Armour"),
    ("evasionIncrease", "Evasion"),
    ("energyShieldIncrease", "Energy Shield"),
    ("blockChance", "Block Chance"),
    ("moveSpeedIncrease", "Movement Speed"),
    ("attackSpeedIncrease", "Attack Speed"),
    ("castSpeedIncrease", "Cast Speed"),
    ("critChance", "Critical Chance"),
    ("critMultiplier", "Critical Multiplier"),
    ("fireDamageIncrease", "Fire Damage"),
    ("coldDamageIncrease", "Cold Damage"),
    ("lightningDamageIncrease", "Lightning Damage"),
    ("physicalDamageIncrease", "Physical Damage"),
    ("chaosDamageIncrease", "Chaos Damage"),
    ("elementalDamageIncrease", "Elemental Damage"),
    ("minionDamageIncrease", "Minion Damage"),
    ("minionHealthIncrease", "Minion Health"),
    ("fireResistance", "Fire Resistance"),
    ("coldResistance", "Cold Resistance"),
    ("lightningResistance", "Lightning Resistance"),
    ("chaosResistance", "Chaos Resistance"),
    ("projectileDamageIncrease", "Projectile Damage"),
    ("areaDamageIncrease", "Area Damage"),
    ("damageOverTimeIncrease", "Damage over Time"),
    ("lifeLeech", "Life Leech"),
    ("manaLeech", "Mana Leech"),
    ("skillEffectDuration", "Skill Effect Duration"),
    ("cooldownRecovery", "Cooldown Recovery"),
];

/// Historical field names kept so boards authored against older pipelines
/// still aggregate onto the same display keys. Within a single node the
/// last field written wins when an alias collides with its canonical form.
const LEGACY_STAT_ALIASES: &[(&str, &str)] = &[
    ("str", "Strength"),
    ("dex", "Dexterity"),
    ("int", "Intelligence"),
    ("hpIncrease", "Max Health"),
    ("maxLifeIncrease", "Max Health"),
    ("mpIncrease", "Max Mana"),
    ("lifeRegen", "Health Regeneration"),
    ("armorIncrease", "Armour"),
    ("movementSpeed", "Movement Speed"),
    ("criticalStrikeChance", "Critical Chance"),
    ("criticalStrikeMultiplier", "Critical Multiplier"),
    ("critDamage", "Critical Multiplier"),
    ("fireDmg", "Fire Damage"),
    ("coldDmg", "Cold Damage"),
    ("lightningDmg", "Lightning Damage"),
    ("allResistance", "All Resistances"),
];

/// Projects a node's raw stat fields onto display-keyed values.
///
/// Only fields present in the fixed name table (canonical or legacy) are
/// kept, and zero-valued fields are dropped. Colliding fields replace each
/// other in field order rather than summing.
#[must_use]
pub fn extract_stats(node: &impl NodeData) -> BTreeMap<String, f64> {
    let mut projected = BTreeMap::new();
    for (field, value) in node.stat_fields() {
        if value.abs() <= f64::EPSILON {
            continue;
        }
        let Some(display) = display_name(field) else {
            continue;
        };
        let _ = projected.insert(display.to_owned(), *value);
    }
    projected
}

/// Sums the extracted stats of every purchased node across all boards.
///
/// Addition per key is commutative, so the traversal order of boards and
/// nodes never affects the result.
#[must_use]
pub fn consolidate_all(inputs: &StatsInputs) -> StatsTotals {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    let mut purchased: u32 = 0;
    for board in inputs.boards() {
        for node in &board.nodes {
            purchased = purchased.saturating_add(1);
            for (name, value) in extract_stats(node) {
                *totals.entry(name).or_insert(0.0) += value;
            }
        }
    }
    StatsTotals::new(totals, purchased)
}

fn display_name(field: &str) -> Option<&'static str> {
    STAT_NAME_TABLE
        .iter()
        .chain(LEGACY_STAT_ALIASES)
        .find(|(raw, _)| *raw == field)
        .map(|(_, display)| *display)
}

/// Pure aggregation system with dirty tracking and a forced re-scan timer.
#[derive(Debug)]
pub struct Aggregation {
    cached: StatsTotals,
    rescan_interval: Duration,
    since_scan: Duration,
    dirty: bool,
}

impl Default for Aggregation {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregation {
    /// Creates an aggregation system with the default re-scan interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rescan_interval(DEFAULT_RESCAN_INTERVAL)
    }

    /// Creates an aggregation system with an explicit re-scan interval.
    #[must_use]
    pub fn with_rescan_interval(rescan_interval: Duration) -> Self {
        Self {
            cached: StatsTotals::default(),
            rescan_interval,
            since_scan: Duration::ZERO,
            dirty: false,
        }
    }

    /// The snapshot most recently accepted by change detection.
    #[must_use]
    pub fn cached_totals(&self) -> &StatsTotals {
        &self.cached
    }

    /// Consumes world events and applied commands to publish stat updates.
    ///
    /// The `inputs` closure is invoked at most once per call and only when
    /// a consolidation actually runs, so callers can defer the (allocating)
    /// world capture until it is needed.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        commands: &[Command],
        inputs: F,
        out: &mut Vec<Event>,
    ) where
        F: FnOnce() -> StatsInputs,
    {
        for event in events {
            match event {
                Event::NodeAllocated { .. }
                | Event::NodeDeallocated { .. }
                | Event::BoardPlaced { .. }
                | Event::BoardRemoved { .. } => self.dirty = true,
                Event::TimeAdvanced { dt } => {
                    self.since_scan = self.since_scan.saturating_add(*dt);
                }
                _ => {}
            }
        }
        for command in commands {
            if matches!(command, Command::RequestStatsRefresh) {
                self.dirty = true;
            }
        }

        let forced = self.since_scan >= self.rescan_interval;
        if !self.dirty && !forced {
            return;
        }
        self.dirty = false;
        self.since_scan = Duration::ZERO;

        let totals = consolidate_all(&inputs());
        if totals.approx_eq(&self.cached, STAT_EPSILON) {
            return;
        }
        let count = totals.purchased_nodes();
        self.cached = totals.clone();
        out.push(Event::StatsUpdated { totals });
        out.push(Event::AllocatedNodesChanged { count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillweave_core::{BoardId, BoardStatsInputs, NodeKind, PurchasedNodeStats};

    fn purchased(id: &str, fields: &[(&str, f64)]) -> PurchasedNodeStats {
        PurchasedNodeStats {
            id: id.to_owned(),
            node_kind: NodeKind::Small,
            node_cost: 1,
            fields: fields
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect(),
        }
    }

    fn inputs_of(nodes: Vec<PurchasedNodeStats>) -> StatsInputs {
        StatsInputs::new(vec![BoardStatsInputs {
            board: BoardId::new(0),
            nodes,
        }])
    }

    #[test]
    fn extraction_projects_canonical_and_legacy_names() {
        let node = purchased(
            "node-a",
            &[
                ("strength", 10.0),
                ("maxLifeIncrease", 12.0),
                ("unknownField", 99.0),
                ("coldDamageIncrease", 0.0),
            ],
        );

        let projected = extract_stats(&node);
        assert_eq!(projected.get("Strength").copied(), Some(10.0));
        assert_eq!(projected.get("Max Health").copied(), Some(12.0));
        assert!(!projected.contains_key("Cold Damage"));
        assert_eq!(projected.len(), 2);
    }

    #[test]
    fn colliding_legacy_fields_replace_rather_than_sum() {
        let node = purchased(
            "node-a",
            &[("critDamage", 15.0), ("criticalStrikeMultiplier", 20.0)],
        );

        let projected = extract_stats(&node);
        assert_eq!(projected.get("Critical Multiplier").copied(), Some(20.0));
    }

    #[test]
    fn consolidation_is_order_independent() {
        let first = purchased("node-a", &[("strength", 5.0), ("fireDamageIncrease", 8.0)]);
        let second = purchased("node-b", &[("strength", 3.0)]);
        let third = purchased("node-c", &[("fireDmg", 4.0)]);

        let forward = consolidate_all(&inputs_of(vec![
            first.clone(),
            second.clone(),
            third.clone(),
        ]));
        let backward = consolidate_all(&inputs_of(vec![third, first, second]));

        assert_eq!(forward, backward);
        assert_eq!(forward.get("Strength"), 8.0);
        assert_eq!(forward.get("Fire Damage"), 12.0);
        assert_eq!(forward.purchased_nodes(), 3);
    }

    #[test]
    fn allocation_events_trigger_a_publish() {
        let mut aggregation = Aggregation::new();
        let mut out = Vec::new();

        aggregation.handle(
            &[Event::NodeAllocated {
                board: BoardId::new(0),
                cell: skillweave_core::CellCoord::new(0, 0),
                node_id: "node-a".to_owned(),
                cost_paid: 1,
            }],
            &[],
            || inputs_of(vec![purchased("node-a", &[("strength", 5.0)])]),
            &mut out,
        );

        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            Event::StatsUpdated { totals } if totals.get("Strength") == 5.0
        ));
        assert!(matches!(&out[1], Event::AllocatedNodesChanged { count: 1 }));
        assert_eq!(aggregation.cached_totals().purchased_nodes(), 1);
    }

    #[test]
    fn unchanged_totals_publish_nothing() {
        let mut aggregation = Aggregation::new();
        let mut out = Vec::new();
        let event = Event::NodeAllocated {
            board: BoardId::new(0),
            cell: skillweave_core::CellCoord::new(0, 0),
            node_id: "node-a".to_owned(),
            cost_paid: 1,
        };

        let state = || inputs_of(vec![purchased("node-a", &[("strength", 5.0)])]);
        aggregation.handle(&[event.clone()], &[], state, &mut out);
        out.clear();

        // A spurious dirty mark over identical world state stays silent.
        aggregation.handle(&[event], &[], state, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn refresh_command_marks_the_cache_dirty() {
        let mut aggregation = Aggregation::new();
        let mut out = Vec::new();

        aggregation.handle(
            &[],
            &[Command::RequestStatsRefresh],
            || inputs_of(vec![purchased("node-a", &[("dex", 7.0)])]),
            &mut out,
        );

        assert!(matches!(
            &out[0],
            Event::StatsUpdated { totals } if totals.get("Dexterity") == 7.0
        ));
    }

    #[test]
    fn elapsed_interval_forces_a_rescan_without_events() {
        let mut aggregation = Aggregation::with_rescan_interval(Duration::from_secs(1));
        let mut out = Vec::new();

        // Time passes but nothing else flows through the event feed; the
        // safety net still notices the out-of-band allocation.
        aggregation.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_millis(600),
            }],
            &[],
            StatsInputs::default,
            &mut out,
        );
        assert!(out.is_empty());

        aggregation.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_millis(600),
            }],
            &[],
            || inputs_of(vec![purchased("node-a", &[("strength", 5.0)])]),
            &mut out,
        );

        assert_eq!(out.len(), 2);
    }

    #[test]
    fn drift_below_epsilon_is_ignored() {
        let mut aggregation = Aggregation::new();
        let mut out = Vec::new();
        let event = Event::NodeAllocated {
            board: BoardId::new(0),
            cell: skillweave_core::CellCoord::new(0, 0),
            node_id: "node-a".to_owned(),
            cost_paid: 1,
        };

        aggregation.handle(
            &[event.clone()],
            &[],
            || inputs_of(vec![purchased("node-a", &[("strength", 5.0)])]),
            &mut out,
        );
        out.clear();

        aggregation.handle(
            &[event],
            &[],
            || inputs_of(vec![purchased("node-a", &[("strength", 5.0005)])]),
            &mut out,
        );
        assert!(out.is_empty());
    }
}
