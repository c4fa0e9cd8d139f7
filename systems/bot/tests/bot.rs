use std::time::Duration;

use skirmish_core::{
    Command, DoorState, MapLayout, SessionId, TilePos, TileSpec, UnitName, UnitSpec,
};
use skirmish_system_action_economy::{self as action_economy, ActionEconomy};
use skirmish_system_bot::{BotDriver, BotOutcome, Config};
use skirmish_world::{self as world, query, World};

struct Harness {
    world: World,
    bots: BotDriver,
    economy: ActionEconomy,
    issued: Vec<Command>,
}

impl Harness {
    fn new(layout: MapLayout) -> Self {
        Self {
            world: World::from_layout(&layout, SessionId::new("room")).expect("valid layout"),
            bots: BotDriver::new(Config::default()),
            economy: ActionEconomy::new(action_economy::Config::default()),
            issued: Vec::new(),
        }
    }

    fn place(&mut self, spec: UnitSpec, at: TilePos) {
        self.submit(Command::PlaceUnit { spec, at });
    }

    fn submit(&mut self, command: Command) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.bots.handle(&events, &self.world, &mut pending);
            self.economy.handle(&events, &self.world, &mut pending);
            self.issued.extend(pending.iter().cloned());
        }
    }

    fn tick(&mut self, millis: u64) {
        self.submit(Command::Tick {
            dt: Duration::from_millis(millis),
        });
    }

    fn count(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.issued.iter().filter(|command| predicate(command)).count()
    }
}

fn orc() -> UnitName {
    UnitName::new("orc")
}

fn is_combat(command: &Command) -> bool {
    matches!(command, Command::StartCombat { .. })
}

fn is_door(command: &Command) -> bool {
    matches!(command, Command::ToggleDoor { .. })
}

fn is_end_turn(command: &Command) -> bool {
    matches!(command, Command::EndTurn { .. })
}

fn door_beside_orc() -> MapLayout {
    MapLayout::open(3, 2).with(TilePos::new(1, 1), TileSpec::door(DoorState::Closed))
}

#[test]
fn aggressive_bot_attacks_once_and_leaves_the_door_alone() {
    let mut harness = Harness::new(door_beside_orc());
    harness.place(UnitSpec::new("orc", 0).autonomous(true), TilePos::new(1, 0));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(2, 0));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.tick(999);
    assert!(harness.issued.is_empty());

    harness.tick(1);

    assert_eq!(
        harness.issued.first(),
        Some(&Command::StartCombat {
            attacker: orc(),
            defender: UnitName::new("hero"),
        })
    );
    assert_eq!(harness.count(is_combat), 1);
    assert_eq!(harness.count(is_door), 0);
    assert_eq!(harness.count(is_end_turn), 1);
    assert_eq!(
        harness.bots.outcomes(),
        &[BotOutcome::Attacked(UnitName::new("hero"))]
    );

    harness.tick(10_000);
    assert_eq!(harness.count(is_combat), 1);
}

#[test]
fn defensive_bot_opens_the_door_first() {
    let mut harness = Harness::new(door_beside_orc());
    harness.place(UnitSpec::new("orc", 0).autonomous(false), TilePos::new(1, 0));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(2, 0));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.tick(1_000);

    assert_eq!(
        harness.issued.first(),
        Some(&Command::ToggleDoor {
            actor: orc(),
            tile: TilePos::new(1, 1),
        })
    );
    assert_eq!(harness.count(is_combat), 0);
    let door = query::grid(&harness.world)
        .tile_at(TilePos::new(1, 1))
        .and_then(|tile| tile.door_state());
    assert_eq!(door, Some(DoorState::Open));
}

#[test]
fn bot_chains_actions_while_counter_allows() {
    let mut harness = Harness::new(MapLayout::open(2, 1));
    harness.place(
        UnitSpec::new("orc", 0).autonomous(true).with_actions(2),
        TilePos::new(0, 0),
    );
    harness.place(UnitSpec::new("hero", 0), TilePos::new(1, 0));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.tick(1_000);
    assert_eq!(harness.count(is_combat), 1);
    assert_eq!(harness.count(is_end_turn), 0);
    assert!(harness.bots.is_scheduled());

    harness.tick(1_000);
    assert_eq!(harness.count(is_combat), 2);
    assert_eq!(harness.count(is_end_turn), 1);

    harness.tick(5_000);
    assert_eq!(harness.count(is_combat), 2);
}

#[test]
fn bot_without_targets_stops_without_ending_turn() {
    let mut harness = Harness::new(MapLayout::open(3, 3));
    harness.place(UnitSpec::new("orc", 1).autonomous(true), TilePos::new(1, 1));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.tick(1_000);

    assert!(harness.issued.is_empty());
    assert_eq!(harness.bots.outcomes(), &[BotOutcome::NoLegalTarget]);
    assert!(!harness.bots.is_scheduled());
    assert!(query::active_turn(&harness.world).is_some());
}

#[test]
fn stale_timer_after_turn_end_does_nothing() {
    let mut harness = Harness::new(MapLayout::open(2, 1));
    harness.place(UnitSpec::new("orc", 0).autonomous(true), TilePos::new(0, 0));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(1, 0));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.submit(Command::EndTurn { unit: orc() });
    harness.submit(Command::BeginTurn {
        unit: UnitName::new("hero"),
    });
    harness.issued.clear();
    harness.tick(2_000);

    assert_eq!(harness.count(is_combat), 0);
    assert!(harness.bots.outcomes().is_empty());
}

#[test]
fn removing_the_bot_cancels_its_evaluation() {
    let mut harness = Harness::new(MapLayout::open(2, 1));
    harness.place(UnitSpec::new("orc", 0).autonomous(true), TilePos::new(0, 0));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(1, 0));

    harness.submit(Command::BeginTurn { unit: orc() });
    harness.submit(Command::RemoveUnit { unit: orc() });
    harness.tick(2_000);

    assert!(harness.bots.outcomes().is_empty());
    assert!(!harness.bots.is_scheduled());
}

#[test]
fn shutdown_cancels_pending_evaluation() {
    let mut harness = Harness::new(MapLayout::open(2, 1));
    harness.place(UnitSpec::new("orc", 0).autonomous(true), TilePos::new(0, 0));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(1, 0));
    harness.submit(Command::BeginTurn { unit: orc() });
    assert!(harness.bots.is_scheduled());

    harness.bots.shutdown();
    harness.tick(2_000);

    assert_eq!(harness.count(is_combat), 0);
    assert!(query::active_turn(&harness.world).is_some());
}

#[test]
fn human_turns_are_not_driven() {
    let mut harness = Harness::new(MapLayout::open(2, 1));
    harness.place(UnitSpec::new("hero", 0), TilePos::new(0, 0));
    harness.place(UnitSpec::new("orc", 0).autonomous(true), TilePos::new(1, 0));

    harness.submit(Command::BeginTurn {
        unit: UnitName::new("hero"),
    });
    harness.tick(5_000);

    assert!(!harness.bots.is_scheduled());
    assert!(harness.bots.outcomes().is_empty());
}
