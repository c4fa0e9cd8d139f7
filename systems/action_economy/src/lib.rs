#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that ends turns once the acting unit has nothing left to do.
//!
//! The system watches the world's `MovementOptionsRecalculated` events and
//! requests `EndTurn` when the acting unit can no longer move and either has
//! spent its action or has nothing adjacent to use it on. An optional countdown
//! ends turns that run past a configured duration.

mod clock;

use std::time::Duration;

use skirmish_core::{ActionBudget, ActionState, Command, Event, TilePos, TurnId, UnitName};
use skirmish_world::{query, Grid, Unit, World};
use tracing::debug;

use crate::clock::TurnClock;

/// Configuration parameters required to construct the action economy system.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    turn_duration: Option<Duration>,
}

impl Config {
    /// Creates a configuration. `None` disables the turn countdown.
    #[must_use]
    pub const fn new(turn_duration: Option<Duration>) -> Self {
        Self { turn_duration }
    }
}

/// Requests the end of exhausted or expired turns.
#[derive(Debug)]
pub struct ActionEconomy {
    clock: TurnClock,
    last_requested: Option<TurnId>,
}

impl ActionEconomy {
    /// Creates the system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            clock: TurnClock::new(config.turn_duration),
            last_requested: None,
        }
    }

    /// Consumes world events and emits `EndTurn` commands.
    ///
    /// At most one `EndTurn` is requested per turn, however many times the
    /// movement options are recalculated afterwards.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TurnStarted { unit, turn } => self.clock.start(unit, *turn),
                Event::TurnEnded { .. } => self.clock.stop(),
                Event::TimeAdvanced { dt } => {
                    for expired in self.clock.advance(*dt) {
                        if active_actions(world, &expired.unit, expired.turn).is_some() {
                            debug!(unit = %expired.unit, "turn countdown expired");
                            self.request_end(&expired.unit, expired.turn, out);
                        }
                    }
                }
                Event::MovementOptionsRecalculated {
                    unit,
                    turn,
                    reachable,
                } => self.evaluate(world, unit, *turn, reachable, out),
                _ => {}
            }
        }
    }

    /// Reports whether a turn countdown is currently running.
    #[must_use]
    pub fn countdown_armed(&self) -> bool {
        self.clock.is_armed()
    }

    /// Cancels the running countdown. Further time advances fire nothing
    /// until the next turn starts.
    pub fn shutdown(&mut self) {
        self.clock.shutdown();
    }

    fn evaluate(
        &mut self,
        world: &World,
        unit: &UnitName,
        turn: TurnId,
        reachable: &[TilePos],
        out: &mut Vec<Command>,
    ) {
        let Some((actions, pending_choice)) = active_actions(world, unit, turn) else {
            return;
        };
        let Some(position) = query::unit(world, unit).map(Unit::position) else {
            return;
        };

        if !should_end_turn(query::grid(world), position, reachable, actions) {
            return;
        }
        if pending_choice {
            debug!(%unit, "deferring automatic end of turn while a choice is pending");
            return;
        }

        debug!(%unit, state = ?actions.state(), "acting unit is out of options");
        self.request_end(unit, turn, out);
    }

    fn request_end(&mut self, unit: &UnitName, turn: TurnId, out: &mut Vec<Command>) {
        if self.last_requested == Some(turn) {
            return;
        }
        self.last_requested = Some(turn);
        out.push(Command::EndTurn { unit: unit.clone() });
    }
}

fn active_actions(world: &World, unit: &UnitName, turn: TurnId) -> Option<(ActionBudget, bool)> {
    query::active_turn(world)
        .filter(|active| active.turn == turn && active.unit == unit)
        .map(|active| (active.actions, active.pending_choice))
}

/// Decides whether a unit standing on `position` has exhausted its turn.
///
/// The unit must be unable to leave its tile. It is then done when its action
/// is consumed, or when no neighbor offers an interaction target.
#[must_use]
pub fn should_end_turn(
    grid: &Grid,
    position: TilePos,
    reachable: &[TilePos],
    actions: ActionBudget,
) -> bool {
    let stuck = matches!(reachable, [only] if *only == position);
    if !stuck {
        return false;
    }

    match actions.state() {
        ActionState::Consumed => true,
        ActionState::Available | ActionState::Selected => !has_interaction_target(grid, position),
    }
}

/// Reports whether any neighbor of `position` holds a door or a unit.
///
/// Units standing on a spawn marker are not targets.
#[must_use]
pub fn has_interaction_target(grid: &Grid, position: TilePos) -> bool {
    grid.neighbors(position)
        .any(|tile| tile.is_door() || (tile.occupant().is_some() && !tile.is_spawn()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{DoorState, Item, MapLayout, SessionId, TileKind, TileSpec, UnitSpec};
    use skirmish_world as world;

    fn grid_of(layout: MapLayout, units: &[(&str, TilePos)]) -> Grid {
        let mut world = World::from_layout(&layout, SessionId::new("t")).expect("valid layout");
        let mut events = Vec::new();
        for (name, at) in units {
            world::apply(
                &mut world,
                Command::PlaceUnit {
                    spec: UnitSpec::new(*name, 0),
                    at: *at,
                },
                &mut events,
            );
        }
        query::grid(&world).clone()
    }

    fn consumed() -> ActionBudget {
        let mut budget = ActionBudget::new(1);
        let _ = budget.consume();
        budget
    }

    #[test]
    fn mobile_unit_never_ends_turn() {
        let grid = grid_of(MapLayout::open(2, 1), &[("hero", TilePos::new(0, 0))]);
        let reachable = [TilePos::new(0, 0), TilePos::new(1, 0)];

        assert!(!should_end_turn(&grid, TilePos::new(0, 0), &reachable, consumed()));
        assert!(!should_end_turn(
            &grid,
            TilePos::new(0, 0),
            &reachable,
            ActionBudget::new(1)
        ));
    }

    #[test]
    fn stuck_unit_with_consumed_action_ends_turn_even_beside_targets() {
        let layout =
            MapLayout::open(2, 1).with(TilePos::new(1, 0), TileSpec::door(DoorState::Closed));
        let grid = grid_of(layout, &[("hero", TilePos::new(0, 0))]);
        let reachable = [TilePos::new(0, 0)];

        assert!(should_end_turn(&grid, TilePos::new(0, 0), &reachable, consumed()));
        assert!(!should_end_turn(
            &grid,
            TilePos::new(0, 0),
            &reachable,
            ActionBudget::new(1)
        ));
    }

    #[test]
    fn stuck_unit_without_targets_ends_turn_in_any_state() {
        let layout = MapLayout::open(2, 1).with(TilePos::new(1, 0), TileSpec::new(TileKind::Wall));
        let grid = grid_of(layout, &[("hero", TilePos::new(0, 0))]);
        let reachable = [TilePos::new(0, 0)];

        let mut selected = ActionBudget::new(1);
        assert!(selected.activate());

        assert!(should_end_turn(
            &grid,
            TilePos::new(0, 0),
            &reachable,
            ActionBudget::new(1)
        ));
        assert!(should_end_turn(&grid, TilePos::new(0, 0), &reachable, selected));
    }

    #[test]
    fn neighbors_on_spawn_markers_are_not_targets() {
        let layout = MapLayout::open(3, 1).with(
            TilePos::new(1, 0),
            TileSpec::new(TileKind::Empty).with_item(Item::SpawnMarker),
        );
        let grid = grid_of(
            layout,
            &[("hero", TilePos::new(0, 0)), ("guard", TilePos::new(1, 0))],
        );
        assert!(!has_interaction_target(&grid, TilePos::new(0, 0)));

        let grid = grid_of(
            MapLayout::open(3, 1),
            &[("hero", TilePos::new(0, 0)), ("guard", TilePos::new(1, 0))],
        );
        assert!(has_interaction_target(&grid, TilePos::new(0, 0)));
    }

    #[test]
    fn open_doors_still_count_as_targets() {
        let layout =
            MapLayout::open(2, 1).with(TilePos::new(1, 0), TileSpec::door(DoorState::Open));
        let grid = grid_of(layout, &[("hero", TilePos::new(0, 0))]);

        assert!(has_interaction_target(&grid, TilePos::new(0, 0)));
    }
}
