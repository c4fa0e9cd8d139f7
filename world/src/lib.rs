#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skirmish.
//!
//! The world owns the tile grid, the units standing on it, and the acting
//! unit's turn state. Every mutation flows through [`apply`]; illegal requests
//! are ignored without emitting events.

mod grid;
mod reachability;
mod routing;

use std::time::Duration;

use skirmish_core::{
    ActionBudget, ActionState, Command, Event, MapLayout, SessionId, Team, TilePos, TurnId,
    UnitName, UnitSpec,
};
use tracing::debug;

pub use grid::{Grid, LayoutError, Tile};
pub use reachability::{reachable_tiles, SearchMode};
pub use routing::{path_cost, shortest_path};

/// A unit placed on the grid, human or bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    name: UnitName,
    team: Option<Team>,
    position: TilePos,
    movement_points: u32,
    movement_budget: u32,
    actions_per_turn: u32,
    autonomous: bool,
    aggressive: bool,
}

impl Unit {
    fn from_spec(spec: UnitSpec, position: TilePos) -> Self {
        Self {
            name: spec.name,
            team: spec.team,
            position,
            movement_points: spec.movement_points,
            movement_budget: spec.movement_points,
            actions_per_turn: spec.actions_per_turn,
            autonomous: spec.autonomous,
            aggressive: spec.aggressive,
        }
    }

    /// Unique name of the unit.
    #[must_use]
    pub fn name(&self) -> &UnitName {
        &self.name
    }

    /// Team affiliation, if any.
    #[must_use]
    pub const fn team(&self) -> Option<Team> {
        self.team
    }

    /// Tile the unit stands on.
    #[must_use]
    pub const fn position(&self) -> TilePos {
        self.position
    }

    /// Movement points left this turn.
    #[must_use]
    pub const fn movement_budget(&self) -> u32 {
        self.movement_budget
    }

    /// Reports whether the decision loop drives this unit.
    #[must_use]
    pub const fn is_autonomous(&self) -> bool {
        self.autonomous
    }

    /// Reports whether a bot prefers attacking over opening doors.
    #[must_use]
    pub const fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Reports whether both units belong to the same team.
    #[must_use]
    pub fn is_ally_of(&self, other: &Unit) -> bool {
        matches!((self.team, other.team), (Some(ours), Some(theirs)) if ours == theirs)
    }
}

#[derive(Clone, Debug)]
struct TurnState {
    id: TurnId,
    unit: UnitName,
    actions: ActionBudget,
}

/// Represents the authoritative Skirmish world state.
#[derive(Debug)]
pub struct World {
    session: SessionId,
    grid: Grid,
    units: Vec<Unit>,
    turn: Option<TurnState>,
    last_turn: TurnId,
    pending_choice: bool,
    elapsed: Duration,
}

impl World {
    /// Creates a world from an already-validated map snapshot.
    pub fn from_layout(layout: &MapLayout, session: SessionId) -> Result<Self, LayoutError> {
        Ok(Self {
            session,
            grid: Grid::from_layout(layout)?,
            units: Vec::new(),
            turn: None,
            last_turn: TurnId::new(0),
            pending_choice: false,
            elapsed: Duration::ZERO,
        })
    }

    fn unit_index(&self, name: &UnitName) -> Option<usize> {
        self.units.iter().position(|unit| &unit.name == name)
    }

    fn unit(&self, name: &UnitName) -> Option<&Unit> {
        self.units.iter().find(|unit| &unit.name == name)
    }

    fn is_acting(&self, name: &UnitName) -> bool {
        self.turn.as_ref().is_some_and(|turn| &turn.unit == name)
    }

    fn place_unit(&mut self, spec: UnitSpec, at: TilePos, out_events: &mut Vec<Event>) {
        if self.unit(&spec.name).is_some() {
            debug!(unit = %spec.name, "ignoring placement of duplicate unit name");
            return;
        }

        let open = self
            .grid
            .tile_at(at)
            .is_some_and(|tile| tile.is_traversable() && tile.occupant().is_none());
        if !open {
            debug!(unit = %spec.name, tile = %at, "ignoring placement onto unavailable tile");
            return;
        }

        if self.grid.set_occupancy(&spec.name, None, at) {
            out_events.push(Event::UnitPlaced {
                unit: spec.name.clone(),
                at,
            });
            self.units.push(Unit::from_spec(spec, at));
        }
    }

    fn remove_unit(&mut self, name: &UnitName, out_events: &mut Vec<Event>) {
        let Some(index) = self.unit_index(name) else {
            return;
        };

        if self.is_acting(name) {
            self.end_turn(name, out_events);
        }

        let unit = self.units.remove(index);
        self.grid.vacate(unit.position);
        out_events.push(Event::UnitRemoved { unit: unit.name });
    }

    fn begin_turn(&mut self, name: &UnitName, out_events: &mut Vec<Event>) {
        if let Some(turn) = &self.turn {
            debug!(
                unit = %name,
                acting = %turn.unit,
                "ignoring turn start while another turn is active"
            );
            return;
        }
        let Some(index) = self.unit_index(name) else {
            return;
        };

        let unit = &mut self.units[index];
        unit.movement_budget = unit.movement_points;
        let actions = ActionBudget::new(unit.actions_per_turn);

        let id = self.last_turn.next();
        self.last_turn = id;
        self.pending_choice = false;
        self.turn = Some(TurnState {
            id,
            unit: name.clone(),
            actions,
        });

        out_events.push(Event::TurnStarted {
            unit: name.clone(),
            turn: id,
        });
        out_events.push(Event::ActionStateChanged {
            unit: name.clone(),
            state: actions.state(),
            remaining: actions.remaining(),
        });
        self.refresh_movement_options(out_events);
    }

    fn end_turn(&mut self, name: &UnitName, out_events: &mut Vec<Event>) {
        if !self.is_acting(name) {
            debug!(unit = %name, "ignoring end of turn for a unit that is not acting");
            return;
        }
        let Some(turn) = self.turn.take() else {
            return;
        };

        self.pending_choice = false;
        self.grid.mark_reachable(&[]);
        self.grid.mark_highlighted(&[]);
        out_events.push(Event::TurnEnded {
            unit: turn.unit,
            turn: turn.id,
            session: self.session.clone(),
        });
    }

    fn activate_action(&mut self, name: &UnitName, out_events: &mut Vec<Event>) {
        let Some(turn) = self.turn.as_mut().filter(|turn| &turn.unit == name) else {
            debug!(unit = %name, "ignoring action toggle outside the unit's turn");
            return;
        };

        if !turn.actions.activate() {
            debug!(unit = %name, "ignoring action toggle after the action was consumed");
            return;
        }

        out_events.push(Event::ActionStateChanged {
            unit: name.clone(),
            state: turn.actions.state(),
            remaining: turn.actions.remaining(),
        });
        self.refresh_movement_options(out_events);
    }

    fn move_unit(&mut self, name: &UnitName, target: TilePos, out_events: &mut Vec<Event>) {
        if !self.is_acting(name) {
            debug!(unit = %name, "ignoring move outside the unit's turn");
            return;
        }
        let Some(index) = self.unit_index(name) else {
            return;
        };
        let from = self.units[index].position;
        let budget = self.units[index].movement_budget;
        if from == target {
            return;
        }

        let reachable = reachable_tiles(&self.grid, name, budget, SearchMode::Real);
        if !reachable.contains(&target) {
            debug!(unit = %name, tile = %target, "ignoring move outside the reachable set");
            return;
        }

        let path = shortest_path(&self.grid, name, target);
        let Some(cost) = path_cost(&self.grid, &path).filter(|_| !path.is_empty()) else {
            return;
        };
        if cost > budget {
            return;
        }

        if !self.grid.set_occupancy(name, Some(from), target) {
            return;
        }
        let unit = &mut self.units[index];
        unit.position = target;
        unit.movement_budget = budget - cost;
        self.grid.mark_highlighted(&[]);

        out_events.push(Event::UnitMoved {
            unit: name.clone(),
            path,
            cost,
        });
        self.refresh_movement_options(out_events);
    }

    fn preview_path(&mut self, name: &UnitName, target: TilePos) {
        if !self.is_acting(name) {
            return;
        }
        let Some(unit) = self.unit(name) else {
            return;
        };

        let reachable = reachable_tiles(&self.grid, name, unit.movement_budget, SearchMode::Real);
        let path = if reachable.contains(&target) {
            shortest_path(&self.grid, name, target)
        } else {
            Vec::new()
        };
        self.grid.mark_highlighted(&path);
    }

    fn toggle_door(&mut self, actor: &UnitName, tile: TilePos, out_events: &mut Vec<Event>) {
        let Some(position) = self.authorize_interaction(actor) else {
            return;
        };

        let is_free_door = self
            .grid
            .tile_at(tile)
            .is_some_and(|door| door.is_door() && door.occupant().is_none());
        if !position.is_adjacent(tile) || !is_free_door {
            debug!(unit = %actor, %tile, "ignoring toggle of a non-adjacent or blocked door");
            return;
        }

        let Some(state) = self.grid.toggle_door(tile) else {
            return;
        };
        out_events.push(Event::DoorToggled { tile, state });
        self.consume_action(actor, out_events);
    }

    fn start_combat(
        &mut self,
        attacker: &UnitName,
        defender: &UnitName,
        out_events: &mut Vec<Event>,
    ) {
        let Some(position) = self.authorize_interaction(attacker) else {
            return;
        };
        let (Some(attacking), Some(defending)) = (self.unit(attacker), self.unit(defender)) else {
            return;
        };

        if attacker == defender || !position.is_adjacent(defending.position) {
            debug!(%attacker, %defender, "ignoring combat against a unit that is not adjacent");
            return;
        }
        if attacking.is_ally_of(defending) {
            debug!(%attacker, %defender, "ignoring combat between team mates");
            return;
        }

        out_events.push(Event::CombatStarted {
            attacker: attacker.clone(),
            defender: defender.clone(),
        });
        self.consume_action(attacker, out_events);
    }

    /// Returns the actor's position when it may perform an interaction now.
    ///
    /// Human units must have selected their action first; bots interact
    /// directly while actions remain.
    fn authorize_interaction(&self, actor: &UnitName) -> Option<TilePos> {
        let turn = self.turn.as_ref().filter(|turn| &turn.unit == actor)?;
        let unit = self.unit(actor)?;

        let state = turn.actions.state();
        let allowed = if unit.autonomous {
            turn.actions.remaining() > 0 && state != ActionState::Consumed
        } else {
            state == ActionState::Selected
        };
        if !allowed {
            debug!(unit = %actor, ?state, "ignoring interaction without an available action");
            return None;
        }

        Some(unit.position)
    }

    fn consume_action(&mut self, actor: &UnitName, out_events: &mut Vec<Event>) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if turn.actions.consume().is_none() {
            return;
        }

        out_events.push(Event::ActionStateChanged {
            unit: actor.clone(),
            state: turn.actions.state(),
            remaining: turn.actions.remaining(),
        });
        self.refresh_movement_options(out_events);
    }

    fn set_pending_choice(&mut self, pending: bool, out_events: &mut Vec<Event>) {
        let was_pending = self.pending_choice;
        self.pending_choice = pending;
        if was_pending && !pending {
            self.refresh_movement_options(out_events);
        }
    }

    fn refresh_movement_options(&mut self, out_events: &mut Vec<Event>) {
        let Some(turn) = &self.turn else {
            return;
        };
        let Some(unit) = self.unit(&turn.unit) else {
            return;
        };

        let reachable =
            reachable_tiles(&self.grid, &unit.name, unit.movement_budget, SearchMode::Real);
        let event = Event::MovementOptionsRecalculated {
            unit: turn.unit.clone(),
            turn: turn.id,
            reachable: reachable.clone(),
        };
        self.grid.mark_reachable(&reachable);
        out_events.push(event);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::PlaceUnit { spec, at } => world.place_unit(spec, at, out_events),
        Command::RemoveUnit { unit } => world.remove_unit(&unit, out_events),
        Command::BeginTurn { unit } => world.begin_turn(&unit, out_events),
        Command::EndTurn { unit } => world.end_turn(&unit, out_events),
        Command::Tick { dt } => {
            world.elapsed = world.elapsed.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::ActivateAction { unit } => world.activate_action(&unit, out_events),
        Command::MoveUnit { unit, target } => world.move_unit(&unit, target, out_events),
        Command::PreviewPath { unit, target } => world.preview_path(&unit, target),
        Command::ToggleDoor { actor, tile } => world.toggle_door(&actor, tile, out_events),
        Command::StartCombat { attacker, defender } => {
            world.start_combat(&attacker, &defender, out_events)
        }
        Command::SetPendingChoice { pending } => world.set_pending_choice(pending, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use skirmish_core::{ActionBudget, SessionId, TilePos, TurnId, UnitName};

    use super::{reachable_tiles, shortest_path, Grid, SearchMode, Unit, World};

    /// Read-only view of the acting unit's turn.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TurnView<'a> {
        /// Acting unit.
        pub unit: &'a UnitName,
        /// Identifier of the active turn.
        pub turn: TurnId,
        /// Action counter of the acting unit.
        pub actions: ActionBudget,
        /// Indicates whether a modal choice awaits the acting player.
        pub pending_choice: bool,
    }

    /// Room or session the world belongs to.
    #[must_use]
    pub fn session(world: &World) -> &SessionId {
        &world.session
    }

    /// Provides read-only access to the tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Units in placement order.
    #[must_use]
    pub fn units(world: &World) -> &[Unit] {
        &world.units
    }

    /// Looks a unit up by name.
    #[must_use]
    pub fn unit<'a>(world: &'a World, name: &UnitName) -> Option<&'a Unit> {
        world.unit(name)
    }

    /// The acting unit's turn, if one is active.
    #[must_use]
    pub fn active_turn(world: &World) -> Option<TurnView<'_>> {
        world.turn.as_ref().map(|turn| TurnView {
            unit: &turn.unit,
            turn: turn.id,
            actions: turn.actions,
            pending_choice: world.pending_choice,
        })
    }

    /// Total simulated time the world has observed.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Tiles `name` may reach with its remaining movement budget.
    #[must_use]
    pub fn reachable_for(world: &World, name: &UnitName, mode: SearchMode) -> Vec<TilePos> {
        world.unit(name).map_or_else(Vec::new, |unit| {
            reachable_tiles(&world.grid, name, unit.movement_budget, mode)
        })
    }

    /// Cheapest route from `name`'s tile to `target`, empty when none exists.
    #[must_use]
    pub fn route(world: &World, name: &UnitName, target: TilePos) -> Vec<TilePos> {
        shortest_path(&world.grid, name, target)
    }
}
