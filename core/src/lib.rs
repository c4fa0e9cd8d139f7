#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish tactics engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to. Systems consume event streams, query the world read-only, and
//! respond exclusively with new command batches. Outbound traffic for remote
//! peers is expressed as [`TransportMessage`] values.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Places a unit on the provided tile at match start.
    PlaceUnit {
        /// Description of the unit to create.
        spec: UnitSpec,
        /// Tile the unit should occupy.
        at: TilePos,
    },
    /// Removes a unit and frees the tile it occupies.
    RemoveUnit {
        /// Unit that leaves the match.
        unit: UnitName,
    },
    /// Hands the turn to the provided unit, resetting its per-turn budgets.
    BeginTurn {
        /// Unit that becomes the acting unit.
        unit: UnitName,
    },
    /// Concludes the acting unit's turn.
    EndTurn {
        /// Unit whose turn should end.
        unit: UnitName,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Toggles the acting unit's action between available and selected.
    ActivateAction {
        /// Unit requesting the toggle.
        unit: UnitName,
    },
    /// Moves a unit along the cheapest route to the target tile.
    MoveUnit {
        /// Unit that should move.
        unit: UnitName,
        /// Destination tile.
        target: TilePos,
    },
    /// Highlights the route a move to the target tile would take.
    PreviewPath {
        /// Unit whose route is previewed.
        unit: UnitName,
        /// Hovered destination tile.
        target: TilePos,
    },
    /// Opens or closes an adjacent door as the acting unit's action.
    ToggleDoor {
        /// Unit performing the interaction.
        actor: UnitName,
        /// Door tile to flip.
        tile: TilePos,
    },
    /// Starts combat against an adjacent unit as the acting unit's action.
    StartCombat {
        /// Unit initiating combat.
        attacker: UnitName,
        /// Unit being attacked.
        defender: UnitName,
    },
    /// Marks whether a modal choice awaits the acting player.
    SetPendingChoice {
        /// Indicates whether a modal choice is open.
        pending: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a unit was placed onto the grid.
    UnitPlaced {
        /// Unit that was placed.
        unit: UnitName,
        /// Tile the unit occupies.
        at: TilePos,
    },
    /// Confirms that a unit left the match.
    UnitRemoved {
        /// Unit that was removed.
        unit: UnitName,
    },
    /// Announces that a unit's turn began.
    TurnStarted {
        /// Acting unit.
        unit: UnitName,
        /// Identifier of the turn.
        turn: TurnId,
    },
    /// Announces that a unit's turn concluded.
    TurnEnded {
        /// Unit whose turn ended.
        unit: UnitName,
        /// Identifier of the turn that ended.
        turn: TurnId,
        /// Room or session the turn belongs to.
        session: SessionId,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports the acting unit's action state after a change.
    ActionStateChanged {
        /// Acting unit.
        unit: UnitName,
        /// State after the change.
        state: ActionState,
        /// Actions left this turn after the change.
        remaining: u32,
    },
    /// Confirms that a unit moved along the provided route.
    UnitMoved {
        /// Unit that moved.
        unit: UnitName,
        /// Ordered route from the origin tile to the destination, inclusive.
        path: Vec<TilePos>,
        /// Movement points spent on the route.
        cost: u32,
    },
    /// Confirms that a door flipped state.
    DoorToggled {
        /// Door tile that flipped.
        tile: TilePos,
        /// State the door is now in.
        state: DoorState,
    },
    /// Confirms that an interaction turned into combat.
    CombatStarted {
        /// Unit that initiated combat.
        attacker: UnitName,
        /// Unit that was attacked.
        defender: UnitName,
    },
    /// Reports the acting unit's freshly computed movement options.
    MovementOptionsRecalculated {
        /// Acting unit.
        unit: UnitName,
        /// Turn the options belong to.
        turn: TurnId,
        /// Tiles the unit may end its move on, in expansion order.
        reachable: Vec<TilePos>,
    },
}

/// Outbound notifications carried to remote peers by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum TransportMessage {
    /// A door changed state.
    #[serde(rename = "toggle door")]
    ToggleDoor {
        /// Door tile that flipped.
        tile: TilePos,
    },
    /// Two units entered combat.
    #[serde(rename = "start combat")]
    StartCombat {
        /// Unit that initiated combat.
        attacker: UnitName,
        /// Unit that was attacked.
        defender: UnitName,
    },
    /// A turn concluded.
    #[serde(rename = "end turn")]
    EndTurn {
        /// Room or session the turn belongs to.
        session: SessionId,
    },
    /// A unit moved and peers should animate the route.
    #[serde(rename = "animate move")]
    AnimateMove {
        /// Unit that moved.
        unit: UnitName,
        /// Ordered route to animate.
        path: Vec<TilePos>,
    },
}

/// Location of a single tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    x: u32,
    y: u32,
}

impl TilePos {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TilePos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Reports whether the two tiles share an edge.
    #[must_use]
    pub fn is_adjacent(self, other: TilePos) -> bool {
        self.manhattan_distance(other) == 1
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Terrain categories a tile may belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Open ground.
    Empty,
    /// Solid wall that can never be entered.
    Wall,
    /// Door that can be opened and closed.
    Door,
    /// Shallow water that is slow to wade through.
    Water,
    /// Ice that costs nothing to cross.
    Ice,
}

/// Open or closed state of a door tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    /// The door can be walked through.
    Open,
    /// The door blocks movement.
    Closed,
}

impl DoorState {
    /// Returns the opposite door state.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

/// Movement points required to enter a tile.
///
/// Negative values mark the tile as impassable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraversalCost(i32);

impl TraversalCost {
    /// Cost of a tile that cannot currently be entered.
    pub const IMPASSABLE: Self = Self(-1);
    /// Cost of entering ice.
    pub const ICE: Self = Self(0);
    /// Cost of entering open ground.
    pub const EMPTY: Self = Self(1);
    /// Cost of entering water.
    pub const WATER: Self = Self(2);
    /// Cost of walking through an open door.
    pub const OPEN_DOOR: Self = Self(1);

    /// Raw signed cost value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Cost in movement points, or `None` when the tile is impassable.
    #[must_use]
    pub const fn points(&self) -> Option<u32> {
        if self.0 < 0 {
            None
        } else {
            Some(self.0 as u32)
        }
    }

    /// Derives the cost of a tile from its kind and door state.
    ///
    /// Doors without an explicit state are treated as closed.
    #[must_use]
    pub const fn for_tile(kind: TileKind, door: Option<DoorState>) -> Self {
        match kind {
            TileKind::Empty => Self::EMPTY,
            TileKind::Wall => Self::IMPASSABLE,
            TileKind::Water => Self::WATER,
            TileKind::Ice => Self::ICE,
            TileKind::Door => match door {
                Some(DoorState::Open) => Self::OPEN_DOOR,
                _ => Self::IMPASSABLE,
            },
        }
    }
}

/// Item resting on a tile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// Marks a spawn point. Units standing here are not interaction targets.
    SpawnMarker,
    /// Any other pickup, identified by name.
    Loot {
        /// Display name of the pickup.
        name: String,
    },
}

/// Name that uniquely identifies a unit across the whole system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitName(String);

impl UnitName {
    /// Creates a unit name from the provided string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Team affiliation. Units on the same team never fight each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Team(u32);

impl Team {
    /// Creates a team identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric team identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of the room or session a match runs in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrows the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Monotonic identifier assigned to every turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(u64);

impl TurnId {
    /// Creates a turn identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Identifier of the following turn.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Availability of the acting unit's non-movement action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionState {
    /// The action can be selected.
    Available,
    /// The action is armed; the next interaction consumes it.
    Selected,
    /// No action remains this turn.
    Consumed,
}

impl ActionState {
    /// Numeric encoding used on the wire: 0, 1 and 2 respectively.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Available => 0,
            Self::Selected => 1,
            Self::Consumed => 2,
        }
    }
}

/// Per-turn action counter of the acting unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionBudget {
    state: ActionState,
    remaining: u32,
}

impl ActionBudget {
    /// Grants the provided number of actions for a fresh turn.
    #[must_use]
    pub const fn new(actions_per_turn: u32) -> Self {
        let state = if actions_per_turn == 0 {
            ActionState::Consumed
        } else {
            ActionState::Available
        };
        Self {
            state,
            remaining: actions_per_turn,
        }
    }

    /// Current action state.
    #[must_use]
    pub const fn state(&self) -> ActionState {
        self.state
    }

    /// Actions left this turn.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Toggles between available and selected.
    ///
    /// Returns `false` without changing anything once the budget is consumed.
    pub fn activate(&mut self) -> bool {
        self.state = match self.state {
            ActionState::Available => ActionState::Selected,
            ActionState::Selected => ActionState::Available,
            ActionState::Consumed => return false,
        };
        true
    }

    /// Spends one action and returns how many remain.
    ///
    /// The state becomes [`ActionState::Consumed`] when the last action is
    /// spent and falls back to [`ActionState::Available`] otherwise.
    pub fn consume(&mut self) -> Option<u32> {
        if self.state == ActionState::Consumed || self.remaining == 0 {
            return None;
        }

        self.remaining -= 1;
        self.state = if self.remaining == 0 {
            ActionState::Consumed
        } else {
            ActionState::Available
        };
        Some(self.remaining)
    }
}

/// Description of a unit used when placing it onto the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unique name of the unit.
    pub name: UnitName,
    /// Optional team affiliation.
    pub team: Option<Team>,
    /// Movement points granted at the start of each turn.
    pub movement_points: u32,
    /// Actions granted at the start of each turn.
    pub actions_per_turn: u32,
    /// Indicates whether the decision loop drives this unit.
    pub autonomous: bool,
    /// Indicates whether a bot prefers attacking over opening doors.
    pub aggressive: bool,
}

impl UnitSpec {
    /// Describes a human-controlled unit with a single action per turn.
    #[must_use]
    pub fn new(name: impl Into<String>, movement_points: u32) -> Self {
        Self {
            name: UnitName::new(name),
            team: None,
            movement_points,
            actions_per_turn: 1,
            autonomous: false,
            aggressive: false,
        }
    }

    /// Hands the unit to the autonomous decision loop.
    #[must_use]
    pub fn autonomous(mut self, aggressive: bool) -> Self {
        self.autonomous = true;
        self.aggressive = aggressive;
        self
    }

    /// Assigns the unit to a team.
    #[must_use]
    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    /// Overrides the number of actions granted per turn.
    #[must_use]
    pub fn with_actions(mut self, actions_per_turn: u32) -> Self {
        self.actions_per_turn = actions_per_turn;
        self
    }
}

/// Static description of a single tile inside a [`MapLayout`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    /// Terrain of the tile.
    pub kind: TileKind,
    /// Door state, meaningful only for door tiles.
    pub door: Option<DoorState>,
    /// Item resting on the tile, if any.
    pub item: Option<Item>,
}

impl TileSpec {
    /// Describes a tile of the provided kind with no item.
    ///
    /// Doors start closed.
    #[must_use]
    pub const fn new(kind: TileKind) -> Self {
        let door = match kind {
            TileKind::Door => Some(DoorState::Closed),
            _ => None,
        };
        Self {
            kind,
            door,
            item: None,
        }
    }

    /// Describes a door tile in the provided state.
    #[must_use]
    pub const fn door(state: DoorState) -> Self {
        Self {
            kind: TileKind::Door,
            door: Some(state),
            item: None,
        }
    }

    /// Attaches an item to the tile.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }
}

/// Map snapshot supplied by the external map loader, stored row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapLayout {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Tile descriptions in row-major order.
    pub tiles: Vec<TileSpec>,
}

impl MapLayout {
    /// Creates a layout where every tile is open ground.
    #[must_use]
    pub fn open(columns: u32, rows: u32) -> Self {
        let count = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![TileSpec::new(TileKind::Empty); count],
        }
    }

    /// Replaces the description of the tile at the provided position.
    ///
    /// Positions outside the layout are ignored.
    pub fn set(&mut self, pos: TilePos, spec: TileSpec) {
        if pos.x() >= self.columns || pos.y() >= self.rows {
            return;
        }
        let index = pos.y() as usize * self.columns as usize + pos.x() as usize;
        if let Some(slot) = self.tiles.get_mut(index) {
            *slot = spec;
        }
    }

    /// Builder-style variant of [`MapLayout::set`].
    #[must_use]
    pub fn with(mut self, pos: TilePos, spec: TileSpec) -> Self {
        self.set(pos, spec);
        self
    }
}
