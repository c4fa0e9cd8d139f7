//! Tile lattice and occupancy bookkeeping owned by the world.

use skirmish_core::{DoorState, Item, MapLayout, TileKind, TilePos, TraversalCost, UnitName};
use thiserror::Error;

/// Reasons a map snapshot cannot be turned into a grid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The layout has no columns or no rows.
    #[error("grid must have at least one column and one row, got {columns}x{rows}")]
    EmptyGrid {
        /// Column count supplied by the layout.
        columns: u32,
        /// Row count supplied by the layout.
        rows: u32,
    },
    /// The tile list does not cover the declared dimensions.
    #[error("expected {expected} tiles, layout supplied {actual}")]
    TileCountMismatch {
        /// Tiles implied by the declared dimensions.
        expected: usize,
        /// Tiles present in the layout.
        actual: usize,
    },
    /// A door state was attached to a tile that is not a door.
    #[error("tile {pos} carries a door state but is not a door")]
    DoorStateOnNonDoor {
        /// Offending tile.
        pos: TilePos,
    },
    /// An item was placed inside a wall.
    #[error("tile {pos} is a wall and cannot hold an item")]
    ItemInWall {
        /// Offending tile.
        pos: TilePos,
    },
}

/// One cell of the square lattice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pos: TilePos,
    kind: TileKind,
    cost: TraversalCost,
    traversable: bool,
    door: Option<DoorState>,
    occupant: Option<UnitName>,
    item: Option<Item>,
    reachable_this_turn: bool,
    highlighted: bool,
}

impl Tile {
    fn from_spec(
        pos: TilePos,
        kind: TileKind,
        door: Option<DoorState>,
        item: Option<Item>,
    ) -> Self {
        let door = match kind {
            TileKind::Door => Some(door.unwrap_or(DoorState::Closed)),
            _ => None,
        };
        let cost = TraversalCost::for_tile(kind, door);
        Self {
            pos,
            kind,
            cost,
            traversable: cost.points().is_some(),
            door,
            occupant: None,
            item,
            reachable_this_turn: false,
            highlighted: false,
        }
    }

    /// Position of the tile within the lattice.
    #[must_use]
    pub const fn pos(&self) -> TilePos {
        self.pos
    }

    /// Terrain of the tile.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Movement points required to enter the tile.
    #[must_use]
    pub const fn cost(&self) -> TraversalCost {
        self.cost
    }

    /// Reports whether the tile can currently be entered.
    #[must_use]
    pub const fn is_traversable(&self) -> bool {
        self.traversable
    }

    /// Door state, present only for door tiles.
    #[must_use]
    pub const fn door_state(&self) -> Option<DoorState> {
        self.door
    }

    /// Unit standing on the tile, if any.
    #[must_use]
    pub fn occupant(&self) -> Option<&UnitName> {
        self.occupant.as_ref()
    }

    /// Item resting on the tile, if any.
    #[must_use]
    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    /// Reports whether the acting unit may end its move here this turn.
    #[must_use]
    pub const fn is_reachable_this_turn(&self) -> bool {
        self.reachable_this_turn
    }

    /// Reports whether the tile lies on the previewed route.
    #[must_use]
    pub const fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    /// Reports whether the tile is a wall.
    #[must_use]
    pub fn is_wall(&self) -> bool {
        self.kind == TileKind::Wall
    }

    /// Reports whether the tile is a door, open or closed.
    #[must_use]
    pub fn is_door(&self) -> bool {
        self.kind == TileKind::Door
    }

    /// Reports whether the tile is a closed door.
    #[must_use]
    pub fn is_closed_door(&self) -> bool {
        self.door == Some(DoorState::Closed)
    }

    /// Reports whether a spawn marker rests on the tile.
    #[must_use]
    pub fn is_spawn(&self) -> bool {
        matches!(self.item, Some(Item::SpawnMarker))
    }

    /// Reports whether a unit other than `unit` stands on the tile.
    #[must_use]
    pub fn is_occupied_by_other(&self, unit: &UnitName) -> bool {
        self.occupant.as_ref().is_some_and(|occupant| occupant != unit)
    }
}

/// Arena of tiles indexed by `(x, y)` in row-major order.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Builds a grid from a validated map snapshot.
    pub fn from_layout(layout: &MapLayout) -> Result<Self, LayoutError> {
        if layout.columns == 0 || layout.rows == 0 {
            return Err(LayoutError::EmptyGrid {
                columns: layout.columns,
                rows: layout.rows,
            });
        }

        let expected = usize::try_from(u64::from(layout.columns) * u64::from(layout.rows))
            .unwrap_or(usize::MAX);
        if layout.tiles.len() != expected {
            return Err(LayoutError::TileCountMismatch {
                expected,
                actual: layout.tiles.len(),
            });
        }

        let mut tiles = Vec::with_capacity(expected);
        for (index, spec) in layout.tiles.iter().enumerate() {
            let column = index % layout.columns as usize;
            let row = index / layout.columns as usize;
            let pos = TilePos::new(column as u32, row as u32);

            if spec.door.is_some() && spec.kind != TileKind::Door {
                return Err(LayoutError::DoorStateOnNonDoor { pos });
            }
            if spec.item.is_some() && spec.kind == TileKind::Wall {
                return Err(LayoutError::ItemInWall { pos });
            }

            tiles.push(Tile::from_spec(pos, spec.kind, spec.door, spec.item.clone()));
        }

        Ok(Self {
            columns: layout.columns,
            rows: layout.rows,
            tiles,
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Iterator over every tile in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Returns the tile at the provided position, if it lies within bounds.
    #[must_use]
    pub fn tile_at(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|index| self.tiles.get(index))
    }

    /// Up to four orthogonally adjacent tiles, without wraparound.
    ///
    /// Neighbors are yielded north, east, south, west.
    pub fn neighbors(&self, pos: TilePos) -> impl Iterator<Item = &Tile> + '_ {
        neighbor_positions(pos, self.columns, self.rows)
            .filter_map(move |neighbor| self.tile_at(neighbor))
    }

    /// Finds the tile whose occupant is the provided unit.
    #[must_use]
    pub fn occupant_tile(&self, unit: &UnitName) -> Option<&Tile> {
        self.tiles
            .iter()
            .find(|tile| tile.occupant.as_ref() == Some(unit))
    }

    /// Moves `unit` from `from` onto `to` in a single step.
    ///
    /// Returns `false` without touching any tile when `to` lies outside the
    /// grid.
    pub(crate) fn set_occupancy(
        &mut self,
        unit: &UnitName,
        from: Option<TilePos>,
        to: TilePos,
    ) -> bool {
        let Some(to_index) = self.index(to) else {
            return false;
        };

        if let Some(from_index) = from.and_then(|from| self.index(from)) {
            self.tiles[from_index].occupant = None;
        }
        self.tiles[to_index].occupant = Some(unit.clone());
        true
    }

    /// Clears the occupant of the tile at the provided position.
    pub(crate) fn vacate(&mut self, pos: TilePos) {
        if let Some(index) = self.index(pos) {
            self.tiles[index].occupant = None;
        }
    }

    /// Flips a door together with its cost and traversability.
    ///
    /// Returns the new door state, or `None` when the tile is not a door.
    pub(crate) fn toggle_door(&mut self, pos: TilePos) -> Option<DoorState> {
        let index = self.index(pos)?;
        let tile = &mut self.tiles[index];
        let state = tile.door?.flipped();

        tile.door = Some(state);
        tile.cost = TraversalCost::for_tile(TileKind::Door, Some(state));
        tile.traversable = state == DoorState::Open;
        Some(state)
    }

    /// Replaces the reachable-this-turn flags with the provided set.
    pub(crate) fn mark_reachable(&mut self, reachable: &[TilePos]) {
        for tile in &mut self.tiles {
            tile.reachable_this_turn = false;
        }
        for pos in reachable {
            if let Some(index) = self.index(*pos) {
                self.tiles[index].reachable_this_turn = true;
            }
        }
    }

    /// Replaces the highlighted route with the provided tiles.
    pub(crate) fn mark_highlighted(&mut self, path: &[TilePos]) {
        for tile in &mut self.tiles {
            tile.highlighted = false;
        }
        for pos in path {
            if let Some(index) = self.index(*pos) {
                self.tiles[index].highlighted = true;
            }
        }
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x() < self.columns && pos.y() < self.rows {
            let row = usize::try_from(pos.y()).ok()?;
            let column = usize::try_from(pos.x()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

fn neighbor_positions(pos: TilePos, columns: u32, rows: u32) -> impl Iterator<Item = TilePos> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = pos.y().checked_sub(1) {
        candidates[count] = Some(TilePos::new(pos.x(), row));
        count += 1;
    }

    if let Some(column) = pos.x().checked_add(1) {
        if column < columns {
            candidates[count] = Some(TilePos::new(column, pos.y()));
            count += 1;
        }
    }

    if let Some(row) = pos.y().checked_add(1) {
        if row < rows {
            candidates[count] = Some(TilePos::new(pos.x(), row));
            count += 1;
        }
    }

    if let Some(column) = pos.x().checked_sub(1) {
        candidates[count] = Some(TilePos::new(column, pos.y()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
