//! Shortest-path routing used to materialize a move's concrete route.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use skirmish_core::{TilePos, UnitName};

use crate::grid::{Grid, Tile};

/// Computes the cheapest route from `unit`'s tile to `target`.
///
/// The route is ordered from the unit's tile to `target` and includes both
/// endpoints. Entering a tile costs that tile's traversal cost. Walls, closed
/// doors and tiles held by other units are never entered. An empty route means
/// no route exists, including when the unit is not on the grid.
#[must_use]
pub fn shortest_path(grid: &Grid, unit: &UnitName, target: TilePos) -> Vec<TilePos> {
    let Some(start) = grid.occupant_tile(unit).map(Tile::pos) else {
        return Vec::new();
    };
    if grid.tile_at(target).is_none() {
        return Vec::new();
    }

    let mut distance: HashMap<TilePos, u32> = HashMap::new();
    let mut predecessor: HashMap<TilePos, TilePos> = HashMap::new();
    let mut open = BinaryHeap::new();

    let _ = distance.insert(start, 0);
    open.push(Reverse((0_u32, start)));

    let mut reached = false;
    while let Some(Reverse((cost, pos))) = open.pop() {
        if pos == target {
            reached = true;
            break;
        }
        if distance.get(&pos).is_some_and(|best| cost > *best) {
            continue;
        }

        for neighbor in grid.neighbors(pos) {
            if !is_passable(neighbor, unit) {
                continue;
            }
            let Some(step) = neighbor.cost().points() else {
                continue;
            };

            let candidate = cost.saturating_add(step);
            let next = neighbor.pos();
            if distance.get(&next).map_or(true, |known| candidate < *known) {
                let _ = distance.insert(next, candidate);
                let _ = predecessor.insert(next, pos);
                open.push(Reverse((candidate, next)));
            }
        }
    }

    if !reached {
        return Vec::new();
    }

    let mut path = vec![target];
    let mut cursor = target;
    while let Some(previous) = predecessor.get(&cursor) {
        path.push(*previous);
        cursor = *previous;
    }
    path.reverse();
    path
}

/// Sums the cost of entering every tile of `path` after the first.
///
/// Returns `None` when the route crosses a tile that is out of bounds or
/// impassable.
#[must_use]
pub fn path_cost(grid: &Grid, path: &[TilePos]) -> Option<u32> {
    path.iter().skip(1).try_fold(0_u32, |total, pos| {
        let step = grid.tile_at(*pos)?.cost().points()?;
        Some(total.saturating_add(step))
    })
}

fn is_passable(tile: &Tile, unit: &UnitName) -> bool {
    !tile.is_wall() && !tile.is_closed_door() && !tile.is_occupied_by_other(unit)
}
