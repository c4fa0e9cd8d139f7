//! Cost-bounded search for the tiles a unit may end its move on.

use std::collections::{HashMap, VecDeque};

use skirmish_core::{TilePos, UnitName};

use crate::grid::{Grid, Tile};

/// Selects how occupied tiles are treated by [`reachable_tiles`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Occupied tiles block expansion. Used for the acting unit's own turn.
    Real,
    /// Occupied tiles are entered like any other tile. Used for planning.
    Simulation,
}

impl SearchMode {
    const fn blocks_occupied(self) -> bool {
        matches!(self, Self::Real)
    }
}

#[derive(Clone, Copy, Debug)]
struct Frontier {
    pos: TilePos,
    cost: u32,
}

/// Collects every tile `unit` can reach with at most `movement_budget` points.
///
/// The search expands from the unit's tile with a FIFO queue and keeps the
/// cheapest cost seen per position, so a tile may be expanded more than once
/// when a cheaper route turns up later. The start tile is always included.
/// Walls and closed doors are never entered; occupied tiles are skipped in
/// [`SearchMode::Real`]. Results come back in expansion order.
///
/// A budget of zero yields the start tile alone, even beside free ice.
/// Returns an empty list when the unit is not on the grid.
#[must_use]
pub fn reachable_tiles(
    grid: &Grid,
    unit: &UnitName,
    movement_budget: u32,
    mode: SearchMode,
) -> Vec<TilePos> {
    let Some(start) = grid.occupant_tile(unit).map(Tile::pos) else {
        return Vec::new();
    };
    if movement_budget == 0 {
        return vec![start];
    }

    let mut best_cost_seen: HashMap<TilePos, u32> = HashMap::new();
    let mut reachable = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(Frontier {
        pos: start,
        cost: 0,
    });

    while let Some(Frontier { pos, cost }) = queue.pop_front() {
        if best_cost_seen.get(&pos).is_some_and(|best| *best <= cost) {
            continue;
        }
        if cost > movement_budget {
            continue;
        }

        if best_cost_seen.insert(pos, cost).is_none() {
            reachable.push(pos);
        }

        for neighbor in grid.neighbors(pos) {
            if !can_enter(neighbor, unit, mode) {
                continue;
            }
            let Some(step) = neighbor.cost().points() else {
                continue;
            };

            let candidate = cost.saturating_add(step);
            if candidate <= movement_budget {
                queue.push_back(Frontier {
                    pos: neighbor.pos(),
                    cost: candidate,
                });
            }
        }
    }

    reachable
}

fn can_enter(tile: &Tile, unit: &UnitName, mode: SearchMode) -> bool {
    if tile.is_wall() || tile.is_closed_door() {
        return false;
    }
    !(mode.blocks_occupied() && tile.is_occupied_by_other(unit))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use skirmish_core::{DoorState, MapLayout, TileKind, TileSpec};

    fn grid_with_units(layout: MapLayout, units: &[(&str, TilePos)]) -> Grid {
        let mut grid = Grid::from_layout(&layout).expect("valid layout");
        for (name, pos) in units {
            assert!(grid.set_occupancy(&UnitName::new(*name), None, *pos));
        }
        grid
    }

    fn as_set(tiles: Vec<TilePos>) -> BTreeSet<TilePos> {
        tiles.into_iter().collect()
    }

    #[test]
    fn budget_of_one_reaches_orthogonal_neighbors() {
        let grid = grid_with_units(MapLayout::open(3, 3), &[("hero", TilePos::new(1, 1))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 1, SearchMode::Real);

        assert_eq!(reachable.len(), 5);
        assert_eq!(
            as_set(reachable),
            as_set(vec![
                TilePos::new(1, 1),
                TilePos::new(0, 1),
                TilePos::new(2, 1),
                TilePos::new(1, 0),
                TilePos::new(1, 2),
            ])
        );
    }

    #[test]
    fn zero_budget_yields_start_tile_only() {
        let grid = grid_with_units(MapLayout::open(3, 3), &[("hero", TilePos::new(2, 0))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 0, SearchMode::Real);

        assert_eq!(reachable, vec![TilePos::new(2, 0)]);
    }

    #[test]
    fn zero_budget_does_not_slide_onto_free_ice() {
        let layout = MapLayout::open(3, 1).with(TilePos::new(1, 0), TileSpec::new(TileKind::Ice));
        let grid = grid_with_units(layout, &[("hero", TilePos::new(0, 0))]);
        let hero = UnitName::new("hero");

        assert_eq!(
            reachable_tiles(&grid, &hero, 0, SearchMode::Real),
            vec![TilePos::new(0, 0)]
        );
        assert_eq!(
            reachable_tiles(&grid, &hero, 0, SearchMode::Simulation),
            vec![TilePos::new(0, 0)]
        );
        assert_eq!(
            as_set(reachable_tiles(&grid, &hero, 1, SearchMode::Real)),
            as_set(vec![TilePos::new(0, 0), TilePos::new(1, 0), TilePos::new(2, 0)])
        );
    }

    #[test]
    fn unknown_unit_yields_nothing() {
        let grid = grid_with_units(MapLayout::open(2, 2), &[]);
        assert!(reachable_tiles(&grid, &UnitName::new("ghost"), 5, SearchMode::Real).is_empty());
    }

    #[test]
    fn walls_and_closed_doors_are_never_reachable() {
        let layout = MapLayout::open(4, 2)
            .with(TilePos::new(1, 0), TileSpec::new(TileKind::Wall))
            .with(TilePos::new(2, 0), TileSpec::door(DoorState::Closed));
        let grid = grid_with_units(layout, &[("hero", TilePos::new(0, 0))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 10, SearchMode::Simulation);

        assert!(!reachable.contains(&TilePos::new(1, 0)));
        assert!(!reachable.contains(&TilePos::new(2, 0)));
        assert!(reachable.contains(&TilePos::new(3, 0)));
        for pos in reachable {
            let tile = grid.tile_at(pos).expect("tile in bounds");
            assert!(!tile.is_wall() && !tile.is_closed_door());
        }
    }

    #[test]
    fn open_doors_are_entered_at_unit_cost() {
        let layout =
            MapLayout::open(3, 1).with(TilePos::new(1, 0), TileSpec::door(DoorState::Open));
        let grid = grid_with_units(layout, &[("hero", TilePos::new(0, 0))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 2, SearchMode::Real);

        assert_eq!(
            reachable,
            vec![TilePos::new(0, 0), TilePos::new(1, 0), TilePos::new(2, 0)]
        );
    }

    #[test]
    fn real_mode_blocks_occupied_tiles_simulation_does_not() {
        let grid = grid_with_units(
            MapLayout::open(3, 1),
            &[("hero", TilePos::new(0, 0)), ("brute", TilePos::new(1, 0))],
        );
        let hero = UnitName::new("hero");

        let real = reachable_tiles(&grid, &hero, 3, SearchMode::Real);
        assert_eq!(real, vec![TilePos::new(0, 0)]);

        let simulated = reachable_tiles(&grid, &hero, 3, SearchMode::Simulation);
        assert_eq!(
            simulated,
            vec![TilePos::new(0, 0), TilePos::new(1, 0), TilePos::new(2, 0)]
        );
    }

    #[test]
    fn cheaper_route_wins_over_earlier_expensive_one() {
        // Water directly east, ice detour through the second row.
        let layout = MapLayout::open(2, 2)
            .with(TilePos::new(1, 0), TileSpec::new(TileKind::Water))
            .with(TilePos::new(0, 1), TileSpec::new(TileKind::Ice))
            .with(TilePos::new(1, 1), TileSpec::new(TileKind::Ice));
        let grid = grid_with_units(layout, &[("hero", TilePos::new(0, 0))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 2, SearchMode::Real);

        assert_eq!(
            as_set(reachable),
            as_set(vec![
                TilePos::new(0, 0),
                TilePos::new(1, 0),
                TilePos::new(0, 1),
                TilePos::new(1, 1),
            ])
        );

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 1, SearchMode::Real);
        assert!(!reachable.contains(&TilePos::new(1, 0)));
        assert!(reachable.contains(&TilePos::new(1, 1)));
    }

    #[test]
    fn results_contain_no_duplicates() {
        let grid = grid_with_units(MapLayout::open(5, 5), &[("hero", TilePos::new(2, 2))]);

        let reachable = reachable_tiles(&grid, &UnitName::new("hero"), 4, SearchMode::Real);

        assert_eq!(reachable.len(), as_set(reachable.clone()).len());
        assert_eq!(reachable.first(), Some(&TilePos::new(2, 2)));
    }
}
