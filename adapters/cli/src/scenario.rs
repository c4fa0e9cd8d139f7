//! Scenario files describing a map, its units and the pacing of a match.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_core::{
    DoorState, Item, MapLayout, SessionId, Team, TileKind, TilePos, TileSpec, UnitSpec,
};
use thiserror::Error;

const DEFAULT_DELAY_MS: u64 = 1_000;
const DEFAULT_TURN_MS: u64 = 5_000;

/// Errors raised while turning a scenario file into a playable scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file is not valid TOML or does not match the scenario schema.
    #[error("could not parse scenario: {0}")]
    Toml(#[from] toml::de::Error),
    /// The map has no rows or its first row is empty.
    #[error("scenario map must contain at least one tile")]
    EmptyMap,
    /// A map row is shorter or longer than the first row.
    #[error("map row {row} has {actual} tiles, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        actual: usize,
    },
    /// A map cell uses a symbol outside the legend.
    #[error("unknown map symbol '{symbol}' at {pos}")]
    UnknownSymbol {
        /// Symbol found in the map.
        symbol: char,
        /// Tile holding the symbol.
        pos: TilePos,
    },
    /// The map is larger than a grid can address.
    #[error("map dimension {0} exceeds the supported size")]
    TooLarge(usize),
}

/// Unit entry as written in a scenario file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitEntry {
    /// Unique unit name.
    pub name: String,
    /// Starting column.
    pub x: u32,
    /// Starting row.
    pub y: u32,
    /// Team number; units without one fight everybody.
    #[serde(default)]
    pub team: Option<u32>,
    /// Movement points granted each turn.
    #[serde(default)]
    pub movement: u32,
    /// Actions granted each turn.
    #[serde(default = "default_actions")]
    pub actions: u32,
    /// Whether the decision loop drives the unit.
    #[serde(default)]
    pub bot: bool,
    /// Whether a bot attacks before opening doors.
    #[serde(default)]
    pub aggressive: bool,
}

impl UnitEntry {
    /// Converts the entry into a placement request.
    #[must_use]
    pub fn placement(&self) -> (UnitSpec, TilePos) {
        let mut spec = UnitSpec::new(self.name.as_str(), self.movement).with_actions(self.actions);
        if self.bot {
            spec = spec.autonomous(self.aggressive);
        }
        if let Some(team) = self.team {
            spec = spec.with_team(Team::new(team));
        }
        (spec, TilePos::new(self.x, self.y))
    }
}

fn default_actions() -> u32 {
    1
}

/// Pacing of bots and turns, in milliseconds of simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// Delay before a bot's first evaluation.
    pub bot_initial_ms: u64,
    /// Delay between chained bot evaluations.
    pub bot_retry_ms: u64,
    /// Longest a turn may last before it is ended for the unit.
    pub turn_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            bot_initial_ms: DEFAULT_DELAY_MS,
            bot_retry_ms: DEFAULT_DELAY_MS,
            turn_ms: DEFAULT_TURN_MS,
        }
    }
}

impl Timing {
    /// Delay before a bot's first evaluation.
    #[must_use]
    pub const fn bot_initial_delay(&self) -> Duration {
        Duration::from_millis(self.bot_initial_ms)
    }

    /// Delay between chained bot evaluations.
    #[must_use]
    pub const fn bot_retry_delay(&self) -> Duration {
        Duration::from_millis(self.bot_retry_ms)
    }

    /// Longest a turn may last.
    #[must_use]
    pub const fn turn_duration(&self) -> Duration {
        Duration::from_millis(self.turn_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    session: String,
    map: Vec<String>,
    #[serde(default)]
    units: Vec<UnitEntry>,
    #[serde(default)]
    timing: Timing,
}

/// Fully resolved scenario ready to seed a world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    /// Room the match runs in.
    pub session: SessionId,
    /// Tile layout.
    pub layout: MapLayout,
    /// Units in initiative order.
    pub units: Vec<UnitEntry>,
    /// Pacing of the match.
    pub timing: Timing,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    ///
    /// The `map` rows use `.` for open ground, `#` for walls, `+` for closed
    /// doors, `/` for open doors, `~` for water, `*` for ice and `S` for open
    /// ground holding a spawn marker.
    pub fn from_toml(text: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = toml::from_str(text)?;
        Ok(Self {
            session: SessionId::new(file.session),
            layout: layout_from_rows(&file.map)?,
            units: file.units,
            timing: file.timing,
        })
    }
}

/// Builds a map layout from legend rows.
pub fn layout_from_rows<S: AsRef<str>>(rows: &[S]) -> Result<MapLayout, ScenarioError> {
    let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
    if width == 0 {
        return Err(ScenarioError::EmptyMap);
    }
    let columns = u32::try_from(width).map_err(|_| ScenarioError::TooLarge(width))?;
    let row_count = u32::try_from(rows.len()).map_err(|_| ScenarioError::TooLarge(rows.len()))?;

    let mut tiles = Vec::with_capacity(width * rows.len());
    for (y, row) in (0..row_count).zip(rows) {
        let row = row.as_ref();
        let actual = row.chars().count();
        if actual != width {
            return Err(ScenarioError::RaggedRow {
                row: y as usize,
                expected: width,
                actual,
            });
        }
        for (x, symbol) in (0..columns).zip(row.chars()) {
            let pos = TilePos::new(x, y);
            tiles.push(tile_for(symbol).ok_or(ScenarioError::UnknownSymbol { symbol, pos })?);
        }
    }

    Ok(MapLayout {
        columns,
        rows: row_count,
        tiles,
    })
}

fn tile_for(symbol: char) -> Option<TileSpec> {
    let spec = match symbol {
        '.' => TileSpec::new(TileKind::Empty),
        '#' => TileSpec::new(TileKind::Wall),
        '+' => TileSpec::door(DoorState::Closed),
        '/' => TileSpec::door(DoorState::Open),
        '~' => TileSpec::new(TileKind::Water),
        '*' => TileSpec::new(TileKind::Ice),
        'S' => TileSpec::new(TileKind::Empty).with_item(Item::SpawnMarker),
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUEL: &str = r#"
session = "duel"
map = [
    "S.+",
    "~*#",
]

[[units]]
name = "hero"
x = 0
y = 0
movement = 3

[[units]]
name = "orc"
x = 1
y = 0
team = 2
bot = true
aggressive = true
actions = 2

[timing]
bot_initial_ms = 250
"#;

    #[test]
    fn parses_legend_units_and_timing() {
        let scenario = Scenario::from_toml(DUEL).expect("scenario parses");

        assert_eq!(scenario.session, SessionId::new("duel"));
        assert_eq!((scenario.layout.columns, scenario.layout.rows), (3, 2));
        let kinds: Vec<TileKind> = scenario.layout.tiles.iter().map(|tile| tile.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TileKind::Empty,
                TileKind::Empty,
                TileKind::Door,
                TileKind::Water,
                TileKind::Ice,
                TileKind::Wall,
            ]
        );
        assert_eq!(scenario.layout.tiles[0].item, Some(Item::SpawnMarker));
        assert_eq!(scenario.layout.tiles[2].door, Some(DoorState::Closed));

        let (orc, at) = scenario.units[1].placement();
        assert_eq!(at, TilePos::new(1, 0));
        assert!(orc.autonomous && orc.aggressive);
        assert_eq!(orc.actions_per_turn, 2);
        assert_eq!(orc.team, Some(Team::new(2)));
        assert_eq!(scenario.units[0].actions, 1);

        assert_eq!(scenario.timing.bot_initial_ms, 250);
        assert_eq!(scenario.timing.bot_retry_ms, DEFAULT_DELAY_MS);
        assert_eq!(scenario.timing.turn_duration(), Duration::from_secs(5));
    }

    #[test]
    fn rejects_ragged_rows_and_unknown_symbols() {
        assert!(matches!(
            layout_from_rows(&["...", ".."]),
            Err(ScenarioError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            layout_from_rows(&["..?"]),
            Err(ScenarioError::UnknownSymbol { symbol: '?', .. })
        ));
        assert!(matches!(
            layout_from_rows::<&str>(&[]),
            Err(ScenarioError::EmptyMap)
        ));
    }

    #[test]
    fn unknown_fields_are_reported() {
        let error = Scenario::from_toml("session = \"x\"\nmap = [\".\"]\ncolour = 3\n")
            .expect_err("unknown field");
        assert!(matches!(error, ScenarioError::Toml(_)));
    }
}
