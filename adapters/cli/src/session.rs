//! Headless match loop wiring the world to its systems.

use std::time::Duration;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{Command, Event, TransportMessage, UnitName};
use skirmish_system_action_economy::{self as action_economy, ActionEconomy};
use skirmish_system_bot::{self as bot, BotDriver};
use skirmish_system_transport::Transport;
use skirmish_world::{self as world, query, LayoutError, World};
use tracing::{info, warn};

use crate::scenario::Scenario;

/// Options controlling a headless run.
#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Number of full initiative rounds to play.
    pub rounds: u32,
    /// Simulated time advanced per tick.
    pub tick: Duration,
    /// Seed used to shuffle the initiative order. `None` keeps file order.
    pub seed: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            rounds: 1,
            tick: Duration::from_millis(100),
            seed: None,
        }
    }
}

/// A running match: the world plus every system reacting to it.
#[derive(Debug)]
pub struct Session {
    world: World,
    bots: BotDriver,
    economy: ActionEconomy,
    transport: Transport,
    initiative: Vec<UnitName>,
    options: RunOptions,
    tick_budget: u64,
}

impl Session {
    /// Builds the world from the scenario and places its units.
    pub fn new(scenario: &Scenario, options: RunOptions) -> Result<Self, LayoutError> {
        let world = World::from_layout(&scenario.layout, scenario.session.clone())?;
        let timing = scenario.timing;
        let bots = BotDriver::new(bot::Config::new(
            timing.bot_initial_delay(),
            timing.bot_retry_delay(),
        ));
        let economy = ActionEconomy::new(action_economy::Config::new(Some(
            timing.turn_duration(),
        )));

        let ticks_per_turn = u128::from(timing.turn_ms) / options.tick.as_millis().max(1) + 1;
        let tick_budget = u64::try_from(ticks_per_turn).unwrap_or(u64::MAX);

        let mut session = Self {
            world,
            bots,
            economy,
            transport: Transport::new(),
            initiative: Vec::new(),
            options,
            tick_budget,
        };

        let mut ignored = Vec::new();
        for entry in &scenario.units {
            let (spec, at) = entry.placement();
            let name = spec.name.clone();
            session.submit(Command::PlaceUnit { spec, at }, &mut ignored);
            if query::unit(&session.world, &name).is_some() {
                session.initiative.push(name);
            } else {
                warn!(unit = %name, tile = %at, "unit could not be placed");
            }
        }

        if let Some(seed) = options.seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            session.initiative.shuffle(&mut rng);
        }

        Ok(session)
    }

    /// Units in the order they act each round.
    #[must_use]
    pub fn initiative(&self) -> &[UnitName] {
        &self.initiative
    }

    /// Read-only access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Plays every configured round, appending outbound messages to `out`.
    pub fn run(&mut self, out: &mut Vec<TransportMessage>) {
        for round in 1..=self.options.rounds {
            info!(round, "round started");
            let order = self.initiative.clone();
            for unit in order {
                self.play_turn(&unit, out);
            }
        }
        self.bots.shutdown();
        self.economy.shutdown();
    }

    fn play_turn(&mut self, unit: &UnitName, out: &mut Vec<TransportMessage>) {
        if query::unit(&self.world, unit).is_none() {
            return;
        }

        info!(%unit, "turn started");
        self.submit(Command::BeginTurn { unit: unit.clone() }, out);

        let mut ticks = 0;
        while self.is_acting(unit) && ticks < self.tick_budget {
            self.submit(
                Command::Tick {
                    dt: self.options.tick,
                },
                out,
            );
            ticks += 1;
        }

        if self.is_acting(unit) {
            warn!(%unit, "turn outlived its countdown; ending it");
            self.submit(Command::EndTurn { unit: unit.clone() }, out);
        }
        info!(%unit, elapsed = ?query::elapsed(&self.world), "turn ended");
    }

    fn is_acting(&self, unit: &UnitName) -> bool {
        query::active_turn(&self.world).is_some_and(|turn| turn.unit == unit)
    }

    fn submit(&mut self, command: Command, out: &mut Vec<TransportMessage>) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events: Vec<Event> = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.transport.handle(&events, out);
            self.bots.handle(&events, &self.world, &mut pending);
            self.economy.handle(&events, &self.world, &mut pending);
        }
    }
}
