#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timer-paced decision loop for autonomous units.
//!
//! When an autonomous unit's turn starts the driver waits for an initial delay,
//! then tries its options in priority order: aggressive bots attack before
//! opening doors, defensive bots open doors before attacking. A successful
//! interaction that leaves actions in the counter reschedules the evaluation
//! after a retry delay. The loop never ends the turn itself.

use std::time::Duration;

use skirmish_core::{ActionState, Command, Event, TilePos, TurnId, UnitName};
use skirmish_scheduler::{CancellationToken, Scheduler};
use skirmish_world::{query, Unit, World};
use tracing::debug;

const DEFAULT_DELAY: Duration = Duration::from_millis(1_000);

const AGGRESSIVE_ORDER: [Attempt; 3] = [Attempt::Attack, Attempt::ToggleDoor, Attempt::Attack];
const DEFENSIVE_ORDER: [Attempt; 2] = [Attempt::ToggleDoor, Attempt::Attack];

/// Configuration parameters required to construct the bot driver.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    initial_delay: Duration,
    retry_delay: Duration,
}

impl Config {
    /// Creates a configuration with the delay before the first evaluation and
    /// the delay between chained evaluations.
    #[must_use]
    pub const fn new(initial_delay: Duration, retry_delay: Duration) -> Self {
        Self {
            initial_delay,
            retry_delay,
        }
    }

    /// Delay between the start of a turn and the first evaluation.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Delay between a successful interaction and the next evaluation.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY, DEFAULT_DELAY)
    }
}

/// Result of one evaluation of a bot's options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotOutcome {
    /// Combat was requested against the named unit.
    Attacked(UnitName),
    /// The door on the provided tile was toggled.
    ToggledDoor(TilePos),
    /// Nothing adjacent could be interacted with.
    NoLegalTarget,
}

impl BotOutcome {
    /// Reports whether the evaluation spent an action.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        !matches!(self, Self::NoLegalTarget)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    Attack,
    ToggleDoor,
}

#[derive(Clone, Debug)]
struct Evaluation {
    unit: UnitName,
    turn: TurnId,
}

#[derive(Debug)]
struct BotTurn {
    unit: UnitName,
    turn: TurnId,
    token: CancellationToken,
}

/// Drives autonomous units by emitting interaction commands on a timer.
#[derive(Debug)]
pub struct BotDriver {
    config: Config,
    scheduler: Scheduler<Evaluation>,
    active: Option<BotTurn>,
    outcomes: Vec<BotOutcome>,
}

impl BotDriver {
    /// Creates a driver using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scheduler: Scheduler::new(),
            active: None,
            outcomes: Vec::new(),
        }
    }

    /// Consumes world events and emits the commands chosen by the acting bot.
    pub fn handle(&mut self, events: &[Event], world: &World, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TurnStarted { unit, turn } => self.start(world, unit, *turn),
                Event::TurnEnded { unit, .. } | Event::UnitRemoved { unit } => self.stop(unit),
                Event::TimeAdvanced { dt } => {
                    for evaluation in self.scheduler.advance(*dt) {
                        self.run(world, evaluation, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Cancels every scheduled evaluation.
    pub fn shutdown(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
        self.scheduler.cancel_all();
    }

    /// Reports whether an evaluation is waiting on the timer.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.token.is_cancelled())
            && !self.scheduler.is_empty()
    }

    /// Outcomes of every evaluation run so far, oldest first.
    #[must_use]
    pub fn outcomes(&self) -> &[BotOutcome] {
        &self.outcomes
    }

    fn start(&mut self, world: &World, unit: &UnitName, turn: TurnId) {
        if let Some(previous) = self.active.take() {
            previous.token.cancel();
        }
        if !query::unit(world, unit).is_some_and(Unit::is_autonomous) {
            return;
        }

        let token = CancellationToken::new();
        let evaluation = Evaluation {
            unit: unit.clone(),
            turn,
        };
        let _ = self
            .scheduler
            .schedule_after(self.config.initial_delay(), evaluation, token.clone());
        self.active = Some(BotTurn {
            unit: unit.clone(),
            turn,
            token,
        });
        debug!(%unit, delay = ?self.config.initial_delay(), "bot turn scheduled");
    }

    fn stop(&mut self, unit: &UnitName) {
        if self.active.as_ref().is_some_and(|active| &active.unit == unit) {
            if let Some(active) = self.active.take() {
                active.token.cancel();
            }
        }
    }

    fn run(&mut self, world: &World, evaluation: Evaluation, out: &mut Vec<Command>) {
        let Some(active) = self
            .active
            .as_ref()
            .filter(|active| active.unit == evaluation.unit && active.turn == evaluation.turn)
        else {
            return;
        };
        let Some(turn) = query::active_turn(world)
            .filter(|turn| turn.turn == evaluation.turn && turn.unit == &evaluation.unit)
        else {
            return;
        };

        let remaining = turn.actions.remaining();
        if remaining == 0 || turn.actions.state() == ActionState::Consumed {
            return;
        }

        let outcome = decide(world, &evaluation.unit);
        debug!(unit = %evaluation.unit, ?outcome, remaining, "bot evaluated options");
        match &outcome {
            BotOutcome::Attacked(defender) => out.push(Command::StartCombat {
                attacker: evaluation.unit.clone(),
                defender: defender.clone(),
            }),
            BotOutcome::ToggledDoor(tile) => out.push(Command::ToggleDoor {
                actor: evaluation.unit.clone(),
                tile: *tile,
            }),
            BotOutcome::NoLegalTarget => {}
        }

        if outcome.is_action() && remaining - 1 > 0 {
            let token = active.token.clone();
            let _ = self
                .scheduler
                .schedule_after(self.config.retry_delay(), evaluation, token);
        }
        self.outcomes.push(outcome);
    }
}

/// Picks the interaction `unit` performs next, following its temperament.
///
/// Attacks target the first orthogonal neighbor held by a unit from another
/// team. Door toggles target the first orthogonal door nobody stands on.
#[must_use]
pub fn decide(world: &World, unit: &UnitName) -> BotOutcome {
    let Some(bot) = query::unit(world, unit) else {
        return BotOutcome::NoLegalTarget;
    };
    let order: &[Attempt] = if bot.is_aggressive() {
        &AGGRESSIVE_ORDER
    } else {
        &DEFENSIVE_ORDER
    };

    order
        .iter()
        .find_map(|attempt| match attempt {
            Attempt::Attack => attack_target(world, bot).map(BotOutcome::Attacked),
            Attempt::ToggleDoor => door_target(world, bot).map(BotOutcome::ToggledDoor),
        })
        .unwrap_or(BotOutcome::NoLegalTarget)
}

fn attack_target(world: &World, bot: &Unit) -> Option<UnitName> {
    query::grid(world)
        .neighbors(bot.position())
        .filter_map(|tile| tile.occupant())
        .filter_map(|name| query::unit(world, name))
        .find(|other| other.name() != bot.name() && !bot.is_ally_of(other))
        .map(|other| other.name().clone())
}

fn door_target(world: &World, bot: &Unit) -> Option<TilePos> {
    query::grid(world)
        .neighbors(bot.position())
        .find(|tile| tile.is_door() && tile.occupant().is_none())
        .map(|tile| tile.pos())
}
