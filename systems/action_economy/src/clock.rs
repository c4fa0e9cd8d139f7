//! Countdown that bounds how long a single turn may last.

use std::time::Duration;

use skirmish_core::{TurnId, UnitName};
use skirmish_scheduler::{CancellationToken, Scheduler};
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Expired {
    pub(crate) unit: UnitName,
    pub(crate) turn: TurnId,
}

/// Arms one countdown per turn and disarms it when the turn ends.
#[derive(Debug)]
pub(crate) struct TurnClock {
    duration: Option<Duration>,
    scheduler: Scheduler<Expired>,
    token: Option<CancellationToken>,
}

impl TurnClock {
    pub(crate) fn new(duration: Option<Duration>) -> Self {
        Self {
            duration,
            scheduler: Scheduler::new(),
            token: None,
        }
    }

    pub(crate) fn start(&mut self, unit: &UnitName, turn: TurnId) {
        self.stop();
        let Some(duration) = self.duration else {
            return;
        };

        let token = CancellationToken::new();
        let expired = Expired {
            unit: unit.clone(),
            turn,
        };
        let _ = self.scheduler.schedule_after(duration, expired, token.clone());
        self.token = Some(token);
        trace!(%unit, turn = turn.get(), ?duration, "turn countdown armed");
    }

    pub(crate) fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub(crate) fn advance(&mut self, dt: Duration) -> Vec<Expired> {
        let expired = self.scheduler.advance(dt);
        if !expired.is_empty() {
            self.token = None;
        }
        expired
    }

    pub(crate) fn shutdown(&mut self) {
        self.stop();
        self.scheduler.cancel_all();
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.token
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}
