#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that turns world events into notifications for remote peers.

use skirmish_core::{Event, TransportMessage};

/// Maps world events onto outbound transport messages.
#[derive(Debug, Default)]
pub struct Transport {
    sent: u64,
}

impl Transport {
    /// Creates a new transport system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to `out` for every event peers must hear about.
    ///
    /// Events without a counterpart on the wire are skipped.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<TransportMessage>) {
        for event in events {
            if let Some(message) = message_for(event) {
                self.sent = self.sent.saturating_add(1);
                out.push(message);
            }
        }
    }

    /// Number of messages produced since construction.
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }
}

fn message_for(event: &Event) -> Option<TransportMessage> {
    let message = match event {
        Event::DoorToggled { tile, .. } => TransportMessage::ToggleDoor { tile: *tile },
        Event::CombatStarted { attacker, defender } => TransportMessage::StartCombat {
            attacker: attacker.clone(),
            defender: defender.clone(),
        },
        Event::TurnEnded { session, .. } => TransportMessage::EndTurn {
            session: session.clone(),
        },
        Event::UnitMoved { unit, path, .. } => TransportMessage::AnimateMove {
            unit: unit.clone(),
            path: path.clone(),
        },
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use skirmish_core::{DoorState, SessionId, TilePos, TurnId, UnitName};

    #[test]
    fn internal_events_stay_local() {
        let mut transport = Transport::new();
        let mut out = Vec::new();

        transport.handle(
            &[
                Event::TimeAdvanced {
                    dt: Duration::from_millis(16),
                },
                Event::TurnStarted {
                    unit: UnitName::new("hero"),
                    turn: TurnId::new(1),
                },
            ],
            &mut out,
        );

        assert!(out.is_empty());
        assert_eq!(transport.sent(), 0);
    }

    #[test]
    fn wire_events_keep_their_order() {
        let mut transport = Transport::new();
        let mut out = Vec::new();

        transport.handle(
            &[
                Event::DoorToggled {
                    tile: TilePos::new(4, 2),
                    state: DoorState::Open,
                },
                Event::TurnEnded {
                    unit: UnitName::new("hero"),
                    turn: TurnId::new(3),
                    session: SessionId::new("room-1"),
                },
            ],
            &mut out,
        );

        assert_eq!(
            out,
            vec![
                TransportMessage::ToggleDoor {
                    tile: TilePos::new(4, 2)
                },
                TransportMessage::EndTurn {
                    session: SessionId::new("room-1")
                },
            ]
        );
        assert_eq!(transport.sent(), 2);
    }
}
