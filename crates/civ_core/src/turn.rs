//! Turn state: whose turn, which phase, which round and year.
//!
//! Every turn start bumps an epoch counter. Mutations issued on behalf of a
//! civilization carry a [`TurnTicket`] captured when their turn began; a
//! ticket from an older epoch is rejected even if the same civilization is
//! active again.

use serde::{Deserialize, Serialize};

use crate::calendar::{self, START_YEAR};
use crate::civilization::CivId;

/// Stage within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Turn just started; humans wait here until ready.
    Start,
    /// Units move.
    UnitMovement,
    /// Production choices.
    CityProduction,
    /// Research choices.
    Research,
    /// End-of-turn processing.
    End,
}

impl Phase {
    /// Phases in order.
    pub const ALL: [Phase; 5] = [
        Self::Start,
        Self::UnitMovement,
        Self::CityProduction,
        Self::Research,
        Self::End,
    ];

    /// Following phase, or `None` at [`Phase::End`].
    #[must_use]
    pub const fn next(self) -> Option<Phase> {
        match self {
            Self::Start => Some(Self::UnitMovement),
            Self::UnitMovement => Some(Self::CityProduction),
            Self::CityProduction => Some(Self::Research),
            Self::Research => Some(Self::End),
            Self::End => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::UnitMovement => "unit_movement",
            Self::CityProduction => "city_production",
            Self::Research => "research",
            Self::End => "end",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Proof that a mutation was issued during a specific turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnTicket {
    /// Issuing civilization.
    pub civ: CivId,
    /// Epoch of the issuing turn.
    pub epoch: u64,
}

/// The single global turn state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Civilization whose turn it is.
    pub active_civ: CivId,
    /// Current phase.
    pub phase: Phase,
    /// Completed rotations.
    pub round: u32,
    /// In-game year, never 0.
    pub year: i32,
    /// Bumped at every turn start and every forced termination.
    pub epoch: u64,
}

impl TurnState {
    /// Round 0, 4000 BC, `first` to move.
    #[must_use]
    pub const fn new(first: CivId) -> Self {
        Self {
            active_civ: first,
            phase: Phase::Start,
            round: 0,
            year: START_YEAR,
            epoch: 0,
        }
    }

    /// Ticket for the current turn.
    #[must_use]
    pub const fn ticket(&self) -> TurnTicket {
        TurnTicket {
            civ: self.active_civ,
            epoch: self.epoch,
        }
    }

    /// Does `ticket` belong to the current turn.
    #[must_use]
    pub fn accepts(&self, ticket: TurnTicket) -> bool {
        ticket.civ == self.active_civ && ticket.epoch == self.epoch
    }

    /// Invalidate every outstanding ticket.
    pub fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Start a new round and advance the calendar.
    pub fn advance_round(&mut self) {
        self.round += 1;
        self.year = calendar::next_year(self.year);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_ends_at_end() {
        let mut phase = Phase::Start;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen, Phase::ALL.to_vec());
    }

    #[test]
    fn test_ticket_rejected_after_epoch_bump() {
        let mut state = TurnState::new(CivId(0));
        let ticket = state.ticket();
        assert!(state.accepts(ticket));
        state.bump_epoch();
        assert!(!state.accepts(ticket));
        assert!(!state.accepts(TurnTicket {
            civ: CivId(1),
            epoch: state.epoch,
        }));
    }

    #[test]
    fn test_round_advance_moves_year() {
        let mut state = TurnState::new(CivId(0));
        state.advance_round();
        assert_eq!(state.round, 1);
        assert_eq!(state.year, START_YEAR + 20);
    }
}
