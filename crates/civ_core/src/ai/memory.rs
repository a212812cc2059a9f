//! The little state the AI keeps between decisions.
//!
//! Decisions are re-evaluated every iteration; only three things carry
//! over: a settler's recent positions, a scout's "enemy found" flag and a
//! rally point handed to units built on request.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::enemy_search::EnemySighting;
use crate::grid::Coord;
use crate::unit::UnitId;

/// Positions remembered per settler.
pub const SETTLER_HISTORY_LEN: usize = 6;

/// Repeated positions in a full history that count as oscillation.
pub const OSCILLATION_REPEATS: usize = 3;

/// Per-unit AI memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiMemory {
    settler_history: BTreeMap<UnitId, VecDeque<Coord>>,
    scout_findings: BTreeMap<UnitId, EnemySighting>,
    rally: BTreeMap<UnitId, Coord>,
}

impl AiMemory {
    /// Empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a settler position, keeping the last [`SETTLER_HISTORY_LEN`].
    pub fn record_settler_position(&mut self, unit: UnitId, at: Coord) {
        let history = self.settler_history.entry(unit).or_default();
        if history.len() == SETTLER_HISTORY_LEN {
            history.pop_front();
        }
        history.push_back(at);
    }

    /// Positions of a settler, oldest first.
    #[must_use]
    pub fn settler_history(&self, unit: UnitId) -> Vec<Coord> {
        self.settler_history
            .get(&unit)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// A full history in which at least [`OSCILLATION_REPEATS`] entries
    /// revisit a tile already in it.
    #[must_use]
    pub fn is_oscillating(&self, unit: UnitId) -> bool {
        let Some(history) = self.settler_history.get(&unit) else {
            return false;
        };
        if history.len() < SETTLER_HISTORY_LEN {
            return false;
        }
        let distinct: BTreeSet<Coord> = history.iter().copied().collect();
        history.len() - distinct.len() >= OSCILLATION_REPEATS
    }

    /// Flag a scout as having found something.
    pub fn mark_enemy_found(&mut self, scout: UnitId, sighting: EnemySighting) {
        self.scout_findings.insert(scout, sighting);
    }

    /// What a scout found, if it is on its way home.
    #[must_use]
    pub fn enemy_found(&self, scout: UnitId) -> Option<&EnemySighting> {
        self.scout_findings.get(&scout)
    }

    /// Clear a scout's finding.
    pub fn clear_enemy_found(&mut self, scout: UnitId) {
        self.scout_findings.remove(&scout);
    }

    /// Give a unit a rally point.
    pub fn set_rally(&mut self, unit: UnitId, at: Coord) {
        self.rally.insert(unit, at);
    }

    /// A unit's rally point.
    #[must_use]
    pub fn rally(&self, unit: UnitId) -> Option<Coord> {
        self.rally.get(&unit).copied()
    }

    /// Drop a reached rally point.
    pub fn clear_rally(&mut self, unit: UnitId) {
        self.rally.remove(&unit);
    }

    /// Forget everything about a unit that left the map.
    pub fn forget(&mut self, unit: UnitId) {
        self.settler_history.remove(&unit);
        self.scout_findings.remove(&unit);
        self.rally.remove(&unit);
    }
}
