//! Game metrics collection for AI self-play analysis.
//!
//! A [`MetricsCollector`] listens to the event stream of one game and is
//! turned into a serializable [`GameMetrics`] once the game ends. Maps are
//! ordered so the JSON output is stable across runs.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use civ_core::civilization::CivId;
use civ_core::events::GameEvent;
use civ_core::game::Game;
use serde::{Deserialize, Serialize};

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Map seed used.
    pub seed: u64,
    /// Rounds completed.
    pub rounds_played: u32,
    /// In-game year when the run stopped.
    pub final_year: i32,
    /// Sole survivor, if the game ended by elimination.
    pub winner: Option<String>,
    /// How the game ended.
    pub end_condition: EndCondition,
    /// Per-civilization metrics keyed by name.
    pub civs: BTreeMap<String, CivMetrics>,
    /// Notable events in order.
    pub events: Vec<TimedEvent>,
    /// AI turns cut short by the scheduler.
    pub forced_turns: u32,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create an empty record.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Sum of cities across all civilizations.
    #[must_use]
    pub fn total_cities(&self) -> u32 {
        self.civs.values().map(|c| c.final_cities).sum()
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCondition {
    /// The round cap was reached.
    #[default]
    RoundLimit,
    /// At most one civilization survived.
    Elimination,
}

/// Metrics for one civilization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CivMetrics {
    /// Display name.
    pub name: String,
    /// Still in the game at the end.
    pub alive: bool,
    /// Round of elimination.
    pub eliminated_round: Option<u32>,

    // === Expansion ===
    /// Cities founded over the game.
    pub cities_founded: u32,
    /// Cities owned at the end.
    pub final_cities: u32,
    /// Population beyond size 1, summed over owned cities.
    pub city_growths: u32,
    /// Tiles ever seen.
    pub explored_tiles: u32,

    // === Military ===
    /// Units built, by kind.
    pub units_produced: BTreeMap<String, u32>,
    /// Units destroyed.
    pub units_lost: u32,
    /// Fights won, attacking or defending.
    pub battles_won: u32,
    /// Fights lost, attacking or defending.
    pub battles_lost: u32,
    /// Units owned at the end.
    pub final_units: u32,
    /// Most units owned at a round boundary.
    pub peak_units: u32,

    // === Economy ===
    /// Gold at the end.
    pub gold: i32,
    /// Technologies known at the end.
    pub technologies: u32,

    // === AI ===
    /// Foreign units and cities first spotted.
    pub enemies_discovered: u32,
    /// Single-tile moves made.
    pub moves: u32,
    /// Turns cut short by the scheduler.
    pub forced_turns: u32,
}

/// A notable event with the round it happened in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Round counter at the time.
    pub round: u32,
    /// Event name, e.g. `CITY_FOUNDED`.
    pub kind: String,
    /// Civilization concerned.
    pub civ: u8,
    /// Free-form detail.
    pub details: String,
}

/// Accumulates counters from the event stream.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    round: u32,
    civs: BTreeMap<CivId, CivMetrics>,
    events: Vec<TimedEvent>,
    forced_turns: u32,
}

impl MetricsCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a fresh collector to `game`.
    pub fn attach(game: &mut Game) -> Rc<RefCell<Self>> {
        let collector = Rc::new(RefCell::new(Self::new()));
        let sink = Rc::clone(&collector);
        game.subscribe(move |event: &GameEvent| sink.borrow_mut().record(event));
        collector
    }

    fn civ_mut(&mut self, civ: CivId) -> &mut CivMetrics {
        self.civs.entry(civ).or_default()
    }

    fn log(&mut self, event: &GameEvent, civ: CivId, details: String) {
        self.events.push(TimedEvent {
            round: self.round,
            kind: event.name().to_string(),
            civ: civ.0,
            details,
        });
    }

    /// Fold one event into the counters.
    pub fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::UnitMoved { civ, .. } => self.civ_mut(*civ).moves += 1,
            GameEvent::CombatVictory {
                attacker_civ,
                defender_civ,
                ..
            } => {
                self.civ_mut(*attacker_civ).battles_won += 1;
                self.civ_mut(*defender_civ).battles_lost += 1;
            }
            GameEvent::CombatDefeat {
                attacker_civ,
                defender_civ,
                ..
            } => {
                self.civ_mut(*attacker_civ).battles_lost += 1;
                self.civ_mut(*defender_civ).battles_won += 1;
            }
            GameEvent::CityFounded { civ, at, name, .. } => {
                self.civ_mut(*civ).cities_founded += 1;
                self.log(event, *civ, format!("{name} at {at}"));
            }
            GameEvent::UnitCreated { civ, kind, .. } => {
                *self.civ_mut(*civ).units_produced.entry(kind.name().to_string()).or_default() += 1;
            }
            GameEvent::UnitDestroyed { civ, .. } => self.civ_mut(*civ).units_lost += 1,
            GameEvent::TechDiscovered { civ, tech } => self.log(event, *civ, tech.clone()),
            GameEvent::EnemyDiscovered { civ, enemy, at, kind } => {
                self.civ_mut(*civ).enemies_discovered += 1;
                self.log(event, *civ, format!("{kind:?} of {enemy} at {at}"));
            }
            GameEvent::AiTurnForced { civ, reason } => {
                self.forced_turns += 1;
                self.civ_mut(*civ).forced_turns += 1;
                self.log(event, *civ, format!("{reason:?}"));
            }
            GameEvent::RoundAdvanced { round, .. } => self.round = *round,
            GameEvent::CivEliminated { civ } => {
                let round = self.round;
                self.civ_mut(*civ).eliminated_round = Some(round);
                self.log(event, *civ, String::new());
            }
            _ => {}
        }
    }

    /// Track peak army sizes. Call at round boundaries.
    pub fn sample(&mut self, game: &Game) {
        let ctx = game.context();
        for civ in &ctx.civs {
            let units = ctx.world.units_of(civ.id).len() as u32;
            let entry = self.civ_mut(civ.id);
            entry.peak_units = entry.peak_units.max(units);
        }
    }

    /// Combine the counters with the final state of `game`.
    #[must_use]
    pub fn finish(mut self, game: &Game, game_id: &str, scenario: &str, seed: u64) -> GameMetrics {
        self.sample(game);
        let ctx = game.context();
        let mut metrics = GameMetrics::new(game_id, scenario, seed);
        metrics.rounds_played = game.round();
        metrics.final_year = game.year();
        metrics.forced_turns = self.forced_turns;
        metrics.final_state_hash = game.state_hash();

        let living = ctx.living_civs();
        if game.is_halted() {
            metrics.end_condition = EndCondition::Elimination;
            if let [survivor] = living.as_slice() {
                metrics.winner = ctx.civ(*survivor).map(|c| c.name.clone());
            }
        }

        for civ in &ctx.civs {
            let mut entry = self.civs.remove(&civ.id).unwrap_or_default();
            let cities = ctx.world.cities_of(civ.id);
            entry.name = civ.name.clone();
            entry.alive = civ.is_alive;
            entry.final_cities = cities.len() as u32;
            entry.city_growths = cities.iter().map(|c| c.population.saturating_sub(1)).sum();
            entry.final_units = ctx.world.units_of(civ.id).len() as u32;
            entry.gold = civ.resources.gold;
            entry.technologies = civ.technologies.len() as u32;
            entry.explored_tiles = ctx.fog.store(civ.id).map_or(0, |s| s.explored_count());
            metrics.civs.insert(civ.name.clone(), entry);
        }

        metrics.events = self.events;
        metrics
    }
}

/// Aggregate statistics over a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games summarized.
    pub games: u32,
    /// Share of games won, by civilization name.
    pub win_rates: BTreeMap<String, f64>,
    /// Games that hit the round cap.
    pub unfinished: u32,
    /// Mean rounds played.
    pub avg_rounds: f64,
    /// Mean cities at the end, by civilization name.
    pub avg_cities: BTreeMap<String, f64>,
    /// Forced AI turns across the batch.
    pub forced_turns: u32,
}

impl BatchSummary {
    /// Summarize a set of games.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        let mut summary = Self {
            games: games.len() as u32,
            ..Default::default()
        };
        if games.is_empty() {
            return summary;
        }
        let n = games.len() as f64;

        let mut wins: BTreeMap<String, u32> = BTreeMap::new();
        let mut cities: BTreeMap<String, u32> = BTreeMap::new();
        let mut rounds = 0u64;
        for game in games {
            rounds += u64::from(game.rounds_played);
            summary.forced_turns += game.forced_turns;
            match &game.winner {
                Some(name) => *wins.entry(name.clone()).or_default() += 1,
                None => summary.unfinished += 1,
            }
            for (name, civ) in &game.civs {
                *cities.entry(name.clone()).or_default() += civ.final_cities;
                wins.entry(name.clone()).or_default();
            }
        }

        summary.avg_rounds = rounds as f64 / n;
        summary.win_rates = wins.into_iter().map(|(k, v)| (k, v as f64 / n)).collect();
        summary.avg_cities = cities.into_iter().map(|(k, v)| (k, v as f64 / n)).collect();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civ_core::grid::Coord;
    use civ_core::unit::{UnitId, UnitKind};

    #[test]
    fn test_record_combat() {
        let mut collector = MetricsCollector::new();
        collector.record(&GameEvent::CombatVictory {
            attacker: UnitId(1),
            defender: UnitId(2),
            attacker_civ: CivId(0),
            defender_civ: CivId(1),
            at: Coord::new(0, 0),
        });
        collector.record(&GameEvent::CombatDefeat {
            attacker: UnitId(3),
            defender: UnitId(4),
            attacker_civ: CivId(0),
            defender_civ: CivId(1),
            at: Coord::new(0, 0),
        });
        assert_eq!(collector.civs[&CivId(0)].battles_won, 1);
        assert_eq!(collector.civs[&CivId(0)].battles_lost, 1);
        assert_eq!(collector.civs[&CivId(1)].battles_won, 1);
        assert_eq!(collector.civs[&CivId(1)].battles_lost, 1);
    }

    #[test]
    fn test_events_carry_round() {
        let mut collector = MetricsCollector::new();
        collector.record(&GameEvent::RoundAdvanced { round: 4, year: -3920 });
        collector.record(&GameEvent::UnitCreated {
            unit: UnitId(9),
            civ: CivId(1),
            kind: UnitKind::Warrior,
            at: Coord::new(2, 2),
        });
        collector.record(&GameEvent::CivEliminated { civ: CivId(0) });
        assert_eq!(collector.civs[&CivId(1)].units_produced["Warrior"], 1);
        assert_eq!(collector.civs[&CivId(0)].eliminated_round, Some(4));
        assert_eq!(collector.events.len(), 1);
        assert_eq!(collector.events[0].kind, "CIV_ELIMINATED");
    }

    #[test]
    fn test_summary_win_rates() {
        let mut a = GameMetrics::new("a", "duel", 1);
        a.winner = Some("Rome".into());
        a.rounds_played = 10;
        a.civs.insert("Rome".into(), CivMetrics { final_cities: 2, ..Default::default() });
        a.civs.insert("Babylon".into(), CivMetrics::default());
        let mut b = GameMetrics::new("b", "duel", 2);
        b.rounds_played = 30;
        b.civs.insert("Rome".into(), CivMetrics { final_cities: 4, ..Default::default() });
        b.civs.insert("Babylon".into(), CivMetrics { final_cities: 1, ..Default::default() });

        let summary = BatchSummary::from_games(&[a, b]);
        assert_eq!(summary.games, 2);
        assert_eq!(summary.unfinished, 1);
        assert!((summary.avg_rounds - 20.0).abs() < f64::EPSILON);
        assert!((summary.win_rates["Rome"] - 0.5).abs() < f64::EPSILON);
        assert!(summary.win_rates["Babylon"].abs() < f64::EPSILON);
        assert!((summary.avg_cities["Rome"] - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_games(&[]).games, 0);
    }
}
