//! Single headless game runs.
//!
//! Builds a [`Game`] from a [`Scenario`], plays it round by round on the
//! wall clock and folds the event stream into [`GameMetrics`]. Human slots
//! are passed without orders.

use civ_core::clock::SystemClock;
use civ_core::error::Result;
use civ_core::game::Game;
use tracing::{debug, info};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::Scenario;

/// Plays one scenario to completion.
#[derive(Debug, Clone)]
pub struct GameRunner {
    scenario: Scenario,
    game_id: String,
}

impl GameRunner {
    /// Runner for `scenario`, identified by its name and seed.
    #[must_use]
    pub fn new(scenario: Scenario) -> Self {
        let game_id = format!("{}-{}", scenario.name, scenario.seed());
        Self { scenario, game_id }
    }

    /// Override the identifier written to the metrics.
    #[must_use]
    pub fn with_game_id(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    /// The scenario being played.
    #[must_use]
    pub const fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Fresh game for the scenario, not yet started.
    pub fn build_game(&self) -> Result<Game> {
        Game::new_generated_with(
            &self.scenario.game,
            Box::new(SystemClock::new()),
            self.scenario.evaluator(),
        )
    }

    /// Play until the round cap or the end of the game.
    pub fn run(&self) -> Result<GameMetrics> {
        self.run_with(|_| {})
    }

    /// Like [`GameRunner::run`], calling `on_round` after every round.
    pub fn run_with<F>(&self, mut on_round: F) -> Result<GameMetrics>
    where
        F: FnMut(&Game),
    {
        let mut game = self.build_game()?;
        let collector = MetricsCollector::attach(&mut game);
        info!(
            game = %self.game_id,
            civs = self.scenario.game.civs.len(),
            max_rounds = self.scenario.max_rounds,
            "game started"
        );

        while game.round() < self.scenario.max_rounds && !game.is_halted() {
            game.run_rounds(1)?;
            collector.borrow_mut().sample(&game);
            debug!(game = %self.game_id, round = game.round(), year = game.year(), "round complete");
            on_round(&game);
        }

        let collected = collector.borrow().clone();
        let metrics = collected.finish(&game, &self.game_id, &self.scenario.name, self.scenario.seed());
        info!(
            game = %self.game_id,
            rounds = metrics.rounds_played,
            winner = ?metrics.winner,
            cities = metrics.total_cities(),
            hash = metrics.final_state_hash,
            "game finished"
        );
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EndCondition;

    fn short_duel() -> Scenario {
        Scenario::duel().with_max_rounds(8)
    }

    #[test]
    fn test_run_reaches_round_cap() {
        let metrics = GameRunner::new(short_duel()).run().unwrap();
        assert_eq!(metrics.rounds_played, 8);
        assert_eq!(metrics.end_condition, EndCondition::RoundLimit);
        assert_eq!(metrics.winner, None);
        assert_eq!(metrics.civs.len(), 2);
        assert!(metrics.civs.values().all(|c| c.explored_tiles > 0));
        assert_eq!(metrics.game_id, "duel-12345");
    }

    #[test]
    fn test_runs_are_reproducible() {
        let a = GameRunner::new(short_duel()).run().unwrap();
        let b = GameRunner::new(short_duel()).run().unwrap();
        assert_eq!(a.final_state_hash, b.final_state_hash);
        assert_eq!(a, b);
    }

    #[test]
    fn test_on_round_called_each_round() {
        let mut rounds = Vec::new();
        GameRunner::new(short_duel().with_max_rounds(3))
            .run_with(|game| rounds.push(game.round()))
            .unwrap();
        assert_eq!(rounds, vec![1, 2, 3]);
    }

    #[test]
    fn test_human_slots_are_passed() {
        let mut scenario = short_duel().with_max_rounds(2);
        scenario.game.civs[1].is_human = true;
        let metrics = GameRunner::new(scenario).run().unwrap();
        assert_eq!(metrics.rounds_played, 2);
        assert_eq!(metrics.civs["Babylon"].moves, 0);
    }
}
