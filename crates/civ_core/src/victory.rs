//! End-of-turn victory evaluation.

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::context::SimulationContext;
use crate::events::GameEvent;

/// Decides at the end of every turn whether the game is over.
pub trait VictoryEvaluator {
    /// Inspect (and possibly update) the game. `true` halts the scheduler.
    fn evaluate_end_of_turn(&mut self, ctx: &mut SimulationContext) -> bool;
}

/// Never ends the game.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoVictory;

impl VictoryEvaluator for NoVictory {
    fn evaluate_end_of_turn(&mut self, _ctx: &mut SimulationContext) -> bool {
        false
    }
}

/// Elimination victory with an optional round limit.
///
/// A civilization with neither units nor cities is eliminated. The game
/// halts when at most one of several civilizations survives, or after the
/// last living civilization finishes its turn in the final round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardVictory {
    /// Number of rounds to play, if limited.
    #[serde(default)]
    pub round_limit: Option<u32>,
}

impl StandardVictory {
    /// Evaluator that stops after `rounds` rounds.
    #[must_use]
    pub const fn with_round_limit(rounds: u32) -> Self {
        Self {
            round_limit: Some(rounds),
        }
    }
}

impl VictoryEvaluator for StandardVictory {
    fn evaluate_end_of_turn(&mut self, ctx: &mut SimulationContext) -> bool {
        let eliminated: Vec<CivId> = ctx
            .living_civs()
            .into_iter()
            .filter(|civ| ctx.world.units_of(*civ).is_empty() && ctx.world.cities_of(*civ).is_empty())
            .collect();
        for civ in eliminated {
            if let Some(c) = ctx.civ_mut(civ) {
                c.is_alive = false;
            }
            tracing::info!(civ = %civ, round = ctx.turn.round, "civilization eliminated");
            ctx.events.emit(GameEvent::CivEliminated { civ });
        }

        let living = ctx.living_civs();
        if ctx.civs.len() > 1 && living.len() <= 1 {
            return true;
        }
        if living.is_empty() {
            return true;
        }

        let last_to_move = living.last() == Some(&ctx.turn.active_civ);
        self.round_limit
            .is_some_and(|limit| last_to_move && ctx.turn.round + 1 >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::Civilization;
    use crate::grid::Coord;
    use crate::map::{GameMap, TerrainKind};
    use crate::rules::Rules;
    use crate::unit::UnitKind;

    fn ctx() -> SimulationContext {
        let map = GameMap::filled(8, 8, TerrainKind::Grassland).unwrap();
        let civs = vec![
            Civilization::new(CivId(0), "Rome", false),
            Civilization::new(CivId(1), "Carthage", false),
            Civilization::new(CivId(2), "Egypt", false),
        ];
        SimulationContext::new(map, Rules::default(), civs).unwrap()
    }

    #[test]
    fn test_empty_civs_are_eliminated() {
        let mut ctx = ctx();
        ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(1, 1));
        ctx.place_city(CivId(1), Coord::new(5, 5));
        let mut victory = StandardVictory::default();
        assert!(!victory.evaluate_end_of_turn(&mut ctx));
        assert_eq!(ctx.living_civs(), vec![CivId(0), CivId(1)]);
    }

    #[test]
    fn test_last_survivor_halts() {
        let mut ctx = ctx();
        ctx.spawn_unit(CivId(2), UnitKind::Warrior, Coord::new(1, 1));
        assert!(StandardVictory::default().evaluate_end_of_turn(&mut ctx));
    }

    #[test]
    fn test_round_limit_waits_for_last_mover() {
        let mut ctx = ctx();
        for civ in 0..3 {
            ctx.spawn_unit(CivId(civ), UnitKind::Warrior, Coord::new(i32::from(civ), 0));
        }
        let mut victory = StandardVictory::with_round_limit(1);
        assert!(!victory.evaluate_end_of_turn(&mut ctx));
        ctx.turn.active_civ = CivId(2);
        assert!(victory.evaluate_end_of_turn(&mut ctx));
        assert!(!NoVictory.evaluate_end_of_turn(&mut ctx));
    }
}
