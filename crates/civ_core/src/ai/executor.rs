//! Turning a target tile into one committed move.
//!
//! Adjacent targets are moved onto (or attacked) directly. Distant ones get
//! a path and only its first step is taken; the target is re-evaluated on
//! the next iteration anyway. A failed step falls back once to the cheapest
//! neighbor the unit can afford.

use crate::actions::{entry_cost, move_unit, MoveOutcome};
use crate::context::SimulationContext;
use crate::error::MoveError;
use crate::grid::Coord;
use crate::pathfinding::find_path_with;
use crate::turn::TurnTicket;
use crate::unit::{Unit, UnitId};
use crate::world::OccupantLookup;

/// Can `unit` never path through `c`.
///
/// Impassable terrain, terrain costing more than a full turn of moves and
/// tiles where its owner sees a foreign unit or city all block.
#[must_use]
pub fn is_blocked(ctx: &SimulationContext, unit: &Unit, c: Coord) -> bool {
    match entry_cost(ctx, unit, c) {
        Ok(cost) if cost <= unit.max_moves => {}
        _ => return true,
    }
    if !ctx.is_visible(unit.owner, c) {
        return false;
    }
    ctx.world.city_at(c).is_some_and(|(owner, _)| owner != unit.owner)
        || ctx.world.foreign_unit_at(c, unit.owner).is_some()
}

/// Path for `unit` to `target`, ignoring whatever blocks the target itself.
#[must_use]
pub fn path_for(ctx: &SimulationContext, unit: &Unit, target: Coord) -> Vec<Coord> {
    find_path_with(ctx.bounds(), unit.coord, target, |c| c != target && is_blocked(ctx, unit, c))
}

/// Cheapest affordable neighbor (all eight directions) that holds nothing
/// foreign. Ties go to the tile nearest `hint`, then to ring order.
#[must_use]
pub fn cheapest_neighbor(ctx: &SimulationContext, unit: &Unit, hint: Option<Coord>) -> Option<Coord> {
    unit.coord
        .ring(1)
        .into_iter()
        .filter(|c| ctx.bounds().contains(*c))
        .filter(|c| ctx.world.city_at(*c).map_or(true, |(owner, _)| owner == unit.owner))
        .filter(|c| ctx.world.foreign_unit_at(*c, unit.owner).is_none())
        .filter_map(|c| {
            let cost = entry_cost(ctx, unit, c).ok()?;
            (cost <= unit.moves_remaining).then_some((c, cost))
        })
        .min_by_key(|(c, cost)| (*cost, hint.map_or(0, |h| c.distance(h))))
        .map(|(c, _)| c)
}

/// Take one step toward `target`.
///
/// Stale tickets are reported as such and never trigger the fallback.
pub fn step_toward(
    ctx: &mut SimulationContext,
    ticket: TurnTicket,
    unit_id: UnitId,
    target: Coord,
) -> Result<MoveOutcome, MoveError> {
    let unit = ctx.world.unit(unit_id).ok_or(MoveError::UnitNotFound)?;
    if unit.coord == target {
        return Err(MoveError::InvalidTarget);
    }

    let next = if unit.coord.is_adjacent(target) {
        Some(target)
    } else {
        path_for(ctx, unit, target).get(1).copied()
    };

    let first_error = match next {
        Some(step) => match move_unit(ctx, ticket, unit_id, step) {
            Ok(outcome) => return Ok(outcome),
            Err(MoveError::StaleTurn) => return Err(MoveError::StaleTurn),
            Err(err) => err,
        },
        None => MoveError::CannotMove,
    };

    let unit = ctx.world.unit(unit_id).ok_or(MoveError::UnitNotFound)?;
    let Some(fallback) = cheapest_neighbor(ctx, unit, Some(target)) else {
        return Err(first_error);
    };
    tracing::trace!(unit = %unit_id, target = %target, fallback = %fallback, error = %first_error, "step fallback");
    move_unit(ctx, ticket, unit_id, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::{CivId, Civilization};
    use crate::map::{GameMap, TerrainKind};
    use crate::rules::Rules;
    use crate::unit::UnitKind;

    fn ctx(map: GameMap) -> SimulationContext {
        let civs = vec![Civilization::new(CivId(0), "Rome", false), Civilization::new(CivId(1), "Carthage", false)];
        SimulationContext::new(map, Rules::default(), civs).unwrap()
    }

    #[test]
    fn test_first_step_of_path() {
        let mut ctx = ctx(GameMap::filled(10, 10, TerrainKind::Grassland).unwrap());
        let ticket = ctx.turn.ticket();
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(0, 0));
        assert_eq!(step_toward(&mut ctx, ticket, w, Coord::new(0, 5)), Ok(MoveOutcome::Moved));
        assert_eq!(ctx.world.unit(w).map(|u| u.coord), Some(Coord::new(0, 1)));
    }

    #[test]
    fn test_mountains_block_slow_units() {
        let mut map = GameMap::filled(5, 5, TerrainKind::Grassland).unwrap();
        map.set_terrain(Coord::new(1, 0), TerrainKind::Mountain);
        let mut ctx = ctx(map);
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(0, 0));
        let unit = ctx.world.unit(w).unwrap();
        assert!(is_blocked(&ctx, unit, Coord::new(1, 0)));
        let path = path_for(&ctx, unit, Coord::new(2, 0));
        assert!(!path.contains(&Coord::new(1, 0)));
        assert_eq!(path.last(), Some(&Coord::new(2, 0)));
    }

    #[test]
    fn test_fallback_picks_cheapest_neighbor() {
        let mut map = GameMap::filled(3, 3, TerrainKind::Forest).unwrap();
        map.set_terrain(Coord::new(2, 1), TerrainKind::Grassland);
        map.set_terrain(Coord::new(0, 0), TerrainKind::Ocean);
        let mut ctx = ctx(map);
        let ticket = ctx.turn.ticket();
        let s = ctx.spawn_unit(CivId(0), UnitKind::Scout, Coord::new(1, 1));
        let unit = ctx.world.unit(s).unwrap();
        assert_eq!(cheapest_neighbor(&ctx, unit, None), Some(Coord::new(2, 1)));

        // Ocean target is impassable, so the fallback is used
        assert_eq!(step_toward(&mut ctx, ticket, s, Coord::new(0, 0)), Ok(MoveOutcome::Moved));
        assert_eq!(ctx.world.unit(s).map(|u| u.coord), Some(Coord::new(2, 1)));
    }

    #[test]
    fn test_stale_ticket_skips_fallback() {
        let mut ctx = ctx(GameMap::filled(5, 5, TerrainKind::Grassland).unwrap());
        let ticket = ctx.turn.ticket();
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(2, 2));
        ctx.turn.bump_epoch();
        assert_eq!(step_toward(&mut ctx, ticket, w, Coord::new(2, 3)), Err(MoveError::StaleTurn));
        assert_eq!(ctx.world.unit(w).map(|u| u.coord), Some(Coord::new(2, 2)));
    }
}
