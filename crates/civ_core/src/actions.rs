//! Unit actions: move, attack, found, fortify, skip.
//!
//! Every action takes the [`TurnTicket`] of the turn it was issued in and
//! is rejected with `StaleTurn` before touching anything if that turn is
//! over. The AI and human players go through the same functions.

use serde::{Deserialize, Serialize};

use crate::city::CityId;
use crate::civilization::CivId;
use crate::combat::{self, defense_strength, CombatWinner};
use crate::context::SimulationContext;
use crate::economy::city_yields;
use crate::error::{ActionError, MoveError};
use crate::events::GameEvent;
use crate::grid::Coord;
use crate::map::TileLookup;
use crate::settlement::is_valid_settlement_site;
use crate::turn::TurnTicket;
use crate::unit::{Unit, UnitId};
use crate::world::OccupantLookup;

/// What a successful move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The unit changed tile.
    Moved,
    /// The unit attacked and won; it stays where it was.
    CombatVictory,
    /// The unit attacked and lost.
    CombatDefeat,
}

/// Cost for `unit` to enter `target`, or why it cannot.
pub fn entry_cost(ctx: &SimulationContext, unit: &Unit, target: Coord) -> Result<u32, MoveError> {
    let terrain = ctx.map.tile(target).ok_or(MoveError::InvalidTarget)?.terrain;
    ctx.rules
        .move_cost(unit.kind.domain(), terrain)
        .ok_or(MoveError::TerrainImpassable)
}

/// Move `unit` onto an adjacent tile, attacking if a foreign unit holds it.
///
/// Diagonal steps are allowed. The unit must have at least the terrain
/// cost in movement points left. Foreign cities cannot be entered.
pub fn move_unit(
    ctx: &mut SimulationContext,
    ticket: TurnTicket,
    unit_id: UnitId,
    target: Coord,
) -> Result<MoveOutcome, MoveError> {
    if !ctx.accepts(ticket) {
        return Err(MoveError::StaleTurn);
    }
    let unit = ctx
        .world
        .unit(unit_id)
        .filter(|u| u.is_active())
        .ok_or(MoveError::UnitNotFound)?;
    if unit.owner != ticket.civ {
        return Err(MoveError::CannotMove);
    }
    if !ctx.bounds().contains(target) || !unit.coord.is_adjacent(target) {
        return Err(MoveError::InvalidTarget);
    }
    if unit.moves_remaining == 0 {
        return Err(MoveError::NoMovesLeft);
    }
    let cost = entry_cost(ctx, unit, target)?;
    let (owner, from, can_attack) = (unit.owner, unit.coord, unit.attack > 0);
    if cost > unit.moves_remaining {
        return Err(MoveError::InsufficientMoves);
    }

    if let Some(defender) = strongest_defender(ctx, owner, target) {
        if !can_attack {
            return Err(MoveError::CannotMove);
        }
        return Ok(attack(ctx, unit_id, defender, target, cost));
    }
    // Undefended foreign cities cannot be entered
    if ctx.world.city_at(target).is_some_and(|(city_owner, _)| city_owner != owner) {
        return Err(MoveError::CannotMove);
    }

    let Some(unit) = ctx.world.unit_mut(unit_id) else {
        return Err(MoveError::UnitNotFound);
    };
    unit.coord = target;
    unit.spend_moves(cost);
    unit.status.fortified = false;
    let moves_remaining = unit.moves_remaining;

    ctx.events.emit(GameEvent::UnitMoved {
        unit: unit_id,
        civ: owner,
        from,
        to: target,
        moves_remaining,
    });
    ctx.refresh_visibility(owner);
    Ok(MoveOutcome::Moved)
}

/// Best defender among the foreign units on `at`; lowest id wins ties.
fn strongest_defender(ctx: &SimulationContext, viewer: CivId, at: Coord) -> Option<UnitId> {
    let mut best: Option<&Unit> = None;
    for (_, id) in ctx.world.foreign_units_at(at, viewer) {
        let Some(candidate) = ctx.world.unit(id) else {
            continue;
        };
        if best.map_or(true, |b| defense_strength(candidate) > defense_strength(b)) {
            best = Some(candidate);
        }
    }
    best.map(|u| u.id)
}

fn attack(ctx: &mut SimulationContext, attacker_id: UnitId, defender_id: UnitId, at: Coord, cost: u32) -> MoveOutcome {
    let (Some(attacker), Some(defender)) = (ctx.world.unit(attacker_id), ctx.world.unit(defender_id)) else {
        return MoveOutcome::CombatDefeat;
    };
    let result = combat::resolve(attacker, defender);
    let (attacker_civ, defender_civ) = (attacker.owner, defender.owner);

    let (winner, loser) = match result.winner {
        CombatWinner::Attacker => (attacker_id, defender_id),
        CombatWinner::Defender => (defender_id, attacker_id),
    };
    if let Some(unit) = ctx.world.unit_mut(winner) {
        unit.health = result.winner_health;
    }
    if let Some(unit) = ctx.world.unit_mut(loser) {
        unit.defeated = true;
        unit.moves_remaining = 0;
    }
    if let Some(unit) = ctx.world.unit_mut(attacker_id) {
        unit.spend_moves(cost);
        unit.status.fortified = false;
    }

    tracing::debug!(
        attacker = %attacker_id,
        defender = %defender_id,
        winner = ?result.winner,
        at = %at,
        "combat"
    );
    let (event, outcome) = match result.winner {
        CombatWinner::Attacker => (
            GameEvent::CombatVictory {
                attacker: attacker_id,
                defender: defender_id,
                attacker_civ,
                defender_civ,
                at,
            },
            MoveOutcome::CombatVictory,
        ),
        CombatWinner::Defender => (
            GameEvent::CombatDefeat {
                attacker: attacker_id,
                defender: defender_id,
                attacker_civ,
                defender_civ,
                at,
            },
            MoveOutcome::CombatDefeat,
        ),
    };
    ctx.events.emit(event);
    ctx.refresh_visibility(attacker_civ);
    ctx.refresh_visibility(defender_civ);
    outcome
}

fn owned_unit(ctx: &SimulationContext, ticket: TurnTicket, unit_id: UnitId) -> Result<&Unit, ActionError> {
    if !ctx.accepts(ticket) {
        return Err(ActionError::StaleTurn);
    }
    let unit = ctx
        .world
        .unit(unit_id)
        .filter(|u| u.is_active())
        .ok_or(ActionError::UnitNotFound)?;
    if unit.owner != ticket.civ {
        return Err(ActionError::NotOwner);
    }
    Ok(unit)
}

/// Consume a settler to found a city on its tile.
pub fn found_city(ctx: &mut SimulationContext, ticket: TurnTicket, unit_id: UnitId) -> Result<CityId, ActionError> {
    let unit = owned_unit(ctx, ticket, unit_id)?;
    if !unit.kind.can_settle() {
        return Err(ActionError::Unsupported);
    }
    let (owner, at) = (unit.owner, unit.coord);
    if !is_valid_settlement_site(at, &ctx.map, &ctx.world, owner, ctx.rules.min_city_distance) {
        return Err(ActionError::InvalidSite);
    }

    ctx.remove_unit(unit_id);
    let city = ctx.place_city(owner, at);
    let yields = ctx
        .world
        .city(city)
        .map(|c| city_yields(&ctx.map, &ctx.rules, c.coord, c.population))
        .unwrap_or_default();
    if let Some(c) = ctx.world.city_mut(city) {
        c.yields = yields;
    }
    Ok(city)
}

/// Dig in: defense bonus, no more moves this turn.
pub fn fortify_unit(ctx: &mut SimulationContext, ticket: TurnTicket, unit_id: UnitId) -> Result<(), ActionError> {
    let unit = owned_unit(ctx, ticket, unit_id)?;
    if !unit.kind.can_fortify() {
        return Err(ActionError::Unsupported);
    }
    let owner = unit.owner;
    if let Some(unit) = ctx.world.unit_mut(unit_id) {
        unit.status.fortified = true;
        unit.moves_remaining = 0;
    }
    ctx.events.emit(GameEvent::UnitFortified { unit: unit_id, civ: owner });
    Ok(())
}

/// Done with this unit for the turn.
pub fn skip_unit(ctx: &mut SimulationContext, ticket: TurnTicket, unit_id: UnitId) -> Result<(), ActionError> {
    owned_unit(ctx, ticket, unit_id)?;
    if let Some(unit) = ctx.world.unit_mut(unit_id) {
        unit.status.skipped = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::Civilization;
    use crate::map::{GameMap, TerrainKind};
    use crate::rules::Rules;
    use crate::unit::UnitKind;

    fn ctx() -> SimulationContext {
        let mut map = GameMap::filled(10, 10, TerrainKind::Grassland).unwrap();
        map.set_terrain(Coord::new(3, 0), TerrainKind::Ocean);
        map.set_terrain(Coord::new(0, 3), TerrainKind::Forest);
        let civs = vec![Civilization::new(CivId(0), "Rome", false), Civilization::new(CivId(1), "Carthage", false)];
        SimulationContext::new(map, Rules::default(), civs).unwrap()
    }

    #[test]
    fn test_rejection_reasons() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(2, 0));
        let s = ctx.spawn_unit(CivId(0), UnitKind::Scout, Coord::new(0, 2));

        assert_eq!(move_unit(&mut ctx, ticket, UnitId(99), Coord::new(0, 0)), Err(MoveError::UnitNotFound));
        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(4, 4)), Err(MoveError::InvalidTarget));
        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(2, -1)), Err(MoveError::InvalidTarget));
        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(3, 0)), Err(MoveError::TerrainImpassable));

        // Scout has 2 moves; forest costs 2, then nothing is left
        assert_eq!(move_unit(&mut ctx, ticket, s, Coord::new(0, 3)), Ok(MoveOutcome::Moved));
        assert_eq!(move_unit(&mut ctx, ticket, s, Coord::new(0, 4)), Err(MoveError::NoMovesLeft));

        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(1, 1)), Ok(MoveOutcome::Moved));
        assert_eq!(ctx.world.unit(w).map(|u| u.moves_remaining), Some(0));
    }

    #[test]
    fn test_insufficient_moves_for_terrain() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let s = ctx.spawn_unit(CivId(0), UnitKind::Scout, Coord::new(2, 3));
        assert_eq!(move_unit(&mut ctx, ticket, s, Coord::new(1, 3)), Ok(MoveOutcome::Moved));
        // One point left, forest needs two
        assert_eq!(move_unit(&mut ctx, ticket, s, Coord::new(0, 3)), Err(MoveError::InsufficientMoves));
        assert_eq!(ctx.world.unit(s).map(|u| u.moves_remaining), Some(1));
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(5, 5));
        ctx.turn.bump_epoch();
        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(5, 6)), Err(MoveError::StaleTurn));
        assert_eq!(fortify_unit(&mut ctx, ticket, w), Err(ActionError::StaleTurn));
        assert_eq!(ctx.world.unit(w).map(|u| u.coord), Some(Coord::new(5, 5)));
    }

    #[test]
    fn test_foreign_units_cannot_be_ordered() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let enemy = ctx.spawn_unit(CivId(1), UnitKind::Warrior, Coord::new(5, 5));
        assert_eq!(move_unit(&mut ctx, ticket, enemy, Coord::new(5, 6)), Err(MoveError::CannotMove));
        assert_eq!(skip_unit(&mut ctx, ticket, enemy), Err(ActionError::NotOwner));
    }

    #[test]
    fn test_attack_does_not_advance() {
        let mut ctx = ctx();
        ctx.events.set_recording(true);
        let ticket = ctx.turn.ticket();
        let mut rules = ctx.rules.clone();
        if let Some(rule) = rules.units.get_mut(&UnitKind::Warrior) {
            rule.attack = 3;
        }
        ctx.rules = rules;
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(5, 5));
        let scout = ctx.spawn_unit(CivId(1), UnitKind::Scout, Coord::new(6, 5));

        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(6, 5)), Ok(MoveOutcome::CombatVictory));
        assert_eq!(ctx.world.unit(w).map(|u| u.coord), Some(Coord::new(5, 5)));
        assert!(ctx.world.unit(scout).is_some_and(|u| u.defeated));
        assert!(ctx.events.recorded().iter().any(|e| e.name() == "COMBAT_VICTORY"));
        assert_eq!(ctx.purge_defeated(), 1);
    }

    #[test]
    fn test_unarmed_units_cannot_attack() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let s = ctx.spawn_unit(CivId(0), UnitKind::Scout, Coord::new(5, 5));
        ctx.spawn_unit(CivId(1), UnitKind::Warrior, Coord::new(6, 5));
        assert_eq!(move_unit(&mut ctx, ticket, s, Coord::new(6, 5)), Err(MoveError::CannotMove));
    }

    #[test]
    fn test_found_city_consumes_settler() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let settler = ctx.spawn_unit(CivId(0), UnitKind::Settler, Coord::new(5, 5));
        let city = found_city(&mut ctx, ticket, settler).unwrap();
        assert!(ctx.world.unit(settler).is_none());
        assert_eq!(ctx.world.city(city).map(|c| c.coord), Some(Coord::new(5, 5)));
        assert!(ctx.world.city(city).is_some_and(|c| c.yields.food > 0));

        let second = ctx.spawn_unit(CivId(0), UnitKind::Settler, Coord::new(6, 6));
        assert_eq!(found_city(&mut ctx, ticket, second), Err(ActionError::InvalidSite));
        let warrior = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(9, 9));
        assert_eq!(found_city(&mut ctx, ticket, warrior), Err(ActionError::Unsupported));
    }

    #[test]
    fn test_foreign_city_blocks_entry() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        ctx.place_city(CivId(1), Coord::new(8, 8));
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(7, 7));
        assert_eq!(move_unit(&mut ctx, ticket, w, Coord::new(8, 8)), Err(MoveError::CannotMove));
    }

    #[test]
    fn test_fortify_zeroes_moves() {
        let mut ctx = ctx();
        let ticket = ctx.turn.ticket();
        let w = ctx.spawn_unit(CivId(0), UnitKind::Warrior, Coord::new(5, 5));
        fortify_unit(&mut ctx, ticket, w).unwrap();
        let unit = ctx.world.unit(w).unwrap();
        assert!(unit.status.fortified);
        assert_eq!(unit.moves_remaining, 0);
    }
}
