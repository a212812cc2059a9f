//! Per-archetype target selection.
//!
//! Settlers look for the best site nearby, military units march on the
//! nearest known enemy city, scouts sweep their zone and run home with
//! news. Anything without a better idea explores.

use crate::actions::entry_cost;
use crate::ai::executor::{cheapest_neighbor, path_for};
use crate::ai::Decision;
use crate::civilization::CivId;
use crate::context::SimulationContext;
use crate::enemy_search::{find_all_enemies_in_radius, find_nearest_enemy_in_zone, EnemyKind, EnemySighting};
use crate::events::{GameEvent, TargetReason};
use crate::grid::{Coord, Rect};
use crate::production;
use crate::settlement::{find_best_settlement_location, is_valid_settlement_site, SettlementPreset, SettlementQuery};
use crate::turn::TurnTicket;
use crate::unit::{Unit, UnitId, UnitKind, UnitRole};
use crate::visibility::{IntelUpdate, Observation};
use crate::world::OccupantLookup;

/// Weights the AI uses to pick city sites.
pub const SETTLER_PRESET: SettlementPreset = SettlementPreset::BalancedGrowth;

/// Minimum distance the AI keeps between its own cities.
pub const AI_MIN_CITY_DISTANCE: u32 = 3;

/// An own city with a visible enemy unit this close is under threat.
pub const THREAT_RADIUS: u32 = 2;

/// Military units within this distance fall back to a threatened city.
pub const DEFEND_RANGE: u32 = 6;

/// Intel older than this many rounds is worth another look.
pub const STALE_INTEL_ROUNDS: u32 = 10;

/// Decide what `unit_id` does next and announce the target.
///
/// May record intel or queue production as a side effect; never moves
/// anything itself.
pub fn decide(ctx: &mut SimulationContext, ticket: TurnTicket, unit_id: UnitId) -> Decision {
    let Some(unit) = ctx.world.unit(unit_id).filter(|u| u.is_active()).cloned() else {
        return Decision::Skip;
    };

    let decision = match unit.kind.role() {
        UnitRole::Settler => settler(ctx, &unit),
        UnitRole::Military => military(ctx, &unit),
        UnitRole::Scout => scout(ctx, ticket, &unit),
        UnitRole::Naval => None,
    }
    .unwrap_or_else(|| explore(ctx, &unit));

    tracing::debug!(civ = %unit.owner, unit = %unit_id, kind = unit.kind.name(), decision = ?decision, "ai decision");
    if let Decision::MoveToward { target, reason } = decision {
        ctx.events.emit(GameEvent::AiTargetHighlight {
            unit: unit_id,
            civ: unit.owner,
            target,
            reason,
        });
    }
    decision
}

fn settler(ctx: &mut SimulationContext, unit: &Unit) -> Option<Decision> {
    let (civ, at) = (unit.owner, unit.coord);
    let min_distance = AI_MIN_CITY_DISTANCE.max(ctx.rules.min_city_distance);

    let valid_here = is_valid_settlement_site(at, &ctx.map, &ctx.world, civ, min_distance);
    if valid_here && ctx.ai_memory.is_oscillating(unit.id) {
        tracing::debug!(unit = %unit.id, at = %at, "settler oscillating, founding in place");
        return Some(Decision::Found);
    }
    ctx.ai_memory.record_settler_position(unit.id, at);

    let view: &SimulationContext = ctx;
    let explored = |c: Coord| view.is_explored(civ, c);
    let reachable = |c: Coord| c == at || path_for(view, unit, c).len() >= 2;
    let query = SettlementQuery::new(at, civ, SETTLER_PRESET, min_distance)
        .with_visibility(&explored)
        .with_reachability(&reachable);
    let site = find_best_settlement_location(&query, &view.map, &view.rules, &view.world)?;

    if site.coord == at {
        Some(Decision::Found)
    } else {
        Some(Decision::MoveToward {
            target: site.coord,
            reason: TargetReason::Settle,
        })
    }
}

fn military(ctx: &mut SimulationContext, unit: &Unit) -> Option<Decision> {
    let civ = unit.owner;
    if let Some(home) = threatened_city(ctx, unit) {
        // Garrisons hold without digging in so they can react next turn
        if unit.coord == home {
            return Some(Decision::Skip);
        }
        return Some(Decision::MoveToward {
            target: home,
            reason: TargetReason::Defend,
        });
    }

    let enemy_city = ctx
        .fog
        .all_intel(civ)
        .filter(|(_, r)| r.kind == EnemyKind::City)
        .min_by_key(|(_, r)| unit.coord.distance(r.coord))
        .map(|(_, r)| r.coord);

    if let Some(city) = enemy_city {
        // Cities cannot be entered; an undefended one is besieged
        if unit.coord.is_adjacent(city) && ctx.world.foreign_unit_at(city, civ).is_none() {
            return Some(if unit.kind.can_fortify() {
                Decision::Fortify
            } else {
                Decision::Skip
            });
        }
        return Some(Decision::MoveToward {
            target: city,
            reason: TargetReason::EnemyCity,
        });
    }

    let rally = ctx.ai_memory.rally(unit.id)?;
    if unit.coord.distance(rally) <= 1 {
        ctx.ai_memory.clear_rally(unit.id);
        return None;
    }
    Some(Decision::MoveToward {
        target: rally,
        reason: TargetReason::Rally,
    })
}

/// Nearest own city within [`DEFEND_RANGE`] that has a visible enemy unit
/// within [`THREAT_RADIUS`].
fn threatened_city(ctx: &SimulationContext, unit: &Unit) -> Option<Coord> {
    let civ = unit.owner;
    let bounds = ctx.bounds();
    ctx.world
        .cities_of(civ)
        .into_iter()
        .filter(|city| unit.coord.distance(city.coord) <= DEFEND_RANGE)
        .filter(|city| {
            find_all_enemies_in_radius(city.coord, bounds, &ctx.world, |c| ctx.is_visible(civ, c), civ, THREAT_RADIUS)
                .iter()
                .any(|s| s.kind == EnemyKind::Unit)
        })
        .min_by_key(|city| unit.coord.distance(city.coord))
        .map(|city| city.coord)
}

fn scout(ctx: &mut SimulationContext, ticket: TurnTicket, unit: &Unit) -> Option<Decision> {
    let civ = unit.owner;
    if let Some(found) = ctx.ai_memory.enemy_found(unit.id).copied() {
        if let Some(decision) = return_home(ctx, ticket, unit, found) {
            return Some(decision);
        }
    }

    if ctx.fog.zone_for(civ, unit.id).is_none() {
        ctx.refresh_scout_zones(civ);
    }
    let zone = ctx
        .fog
        .zone_for(civ, unit.id)
        .filter(|z| !z.is_empty())
        .unwrap_or_else(|| ctx.bounds());

    let view: &SimulationContext = ctx;
    let sighting = find_nearest_enemy_in_zone(
        unit.coord,
        view.bounds(),
        zone,
        &view.world,
        |c| view.is_visible(civ, c),
        civ,
        None,
    );
    if let Some(found) = sighting {
        if record_sighting(ctx, civ, found) == IntelUpdate::Inserted {
            ctx.ai_memory.mark_enemy_found(unit.id, found);
            if let Some(decision) = return_home(ctx, ticket, unit, found) {
                return Some(decision);
            }
        }
    }

    let target = unexplored_target(ctx, unit, Some(zone)).or_else(|| stale_intel_target(ctx, unit))?;
    Some(Decision::MoveToward {
        target,
        reason: TargetReason::Explore,
    })
}

fn record_sighting(ctx: &mut SimulationContext, civ: CivId, found: EnemySighting) -> IntelUpdate {
    let observation = Observation {
        coord: found.coord,
        kind: found.kind,
        id: found.id,
    };
    let round = ctx.turn.round;
    let update = ctx.fog.record_enemy_location(civ, found.owner, observation, round);
    if update == IntelUpdate::Inserted {
        tracing::info!(civ = %civ, enemy = %found.owner, at = %found.coord, kind = %found.kind, "enemy discovered");
        ctx.events.emit(GameEvent::EnemyDiscovered {
            civ,
            enemy: found.owner,
            at: found.coord,
            kind: found.kind,
        });
    }
    update
}

/// Walk back to the nearest own city; once there, dig in and ask for a
/// warrior headed for what was found. `None` when there is no city.
fn return_home(ctx: &mut SimulationContext, ticket: TurnTicket, unit: &Unit, found: EnemySighting) -> Option<Decision> {
    let home = ctx
        .world
        .cities_of(unit.owner)
        .into_iter()
        .min_by_key(|c| unit.coord.distance(c.coord))
        .map(|c| (c.id, c.coord));
    let Some((city, at)) = home else {
        ctx.ai_memory.clear_enemy_found(unit.id);
        return None;
    };
    if unit.coord != at {
        return Some(Decision::MoveToward {
            target: at,
            reason: TargetReason::ReturnHome,
        });
    }

    ctx.ai_memory.clear_enemy_found(unit.id);
    match production::request_priority(ctx, ticket, city, UnitKind::Warrior, Some(found.coord)) {
        Ok(()) => tracing::debug!(city = %city, rally = %found.coord, "scout requested a warrior"),
        Err(err) => tracing::debug!(city = %city, error = %err, "warrior request rejected"),
    }
    Some(Decision::Fortify)
}

/// Nearest tile `unit` has never seen and could stand on, searched in
/// `zone` first, then on the whole map.
fn unexplored_target(ctx: &SimulationContext, unit: &Unit, zone: Option<Rect>) -> Option<Coord> {
    let bounds = ctx.bounds();
    let reach = bounds.max_distance_from(unit.coord);
    let standable = |c: Coord| entry_cost(ctx, unit, c).is_ok_and(|cost| cost <= unit.max_moves);
    let nearest_in = |area: Rect| {
        (1..=reach).find_map(|radius| {
            unit.coord
                .ring(radius)
                .into_iter()
                .find(|c| area.contains(*c) && !ctx.is_explored(unit.owner, *c) && standable(*c))
        })
    };
    zone.and_then(nearest_in).or_else(|| nearest_in(bounds))
}

fn stale_intel_target(ctx: &SimulationContext, unit: &Unit) -> Option<Coord> {
    ctx.fog
        .stale_targets(unit.owner, ctx.turn.round, STALE_INTEL_ROUNDS)
        .into_iter()
        .map(|(_, r)| r.coord)
        .filter(|c| *c != unit.coord)
        .min_by_key(|c| unit.coord.distance(*c))
}

/// Generic fallback: unexplored ground, then an adjacent enemy unit, then
/// the cheapest step toward the nearest thing we know about.
fn explore(ctx: &SimulationContext, unit: &Unit) -> Decision {
    if let Some(target) = unexplored_target(ctx, unit, None) {
        return Decision::MoveToward {
            target,
            reason: TargetReason::Explore,
        };
    }

    if unit.attack > 0 {
        let adjacent_enemy = unit
            .coord
            .ring(1)
            .into_iter()
            .find(|c| ctx.is_visible(unit.owner, *c) && ctx.world.foreign_unit_at(*c, unit.owner).is_some());
        if let Some(target) = adjacent_enemy {
            return Decision::MoveToward {
                target,
                reason: TargetReason::Wander,
            };
        }
    }

    let hint = ctx
        .fog
        .all_intel(unit.owner)
        .map(|(_, r)| r.coord)
        .min_by_key(|c| unit.coord.distance(*c));
    match cheapest_neighbor(ctx, unit, hint) {
        Some(target) => Decision::MoveToward {
            target,
            reason: TargetReason::Wander,
        },
        None => Decision::Skip,
    }
}
