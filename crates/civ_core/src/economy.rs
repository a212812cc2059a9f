//! City yields, growth and research.
//!
//! A city works its own tile plus its `population` best tiles from the
//! surrounding ring. Food above upkeep fills the growth box; trade is
//! split between gold and science.

use thiserror::Error;

use crate::city::CityId;
use crate::civilization::CivId;
use crate::context::SimulationContext;
use crate::events::GameEvent;
use crate::grid::Coord;
use crate::map::TileLookup;
use crate::rules::{Rules, Yields};
use crate::turn::TurnTicket;

/// Food eaten per citizen each turn.
pub const FOOD_PER_CITIZEN: i32 = 2;

/// Yields of a city working its centre and best surrounding tiles.
#[must_use]
pub fn city_yields<T: TileLookup>(tiles: &T, rules: &Rules, center: Coord, population: u32) -> Yields {
    let mut total = tiles.tile(center).map(|t| rules.worked_yield(t)).unwrap_or_default();

    let mut ring: Vec<Yields> = center
        .ring(1)
        .into_iter()
        .filter_map(|c| tiles.tile(c))
        .map(|t| rules.worked_yield(t))
        .collect();
    // Stable: equal tiles keep ring order
    ring.sort_by_key(|y| std::cmp::Reverse(y.food * 2 + y.shields + y.trade));
    for y in ring.into_iter().take(population as usize) {
        total += y;
    }
    total
}

/// Recompute the stored yields of every city owned by `civ`.
pub fn refresh_city_yields(ctx: &mut SimulationContext, civ: CivId) {
    let ids: Vec<CityId> = ctx.world.cities_of(civ).into_iter().map(|c| c.id).collect();
    for id in ids {
        let Some((center, population)) = ctx.world.city(id).map(|c| (c.coord, c.population)) else {
            continue;
        };
        let yields = city_yields(&ctx.map, &ctx.rules, center, population);
        if let Some(city) = ctx.world.city_mut(id) {
            city.yields = yields;
        }
    }
}

/// Feed every city of `civ`: grow on a full food box, shrink on starvation.
pub fn accrue_city_growth(ctx: &mut SimulationContext, civ: CivId) {
    let ids: Vec<CityId> = ctx.world.cities_of(civ).into_iter().map(|c| c.id).collect();
    for id in ids {
        let Some(city) = ctx.world.city_mut(id) else {
            continue;
        };
        let surplus = city.yields.food - FOOD_PER_CITIZEN * city.population as i32;
        city.progress.food += surplus;

        let changed = if city.progress.food >= city.growth_threshold() {
            city.population += 1;
            city.progress.food = 0;
            true
        } else if city.progress.food < 0 {
            city.progress.food = 0;
            if city.population > 1 {
                city.population -= 1;
                true
            } else {
                false
            }
        } else {
            false
        };

        if changed {
            let population = city.population;
            tracing::debug!(city = %id, population, "city size changed");
            ctx.events.emit(GameEvent::CityGrew { city: id, population });
        }
    }
}

/// Split trade into gold and science, advance research, unlock techs.
///
/// AI civilizations without a research target pick the cheapest unknown
/// technology.
pub fn accrue_civ_resources(ctx: &mut SimulationContext, civ: CivId) {
    let trade: i32 = ctx.world.cities_of(civ).iter().map(|c| c.yields.trade.max(0)).sum();
    let science = (trade + 1) / 2;
    let gold = trade - science;

    let Some(current) = ctx.civ(civ) else {
        return;
    };
    let target = match &current.current_research {
        Some(tech) => Some(tech.clone()),
        None if !current.is_human => next_research(ctx, civ),
        None => None,
    };
    let cost = target.as_deref().and_then(|t| ctx.rules.tech_cost(t));

    let Some(c) = ctx.civ_mut(civ) else {
        return;
    };
    c.resources.gold += gold;
    c.resources.science = science;
    c.research_progress += science as u32;
    c.current_research = target.clone().filter(|_| cost.is_some());

    let (Some(tech), Some(cost)) = (target, cost) else {
        return;
    };
    if c.research_progress < cost {
        return;
    }
    c.research_progress -= cost;
    c.technologies.insert(tech.clone());
    c.current_research = None;
    tracing::info!(civ = %civ, tech = %tech, "technology discovered");
    ctx.events.emit(GameEvent::TechDiscovered { civ, tech });
}

/// Cheapest technology `civ` does not know yet, in rule order on ties.
#[must_use]
pub fn next_research(ctx: &SimulationContext, civ: CivId) -> Option<String> {
    let known = ctx.civ(civ)?;
    ctx.rules
        .techs
        .iter()
        .filter(|t| !known.knows(&t.id))
        .min_by_key(|t| t.cost)
        .map(|t| t.id.clone())
}

/// Reasons a research choice is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    /// No technology with that id exists.
    #[error("unknown technology '{0}'")]
    UnknownTech(String),
    /// The civilization already knows it.
    #[error("technology '{0}' is already known")]
    AlreadyKnown(String),
    /// The issuing turn is no longer the active one.
    #[error("stale_turn")]
    StaleTurn,
}

/// Pick the technology `ticket.civ` researches next.
///
/// Progress already accumulated carries over to the new target.
pub fn set_research(ctx: &mut SimulationContext, ticket: TurnTicket, tech: &str) -> Result<(), ResearchError> {
    if !ctx.accepts(ticket) {
        return Err(ResearchError::StaleTurn);
    }
    if ctx.rules.tech_cost(tech).is_none() {
        return Err(ResearchError::UnknownTech(tech.to_string()));
    }
    let civ = ctx.civ_mut(ticket.civ).ok_or(ResearchError::StaleTurn)?;
    if civ.knows(tech) {
        return Err(ResearchError::AlreadyKnown(tech.to_string()));
    }
    civ.current_research = Some(tech.to_string());
    Ok(())
}
