//! City production.
//!
//! Each city holds a [`ProductionQueue`] of units to build. At the end of
//! its owner's turn the [`ProductionSystem`] first delivers purchased items,
//! then pours the city's shields into the current item and spawns the unit
//! once paid for. AI civilizations never idle: an empty queue is refilled
//! by [`choose_auto_production`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::city::CityId;
use crate::civilization::CivId;
use crate::context::SimulationContext;
use crate::events::GameEvent;
use crate::grid::Coord;
use crate::turn::TurnTicket;
use crate::unit::{UnitId, UnitKind, UnitRole};

/// Cities the AI aims for before it stops building settlers.
pub const AI_CITY_TARGET: usize = 6;

/// An item in a production queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionItem {
    /// Unit archetype to build.
    pub kind: UnitKind,
    /// Shield cost.
    pub cost: u32,
    /// Tile the finished unit should head for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rally: Option<Coord>,
}

impl ProductionItem {
    /// Create an item without a rally point.
    #[must_use]
    pub const fn new(kind: UnitKind, cost: u32) -> Self {
        Self { kind, cost, rally: None }
    }

    /// Attach a rally point.
    #[must_use]
    pub const fn with_rally(mut self, rally: Coord) -> Self {
        self.rally = Some(rally);
        self
    }
}

/// Production queue of a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionQueue {
    queue: VecDeque<ProductionItem>,
    max_queue_size: usize,
}

impl Default for ProductionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionQueue {
    /// Default maximum queue size.
    pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5;

    /// Create a new empty production queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_size(Self::DEFAULT_MAX_QUEUE_SIZE)
    }

    /// Create a production queue with a specific max size.
    #[must_use]
    pub fn with_max_size(max_queue_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max_queue_size,
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_queue_size
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Append an item.
    pub fn add(&mut self, item: ProductionItem) -> Result<(), ProductionError> {
        if self.is_full() {
            return Err(ProductionError::QueueFull);
        }
        self.queue.push_back(item);
        Ok(())
    }

    /// Put an item at the front.
    ///
    /// A full queue drops its last item to make room.
    pub fn push_priority(&mut self, item: ProductionItem) -> Option<ProductionItem> {
        let dropped = if self.is_full() { self.queue.pop_back() } else { None };
        self.queue.push_front(item);
        dropped
    }

    /// Next item to start.
    #[must_use]
    pub fn front(&self) -> Option<&ProductionItem> {
        self.queue.front()
    }

    /// Take the next item to start.
    pub fn pop_next(&mut self) -> Option<ProductionItem> {
        self.queue.pop_front()
    }
}

/// Production request failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductionError {
    /// The production queue is full.
    #[error("production queue is full")]
    QueueFull,
    /// Not enough gold to buy the item.
    #[error("insufficient gold: need {needed}, have {available}")]
    InsufficientGold {
        /// Price.
        needed: u32,
        /// Gold on hand.
        available: i32,
    },
    /// No such city.
    #[error("city not found")]
    CityNotFound,
    /// The city belongs to someone else.
    #[error("city belongs to another civilization")]
    NotOwner,
    /// Nothing in production to buy.
    #[error("nothing to buy")]
    NothingToBuy,
    /// An item was already bought this turn.
    #[error("an item was already purchased this turn")]
    AlreadyPurchased,
    /// Settlers cannot be bought in a size-1 city.
    #[error("city population too low: need {needed}, have {population}")]
    PopulationTooLow {
        /// Population required.
        needed: u32,
        /// Current population.
        population: u32,
    },
    /// The archetype needs a technology the owner lacks.
    #[error("requires technology '{0}'")]
    TechRequired(String),
    /// The issuing turn is no longer the active one.
    #[error("stale_turn")]
    StaleTurn,
}

/// End-of-turn production collaborator.
pub trait ProductionSystem {
    /// Deliver items bought with gold during the turn.
    fn materialize_purchases(&mut self, ctx: &mut SimulationContext, civ: CivId);

    /// Add shields to current items and complete what is paid for.
    fn advance(&mut self, ctx: &mut SimulationContext, civ: CivId);
}

/// Default production rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardProduction {
    /// Refill empty queues of AI civilizations.
    pub auto_produce_for_ai: bool,
}

impl Default for StandardProduction {
    fn default() -> Self {
        Self {
            auto_produce_for_ai: true,
        }
    }
}

impl ProductionSystem for StandardProduction {
    fn materialize_purchases(&mut self, ctx: &mut SimulationContext, civ: CivId) {
        for city_id in city_ids(ctx, civ) {
            let Some(item) = ctx.world.city(city_id).and_then(|c| c.purchased.clone()) else {
                continue;
            };
            if complete_item(ctx, city_id, &item).is_some() {
                if let Some(city) = ctx.world.city_mut(city_id) {
                    city.purchased = None;
                }
            }
        }
    }

    fn advance(&mut self, ctx: &mut SimulationContext, civ: CivId) {
        let is_ai = ctx.civ(civ).is_some_and(|c| !c.is_human);
        for city_id in city_ids(ctx, civ) {
            let auto_kind = if self.auto_produce_for_ai && is_ai {
                Some(choose_auto_production(ctx, civ, city_id))
            } else {
                None
            };
            let auto_item = auto_kind.map(|k| ProductionItem::new(k, ctx.rules.unit(k).cost));

            let Some(city) = ctx.world.city_mut(city_id) else {
                continue;
            };
            if city.current_production.is_none() {
                city.current_production = city.production_queue.pop_next().or(auto_item);
            }
            let Some(item) = city.current_production.clone() else {
                continue;
            };
            city.progress.shields += city.yields.shields.max(0) as u32;
            if city.progress.shields < item.cost {
                continue;
            }
            if item.kind.can_settle() && city.population < 2 {
                continue;
            }
            city.progress.shields -= item.cost;
            city.current_production = None;
            complete_item(ctx, city_id, &item);
        }
    }
}

fn city_ids(ctx: &SimulationContext, civ: CivId) -> Vec<CityId> {
    ctx.world.cities_of(civ).into_iter().map(|c| c.id).collect()
}

/// Spawn the unit for a finished item. Settlers cost one population and
/// are held back while the city is size 1.
fn complete_item(ctx: &mut SimulationContext, city_id: CityId, item: &ProductionItem) -> Option<UnitId> {
    let city = ctx.world.city_mut(city_id)?;
    if item.kind.can_settle() {
        if city.population < 2 {
            return None;
        }
        city.population -= 1;
    }
    let (owner, at) = (city.owner, city.coord);

    let unit = ctx.spawn_unit(owner, item.kind, at);
    if let Some(rally) = item.rally {
        ctx.ai_memory.set_rally(unit, rally);
    }
    tracing::debug!(city = %city_id, unit = %unit, kind = item.kind.name(), "production complete");
    ctx.events.emit(GameEvent::ProductionCompleted {
        city: city_id,
        unit,
        kind: item.kind,
    });
    Some(unit)
}

/// Can `civ` build `kind` with its current technologies.
#[must_use]
pub fn can_build(ctx: &SimulationContext, civ: CivId, kind: UnitKind) -> bool {
    match &ctx.rules.unit(kind).requires_tech {
        Some(tech) => ctx.civ(civ).is_some_and(|c| c.knows(tech)),
        None => true,
    }
}

fn check_city(ctx: &SimulationContext, ticket: TurnTicket, city: CityId) -> Result<(), ProductionError> {
    if !ctx.turn.accepts(ticket) {
        return Err(ProductionError::StaleTurn);
    }
    let city = ctx.world.city(city).ok_or(ProductionError::CityNotFound)?;
    if city.owner != ticket.civ {
        return Err(ProductionError::NotOwner);
    }
    Ok(())
}

fn build_item(ctx: &SimulationContext, civ: CivId, kind: UnitKind) -> Result<ProductionItem, ProductionError> {
    if !can_build(ctx, civ, kind) {
        let tech = ctx.rules.unit(kind).requires_tech.clone().unwrap_or_default();
        return Err(ProductionError::TechRequired(tech));
    }
    Ok(ProductionItem::new(kind, ctx.rules.unit(kind).cost))
}

/// Append a unit to a city's queue.
pub fn enqueue(ctx: &mut SimulationContext, ticket: TurnTicket, city: CityId, kind: UnitKind) -> Result<(), ProductionError> {
    check_city(ctx, ticket, city)?;
    let item = build_item(ctx, ticket.civ, kind)?;
    ctx.world
        .city_mut(city)
        .ok_or(ProductionError::CityNotFound)?
        .production_queue
        .add(item)
}

/// Put a unit at the front of a city's queue, optionally with a rally point.
pub fn request_priority(
    ctx: &mut SimulationContext,
    ticket: TurnTicket,
    city: CityId,
    kind: UnitKind,
    rally: Option<Coord>,
) -> Result<(), ProductionError> {
    check_city(ctx, ticket, city)?;
    let mut item = build_item(ctx, ticket.civ, kind)?;
    item.rally = rally;
    let queue = &mut ctx.world.city_mut(city).ok_or(ProductionError::CityNotFound)?.production_queue;
    if let Some(dropped) = queue.push_priority(item) {
        tracing::debug!(city = %city, dropped = dropped.kind.name(), "queue overflow on priority request");
    }
    Ok(())
}

/// Buy the item in production (or the next queued one) with gold.
///
/// The unit appears at the end of the turn. Returns the price paid.
/// Settlers are refused while the city is size 1, since the item could
/// never be delivered.
pub fn purchase(ctx: &mut SimulationContext, ticket: TurnTicket, city_id: CityId) -> Result<u32, ProductionError> {
    check_city(ctx, ticket, city_id)?;
    let gold_per_shield = ctx.rules.gold_per_shield;
    let available = ctx.civ(ticket.civ).map_or(0, |c| c.resources.gold);

    let city = ctx.world.city(city_id).ok_or(ProductionError::CityNotFound)?;
    if city.purchased.is_some() {
        return Err(ProductionError::AlreadyPurchased);
    }
    let (item, paid) = match (&city.current_production, city.production_queue.front()) {
        (Some(current), _) => (current.clone(), city.progress.shields),
        (None, Some(next)) => (next.clone(), 0),
        (None, None) => return Err(ProductionError::NothingToBuy),
    };
    if item.kind.can_settle() && city.population < 2 {
        return Err(ProductionError::PopulationTooLow {
            needed: 2,
            population: city.population,
        });
    }
    let price = item.cost.saturating_sub(paid) * gold_per_shield;
    if i64::from(available) < i64::from(price) {
        return Err(ProductionError::InsufficientGold { needed: price, available });
    }

    if let Some(civ) = ctx.civ_mut(ticket.civ) {
        civ.resources.gold -= price as i32;
    }
    if let Some(city) = ctx.world.city_mut(city_id) {
        if city.current_production.is_some() {
            city.current_production = None;
            city.progress.shields = 0;
        } else {
            city.production_queue.pop_next();
        }
        city.purchased = Some(item);
    }
    Ok(price)
}

/// Pick what an AI city builds next.
///
/// Keeps one defender and one scout alive, then alternates between
/// expansion and an army of about two units per city.
#[must_use]
pub fn choose_auto_production(ctx: &SimulationContext, civ: CivId, city: CityId) -> UnitKind {
    let units = ctx.world.units_of(civ);
    let military = units.iter().filter(|u| u.kind.role() == UnitRole::Military).count();
    let scouts = units.iter().filter(|u| u.kind.role() == UnitRole::Scout).count();
    let settlers = units.iter().filter(|u| u.kind.can_settle()).count();
    let cities = ctx.world.cities_of(civ).len();
    let population = ctx.world.city(city).map_or(1, |c| c.population);

    if military == 0 {
        best_military(ctx, civ)
    } else if scouts == 0 {
        UnitKind::Scout
    } else if settlers == 0 && cities < AI_CITY_TARGET && population >= 2 {
        UnitKind::Settler
    } else if military < cities * 2 {
        best_military(ctx, civ)
    } else if settlers == 0 && cities < AI_CITY_TARGET {
        UnitKind::Settler
    } else {
        best_military(ctx, civ)
    }
}

/// Strongest land attacker `civ` can build.
#[must_use]
pub fn best_military(ctx: &SimulationContext, civ: CivId) -> UnitKind {
    UnitKind::ALL
        .into_iter()
        .filter(|k| k.role() == UnitRole::Military && can_build(ctx, civ, *k))
        .fold(UnitKind::Warrior, |best, k| {
            if ctx.rules.unit(k).attack > ctx.rules.unit(best).attack {
                k
            } else {
                best
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: UnitKind) -> ProductionItem {
        ProductionItem::new(kind, 10)
    }

    #[test]
    fn test_queue_capacity() {
        let mut queue = ProductionQueue::with_max_size(2);
        assert!(queue.add(item(UnitKind::Warrior)).is_ok());
        assert!(queue.add(item(UnitKind::Scout)).is_ok());
        assert_eq!(queue.add(item(UnitKind::Settler)), Err(ProductionError::QueueFull));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_priority_goes_first_and_evicts_last() {
        let mut queue = ProductionQueue::with_max_size(2);
        queue.add(item(UnitKind::Scout)).unwrap();
        queue.add(item(UnitKind::Settler)).unwrap();
        let dropped = queue.push_priority(item(UnitKind::Warrior));
        assert_eq!(dropped.map(|i| i.kind), Some(UnitKind::Settler));
        assert_eq!(queue.front().map(|i| i.kind), Some(UnitKind::Warrior));
    }

    fn city_ctx(gold: i32) -> (SimulationContext, CityId) {
        use crate::civilization::Civilization;
        use crate::map::{GameMap, TerrainKind};
        use crate::rules::Rules;

        let map = GameMap::filled(8, 8, TerrainKind::Grassland).unwrap();
        let civs = vec![Civilization::new(CivId(0), "Rome", false), Civilization::new(CivId(1), "Carthage", false)];
        let mut ctx = SimulationContext::new(map, Rules::default(), civs).unwrap();
        ctx.civ_mut(CivId(0)).unwrap().resources.gold = gold;
        let city = ctx.place_city(CivId(0), Coord::new(3, 3));
        (ctx, city)
    }

    #[test]
    fn test_purchase_charges_missing_shields() {
        let (mut ctx, city) = city_ctx(100);
        let ticket = ctx.turn.ticket();
        enqueue(&mut ctx, ticket, city, UnitKind::Warrior).unwrap();
        assert_eq!(purchase(&mut ctx, ticket, city), Ok(20));
        assert_eq!(ctx.civ(CivId(0)).unwrap().resources.gold, 80);
        assert_eq!(purchase(&mut ctx, ticket, city), Err(ProductionError::AlreadyPurchased));

        StandardProduction::default().materialize_purchases(&mut ctx, CivId(0));
        assert_eq!(ctx.world.units_of(CivId(0)).len(), 1);
        assert!(ctx.world.city(city).unwrap().purchased.is_none());
    }

    #[test]
    fn test_purchase_rejects_settler_in_size_one_city() {
        let (mut ctx, city) = city_ctx(500);
        let ticket = ctx.turn.ticket();
        enqueue(&mut ctx, ticket, city, UnitKind::Settler).unwrap();
        assert_eq!(
            purchase(&mut ctx, ticket, city),
            Err(ProductionError::PopulationTooLow { needed: 2, population: 1 })
        );
        assert_eq!(ctx.civ(CivId(0)).unwrap().resources.gold, 500);
        assert_eq!(ctx.world.city(city).unwrap().production_queue.len(), 1);

        ctx.world.city_mut(city).unwrap().population = 2;
        assert_eq!(purchase(&mut ctx, ticket, city), Ok(60));
        StandardProduction::default().materialize_purchases(&mut ctx, CivId(0));
        assert_eq!(ctx.world.city(city).unwrap().population, 1);
        assert_eq!(ctx.world.units_of(CivId(0))[0].kind, UnitKind::Settler);
    }

    #[test]
    fn test_purchase_checks_gold_and_owner() {
        let (mut ctx, city) = city_ctx(5);
        let ticket = ctx.turn.ticket();
        assert_eq!(purchase(&mut ctx, ticket, city), Err(ProductionError::NothingToBuy));
        enqueue(&mut ctx, ticket, city, UnitKind::Warrior).unwrap();
        assert_eq!(
            purchase(&mut ctx, ticket, city),
            Err(ProductionError::InsufficientGold { needed: 20, available: 5 })
        );
        let foreign = crate::turn::TurnTicket {
            civ: CivId(1),
            epoch: ticket.epoch,
        };
        assert_eq!(purchase(&mut ctx, foreign, city), Err(ProductionError::StaleTurn));
    }
}
