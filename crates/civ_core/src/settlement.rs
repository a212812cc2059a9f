//! Settlement site scoring.
//!
//! Every tile within [`SEARCH_RADIUS`] of the settler is a candidate.
//! A candidate is scored on the weighted yields of its 3x3 neighborhood,
//! gets a flat bonus for water access and is penalized for each city whose
//! own 3x3 neighborhood overlaps it. Scores are fixed-point so the choice
//! is identical on every platform.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::grid::Coord;
use crate::map::{TerrainKind, TileLookup};
use crate::math::{hundredths_serde, ratio, Fixed};
use crate::rules::{Rules, Yields};
use crate::world::OccupantLookup;

/// Half-width of the square search window (11x11).
pub const SEARCH_RADIUS: u32 = 5;

/// Flat bonus for water on or next to the site.
const WATER_BONUS: i32 = 2;

/// Extra bonus for the deep-water preset.
const COASTAL_BONUS: i32 = 3;

/// Yield weights. Stored as hundredths in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementWeights {
    /// Weight of food.
    #[serde(with = "hundredths_serde")]
    pub food: Fixed,
    /// Weight of shields.
    #[serde(with = "hundredths_serde")]
    pub shields: Fixed,
    /// Weight of trade (gold).
    #[serde(with = "hundredths_serde")]
    pub gold: Fixed,
}

impl SettlementWeights {
    /// Weights from hundredths.
    #[must_use]
    pub fn from_hundredths(food: i32, shields: i32, gold: i32) -> Self {
        Self {
            food: ratio(food, 100),
            shields: ratio(shields, 100),
            gold: ratio(gold, 100),
        }
    }

    /// Mean of the three weights, used to scale proximity penalties.
    #[must_use]
    pub fn mean(&self) -> Fixed {
        (self.food + self.shields + self.gold) / Fixed::from_num(3)
    }

    fn score(&self, y: Yields) -> Fixed {
        self.food * Fixed::from_num(y.food) + self.shields * Fixed::from_num(y.shields) + self.gold * Fixed::from_num(y.trade)
    }
}

/// Named weight presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SettlementPreset {
    /// Favors food.
    #[default]
    BalancedGrowth,
    /// Favors shields.
    ProductionPowerhouse,
    /// Favors trade.
    TradeCommerce,
    /// Coast only, with an extra bonus.
    DeepWaterCoastal,
}

impl SettlementPreset {
    /// All presets.
    pub const ALL: [SettlementPreset; 4] = [
        Self::BalancedGrowth,
        Self::ProductionPowerhouse,
        Self::TradeCommerce,
        Self::DeepWaterCoastal,
    ];

    /// Weight tuple of the preset.
    #[must_use]
    pub fn weights(self) -> SettlementWeights {
        match self {
            Self::BalancedGrowth => SettlementWeights::from_hundredths(150, 100, 100),
            Self::ProductionPowerhouse => SettlementWeights::from_hundredths(100, 200, 50),
            Self::TradeCommerce => SettlementWeights::from_hundredths(100, 75, 200),
            Self::DeepWaterCoastal => SettlementWeights::from_hundredths(125, 75, 150),
        }
    }

    /// Sites without water access are rejected.
    #[must_use]
    pub const fn requires_water(self) -> bool {
        matches!(self, Self::DeepWaterCoastal)
    }

    /// Kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BalancedGrowth => "balanced-growth",
            Self::ProductionPowerhouse => "production-powerhouse",
            Self::TradeCommerce => "trade-commerce",
            Self::DeepWaterCoastal => "deep-water-coastal",
        }
    }
}

impl FromStr for SettlementPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown settlement preset '{s}'"))
    }
}

/// A scored site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementSite {
    /// Site tile.
    pub coord: Coord,
    /// Final score.
    pub score: Fixed,
    /// Raw yields of the 3x3 neighborhood.
    pub yields: Yields,
    /// Water on or next to the site.
    pub has_water_access: bool,
}

/// Tile predicate borrowed from the caller.
pub type TilePredicate<'a> = &'a dyn Fn(Coord) -> bool;

/// Parameters of one site search.
#[derive(Clone, Copy)]
pub struct SettlementQuery<'a> {
    /// Center of the search window (the settler's tile).
    pub origin: Coord,
    /// Evaluating civilization.
    pub civ: CivId,
    /// Weight preset.
    pub preset: SettlementPreset,
    /// Minimum distance to own cities.
    pub min_city_distance: u32,
    /// Only consider tiles passing this check (fog of war).
    pub visible: Option<TilePredicate<'a>>,
    /// Only consider tiles passing this check (path exists).
    pub reachable: Option<TilePredicate<'a>>,
}

impl<'a> SettlementQuery<'a> {
    /// Query without fog or reachability filters.
    #[must_use]
    pub fn new(origin: Coord, civ: CivId, preset: SettlementPreset, min_city_distance: u32) -> Self {
        Self {
            origin,
            civ,
            preset,
            min_city_distance,
            visible: None,
            reachable: None,
        }
    }

    /// Add a visibility filter.
    #[must_use]
    pub fn with_visibility(mut self, visible: TilePredicate<'a>) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Add a reachability filter.
    #[must_use]
    pub fn with_reachability(mut self, reachable: TilePredicate<'a>) -> Self {
        self.reachable = Some(reachable);
        self
    }
}

/// Radius of the block around own cities where founding is forbidden.
#[must_use]
pub const fn exclusion_radius(min_city_distance: u32) -> u32 {
    min_city_distance.saturating_sub(1)
}

/// Static site checks: land that is not mountain, no city on it and
/// outside the exclusion block of every city owned by `civ`.
#[must_use]
pub fn is_valid_settlement_site<T, O>(coord: Coord, tiles: &T, occupants: &O, civ: CivId, min_city_distance: u32) -> bool
where
    T: TileLookup,
    O: OccupantLookup,
{
    let Some(tile) = tiles.tile(coord) else {
        return false;
    };
    if tile.terrain.is_water() || tile.terrain == TerrainKind::Mountain {
        return false;
    }
    if occupants.city_at(coord).is_some() {
        return false;
    }
    let radius = exclusion_radius(min_city_distance);
    !occupants
        .city_positions()
        .into_iter()
        .any(|(owner, c)| owner == civ && c.distance(coord) <= radius)
}

fn has_water_access<T: TileLookup>(coord: Coord, tiles: &T) -> bool {
    coord
        .square(1)
        .filter_map(|c| tiles.tile(c))
        .any(|t| t.terrain.is_water())
}

/// Score a site that already passed the validity checks.
#[must_use]
pub fn score_site<T, O>(coord: Coord, tiles: &T, rules: &Rules, occupants: &O, civ: CivId, preset: SettlementPreset) -> Option<SettlementSite>
where
    T: TileLookup,
    O: OccupantLookup,
{
    let water = has_water_access(coord, tiles);
    if preset.requires_water() && !water {
        return None;
    }

    let weights = preset.weights();
    let mut yields = Yields::default();
    let mut score = Fixed::ZERO;
    for tile in coord.square(1).filter_map(|c| tiles.tile(c)) {
        let y = rules.base_yield(tile);
        yields += y;
        score += weights.score(y);
    }

    if water {
        score += Fixed::from_num(WATER_BONUS);
    }
    if preset.requires_water() {
        score += Fixed::from_num(COASTAL_BONUS);
    }

    let cities = occupants.city_positions();
    let own_penalty = weights.mean();
    let foreign_penalty = weights.mean() * ratio(1, 5);
    for worked in coord.square(1) {
        for (owner, _) in cities.iter().filter(|(_, c)| c.distance(worked) <= 1) {
            score -= if *owner == civ { own_penalty } else { foreign_penalty };
        }
    }

    Some(SettlementSite {
        coord,
        score,
        yields,
        has_water_access: water,
    })
}

/// Best site in the 11x11 window around `query.origin`.
///
/// Ties keep the first candidate in row-major order. Returns `None` when
/// nothing in the window qualifies.
pub fn find_best_settlement_location<T, O>(query: &SettlementQuery<'_>, tiles: &T, rules: &Rules, occupants: &O) -> Option<SettlementSite>
where
    T: TileLookup,
    O: OccupantLookup,
{
    let mut best: Option<SettlementSite> = None;

    for coord in query.origin.square(SEARCH_RADIUS) {
        if !is_valid_settlement_site(coord, tiles, occupants, query.civ, query.min_city_distance) {
            continue;
        }
        if coord != query.origin && occupants.foreign_unit_at(coord, query.civ).is_some() {
            continue;
        }
        if query.visible.is_some_and(|visible| !visible(coord)) {
            continue;
        }
        if query.reachable.is_some_and(|reachable| !reachable(coord)) {
            continue;
        }
        let Some(site) = score_site(coord, tiles, rules, occupants, query.civ, query.preset) else {
            continue;
        };
        if best.map_or(true, |b| site.score > b.score) {
            best = Some(site);
        }
    }

    if let Some(site) = &best {
        tracing::trace!(civ = %query.civ, site = %site.coord, score = %site.score, "settlement site");
    }
    best
}
