//! Balance tables consumed by the simulation.
//!
//! Terrain yields, unit statistics and technology costs are data, not
//! logic. [`Rules::default`] carries the built-in table; a RON file can
//! replace it wholesale.
//!
//! # Example RON
//!
//! ```ron
//! Rules(
//!     terrain: {
//!         Grassland: TerrainRule(move_cost: 1, yields: Yields(food: 2, shields: 0, trade: 0)),
//!         // ...
//!     },
//!     units: {
//!         Warrior: UnitRule(moves: 1, attack: 1, defense: 1, health: 10, sight: 1, cost: 10),
//!         // ...
//!     },
//!     city_sight: 2,
//!     techs: [TechRule(id: "bronze_working", cost: 20)],
//! )
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::map::{Improvement, TerrainKind, Tile};
use crate::unit::{Domain, UnitKind};

/// Food, shields and trade produced by a tile or a city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Yields {
    /// Feeds population growth.
    pub food: i32,
    /// Feeds production.
    pub shields: i32,
    /// Split into gold and science.
    pub trade: i32,
}

impl Yields {
    /// Create a yield triple.
    #[must_use]
    pub const fn new(food: i32, shields: i32, trade: i32) -> Self {
        Self { food, shields, trade }
    }

    /// Component-wise doubling (bonus resource).
    #[must_use]
    pub const fn doubled(self) -> Self {
        Self::new(self.food * 2, self.shields * 2, self.trade * 2)
    }
}

impl std::ops::Add for Yields {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.food + rhs.food, self.shields + rhs.shields, self.trade + rhs.trade)
    }
}

impl std::ops::AddAssign for Yields {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Per-terrain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainRule {
    /// Movement points needed to enter.
    pub move_cost: u32,
    /// Base yields.
    pub yields: Yields,
}

/// Per-archetype unit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRule {
    /// Movement allowance per turn.
    pub moves: u32,
    /// Attack strength.
    pub attack: u32,
    /// Defense strength.
    pub defense: u32,
    /// Maximum health.
    pub health: u32,
    /// Sight radius.
    pub sight: u32,
    /// Shield cost to produce.
    pub cost: u32,
    /// Technology required before the unit can be built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_tech: Option<String>,
}

/// A researchable technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechRule {
    /// Stable identifier.
    pub id: String,
    /// Science needed to discover.
    pub cost: u32,
}

/// Fallback for terrain missing from a loaded table: impassable, no yield.
const MISSING_TERRAIN: TerrainRule = TerrainRule {
    move_cost: u32::MAX,
    yields: Yields::new(0, 0, 0),
};

/// Complete rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rules {
    /// Terrain table.
    pub terrain: BTreeMap<TerrainKind, TerrainRule>,
    /// Unit table.
    pub units: BTreeMap<UnitKind, UnitRule>,
    /// Sight radius of cities.
    pub city_sight: u32,
    /// Technologies in research order.
    pub techs: Vec<TechRule>,
    /// Gold paid per missing shield when buying production.
    #[serde(default = "default_purchase_rate")]
    pub gold_per_shield: u32,
    /// Minimum Chebyshev distance between two cities of the same owner.
    #[serde(default = "default_min_city_distance")]
    pub min_city_distance: u32,
}

fn default_purchase_rate() -> u32 {
    2
}

fn default_min_city_distance() -> u32 {
    3
}

impl Default for Rules {
    fn default() -> Self {
        use TerrainKind::*;

        let terrain = [
            (Grassland, 1, Yields::new(2, 1, 0)),
            (Plains, 1, Yields::new(1, 1, 1)),
            (Desert, 1, Yields::new(0, 1, 0)),
            (Tundra, 1, Yields::new(1, 0, 0)),
            (Forest, 2, Yields::new(1, 2, 0)),
            (Hills, 2, Yields::new(1, 1, 0)),
            (Mountain, 3, Yields::new(0, 1, 0)),
            (Swamp, 2, Yields::new(1, 0, 0)),
            (Jungle, 2, Yields::new(1, 0, 0)),
            (Ocean, 1, Yields::new(1, 0, 2)),
            (Lake, 1, Yields::new(2, 0, 2)),
        ]
        .into_iter()
        .map(|(kind, move_cost, yields)| (kind, TerrainRule { move_cost, yields }))
        .collect();

        let unit = |moves, attack, defense, sight, cost, tech: Option<&str>| UnitRule {
            moves,
            attack,
            defense,
            health: 10,
            sight,
            cost,
            requires_tech: tech.map(str::to_string),
        };
        let units = [
            (UnitKind::Settler, unit(1, 0, 1, 1, 30, None)),
            (UnitKind::Scout, unit(2, 0, 1, 2, 10, None)),
            (UnitKind::Warrior, unit(1, 1, 1, 1, 10, None)),
            (UnitKind::Archer, unit(1, 3, 2, 1, 30, Some("bronze_working"))),
            (UnitKind::Horseman, unit(2, 2, 1, 1, 20, Some("horseback_riding"))),
            (UnitKind::Trireme, unit(3, 1, 1, 1, 40, Some("map_making"))),
        ]
        .into_iter()
        .collect();

        let techs = [
            ("bronze_working", 20),
            ("horseback_riding", 25),
            ("alphabet", 30),
            ("map_making", 40),
            ("pottery", 40),
            ("writing", 60),
            ("currency", 70),
            ("mathematics", 90),
        ]
        .into_iter()
        .map(|(id, cost)| TechRule {
            id: id.to_string(),
            cost,
        })
        .collect();

        Self {
            terrain,
            units,
            city_sight: 2,
            techs,
            gold_per_shield: default_purchase_rate(),
            min_city_distance: default_min_city_distance(),
        }
    }
}

impl Rules {
    /// Load rules from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let rules: Rules = ron::from_str(&contents).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let rules: Rules = ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check that every terrain and archetype has an entry with sane values.
    pub fn validate(&self) -> Result<()> {
        for kind in TerrainKind::ALL {
            match self.terrain.get(&kind) {
                Some(rule) if rule.move_cost == 0 => {
                    return Err(GameError::InvalidConfig(format!("{kind:?} has zero move cost")));
                }
                Some(_) => {}
                None => return Err(GameError::InvalidConfig(format!("missing terrain rule for {kind:?}"))),
            }
        }
        for kind in UnitKind::ALL {
            if !self.units.contains_key(&kind) {
                return Err(GameError::InvalidConfig(format!("missing unit rule for {kind:?}")));
            }
        }
        if self.min_city_distance == 0 {
            return Err(GameError::InvalidConfig("min_city_distance must be at least 1".into()));
        }
        Ok(())
    }

    /// Terrain rule (impassable placeholder if absent).
    #[must_use]
    pub fn terrain(&self, kind: TerrainKind) -> &TerrainRule {
        self.terrain.get(&kind).unwrap_or(&MISSING_TERRAIN)
    }

    /// Unit rule for an archetype.
    ///
    /// `validate` guarantees presence for loaded rules; a hand-built table
    /// missing an entry falls back to the warrior row.
    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> &UnitRule {
        self.units
            .get(&kind)
            .or_else(|| self.units.get(&UnitKind::Warrior))
            .or_else(|| self.units.values().next())
            .unwrap_or(&FALLBACK_UNIT)
    }

    /// Movement cost for a unit of `domain` entering `terrain`, or `None` if it cannot.
    #[must_use]
    pub fn move_cost(&self, domain: Domain, terrain: TerrainKind) -> Option<u32> {
        let passable = match domain {
            Domain::Land => !terrain.is_water(),
            Domain::Sea => terrain.is_water(),
        };
        let cost = self.terrain(terrain).move_cost;
        (passable && cost != u32::MAX).then_some(cost)
    }

    /// Base terrain yield, doubled when the tile carries a resource.
    ///
    /// Improvements are ignored: this is what a settler can expect before any work.
    #[must_use]
    pub fn base_yield(&self, tile: &Tile) -> Yields {
        let base = self.terrain(tile.terrain).yields;
        if tile.resource.is_some() {
            base.doubled()
        } else {
            base
        }
    }

    /// Worked-tile yield including improvements.
    #[must_use]
    pub fn worked_yield(&self, tile: &Tile) -> Yields {
        let mut y = self.base_yield(tile);
        match tile.improvement {
            Some(Improvement::Irrigation) => y.food += 1,
            Some(Improvement::Mine) => y.shields += 1,
            Some(Improvement::Road) => y.trade += 1,
            None => {}
        }
        y
    }

    /// Cost of a technology by id.
    #[must_use]
    pub fn tech_cost(&self, id: &str) -> Option<u32> {
        self.techs.iter().find(|t| t.id == id).map(|t| t.cost)
    }
}

static FALLBACK_UNIT: UnitRule = UnitRule {
    moves: 1,
    attack: 1,
    defense: 1,
    health: 10,
    sight: 1,
    cost: 10,
    requires_tech: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coord;
    use crate::map::Resource;

    #[test]
    fn test_default_rules_validate() {
        assert!(Rules::default().validate().is_ok());
    }

    #[test]
    fn test_move_cost_by_domain() {
        let rules = Rules::default();
        assert_eq!(rules.move_cost(Domain::Land, TerrainKind::Grassland), Some(1));
        assert_eq!(rules.move_cost(Domain::Land, TerrainKind::Forest), Some(2));
        assert_eq!(rules.move_cost(Domain::Land, TerrainKind::Ocean), None);
        assert_eq!(rules.move_cost(Domain::Sea, TerrainKind::Ocean), Some(1));
        assert_eq!(rules.move_cost(Domain::Sea, TerrainKind::Plains), None);
    }

    #[test]
    fn test_resource_doubles_base_yield() {
        let rules = Rules::default();
        let mut tile = Tile::new(Coord::new(0, 0), TerrainKind::Grassland);
        assert_eq!(rules.base_yield(&tile), Yields::new(2, 1, 0));
        tile.resource = Some(Resource::Wheat);
        assert_eq!(rules.base_yield(&tile), Yields::new(4, 2, 0));
        tile.improvement = Some(Improvement::Road);
        assert_eq!(rules.worked_yield(&tile), Yields::new(4, 2, 1));
    }

    #[test]
    fn test_ron_roundtrip() {
        let rules = Rules::default();
        let text = ron::ser::to_string_pretty(&rules, ron::ser::PrettyConfig::default()).unwrap();
        let back = Rules::from_ron_str(&text).unwrap();
        assert_eq!(back, rules);
    }

    #[test]
    fn test_incomplete_rules_rejected() {
        let mut rules = Rules::default();
        rules.terrain.remove(&TerrainKind::Swamp);
        assert!(matches!(rules.validate(), Err(GameError::InvalidConfig(_))));
        // Lookup degrades to impassable instead of panicking
        assert_eq!(rules.move_cost(Domain::Land, TerrainKind::Swamp), None);
    }
}
