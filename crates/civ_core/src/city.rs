//! Cities.

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::grid::Coord;
use crate::production::{ProductionItem, ProductionQueue};
use crate::rules::Yields;

/// Unique identifier for cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CityId(pub u32);

impl std::fmt::Display for CityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "city#{}", self.0)
    }
}

/// Accumulated food and shields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressCounters {
    /// Food box.
    pub food: i32,
    /// Shields toward the current production item.
    pub shields: u32,
}

/// A city. Cities are never destroyed in this simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    /// Unique id.
    pub id: CityId,
    /// Owning civilization.
    pub owner: CivId,
    /// Display name.
    pub name: String,
    /// Tile the city stands on.
    pub coord: Coord,
    /// Population (worked tiles besides the centre).
    pub population: u32,
    /// Yields from the last end-of-turn pass.
    pub yields: Yields,
    /// Items waiting to be built.
    pub production_queue: ProductionQueue,
    /// Item currently under construction.
    pub current_production: Option<ProductionItem>,
    /// Item bought with gold, delivered at the end of the turn.
    pub purchased: Option<ProductionItem>,
    /// Food and shield boxes.
    pub progress: ProgressCounters,
}

impl City {
    /// New size-1 city with empty queues. Id is assigned by the store.
    #[must_use]
    pub fn new(owner: CivId, name: impl Into<String>, coord: Coord) -> Self {
        Self {
            id: CityId(0),
            owner,
            name: name.into(),
            coord,
            population: 1,
            yields: Yields::default(),
            production_queue: ProductionQueue::new(),
            current_production: None,
            purchased: None,
            progress: ProgressCounters::default(),
        }
    }

    /// Food needed to grow from the current size.
    #[must_use]
    pub fn growth_threshold(&self) -> i32 {
        10 + 5 * self.population as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_threshold_scales_with_population() {
        let mut city = City::new(CivId(0), "Ur", Coord::new(1, 1));
        assert_eq!(city.growth_threshold(), 15);
        city.population = 3;
        assert_eq!(city.growth_threshold(), 25);
        assert!(city.current_production.is_none());
    }
}
