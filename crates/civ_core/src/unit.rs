//! Units and unit archetypes.
//!
//! Archetypes form a closed set; behavior is selected through [`UnitRole`]
//! and the capability queries on [`UnitKind`] instead of probing fields.

use serde::{Deserialize, Serialize};

use crate::civilization::CivId;
use crate::grid::Coord;
use crate::rules::UnitRule;

/// Unique identifier for units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Concrete unit archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Founds cities.
    Settler,
    /// Fast explorer with extended sight.
    Scout,
    /// Basic melee unit.
    Warrior,
    /// Ranged defender.
    Archer,
    /// Mounted attacker.
    Horseman,
    /// Coastal ship.
    Trireme,
}

/// Behavioral family of a unit archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitRole {
    /// Looks for settlement sites.
    Settler,
    /// Explores an assigned zone looking for enemies.
    Scout,
    /// Marches on known enemy cities.
    Military,
    /// Water-bound unit.
    Naval,
}

/// Terrain family a unit can move through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Domain {
    /// Land tiles only.
    #[default]
    Land,
    /// Water tiles only.
    Sea,
}

impl UnitKind {
    /// All archetypes.
    pub const ALL: [UnitKind; 6] = [
        Self::Settler,
        Self::Scout,
        Self::Warrior,
        Self::Archer,
        Self::Horseman,
        Self::Trireme,
    ];

    /// Behavioral role.
    #[must_use]
    pub const fn role(self) -> UnitRole {
        match self {
            Self::Settler => UnitRole::Settler,
            Self::Scout => UnitRole::Scout,
            Self::Warrior | Self::Archer | Self::Horseman => UnitRole::Military,
            Self::Trireme => UnitRole::Naval,
        }
    }

    /// Movement domain.
    #[must_use]
    pub const fn domain(self) -> Domain {
        match self {
            Self::Trireme => Domain::Sea,
            _ => Domain::Land,
        }
    }

    /// Can this unit found a city.
    #[must_use]
    pub const fn can_settle(self) -> bool {
        matches!(self, Self::Settler)
    }

    /// Can this unit fortify in place.
    #[must_use]
    pub const fn can_fortify(self) -> bool {
        !matches!(self, Self::Settler | Self::Trireme)
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Settler => "Settler",
            Self::Scout => "Scout",
            Self::Warrior => "Warrior",
            Self::Archer => "Archer",
            Self::Horseman => "Horseman",
            Self::Trireme => "Trireme",
        }
    }
}

/// Per-unit status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitStatus {
    /// Dug in; defensive bonus and skipped by the AI loop.
    pub fortified: bool,
    /// Inactive until woken.
    pub sleeping: bool,
    /// Done for this turn.
    pub skipped: bool,
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id.
    pub id: UnitId,
    /// Owning civilization.
    pub owner: CivId,
    /// Archetype.
    pub kind: UnitKind,
    /// Current tile.
    pub coord: Coord,
    /// Movement points left this turn.
    pub moves_remaining: u32,
    /// Movement allowance per turn.
    pub max_moves: u32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Attack strength.
    pub attack: u32,
    /// Defense strength.
    pub defense: u32,
    /// Sight radius.
    pub sight: u32,
    /// Status flags.
    pub status: UnitStatus,
    /// Set when the unit lost a fight; removed at the next purge.
    pub defeated: bool,
}

impl Unit {
    /// Build a fresh unit from its archetype rule. Id is assigned by the store.
    #[must_use]
    pub fn from_rule(owner: CivId, kind: UnitKind, coord: Coord, rule: &UnitRule) -> Self {
        Self {
            id: UnitId(0),
            owner,
            kind,
            coord,
            moves_remaining: rule.moves,
            max_moves: rule.moves,
            health: rule.health,
            max_health: rule.health,
            attack: rule.attack,
            defense: rule.defense,
            sight: rule.sight,
            status: UnitStatus::default(),
            defeated: false,
        }
    }

    /// True while the unit is on the map and able to act.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.defeated && self.health > 0
    }

    /// Spend movement points, never going below zero.
    pub fn spend_moves(&mut self, cost: u32) {
        self.moves_remaining = self.moves_remaining.saturating_sub(cost);
    }

    /// Restore the full movement allowance and clear per-turn flags.
    pub fn reset_for_turn(&mut self) {
        self.moves_remaining = self.max_moves;
        self.status.skipped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;

    #[test]
    fn test_roles() {
        assert_eq!(UnitKind::Settler.role(), UnitRole::Settler);
        assert_eq!(UnitKind::Scout.role(), UnitRole::Scout);
        assert_eq!(UnitKind::Warrior.role(), UnitRole::Military);
        assert_eq!(UnitKind::Trireme.role(), UnitRole::Naval);
        assert_eq!(UnitKind::Trireme.domain(), Domain::Sea);
    }

    #[test]
    fn test_capabilities() {
        assert!(UnitKind::Settler.can_settle());
        assert!(!UnitKind::Warrior.can_settle());
        assert!(UnitKind::Warrior.can_fortify());
        assert!(!UnitKind::Settler.can_fortify());
    }

    #[test]
    fn test_moves_never_underflow() {
        let rules = Rules::default();
        let mut unit = Unit::from_rule(CivId(0), UnitKind::Warrior, Coord::new(0, 0), rules.unit(UnitKind::Warrior));
        unit.spend_moves(10);
        assert_eq!(unit.moves_remaining, 0);
        unit.reset_for_turn();
        assert_eq!(unit.moves_remaining, unit.max_moves);
    }
}
