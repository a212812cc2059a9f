//! Deterministic unit-versus-unit combat.
//!
//! Strength is base stat times current health. A fortified defender gets
//! +50%. The defender wins ties. The winner loses health in proportion to
//! how close the fight was.

use serde::{Deserialize, Serialize};

use crate::math::{ratio, Fixed};
use crate::unit::Unit;

/// Who won a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatWinner {
    /// The attacking unit.
    Attacker,
    /// The defending unit.
    Defender,
}

/// Result of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResult {
    /// Winner.
    pub winner: CombatWinner,
    /// Health the winner has left.
    pub winner_health: u32,
}

/// Effective attack strength.
#[must_use]
pub fn attack_strength(unit: &Unit) -> Fixed {
    Fixed::from_num(unit.attack) * Fixed::from_num(unit.health)
}

/// Effective defense strength, including the fortification bonus.
#[must_use]
pub fn defense_strength(unit: &Unit) -> Fixed {
    let base = Fixed::from_num(unit.defense) * Fixed::from_num(unit.health);
    if unit.status.fortified {
        base * ratio(3, 2)
    } else {
        base
    }
}

/// Resolve a fight. Pure: callers apply the result.
#[must_use]
pub fn resolve(attacker: &Unit, defender: &Unit) -> CombatResult {
    let att = attack_strength(attacker);
    let def = defense_strength(defender);

    let (winner, strong, weak, unit) = if att > def {
        (CombatWinner::Attacker, att, def, attacker)
    } else {
        (CombatWinner::Defender, def, att, defender)
    };

    // Damage share is weak/strong of the winner's health, at least 1 when contested
    let damage = if strong == Fixed::ZERO || weak == Fixed::ZERO {
        0
    } else {
        let share: u32 = (Fixed::from_num(unit.health) * weak / strong).to_num();
        share.max(1)
    };

    CombatResult {
        winner,
        winner_health: unit.health.saturating_sub(damage).max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civilization::CivId;
    use crate::grid::Coord;
    use crate::rules::Rules;
    use crate::unit::UnitKind;

    fn unit(kind: UnitKind) -> Unit {
        Unit::from_rule(CivId(0), kind, Coord::new(0, 0), Rules::default().unit(kind))
    }

    #[test]
    fn test_defender_wins_ties() {
        let result = resolve(&unit(UnitKind::Warrior), &unit(UnitKind::Warrior));
        assert_eq!(result.winner, CombatWinner::Defender);
        assert_eq!(result.winner_health, 1);
    }

    #[test]
    fn test_stronger_attacker_wins() {
        let result = resolve(&unit(UnitKind::Archer), &unit(UnitKind::Warrior));
        assert_eq!(result.winner, CombatWinner::Attacker);
        // 30 vs 10: loses a third of its health
        assert_eq!(result.winner_health, 7);
    }

    #[test]
    fn test_fortification_bonus() {
        let horse = unit(UnitKind::Horseman);
        let mut archer = unit(UnitKind::Archer);
        // 20 vs 20: tie goes to defender
        assert_eq!(resolve(&horse, &archer).winner, CombatWinner::Defender);
        archer.status.fortified = true;
        assert_eq!(defense_strength(&archer), Fixed::from_num(30));
    }

    #[test]
    fn test_unarmed_attacker_loses_without_damage() {
        let result = resolve(&unit(UnitKind::Scout), &unit(UnitKind::Warrior));
        assert_eq!(result.winner, CombatWinner::Defender);
        assert_eq!(result.winner_health, 10);
    }
}
