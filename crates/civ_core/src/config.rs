//! Game setup loaded from RON.
//!
//! # Example RON
//!
//! ```ron
//! GameConfig(
//!     map: (width: 20, height: 20, seed: 7),
//!     civs: [
//!         (name: "Rome", is_human: false),
//!         (name: "Carthage", is_human: true),
//!     ],
//!     scheduler: (ai_turn_timeout_ms: 30000),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::civilization::{CivId, Civilization};
use crate::error::{GameError, Result};
use crate::map_generation::MapGenConfig;
use crate::rules::Rules;
use crate::scheduler::SchedulerConfig;
use crate::unit::UnitKind;

/// One player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CivSlot {
    /// Display name.
    pub name: String,
    /// Controlled through the UI rather than the AI.
    #[serde(default)]
    pub is_human: bool,
}

impl CivSlot {
    /// An AI slot.
    #[must_use]
    pub fn ai(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_human: false,
        }
    }

    /// A human slot.
    #[must_use]
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_human: true,
        }
    }
}

/// Everything needed to set up a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Map generation settings.
    pub map: MapGenConfig,
    /// Player slots in turn order.
    pub civs: Vec<CivSlot>,
    /// Turn scheduler tuning.
    pub scheduler: SchedulerConfig,
    /// Debug: every civilization sees the whole map.
    pub reveal_all: bool,
    /// Units every civilization starts with.
    pub starting_units: Vec<UnitKind>,
    /// Balance tables.
    pub rules: Rules,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map: MapGenConfig::default(),
            civs: vec![CivSlot::ai("Rome"), CivSlot::ai("Babylon")],
            scheduler: SchedulerConfig::default(),
            reveal_all: false,
            starting_units: vec![UnitKind::Settler, UnitKind::Warrior, UnitKind::Scout],
            rules: Rules::default(),
        }
    }
}

impl GameConfig {
    /// AI-only game on a `width x height` map.
    #[must_use]
    pub fn ai_only(civs: usize, width: u32, height: u32, seed: u64) -> Self {
        const NAMES: [&str; 8] = [
            "Rome", "Babylon", "Egypt", "Greece", "China", "Persia", "Carthage", "Aztecs",
        ];
        let civs = (0..civs)
            .map(|i| CivSlot::ai(NAMES.get(i).map_or_else(|| format!("Civ {i}"), |n| (*n).to_string())))
            .collect();
        Self {
            map: MapGenConfig::sized(width, height).with_seed(seed),
            civs,
            ..Default::default()
        }
    }

    /// Load from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config: GameConfig = ron::from_str(&contents).map_err(|e| GameError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: GameConfig = ron::from_str(ron).map_err(|e| GameError::ConfigParse {
            path: "<inline>".into(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check slot count and nested settings.
    pub fn validate(&self) -> Result<()> {
        if self.civs.is_empty() {
            return Err(GameError::InvalidConfig("at least one civilization is required".into()));
        }
        if self.civs.len() > usize::from(u8::MAX) {
            return Err(GameError::InvalidConfig(format!(
                "{} civilizations exceed the limit of {}",
                self.civs.len(),
                u8::MAX
            )));
        }
        if let Some(slot) = self.civs.iter().find(|s| s.name.trim().is_empty()) {
            return Err(GameError::InvalidConfig(format!("civilization name {:?} is blank", slot.name)));
        }
        self.scheduler.validate()?;
        self.rules.validate()
    }

    /// Civilizations for the configured slots, numbered in order.
    #[must_use]
    pub fn civilizations(&self) -> Vec<Civilization> {
        self.civs
            .iter()
            .enumerate()
            .map(|(i, slot)| Civilization::new(CivId(i as u8), slot.name.clone(), slot.is_human))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.scheduler.ai_turn_timeout_ms, 30_000);
        assert_eq!(config.scheduler.max_iterations_per_unit, 12);
        assert_eq!(config.scheduler.stuck_threshold, 3);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = GameConfig::from_ron_str(
            r#"GameConfig(
                map: (width: 30, height: 24, seed: 9),
                civs: [(name: "Rome"), (name: "Carthage", is_human: true)],
                scheduler: (ai_turn_timeout_ms: 500),
                reveal_all: true,
            )"#,
        )
        .unwrap();
        assert_eq!(config.map.width, 30);
        assert_eq!(config.map.seed, 9);
        assert!(config.reveal_all);
        assert_eq!(config.scheduler.ai_turn_timeout_ms, 500);
        assert_eq!(config.scheduler.stuck_threshold, 3);
        assert_eq!(config.rules, Rules::default());

        let civs = config.civilizations();
        assert_eq!(civs[1].id, CivId(1));
        assert!(!civs[0].is_human);
        assert!(civs[1].is_human);
    }

    #[test]
    fn test_rejects_empty_slots() {
        let err = GameConfig::from_ron_str("GameConfig(civs: [])").unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = GameConfig::from_ron_str("GameConfig(civs: 3)").unwrap_err();
        assert!(matches!(err, GameError::ConfigParse { .. }));
    }

    #[test]
    fn test_ai_only_names() {
        let config = GameConfig::ai_only(3, 24, 20, 1);
        assert_eq!(config.civs[2].name, "Egypt");
        assert!(config.civs.iter().all(|c| !c.is_human));
    }
}
