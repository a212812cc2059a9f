//! Scenario loading and configuration.
//!
//! A scenario is a [`GameConfig`] plus the limits of a headless run: how
//! many rounds to play and whether elimination ends the game early.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "Coastal Duel",
//!     game: (
//!         map: (width: 24, height: 20, seed: 3),
//!         civs: [(name: "Rome"), (name: "Carthage")],
//!     ),
//!     max_rounds: 80,
//!     victory: (elimination: true),
//! )
//! ```

use std::path::Path;

use civ_core::config::GameConfig;
use civ_core::error::GameError;
use civ_core::victory::{NoVictory, StandardVictory, VictoryEvaluator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Neither a built-in name nor an existing file.
    #[error("Scenario not found: {0}")]
    NotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but the game setup is unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// How a headless game may end before `max_rounds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictorySettings {
    /// Stop once a single civilization remains.
    pub elimination: bool,
}

impl Default for VictorySettings {
    fn default() -> Self {
        Self { elimination: true }
    }
}

/// A complete headless scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Game setup.
    pub game: GameConfig,
    /// Rounds to play at most.
    pub max_rounds: u32,
    /// Early end conditions.
    pub victory: VictorySettings,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::duel()
    }
}

impl Scenario {
    /// Built-in scenario names accepted by [`Scenario::resolve`].
    pub const BUILTIN: [&'static str; 3] = ["duel", "four_way", "crowded"];

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::NotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// A built-in scenario by name, else a RON file at that path.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Look up a built-in scenario.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "duel" => Some(Self::duel()),
            "four_way" => Some(Self::four_way()),
            "crowded" => Some(Self::crowded()),
            _ => None,
        }
    }

    /// Two AI civilizations on a 20x20 map.
    #[must_use]
    pub fn duel() -> Self {
        Self {
            name: "duel".to_string(),
            description: "Two AI civilizations on a small continent".to_string(),
            game: GameConfig::ai_only(2, 20, 20, 12345),
            max_rounds: 50,
            victory: VictorySettings::default(),
        }
    }

    /// Four AI civilizations on a 40x30 map.
    #[must_use]
    pub fn four_way() -> Self {
        Self {
            name: "four_way".to_string(),
            description: "Four AI civilizations racing for land".to_string(),
            game: GameConfig::ai_only(4, 40, 30, 12345),
            max_rounds: 100,
            victory: VictorySettings::default(),
        }
    }

    /// Six AI civilizations squeezed onto a 24x16 map.
    #[must_use]
    pub fn crowded() -> Self {
        let mut game = GameConfig::ai_only(6, 24, 16, 12345);
        game.map.feature_density = 0.1;
        Self {
            name: "crowded".to_string(),
            description: "Six AI civilizations with no room to expand".to_string(),
            game,
            max_rounds: 60,
            victory: VictorySettings::default(),
        }
    }

    /// Same scenario on a different map seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.game.map.seed = seed;
        self
    }

    /// Same scenario with a different round cap.
    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Map seed in use.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.game.map.seed
    }

    /// Check the embedded game setup.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.max_rounds == 0 {
            return Err(GameError::InvalidConfig("max_rounds must be positive".into()));
        }
        self.game.validate()
    }

    /// End condition for a fresh game of this scenario. The round cap is
    /// enforced by the runner.
    #[must_use]
    pub fn evaluator(&self) -> Box<dyn VictoryEvaluator> {
        if self.victory.elimination {
            Box::new(StandardVictory::default())
        } else {
            Box::new(NoVictory)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        for name in Scenario::BUILTIN {
            let scenario = Scenario::builtin(name).unwrap();
            assert_eq!(scenario.name, name);
            scenario.validate().unwrap();
        }
        assert!(Scenario::builtin("nope").is_none());
    }

    #[test]
    fn test_parse_partial_ron() {
        let scenario = Scenario::from_ron_str(
            r#"Scenario(
                name: "tiny",
                game: (map: (width: 16, height: 12, seed: 4), civs: [(name: "Rome"), (name: "Carthage", is_human: true)]),
                max_rounds: 10,
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.name, "tiny");
        assert_eq!(scenario.seed(), 4);
        assert_eq!(scenario.max_rounds, 10);
        assert!(scenario.victory.elimination);
        assert!(scenario.game.civs[1].is_human);
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let err = Scenario::from_ron_str("Scenario(max_rounds: 0)").unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::resolve("definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::NotFound(_)));
    }

    #[test]
    fn test_with_seed() {
        let scenario = Scenario::duel().with_seed(99).with_max_rounds(5);
        assert_eq!(scenario.seed(), 99);
        assert_eq!(scenario.max_rounds, 5);
    }
}
