//! Civilizations (player slots).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Unique identifier for civilizations. Also the rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CivId(pub u8);

impl std::fmt::Display for CivId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "civ#{}", self.0)
    }
}

/// Treasury and research output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Gold on hand.
    pub gold: i32,
    /// Science produced last turn.
    pub science: i32,
}

/// A player slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Civilization {
    /// Slot id.
    pub id: CivId,
    /// Display name.
    pub name: String,
    /// Controlled through the UI rather than the AI engine.
    pub is_human: bool,
    /// Cleared by the victory evaluator on elimination.
    pub is_alive: bool,
    /// Gold and science.
    pub resources: Treasury,
    /// Discovered technology ids.
    pub technologies: BTreeSet<String>,
    /// Technology currently researched.
    pub current_research: Option<String>,
    /// Science accumulated toward `current_research`.
    pub research_progress: u32,
}

impl Civilization {
    /// Create a living civilization with an empty treasury.
    #[must_use]
    pub fn new(id: CivId, name: impl Into<String>, is_human: bool) -> Self {
        Self {
            id,
            name: name.into(),
            is_human,
            is_alive: true,
            resources: Treasury::default(),
            technologies: BTreeSet::new(),
            current_research: None,
            research_progress: 0,
        }
    }

    /// Has this civilization discovered `tech`.
    #[must_use]
    pub fn knows(&self, tech: &str) -> bool {
        self.technologies.contains(tech)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_civilization_is_alive() {
        let civ = Civilization::new(CivId(1), "Babylon", false);
        assert!(civ.is_alive);
        assert!(!civ.is_human);
        assert_eq!(civ.resources, Treasury::default());
        assert!(!civ.knows("pottery"));
        assert_eq!(civ.id.to_string(), "civ#1");
    }
}
