//! Error types for the game simulation.
//!
//! Only initialization and configuration problems surface as [`GameError`].
//! Everything that can go wrong during a turn is a plain value
//! ([`MoveError`], [`ActionError`]) so that callers always have a fallback.

use thiserror::Error;

use crate::civilization::CivId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for setup and configuration failures.
#[derive(Debug, Error)]
pub enum GameError {
    /// The simulation was started without a usable map.
    #[error("Missing map: {0}")]
    MissingMap(String),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A civilization id does not refer to a known slot.
    #[error("Unknown civilization: {0}")]
    UnknownCivilization(CivId),

    /// Data file parsing error.
    #[error("Failed to parse config '{path}': {message}")]
    ConfigParse {
        /// Path (or label) of the source that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Reading a config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a unit move (or move-attack) is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    /// No unit with the given id exists.
    #[error("unit_not_found")]
    UnitNotFound,
    /// Target is off the map, not adjacent, or otherwise unusable.
    #[error("invalid_target")]
    InvalidTarget,
    /// The unit has no movement points left this turn.
    #[error("no_moves_left")]
    NoMovesLeft,
    /// The unit cannot enter the target terrain at all.
    #[error("terrain_impassable")]
    TerrainImpassable,
    /// The unit has moves left, but fewer than the target terrain costs.
    #[error("insufficient_moves")]
    InsufficientMoves,
    /// The move is blocked for another reason (foreign city, wrong owner).
    #[error("cannot_move")]
    CannotMove,
    /// The issuing turn is no longer the active one.
    #[error("stale_turn")]
    StaleTurn,
}

/// Reasons a non-movement unit action is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No unit with the given id exists.
    #[error("unit_not_found")]
    UnitNotFound,
    /// The unit's archetype does not support the action.
    #[error("unsupported_action")]
    Unsupported,
    /// A city cannot be founded on the unit's tile.
    #[error("invalid_site")]
    InvalidSite,
    /// The unit does not belong to the issuing civilization.
    #[error("not_owner")]
    NotOwner,
    /// The issuing turn is no longer the active one.
    #[error("stale_turn")]
    StaleTurn,
}
