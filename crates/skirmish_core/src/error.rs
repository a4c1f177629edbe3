//! Error types for the game simulation.
//!
//! Two families live here. [`GameError`] covers API misuse and bad data
//! (unknown ids, unparsable catalogs). [`ProductionError`] and
//! [`PlacementError`] are player-facing rejections: they are returned as
//! `Err` and the same text is pushed to the UI status line, but the game
//! carries on untouched.

use thiserror::Error;

use crate::abilities::AbilityKind;
use crate::components::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// An id the world has already handed out, stored a second time.
    #[error("Entity id {0} was already issued")]
    IdReused(EntityId),

    /// Item name not present in the catalog.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The entity exists but is not a unit.
    #[error("Entity {0} is not a unit")]
    NotAUnit(EntityId),

    /// The entity exists but is not a building.
    #[error("Entity {0} is not a building")]
    NotABuilding(EntityId),

    /// Catalog text failed to parse.
    #[error("Failed to parse item catalog: {0}")]
    CatalogParse(String),

    /// Config text failed to parse.
    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    /// An ability grant whose multiplier could not be reversed.
    #[error("Cannot grant {kind:?}: {reason}")]
    InvalidAbility {
        /// Offending record kind.
        kind: AbilityKind,
        /// Why it was refused.
        reason: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}

/// Player-facing reasons a production request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductionError {
    /// Nothing (or nothing able to produce) is selected.
    #[error("Select a production building first")]
    NoBuildingSelected,

    /// The requested item is not in the catalog.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The selected building does not list the item.
    #[error("{building} cannot produce {item}")]
    CannotProduce {
        /// Name of the selected building.
        building: String,
        /// Name of the requested item.
        item: String,
    },

    /// The production queue is full.
    #[error("Production queue is full")]
    QueueFull,

    /// The resource pool cannot cover the cost.
    #[error("Not enough resources for {0}")]
    InsufficientResources(String),

    /// No queued item at the given index.
    #[error("Nothing queued at position {0}")]
    NothingQueued(usize),

    /// The building has no finished item awaiting collection.
    #[error("Nothing is ready for collection")]
    NothingToCollect,

    /// A finished building could not be placed.
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

/// Player-facing reasons a building cannot be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Another entity (plus padding) overlaps the footprint.
    #[error("Cannot place {0} here: area is blocked")]
    AreaBlocked(String),
}
