//! # Skirmish Core
//!
//! Deterministic simulation core for a real-time skirmish game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO (catalogs and configs are parsed from strings)
//! - No system randomness and no wall clock
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and scripted scenarios
//! - Determinism testing via state hashes
//! - Any presentation layer on top, talking through [`interface::UiSink`]
//!
//! ## Crate Structure
//!
//! - [`world`] - Entity storage
//! - [`spatial`] - Collision and proximity queries
//! - [`pathfinding`] - Single-detour movement planning
//! - [`combat`] - Target acquisition and damage
//! - [`production`] - Production queues and spawn points
//! - [`economy`] - Resource pool and passive income
//! - [`abilities`] - Timed abilities and status effects
//! - [`simulation`] - Core simulation loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod buildings;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod economy;
pub mod error;
pub mod interface;
pub mod math;
pub mod pathfinding;
pub mod production;
pub mod simulation;
pub mod spatial;
pub mod unit;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{AbilityGrant, AbilityKind, AbilityRecord};
    pub use crate::buildings::{Building, BuildingKind};
    pub use crate::components::{EntityId, EntityTags, Footprint, Health, Rect, Team};
    pub use crate::config::SimConfig;
    pub use crate::data::{ItemCatalog, ItemCategory, ItemDefinition};
    pub use crate::economy::{Cost, ResourcePool};
    pub use crate::error::{GameError, PlacementError, ProductionError, Result};
    pub use crate::interface::{NullSink, UiSink};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::production::{ProductionPhase, ProductionState};
    pub use crate::simulation::{Command, Simulation, TickEvents};
    pub use crate::unit::{StatusFlags, Unit, UnitOrder, UnitStats};
    pub use crate::world::{Entity, EntityKind, World};
}
