//! Item definitions for data-driven units and buildings.

use serde::{Deserialize, Serialize};

use crate::components::EntityTags;
use crate::economy::Cost;
use crate::math::{decimal_serde, Fixed};

/// What kind of thing an item produces when built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    /// A mobile unit.
    Unit,
    /// A building with a production queue.
    Production,
    /// A headquarters building.
    Command,
    /// A building that generates resources.
    Economic,
    /// Any other static building (walls, decorations).
    Other,
}

impl ItemCategory {
    /// Check if this category describes a unit.
    #[must_use]
    pub const fn is_unit(self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Check if this category describes a building.
    #[must_use]
    pub const fn is_building(self) -> bool {
        !self.is_unit()
    }

    /// Capability tags for entities built from this category.
    #[must_use]
    pub fn tags(self) -> EntityTags {
        let building = EntityTags::SOLID | EntityTags::STRUCTURE;
        match self {
            Self::Unit => EntityTags::SOLID,
            Self::Production => building | EntityTags::PRODUCTION,
            Self::Command => building | EntityTags::HQ,
            Self::Economic => building | EntityTags::ECONOMIC,
            Self::Other => building,
        }
    }
}

/// Combat and movement stats for unit items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Movement speed in world units per second.
    #[serde(with = "decimal_serde")]
    pub speed: Fixed,
    /// Damage per second while in range.
    #[serde(with = "decimal_serde")]
    pub damage: Fixed,
    /// Distance at which the unit stops and attacks.
    #[serde(with = "decimal_serde")]
    pub attack_range: Fixed,
    /// Radius within which enemies are acquired automatically.
    #[serde(with = "decimal_serde")]
    pub autochase_range: Fixed,
}

/// Income settings for economic buildings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorProfile {
    /// Resource produced.
    pub resource_type: String,
    /// Amount produced per generation interval.
    pub generation_rate: u32,
}

/// Data-driven item definition.
///
/// # Example JSON
///
/// ```json
/// {
///   "name": "rifleman",
///   "category": "unit",
///   "width": 20, "height": 20,
///   "cost": { "credits": 100 },
///   "build_time": 4,
///   "health": 120,
///   "unit": { "speed": 60, "damage": 20, "attack_range": 40, "autochase_range": 200 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique name; the catalog key.
    pub name: String,

    /// Behavior variant.
    pub category: ItemCategory,

    /// Footprint width in world units.
    #[serde(with = "decimal_serde")]
    pub width: Fixed,

    /// Footprint height in world units.
    #[serde(with = "decimal_serde")]
    pub height: Fixed,

    /// Resources charged when queued.
    #[serde(default)]
    pub cost: Cost,

    /// Production time in seconds.
    #[serde(default, with = "decimal_serde")]
    pub build_time: Fixed,

    /// Maximum health points.
    #[serde(with = "decimal_serde")]
    pub health: Fixed,

    /// Item names this building can produce. Empty means anything.
    #[serde(default)]
    pub produces: Vec<String>,

    /// Unit stats; required for unit items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitProfile>,

    /// Income settings; required for economic buildings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorProfile>,
}

impl ItemDefinition {
    /// Production time converted to milliseconds.
    ///
    /// Saturates for times too long to represent in milliseconds; see
    /// [`Self::build_time_in_range`].
    #[must_use]
    pub fn build_time_ms(&self) -> u64 {
        let ms = self
            .build_time
            .max(Fixed::ZERO)
            .saturating_mul(Fixed::from_num(1000));
        ms.to_num::<u64>()
    }

    /// Check that the build time converts to milliseconds exactly.
    #[must_use]
    pub fn build_time_in_range(&self) -> bool {
        self.build_time.checked_mul(Fixed::from_num(1000)).is_some()
    }

    /// Check whether this building may produce `item`.
    #[must_use]
    pub fn can_produce(&self, item: &str) -> bool {
        self.produces.is_empty() || self.produces.iter().any(|p| p == item)
    }

    /// Capability tags for entities built from this item.
    #[must_use]
    pub fn tags(&self) -> EntityTags {
        self.category.tags()
    }
}
