//! Shared entity building blocks.
//!
//! Components are pure data with no behavior beyond small helpers.
//! Every entity in the world is composed of these plus a unit or
//! building specialization.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for entities.
///
/// Allocated monotonically by the world and never reused.
pub type EntityId = u64;

/// Side an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// The local player.
    Friend,
    /// Everybody else.
    Enemy,
}

impl Team {
    /// Check if two teams are hostile to each other.
    #[must_use]
    pub fn is_hostile_to(self, other: Self) -> bool {
        self != other
    }
}

bitflags! {
    /// Capability tags driving collision and behavior dispatch.
    ///
    /// Computed once when an entity is built from its catalog entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EntityTags: u8 {
        /// Blocks movement and spawning.
        const SOLID      = 1 << 0;
        /// Collides as a rectangle instead of a circle.
        const STRUCTURE  = 1 << 1;
        /// Headquarters; units return here.
        const HQ         = 1 << 2;
        /// Generates resources over time.
        const ECONOMIC   = 1 << 3;
        /// Owns a production queue.
        const PRODUCTION = 1 << 4;
    }
}

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    #[serde(with = "fixed_serde")]
    pub current: Fixed,
    /// Maximum health points.
    #[serde(with = "fixed_serde")]
    pub max: Fixed,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: Fixed) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health ≤ 0).
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= Fixed::ZERO
    }

    /// Check if entity is at full health.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply damage, returning actual damage dealt.
    ///
    /// Health bottoms out at zero.
    pub fn apply_damage(&mut self, amount: Fixed) -> Fixed {
        if amount <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        let actual = amount.min(self.current.max(Fixed::ZERO));
        self.current -= actual;
        actual
    }

    /// Heal the entity, returning actual amount healed.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        if amount <= Fixed::ZERO || self.is_dead() {
            return Fixed::ZERO;
        }
        let headroom = (self.max - self.current).max(Fixed::ZERO);
        let actual = amount.min(headroom);
        self.current += actual;
        actual
    }

    /// Multiply both current and maximum health by `factor`.
    ///
    /// Used for max-health multipliers; dividing by the same factor
    /// restores the original pair. Returns `false` and changes nothing
    /// if either product is out of range.
    pub fn try_scale(&mut self, factor: Fixed) -> bool {
        match (self.max.checked_mul(factor), self.current.checked_mul(factor)) {
            (Some(max), Some(current)) => {
                self.max = max;
                self.current = current;
                true
            }
            _ => false,
        }
    }

    /// Divide both current and maximum health by `factor`.
    pub fn unscale(&mut self, factor: Fixed) {
        if let (Some(max), Some(current)) =
            (self.max.checked_div(factor), self.current.checked_div(factor))
        {
            self.max = max;
            self.current = current.min(max);
        }
    }

    /// Get health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max <= Fixed::ZERO {
            0
        } else {
            (self.current.max(Fixed::ZERO) * Fixed::from_num(100) / self.max).to_num::<u32>()
        }
    }
}

/// Axis-aligned size of an entity, centered on its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    /// Width in world units.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Height in world units.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl Footprint {
    /// Create a footprint.
    #[must_use]
    pub const fn new(width: Fixed, height: Fixed) -> Self {
        Self { width, height }
    }

    /// Collision radius used for circle tests (`width / 2`).
    #[must_use]
    pub fn radius(&self) -> Fixed {
        self.width / Fixed::from_num(2)
    }

    /// Half of the larger side.
    #[must_use]
    pub fn half_extent(&self) -> Fixed {
        self.width.max(self.height) / Fixed::from_num(2)
    }

    /// Bounding box when centered at `center`.
    #[must_use]
    pub fn bounds_at(&self, center: Vec2Fixed) -> Rect {
        Rect::centered(center, self.width, self.height)
    }
}

/// Axis-aligned rectangle given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Lowest x and y.
    pub min: Vec2Fixed,
    /// Highest x and y.
    pub max: Vec2Fixed,
}

impl Rect {
    /// Rectangle of the given size centered at `center`.
    #[must_use]
    pub fn centered(center: Vec2Fixed, width: Fixed, height: Fixed) -> Self {
        let half = Vec2Fixed::new(width / Fixed::from_num(2), height / Fixed::from_num(2));
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        self.min.lerp(self.max, Fixed::from_num(0.5))
    }

    /// Grow the rectangle by `padding` on every side.
    #[must_use]
    pub fn expand(&self, padding: Fixed) -> Self {
        let pad = Vec2Fixed::new(padding, padding);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Strict overlap test; rectangles that only touch do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains(&self, point: Vec2Fixed) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Closest point inside (or on) the rectangle to `point`.
    #[must_use]
    pub fn clamp_point(&self, point: Vec2Fixed) -> Vec2Fixed {
        Vec2Fixed::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
        )
    }
}
