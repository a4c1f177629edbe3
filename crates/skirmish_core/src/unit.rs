//! Mobile unit state.
//!
//! A unit keeps two copies of its stats: `base` as defined in the
//! catalog, and `stats` with every active ability folded in. Abilities
//! mutate `stats` and reverse their own change on expiry, so `stats`
//! returns to `base` once nothing is active.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::abilities::AbilityMap;
use crate::components::EntityId;
use crate::data::UnitProfile;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::pathfinding::Path;

/// Numeric unit stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// World units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage per second while a target is in range.
    #[serde(with = "fixed_serde")]
    pub damage: Fixed,
    /// Distance at which the unit stops and attacks.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Radius within which enemies are acquired automatically.
    #[serde(with = "fixed_serde")]
    pub autochase_range: Fixed,
    /// Maximum health.
    #[serde(with = "fixed_serde")]
    pub max_health: Fixed,
}

impl UnitStats {
    /// Stats from a catalog profile plus the item's health.
    #[must_use]
    pub fn from_profile(profile: &UnitProfile, max_health: Fixed) -> Self {
        Self {
            speed: profile.speed,
            damage: profile.damage,
            attack_range: profile.attack_range,
            autochase_range: profile.autochase_range,
            max_health,
        }
    }
}

/// What drives a unit's motion this tick.
///
/// Exactly one mode is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitOrder {
    /// Standing still; enemies in range are acquired automatically.
    #[default]
    Idle,
    /// Walking to a point. Auto-engage is suppressed.
    Move {
        /// Final destination.
        destination: Vec2Fixed,
    },
    /// Fighting an automatically acquired enemy.
    Engage,
    /// Fighting a target chosen by the player.
    Attack {
        /// Target entity.
        target: EntityId,
    },
    /// Walking back to a headquarters.
    ReturnToBase {
        /// Headquarters entity.
        hq: EntityId,
    },
}

impl UnitOrder {
    /// Check if this order may be replaced by automatic target acquisition.
    #[must_use]
    pub const fn allows_auto_engage(self) -> bool {
        matches!(self, Self::Idle | Self::Engage)
    }
}

bitflags! {
    /// Visible status effects currently on a unit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StatusFlags: u8 {
        /// Takes no damage.
        const IMMUNE     = 1 << 0;
        /// Regenerates health.
        const RECOVERING = 1 << 1;
        /// Takes periodic damage.
        const POISONED   = 1 << 2;
        /// Absorbs part of incoming damage.
        const SHIELDED   = 1 << 3;
    }
}

/// Unit specialization of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Catalog stats.
    pub base: UnitStats,
    /// Stats with active abilities applied.
    pub stats: UnitStats,
    /// Current movement mode.
    pub order: UnitOrder,
    /// Enemy being fought. Revalidated every tick.
    pub attack_target: Option<EntityId>,
    /// Remaining waypoints.
    pub path: Path,
    /// Granted abilities keyed by kind.
    pub abilities: AbilityMap,
    /// Active status effects.
    pub status: StatusFlags,
}

impl Unit {
    /// Create an idle unit with no abilities.
    #[must_use]
    pub fn new(base: UnitStats) -> Self {
        Self {
            base,
            stats: base,
            order: UnitOrder::Idle,
            attack_target: None,
            path: Path::default(),
            abilities: AbilityMap::default(),
            status: StatusFlags::empty(),
        }
    }

    /// Check if the unit currently ignores damage.
    #[must_use]
    pub fn is_immune(&self) -> bool {
        self.status.contains(StatusFlags::IMMUNE)
    }

    /// Fraction of incoming damage absorbed: the strongest applied shield.
    #[must_use]
    pub fn shield(&self) -> Option<Fixed> {
        self.abilities
            .iter()
            .filter(|record| record.applied && record.kind.is_shield())
            .map(|record| record.value)
            .max()
    }

    /// Damage actually taken from a raw hit after immunity and shields.
    #[must_use]
    pub fn mitigate(&self, raw: Fixed) -> Fixed {
        if self.is_immune() || raw <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        match self.shield() {
            Some(absorb) => {
                let absorb = absorb.clamp(Fixed::ZERO, Fixed::ONE);
                raw * (Fixed::ONE - absorb)
            }
            None => raw,
        }
    }

    /// Drop every movement driver and go idle.
    pub fn stop(&mut self) {
        self.order = UnitOrder::Idle;
        self.attack_target = None;
        self.path.clear();
    }
}
