//! Damage resolution and engagement range.
//!
//! Damage is a rate: a unit deals `damage` health per second while its
//! target is in range, applied each tick as `damage × dt`. Mitigation
//! (immunity, shields) is applied by the victim.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::{fixed_serde, rate_over_millis, Fixed, Vec2Fixed};
use crate::spatial::find_closest_enemy;
use crate::world::{Entity, World};

/// A hit landed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that dealt the damage.
    pub attacker: EntityId,
    /// Entity that took the damage.
    pub target: EntityId,
    /// Health actually removed.
    #[serde(with = "fixed_serde")]
    pub amount: Fixed,
}

/// Closest living enemy of `id` within `autochase_range`.
#[must_use]
pub fn acquire_target(world: &World, id: EntityId, autochase_range: Fixed) -> Option<EntityId> {
    find_closest_enemy(world, id, autochase_range)
}

/// Distance from `from` to the part of `target` an attacker must reach.
///
/// Structures are measured to the nearest point of their footprint,
/// everything else center to center.
#[must_use]
pub fn engagement_distance(from: Vec2Fixed, target: &Entity) -> Fixed {
    if target.is_structure() {
        from.distance(target.bounds().clamp_point(from))
    } else {
        from.distance(target.position)
    }
}

/// Check if `target` is within `attack_range` of `from`.
#[must_use]
pub fn in_attack_range(from: Vec2Fixed, attack_range: Fixed, target: &Entity) -> bool {
    engagement_distance(from, target) <= attack_range
}

/// Raw damage dealt over `dt_ms` at `damage_per_second`.
#[must_use]
pub fn damage_for_tick(damage_per_second: Fixed, dt_ms: u64) -> Fixed {
    rate_over_millis(damage_per_second.max(Fixed::ZERO), dt_ms)
}

/// Apply a raw hit to `target`, returning the health actually removed.
///
/// Dead targets are not hit again.
pub fn apply_hit(target: &mut Entity, raw: Fixed) -> Fixed {
    if !target.is_alive() {
        return Fixed::ZERO;
    }
    let mitigated = target.mitigate(raw);
    target.health.apply_damage(mitigated)
}
