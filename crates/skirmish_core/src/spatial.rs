//! Spatial queries and collision tests.
//!
//! Every query is a linear scan over the world in ascending id order.
//! Ties (equal distances) resolve to the first entity encountered, so
//! results never depend on anything but the world contents. A spatial
//! index may replace the scans as long as it keeps those two contracts:
//! nearest match within the radius, and lowest id on ties.

use crate::components::{EntityId, EntityTags, Rect};
use crate::math::{Fixed, Vec2Fixed};
use crate::world::{Entity, World};

/// Check whether a `width` x `height` box centered at `center` is free.
///
/// Every living entity's bounding box is grown by `padding` on each side
/// before the overlap test.
#[must_use]
pub fn is_area_clear(
    world: &World,
    center: Vec2Fixed,
    width: Fixed,
    height: Fixed,
    padding: Fixed,
) -> bool {
    let area = Rect::centered(center, width, height);
    !world
        .iter()
        .filter(|entity| entity.is_alive())
        .any(|entity| entity.bounds().expand(padding).overlaps(&area))
}

/// Check whether a circle of `radius` at `point` touches no solid entity.
#[must_use]
pub fn is_location_clear(
    world: &World,
    point: Vec2Fixed,
    radius: Fixed,
    ignore: &[EntityId],
) -> bool {
    first_blocker(world, point, radius, ignore).is_none()
}

/// First solid entity (ascending id) that a circle at `point` touches.
///
/// Structures are tested as rectangles using the closest point on the
/// rectangle, which rounds the corners. Everything else is a circle of
/// radius `width / 2`.
#[must_use]
pub fn first_blocker(
    world: &World,
    point: Vec2Fixed,
    radius: Fixed,
    ignore: &[EntityId],
) -> Option<EntityId> {
    world
        .iter()
        .filter(|entity| entity.is_alive() && entity.is_solid())
        .filter(|entity| !ignore.contains(&entity.id))
        .find(|entity| circle_hits(entity, point, radius))
        .map(|entity| entity.id)
}

fn circle_hits(entity: &Entity, point: Vec2Fixed, radius: Fixed) -> bool {
    if entity.is_structure() {
        let bounds = entity.bounds();
        if bounds.contains(point) {
            return true;
        }
        let closest = bounds.clamp_point(point);
        point.distance_squared(closest) < radius.saturating_mul(radius)
    } else {
        let reach = radius + entity.radius();
        point.distance_squared(entity.position) < reach.saturating_mul(reach)
    }
}

/// Topmost living entity whose bounding box contains `point`.
///
/// The most recently added entity wins when boxes overlap.
#[must_use]
pub fn object_at(world: &World, point: Vec2Fixed) -> Option<EntityId> {
    world
        .iter_rev()
        .find(|entity| entity.is_alive() && entity.bounds().contains(point))
        .map(|entity| entity.id)
}

/// Closest living entity hostile to `id` within `radius` of it.
#[must_use]
pub fn find_closest_enemy(world: &World, id: EntityId, radius: Fixed) -> Option<EntityId> {
    let seeker = world.get(id)?;
    closest_matching(world, seeker, Some(radius), |other| {
        seeker.team.is_hostile_to(other.team)
    })
}

/// Closest living headquarters on `id`'s team, optionally within `radius`.
#[must_use]
pub fn find_closest_hq(world: &World, id: EntityId, radius: Option<Fixed>) -> Option<EntityId> {
    let seeker = world.get(id)?;
    closest_matching(world, seeker, radius, |other| {
        other.team == seeker.team && other.tags.contains(EntityTags::HQ)
    })
}

fn closest_matching(
    world: &World,
    seeker: &Entity,
    radius: Option<Fixed>,
    predicate: impl Fn(&Entity) -> bool,
) -> Option<EntityId> {
    let limit = radius.map(|r| r.saturating_mul(r));
    let mut best: Option<(EntityId, Fixed)> = None;

    for other in world.iter() {
        if other.id == seeker.id || !other.is_alive() || !predicate(other) {
            continue;
        }
        let dist_sq = seeker.position.distance_squared(other.position);
        if limit.is_some_and(|limit| dist_sq > limit) {
            continue;
        }
        // Strict comparison keeps the lowest id on ties.
        if best.map_or(true, |(_, best_sq)| dist_sq < best_sq) {
            best = Some((other.id, dist_sq));
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::{Building, BuildingKind};
    use crate::components::{Footprint, Health, Team};
    use crate::unit::{Unit, UnitStats};
    use crate::world::EntityKind;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn stats() -> UnitStats {
        UnitStats {
            speed: fixed(50),
            damage: fixed(10),
            attack_range: fixed(30),
            autochase_range: fixed(200),
            max_health: fixed(100),
        }
    }

    fn add_unit(world: &mut World, team: Team, x: i32, y: i32) -> EntityId {
        let id = world.allocate_id();
        world.insert(Entity {
            id,
            name: "unit".to_string(),
            team,
            position: Vec2Fixed::from_ints(x, y),
            footprint: Footprint::new(fixed(20), fixed(20)),
            health: Health::new(fixed(100)),
            tags: EntityTags::SOLID,
            kind: EntityKind::Unit(Unit::new(stats())),
        })
        .unwrap()
    }

    fn add_structure(world: &mut World, team: Team, x: i32, y: i32, size: i32) -> EntityId {
        let id = world.allocate_id();
        world.insert(Entity {
            id,
            name: "block".to_string(),
            team,
            position: Vec2Fixed::from_ints(x, y),
            footprint: Footprint::new(fixed(size), fixed(size)),
            health: Health::new(fixed(500)),
            tags: EntityTags::SOLID | EntityTags::STRUCTURE | EntityTags::HQ,
            kind: EntityKind::Building(Building {
                kind: BuildingKind::Command,
            }),
        })
        .unwrap()
    }

    #[test]
    fn test_area_clear_with_padding() {
        let mut world = World::new();
        add_structure(&mut world, Team::Friend, 0, 0, 80);

        // Box edge at 40, padding pushes the blocked zone to 50.
        assert!(!is_area_clear(
            &world,
            Vec2Fixed::from_ints(85, 0),
            fixed(80),
            fixed(80),
            fixed(10)
        ));
        assert!(is_area_clear(
            &world,
            Vec2Fixed::from_ints(90, 0),
            fixed(80),
            fixed(80),
            fixed(10)
        ));
    }

    #[test]
    fn test_circle_against_rectangle() {
        let mut world = World::new();
        let wall = add_structure(&mut world, Team::Friend, 0, 0, 100);

        // Straight out from an edge.
        assert!(!is_location_clear(&world, Vec2Fixed::from_ints(55, 0), fixed(10), &[]));
        assert!(is_location_clear(&world, Vec2Fixed::from_ints(60, 0), fixed(10), &[]));

        // Diagonal from the corner (50, 50): 8² + 8² = 128 > 100.
        assert!(is_location_clear(&world, Vec2Fixed::from_ints(58, 58), fixed(10), &[]));
        assert!(!is_location_clear(&world, Vec2Fixed::from_ints(56, 56), fixed(10), &[]));

        // Inside and ignored.
        assert_eq!(
            first_blocker(&world, Vec2Fixed::ZERO, fixed(1), &[]),
            Some(wall)
        );
        assert!(is_location_clear(&world, Vec2Fixed::ZERO, fixed(1), &[wall]));
    }

    #[test]
    fn test_circle_against_circle() {
        let mut world = World::new();
        add_unit(&mut world, Team::Friend, 0, 0);

        assert!(!is_location_clear(&world, Vec2Fixed::from_ints(19, 0), fixed(10), &[]));
        assert!(is_location_clear(&world, Vec2Fixed::from_ints(20, 0), fixed(10), &[]));
    }

    #[test]
    fn test_dead_entities_do_not_block() {
        let mut world = World::new();
        let id = add_unit(&mut world, Team::Friend, 0, 0);
        world.get_mut(id).unwrap().health.current = Fixed::ZERO;
        assert!(is_location_clear(&world, Vec2Fixed::ZERO, fixed(10), &[]));
        assert!(object_at(&world, Vec2Fixed::ZERO).is_none());
    }

    #[test]
    fn test_object_at_prefers_latest() {
        let mut world = World::new();
        add_structure(&mut world, Team::Friend, 0, 0, 100);
        let top = add_unit(&mut world, Team::Friend, 10, 10);

        assert_eq!(object_at(&world, Vec2Fixed::from_ints(10, 10)), Some(top));
        assert_ne!(object_at(&world, Vec2Fixed::from_ints(-40, -40)), Some(top));
        assert!(object_at(&world, Vec2Fixed::from_ints(500, 500)).is_none());
    }

    #[test]
    fn test_find_closest_enemy() {
        let mut world = World::new();
        let me = add_unit(&mut world, Team::Friend, 0, 0);
        add_unit(&mut world, Team::Friend, 10, 0);
        let far = add_unit(&mut world, Team::Enemy, 150, 0);
        let near = add_unit(&mut world, Team::Enemy, 0, 100);

        assert_eq!(find_closest_enemy(&world, me, fixed(200)), Some(near));
        assert_eq!(find_closest_enemy(&world, me, fixed(50)), None);

        world.get_mut(near).unwrap().health.current = Fixed::ZERO;
        assert_eq!(find_closest_enemy(&world, me, fixed(200)), Some(far));
    }

    #[test]
    fn test_find_closest_enemy_tie_breaks_by_id() {
        let mut world = World::new();
        let me = add_unit(&mut world, Team::Friend, 0, 0);
        let first = add_unit(&mut world, Team::Enemy, 50, 0);
        add_unit(&mut world, Team::Enemy, -50, 0);
        assert_eq!(find_closest_enemy(&world, me, fixed(100)), Some(first));
    }

    #[test]
    fn test_find_closest_hq() {
        let mut world = World::new();
        let me = add_unit(&mut world, Team::Friend, 0, 0);
        add_structure(&mut world, Team::Enemy, 50, 0, 40);
        let home = add_structure(&mut world, Team::Friend, 400, 0, 40);

        assert_eq!(find_closest_hq(&world, me, None), Some(home));
        assert_eq!(find_closest_hq(&world, me, Some(fixed(100))), None);
    }
}
