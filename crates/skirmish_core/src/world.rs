//! Entity storage.
//!
//! The world exclusively owns every entity. Everything else refers to
//! entities by [`EntityId`] and looks them up again each tick, since any
//! referenced entity may have been pruned in the meantime.
//!
//! Entities are kept in a `BTreeMap`. Ids are allocated monotonically,
//! so ascending id order is also insertion order, and every iteration
//! is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::buildings::Building;
use crate::components::{EntityId, EntityTags, Footprint, Health, Rect, Team};
use crate::config::SimConfig;
use crate::data::ItemDefinition;
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::unit::{Unit, UnitStats};

/// Unit or building specialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile unit.
    Unit(Unit),
    /// A static building.
    Building(Building),
}

/// Anything that lives on the map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id.
    pub id: EntityId,
    /// Catalog item this entity was built from.
    pub name: String,
    /// Owning side.
    pub team: Team,
    /// Center of the entity.
    pub position: Vec2Fixed,
    /// Size of the bounding box.
    pub footprint: Footprint,
    /// Hit points.
    pub health: Health,
    /// Capability tags.
    pub tags: EntityTags,
    /// Unit or building state.
    pub kind: EntityKind,
}

impl Entity {
    /// Build an entity from its catalog definition.
    ///
    /// Fails if a unit item has no unit profile.
    pub fn from_definition(
        id: EntityId,
        definition: &ItemDefinition,
        team: Team,
        position: Vec2Fixed,
        now_ms: u64,
        config: &SimConfig,
    ) -> Result<Self> {
        let kind = if definition.category.is_unit() {
            let profile = definition.unit.as_ref().ok_or_else(|| {
                GameError::InvalidState(format!("{} has no unit profile", definition.name))
            })?;
            EntityKind::Unit(Unit::new(UnitStats::from_profile(
                profile,
                definition.health,
            )))
        } else {
            EntityKind::Building(Building::from_definition(
                definition,
                position,
                now_ms,
                config.max_queue_size,
            ))
        };

        Ok(Self {
            id,
            name: definition.name.clone(),
            team,
            position,
            footprint: Footprint::new(definition.width, definition.height),
            health: Health::new(definition.health),
            tags: definition.tags(),
            kind,
        })
    }

    /// Check if the entity is still alive (health > 0).
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Check if the entity blocks movement.
    #[must_use]
    pub fn is_solid(&self) -> bool {
        self.tags.contains(EntityTags::SOLID)
    }

    /// Check if the entity collides as a rectangle.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        self.tags.contains(EntityTags::STRUCTURE)
    }

    /// Axis-aligned bounding box.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.footprint.bounds_at(self.position)
    }

    /// Collision radius for circle tests.
    #[must_use]
    pub fn radius(&self) -> Fixed {
        self.footprint.radius()
    }

    /// Unit state, if this is a unit.
    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match &self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// Mutable unit state, if this is a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut Unit> {
        match &mut self.kind {
            EntityKind::Unit(unit) => Some(unit),
            EntityKind::Building(_) => None,
        }
    }

    /// Building state, if this is a building.
    #[must_use]
    pub fn as_building(&self) -> Option<&Building> {
        match &self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) => None,
        }
    }

    /// Mutable building state, if this is a building.
    pub fn as_building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.kind {
            EntityKind::Building(building) => Some(building),
            EntityKind::Unit(_) => None,
        }
    }

    /// Raw damage after this entity's mitigation (shields, immunity).
    #[must_use]
    pub fn mitigate(&self, raw: Fixed) -> Fixed {
        match &self.kind {
            EntityKind::Unit(unit) => unit.mitigate(raw),
            EntityKind::Building(_) => raw.max(Fixed::ZERO),
        }
    }
}

/// Storage for every entity in the game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: EntityId,
    /// Ids handed out by [`World::allocate_id`] and not inserted yet.
    reserved: BTreeSet<EntityId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create an empty world. The first allocated id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
            reserved: BTreeSet::new(),
        }
    }

    /// Allocate a fresh id. Ids are never reused.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        self.reserved.insert(id);
        id
    }

    /// Insert an entity under its own id.
    ///
    /// The id must be one [`World::allocate_id`] handed out and that has
    /// not been inserted yet, or one above every id issued so far (which
    /// advances the allocator past it).
    ///
    /// # Errors
    ///
    /// Returns [`GameError::IdReused`] for any other id: live, removed,
    /// or pruned ids are never stored again.
    pub fn insert(&mut self, entity: Entity) -> Result<EntityId> {
        let id = entity.id;
        if !self.reserved.remove(&id) {
            if id < self.next_id {
                return Err(GameError::IdReused(id));
            }
            self.next_id = id + 1;
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity. Unknown ids are a no-op.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Remove every dead entity, returning their ids in ascending order.
    pub fn prune(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| !entity.is_alive())
            .map(|entity| entity.id)
            .collect();
        for id in &dead {
            self.entities.remove(id);
        }
        dead
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by id.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists (dead or alive).
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Check if an entity exists and has health left.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_alive)
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the world is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Snapshot of every id in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate in ascending id (insertion) order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate in descending id order, most recently added first.
    pub fn iter_rev(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().rev()
    }
}
