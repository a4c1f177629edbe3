//! Core simulation loop.
//!
//! The simulation advances in fixed steps and processes all game logic
//! deterministically. It owns the world, the resource pool and the
//! simulation clock, and is the only place where passes are sequenced.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - No system randomness and no wall clock (time is `now_ms`, advanced by `dt`)
//! - Consistent iteration order (ascending entity ids)
//! - Same inputs always produce same outputs
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::SimConfig;
//! use skirmish_core::data::ItemCatalog;
//! use skirmish_core::economy::ResourcePool;
//! use skirmish_core::interface::NullSink;
//! use skirmish_core::simulation::Simulation;
//!
//! let mut sim = Simulation::new(
//!     ItemCatalog::new(),
//!     SimConfig::default(),
//!     ResourcePool::new().with("credits", 1000),
//! );
//!
//! sim.tick(&mut NullSink);
//! assert_eq!(sim.get_tick(), 1);
//! assert_eq!(sim.now_ms(), 50);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::abilities::{self, AbilityGrant, AbilityKind};
use crate::buildings::{Building, BuildingKind};
use crate::combat::{
    acquire_target, apply_hit, damage_for_tick, engagement_distance, in_attack_range, DamageEvent,
};
use crate::components::{EntityId, Footprint, Team};
use crate::config::SimConfig;
use crate::data::{ItemCatalog, ItemDefinition};
use crate::economy::{Cost, ResourcePool};
use crate::error::{GameError, PlacementError, ProductionError, Result};
use crate::interface::UiSink;
use crate::math::{rate_over_millis, Fixed, Vec2Fixed};
use crate::pathfinding::{follow_path, plan_path, StepOutcome};
use crate::production::{
    closest_point_on_perimeter, ProductionPhase, ProductionState, QueuedItem,
};
use crate::spatial::{find_closest_hq, is_area_clear, is_location_clear};
use crate::unit::UnitOrder;
use crate::world::{Entity, EntityKind, World};

/// Player orders for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Walk to a point, ignoring enemies on the way.
    MoveTo(Vec2Fixed),
    /// Chase and fight a specific entity until it dies.
    Attack(EntityId),
    /// Walk back to the closest friendly headquarters.
    ReturnToBase,
    /// Drop every order and stand still.
    Stop,
}

/// A finished building item waiting for collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionReady {
    /// Production building holding the item.
    pub building: EntityId,
    /// Finished item.
    pub item: String,
}

/// Events generated during a simulation tick.
///
/// These events can be used by the host to trigger effects, sounds,
/// animations, etc.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Hits landed by units.
    pub damage_events: Vec<DamageEvent>,
    /// Entities pruned at the end of the tick.
    pub deaths: Vec<EntityId>,
    /// Units spawned by production buildings.
    pub spawned: Vec<EntityId>,
    /// Building items that became ready for collection.
    pub production_ready: Vec<ProductionReady>,
    /// Abilities that expired and were reversed.
    pub expired_abilities: Vec<(EntityId, AbilityKind)>,
}

/// The core game simulation.
///
/// # Pass Order
///
/// Each tick runs these passes in order:
/// 1. **Clock** - `now_ms += dt`
/// 2. **Abilities** - apply-once multipliers, recovery, poison
/// 3. **Units** - orders, auto-engage, movement, damage
/// 4. **Buildings** - production queues, economic generation
/// 5. **Expiry** - reverse and remove expired abilities
/// 6. **Prune** - remove dead entities
///
/// Every pass walks the ids that existed when the tick started, in
/// ascending order. Entities spawned during a tick first act on the next
/// one. Entities killed during a tick stay resolvable until the prune.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    catalog: ItemCatalog,
    config: SimConfig,
    resources: ResourcePool,
    selected: Option<EntityId>,
    now_ms: u64,
    tick: u64,
}

impl Simulation {
    /// Create a simulation with an empty world at time 0.
    #[must_use]
    pub fn new(catalog: ItemCatalog, config: SimConfig, resources: ResourcePool) -> Self {
        Self {
            world: World::new(),
            catalog,
            config,
            resources,
            selected: None,
            now_ms: 0,
            tick: 0,
        }
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Get a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get a mutable reference to the world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Get the item catalog.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Get the simulation settings.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get the player's resource pool.
    #[must_use]
    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    /// Currently selected building, if any.
    #[must_use]
    pub const fn selected_building(&self) -> Option<EntityId> {
        self.selected
    }

    /// Production state of a building, if it is a production building.
    #[must_use]
    pub fn production(&self, building: EntityId) -> Option<&ProductionState> {
        self.world
            .get(building)?
            .as_building()
            .and_then(Building::production)
    }

    fn production_mut(&mut self, building: EntityId) -> Option<&mut ProductionState> {
        self.world
            .get_mut(building)?
            .as_building_mut()
            .and_then(Building::production_mut)
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Place a unit from the catalog without charging for it.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItem`] if the item is not in the catalog,
    /// or [`GameError::InvalidState`] if it is not a unit.
    pub fn spawn_unit(&mut self, item: &str, team: Team, position: Vec2Fixed) -> Result<EntityId> {
        self.spawn_item(item, team, position, true)
    }

    /// Place a building from the catalog without charging for it.
    ///
    /// No placement check is made; setup code is trusted.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItem`] if the item is not in the catalog,
    /// or [`GameError::InvalidState`] if it is a unit.
    pub fn spawn_building(
        &mut self,
        item: &str,
        team: Team,
        position: Vec2Fixed,
    ) -> Result<EntityId> {
        self.spawn_item(item, team, position, false)
    }

    fn spawn_item(
        &mut self,
        item: &str,
        team: Team,
        position: Vec2Fixed,
        want_unit: bool,
    ) -> Result<EntityId> {
        let definition = self
            .catalog
            .get(item)
            .ok_or_else(|| GameError::UnknownItem(item.to_string()))?;
        if definition.category.is_unit() != want_unit {
            let expected = if want_unit { "a unit" } else { "a building" };
            return Err(GameError::InvalidState(format!(
                "{} is not {}",
                item, expected
            )));
        }

        let id = self.world.allocate_id();
        let entity =
            Entity::from_definition(id, definition, team, position, self.now_ms, &self.config)?;
        self.world.insert(entity)
    }

    // ------------------------------------------------------------------
    // Selection and production
    // ------------------------------------------------------------------

    /// Select a friendly building as the target of production requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist, is not a building,
    /// or belongs to the enemy.
    pub fn select_building(&mut self, building: EntityId) -> Result<()> {
        let entity = self
            .world
            .get(building)
            .ok_or(GameError::EntityNotFound(building))?;
        if entity.as_building().is_none() {
            return Err(GameError::NotABuilding(building));
        }
        if entity.team != Team::Friend {
            return Err(GameError::InvalidState(format!(
                "Building {} is not ours to select",
                building
            )));
        }
        self.selected = Some(building);
        Ok(())
    }

    /// Clear the building selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Queue `item` at the selected building.
    ///
    /// The cost is deducted immediately. When the building is idle the
    /// countdown starts right away. A rejection leaves every piece of
    /// state untouched and is also sent to `sink` as a status line.
    ///
    /// # Errors
    ///
    /// Returns the [`ProductionError`] describing why the request was refused.
    pub fn train_item(
        &mut self,
        item: &str,
        ui_handle: Option<u64>,
        sink: &mut dyn UiSink,
    ) -> std::result::Result<(), ProductionError> {
        let cost = reject_to(sink, self.queue_item(item, ui_handle))?;
        self.report_resources(&cost, sink);
        sink.set_status(&format!("Training {}", item));
        Ok(())
    }

    fn queue_item(
        &mut self,
        item: &str,
        ui_handle: Option<u64>,
    ) -> std::result::Result<Cost, ProductionError> {
        let building = self.selected.ok_or(ProductionError::NoBuildingSelected)?;
        let entity = self
            .world
            .get(building)
            .filter(|entity| entity.is_alive())
            .ok_or(ProductionError::NoBuildingSelected)?;
        let state = entity
            .as_building()
            .and_then(Building::production)
            .ok_or(ProductionError::NoBuildingSelected)?;
        let definition = self
            .catalog
            .get(item)
            .ok_or_else(|| ProductionError::UnknownItem(item.to_string()))?;

        if !state.can_produce(item) {
            return Err(ProductionError::CannotProduce {
                building: entity.name.clone(),
                item: item.to_string(),
            });
        }
        if state.is_full() {
            return Err(ProductionError::QueueFull);
        }

        let cost = definition.cost.clone();
        if !self.resources.try_spend(&cost) {
            return Err(ProductionError::InsufficientResources(item.to_string()));
        }

        let queued = QueuedItem {
            item: item.to_string(),
            ui_handle,
            cost: cost.clone(),
        };
        let Some(state) = self.production_mut(building) else {
            self.resources.earn(&cost);
            return Err(ProductionError::NoBuildingSelected);
        };
        if let Err(e) = state.enqueue(queued) {
            self.resources.earn(&cost);
            return Err(e);
        }

        self.start_next_item(building);
        Ok(cost)
    }

    /// Place the finished building item held by `building` at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`ProductionError::NothingToCollect`] if nothing is ready, or
    /// [`ProductionError::Placement`] if the area is blocked. The item stays
    /// ready for another attempt.
    pub fn collect_building(
        &mut self,
        building: EntityId,
        position: Vec2Fixed,
        sink: &mut dyn UiSink,
    ) -> std::result::Result<EntityId, ProductionError> {
        let placed = reject_to(sink, self.place_ready_item(building, position))?;
        if let Some(entity) = self.world.get(placed) {
            sink.set_status(&format!("Placed {}", entity.name));
        }
        Ok(placed)
    }

    fn place_ready_item(
        &mut self,
        building: EntityId,
        position: Vec2Fixed,
    ) -> std::result::Result<EntityId, ProductionError> {
        let entity = self
            .world
            .get(building)
            .ok_or(ProductionError::NothingToCollect)?;
        let team = entity.team;
        let item = match entity.as_building().and_then(Building::production) {
            Some(ProductionState {
                phase: ProductionPhase::ReadyForCollection { item },
                ..
            }) => item.clone(),
            _ => return Err(ProductionError::NothingToCollect),
        };
        let definition = self
            .catalog
            .get(&item)
            .ok_or_else(|| ProductionError::UnknownItem(item.clone()))?;

        if !is_area_clear(
            &self.world,
            position,
            definition.width,
            definition.height,
            self.config.placement_padding,
        ) {
            return Err(PlacementError::AreaBlocked(item).into());
        }

        let id = self.world.allocate_id();
        Entity::from_definition(id, definition, team, position, self.now_ms, &self.config)
            .and_then(|placed| self.world.insert(placed))
            .map_err(|e| {
                tracing::warn!("Cannot build {}: {}", item, e);
                ProductionError::UnknownItem(item.clone())
            })?;
        tracing::info!("Building {} placed {} as entity {}", building, item, id);

        if let Some(state) = self.production_mut(building) {
            state.finish_current();
        }
        self.start_next_item(building);
        Ok(id)
    }

    /// Remove the item at `index` from a production queue and refund it.
    ///
    /// Waiting items are refunded in full, the item in progress in
    /// proportion to its remaining build time, a finished item not at all.
    ///
    /// # Errors
    ///
    /// Returns [`ProductionError::NothingQueued`] if there is no such item.
    pub fn cancel_production(
        &mut self,
        building: EntityId,
        index: usize,
        sink: &mut dyn UiSink,
    ) -> std::result::Result<Cost, ProductionError> {
        let now = self.now_ms;
        let cancelled = self
            .production_mut(building)
            .and_then(|state| state.cancel(index, now))
            .ok_or(ProductionError::NothingQueued(index));
        let (removed, refund) = reject_to(sink, cancelled)?;

        self.resources.earn(&refund);
        self.report_resources(&refund, sink);
        self.start_next_item(building);
        tracing::debug!("Building {} cancelled {}", building, removed.item);
        sink.set_status(&format!("Cancelled {}", removed.item));
        Ok(refund)
    }

    /// Move a production building's rally point.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist or is not a
    /// production building.
    pub fn set_rally_point(&mut self, building: EntityId, point: Vec2Fixed) -> Result<()> {
        if !self.world.contains(building) {
            return Err(GameError::EntityNotFound(building));
        }
        let state = self
            .production_mut(building)
            .ok_or(GameError::NotABuilding(building))?;
        state.rally_point = Some(point);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    /// Grant an ability to a unit. It takes effect on the next tick.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist or is not a unit,
    /// or [`GameError::InvalidAbility`] if a multiplier is below
    /// [`abilities::MIN_MULTIPLIER`] or would push a stat out of range.
    /// A refused grant changes nothing.
    pub fn grant_ability(&mut self, unit: EntityId, grant: AbilityGrant) -> Result<()> {
        let now = self.now_ms;
        let entity = self
            .world
            .get_mut(unit)
            .ok_or(GameError::EntityNotFound(unit))?;
        let Entity { health, kind, .. } = entity;
        let EntityKind::Unit(state) = kind else {
            return Err(GameError::NotAUnit(unit));
        };
        let records = grant.into_records(now);
        abilities::check_grant(state, health, &records)?;
        abilities::grant(state, health, records);
        Ok(())
    }

    /// Give a unit a new order, replacing whatever it was doing.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist or is not a unit,
    /// if an attack target does not exist, or if there is no friendly
    /// headquarters to return to.
    pub fn issue_command(&mut self, id: EntityId, command: Command) -> Result<()> {
        let entity = self.world.get(id).ok_or(GameError::EntityNotFound(id))?;
        if entity.as_unit().is_none() {
            return Err(GameError::NotAUnit(id));
        }
        let position = entity.position;
        let radius = entity.radius();
        let footprint = entity.footprint;

        let (order, path) = match command {
            Command::MoveTo(destination) => (
                UnitOrder::Move { destination },
                plan_path(
                    &self.world,
                    id,
                    position,
                    radius,
                    destination,
                    &[],
                    &self.config,
                ),
            ),
            Command::Attack(target) => {
                if !self.world.is_alive(target) {
                    return Err(GameError::EntityNotFound(target));
                }
                (UnitOrder::Attack { target }, Default::default())
            }
            Command::ReturnToBase => {
                let hq = find_closest_hq(&self.world, id, None)
                    .and_then(|hq| self.world.get(hq))
                    .ok_or_else(|| {
                        GameError::InvalidState(format!("No headquarters for unit {}", id))
                    })?;
                let destination = closest_point_on_perimeter(
                    &hq.bounds(),
                    position,
                    footprint,
                    self.config.spawn_clearance,
                );
                (
                    UnitOrder::ReturnToBase { hq: hq.id },
                    plan_path(
                        &self.world,
                        id,
                        position,
                        radius,
                        destination,
                        &[],
                        &self.config,
                    ),
                )
            }
            Command::Stop => (UnitOrder::Idle, Default::default()),
        };

        let unit = self
            .world
            .get_mut(id)
            .and_then(Entity::as_unit_mut)
            .ok_or(GameError::NotAUnit(id))?;
        unit.stop();
        unit.order = order;
        unit.path = path;
        if let UnitOrder::Attack { target } = order {
            unit.attack_target = Some(target);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the simulation by one configured tick.
    pub fn tick(&mut self, sink: &mut dyn UiSink) -> TickEvents {
        self.advance(self.config.tick_duration_ms, sink)
    }

    /// Advance the simulation by `dt_ms` milliseconds.
    ///
    /// Runs every pass in order and increments the tick counter.
    /// Returns events generated during this tick for use by the host.
    pub fn advance(&mut self, dt_ms: u64, sink: &mut dyn UiSink) -> TickEvents {
        let mut events = TickEvents::default();
        self.now_ms = self.now_ms.saturating_add(dt_ms);

        let entity_ids = self.world.ids();

        // 1. Ability application
        self.run_ability_system(&entity_ids, dt_ms);

        // 2. Unit behaviour
        events.damage_events = self.run_unit_system(&entity_ids, dt_ms);

        // 3. Buildings
        self.run_building_system(&entity_ids, sink, &mut events);

        // 4. Ability expiry
        events.expired_abilities = self.run_expiry_system(&entity_ids);

        // 5. Prune
        events.deaths = self.world.prune();
        if let Some(selected) = self.selected {
            if events.deaths.contains(&selected) {
                self.selected = None;
            }
        }

        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    fn run_ability_system(&mut self, entity_ids: &[EntityId], dt_ms: u64) {
        let now = self.now_ms;
        for &id in entity_ids {
            let Some(entity) = self.world.get_mut(id) else {
                continue;
            };
            if !entity.is_alive() {
                continue;
            }
            let Entity { health, kind, .. } = entity;
            let EntityKind::Unit(unit) = kind else {
                continue;
            };
            if unit.abilities.is_empty() {
                continue;
            }
            let outcome = abilities::apply_abilities(unit, health, now, dt_ms);
            if outcome.poison_damage > Fixed::ZERO {
                tracing::debug!("Poison dealt {} to entity {}", outcome.poison_damage, id);
            }
        }
    }

    fn run_expiry_system(&mut self, entity_ids: &[EntityId]) -> Vec<(EntityId, AbilityKind)> {
        let now = self.now_ms;
        let mut expired = Vec::new();
        for &id in entity_ids {
            let Some(entity) = self.world.get_mut(id) else {
                continue;
            };
            let Entity { health, kind, .. } = entity;
            let EntityKind::Unit(unit) = kind else {
                continue;
            };
            for kind in abilities::expire_abilities(unit, health, now) {
                expired.push((id, kind));
            }
        }
        expired
    }

    fn run_unit_system(&mut self, entity_ids: &[EntityId], dt_ms: u64) -> Vec<DamageEvent> {
        let mut damage_events = Vec::new();
        for &id in entity_ids {
            if let Some(event) = self.run_unit(id, dt_ms) {
                damage_events.push(event);
            }
        }
        damage_events
    }

    fn run_unit(&mut self, id: EntityId, dt_ms: u64) -> Option<DamageEvent> {
        let entity = self.world.get(id).filter(|entity| entity.is_alive())?;
        let unit = entity.as_unit()?;
        let order = unit.order;
        let autochase_range = unit.stats.autochase_range;

        if order.allows_auto_engage() {
            return match acquire_target(&self.world, id, autochase_range) {
                Some(target) => {
                    if let Some(unit) = self.world.get_mut(id).and_then(Entity::as_unit_mut) {
                        unit.order = UnitOrder::Engage;
                        unit.attack_target = Some(target);
                    }
                    self.engage(id, target, dt_ms)
                }
                None => {
                    if order == UnitOrder::Engage {
                        self.stop_unit(id);
                    }
                    None
                }
            };
        }

        match order {
            UnitOrder::Move { .. } => {
                self.step_travel(id, dt_ms);
                None
            }
            UnitOrder::ReturnToBase { hq } => {
                if self.world.is_alive(hq) {
                    self.step_travel(id, dt_ms);
                } else {
                    self.stop_unit(id);
                }
                None
            }
            UnitOrder::Attack { target } => {
                if self.world.is_alive(target) {
                    self.engage(id, target, dt_ms)
                } else {
                    self.stop_unit(id);
                    None
                }
            }
            UnitOrder::Idle | UnitOrder::Engage => None,
        }
    }

    fn stop_unit(&mut self, id: EntityId) {
        if let Some(unit) = self.world.get_mut(id).and_then(Entity::as_unit_mut) {
            unit.stop();
        }
    }

    /// Follow the unit's planned path one step.
    fn step_travel(&mut self, id: EntityId, dt_ms: u64) {
        let Some(entity) = self.world.get(id) else {
            return;
        };
        let Some(unit) = entity.as_unit() else {
            return;
        };
        let position = entity.position;
        let radius = entity.radius();
        let step = rate_over_millis(unit.stats.speed, dt_ms);
        let mut path = unit.path.clone();

        let result = follow_path(
            &self.world,
            id,
            position,
            radius,
            step,
            &mut path,
            &[],
            &self.config,
        );

        let Some(entity) = self.world.get_mut(id) else {
            return;
        };
        entity.position = result.position;
        let Some(unit) = entity.as_unit_mut() else {
            return;
        };
        match result.outcome {
            StepOutcome::Moved => unit.path = path,
            StepOutcome::Arrived => unit.stop(),
            StepOutcome::Stuck => {
                tracing::debug!("Entity {} is stuck, dropping its order", id);
                unit.stop();
            }
        }
    }

    /// Close in on `target`, or hit it if already in range.
    fn engage(&mut self, id: EntityId, target: EntityId, dt_ms: u64) -> Option<DamageEvent> {
        let entity = self.world.get(id)?;
        let unit = entity.as_unit()?;
        let target_entity = self.world.get(target)?;
        let position = entity.position;
        let radius = entity.radius();
        let stats = unit.stats;

        if in_attack_range(position, stats.attack_range, target_entity) {
            if let Some(unit) = self.world.get_mut(id).and_then(Entity::as_unit_mut) {
                unit.path.clear();
            }
            let raw = damage_for_tick(stats.damage, dt_ms);
            let dealt = apply_hit(self.world.get_mut(target)?, raw);
            if dealt <= Fixed::ZERO {
                return None;
            }
            return Some(DamageEvent {
                attacker: id,
                target,
                amount: dealt,
            });
        }

        // Never step past the point where the target comes into range.
        let gap = engagement_distance(position, target_entity) - stats.attack_range;
        let step = rate_over_millis(stats.speed, dt_ms).min(gap);
        let ignore = [target];
        let mut path = plan_path(
            &self.world,
            id,
            position,
            radius,
            target_entity.position,
            &ignore,
            &self.config,
        );
        let result = follow_path(
            &self.world,
            id,
            position,
            radius,
            step,
            &mut path,
            &ignore,
            &self.config,
        );

        if let Some(entity) = self.world.get_mut(id) {
            entity.position = result.position;
            if let Some(unit) = entity.as_unit_mut() {
                unit.path = path;
            }
        }
        None
    }

    fn run_building_system(
        &mut self,
        entity_ids: &[EntityId],
        sink: &mut dyn UiSink,
        events: &mut TickEvents,
    ) {
        for &id in entity_ids {
            let Some(entity) = self.world.get(id).filter(|entity| entity.is_alive()) else {
                continue;
            };
            let kind = entity.as_building().map(|building| &building.kind);
            let producing = matches!(kind, Some(BuildingKind::Production(_)));
            let generating =
                matches!(kind, Some(BuildingKind::Economic(_))) && entity.team == Team::Friend;

            if producing {
                self.run_production(id, sink, events);
            } else if generating {
                self.run_generation(id, sink);
            }
        }
    }

    fn run_production(
        &mut self,
        building: EntityId,
        sink: &mut dyn UiSink,
        events: &mut TickEvents,
    ) {
        let now = self.now_ms;
        let Some(state) = self.production(building) else {
            return;
        };
        let elapsed = state.elapsed_item(now).map(str::to_string);

        match state.phase.clone() {
            ProductionPhase::Idle => self.start_next_item(building),
            ProductionPhase::Counting { .. } => {
                if let Some(item) = elapsed {
                    self.deliver(building, &item, sink, events);
                }
            }
            ProductionPhase::SpawnDeferred { item } => {
                self.spawn_produced_unit(building, &item, events);
            }
            ProductionPhase::ReadyForCollection { .. } => {}
        }
    }

    /// Start the countdown for the front item if the building is idle.
    fn start_next_item(&mut self, building: EntityId) {
        let now = self.now_ms;
        let Some(state) = self.production(building) else {
            return;
        };
        if state.phase != ProductionPhase::Idle {
            return;
        }
        let Some(front) = state.queue.front() else {
            return;
        };
        let Some(definition) = self.catalog.get(&front.item) else {
            tracing::warn!(
                "Queued item {} at building {} is not in the catalog",
                front.item,
                building
            );
            return;
        };
        let build_time = definition.build_time_ms();

        if let Some(state) = self.production_mut(building) {
            if let Some(item) = state.start_next(now, build_time) {
                tracing::debug!(
                    "Building {} started {} ({} ms)",
                    building,
                    item,
                    build_time
                );
            }
        }
    }

    fn deliver(
        &mut self,
        building: EntityId,
        item: &str,
        sink: &mut dyn UiSink,
        events: &mut TickEvents,
    ) {
        let Some(definition) = self.catalog.get(item) else {
            tracing::warn!("Finished item {} is not in the catalog", item);
            return;
        };

        if definition.category.is_building() {
            if let Some(state) = self.production_mut(building) {
                state.mark_ready();
            }
            tracing::debug!("Building {} finished {}", building, item);
            sink.on_production_ready(building, item);
            events.production_ready.push(ProductionReady {
                building,
                item: item.to_string(),
            });
        } else {
            self.spawn_produced_unit(building, item, events);
        }
    }

    /// Spawn a finished unit at the building's exit, or hold it.
    fn spawn_produced_unit(&mut self, building: EntityId, item: &str, events: &mut TickEvents) {
        let Some(definition) = self.catalog.get(item).cloned() else {
            tracing::warn!("Finished item {} is not in the catalog", item);
            return;
        };
        if definition.unit.is_none() {
            tracing::warn!("Unit {} has no unit profile", item);
            return;
        }
        let Some(entity) = self.world.get(building) else {
            return;
        };
        let Some(state) = entity.as_building().and_then(Building::production) else {
            return;
        };
        let Some(rally) = state.rally_point else {
            tracing::warn!("Building {} has no rally point; holding {}", building, item);
            return;
        };

        let size = Footprint::new(definition.width, definition.height);
        let exit = closest_point_on_perimeter(
            &entity.bounds(),
            rally,
            size,
            self.config.spawn_clearance,
        );
        let team = entity.team;
        let deferred = matches!(state.phase, ProductionPhase::SpawnDeferred { .. });

        if !is_location_clear(&self.world, exit, size.radius(), &[]) {
            if !deferred {
                tracing::debug!("Exit of building {} is blocked; holding {}", building, item);
                if let Some(state) = self.production_mut(building) {
                    state.defer_spawn();
                }
            }
            return;
        }

        let Some(id) = self.spawn_at_exit(&definition, team, exit, rally) else {
            return;
        };
        tracing::info!("Building {} produced {} as entity {}", building, item, id);
        events.spawned.push(id);

        if let Some(state) = self.production_mut(building) {
            state.finish_current();
        }
        self.start_next_item(building);
    }

    fn spawn_at_exit(
        &mut self,
        definition: &ItemDefinition,
        team: Team,
        exit: Vec2Fixed,
        rally: Vec2Fixed,
    ) -> Option<EntityId> {
        let id = self.world.allocate_id();
        let mut entity =
            match Entity::from_definition(id, definition, team, exit, self.now_ms, &self.config) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!("Cannot spawn {}: {}", definition.name, e);
                    return None;
                }
            };
        let radius = entity.radius();
        let path = plan_path(&self.world, id, exit, radius, rally, &[], &self.config);
        if let Some(unit) = entity.as_unit_mut() {
            unit.order = UnitOrder::Move { destination: rally };
            unit.path = path;
        }
        match self.world.insert(entity) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Cannot spawn at exit: {}", e);
                None
            }
        }
    }

    fn run_generation(&mut self, id: EntityId, sink: &mut dyn UiSink) {
        let now = self.now_ms;
        let interval = self.config.generation_interval_ms;
        let Some(income) = self
            .world
            .get_mut(id)
            .and_then(Entity::as_building_mut)
            .and_then(Building::generator_mut)
            .and_then(|generator| generator.collect(now, interval))
        else {
            return;
        };
        self.resources.earn(&income);
        self.report_resources(&income, sink);
    }

    /// Mirror every resource named in `touched` to the sink.
    fn report_resources(&self, touched: &Cost, sink: &mut dyn UiSink) {
        for (resource, _) in touched.iter() {
            if let Some(balance) = self.resources.balance(resource) {
                sink.update_resource_count(resource, balance);
            }
        }
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        self.now_ms.hash(&mut hasher);
        self.resources.hash(&mut hasher);
        self.world.hash(&mut hasher);
        hasher.finish()
    }
}

/// Push a rejection to the status line before handing it back.
fn reject_to<T>(
    sink: &mut dyn UiSink,
    result: std::result::Result<T, ProductionError>,
) -> std::result::Result<T, ProductionError> {
    if let Err(e) = &result {
        sink.set_status(&e.to_string());
    }
    result
}
