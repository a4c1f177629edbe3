//! Test fixtures and helpers.
//!
//! A small but complete item catalog, pre-built simulations and a UI
//! sink that records everything it is told, for consistent testing.

use fixed::types::I32F32;
use skirmish_core::components::EntityId;
use skirmish_core::config::SimConfig;
use skirmish_core::data::ItemCatalog;
use skirmish_core::economy::ResourcePool;
use skirmish_core::interface::UiSink;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::{Simulation, TickEvents};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a position from integer coordinates.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// JSON text of the fixture catalog.
///
/// | item | category | size | cost | build | notes |
/// |---|---|---|---|---|---|
/// | `command_center` | command | 120 | - | - | HQ |
/// | `barracks` | production | 80 | 150 credits | 8 s | infantry, buildings |
/// | `factory` | production | 100 | 200 credits | 10 s | tanks |
/// | `power_plant` | economic | 60 | 100 credits | 5 s | 2 energy/s |
/// | `refinery` | economic | 60 | 120 credits | 6 s | 5 credits/s |
/// | `wall` | other | 40 | 10 credits | 1 s | |
/// | `rifleman` | unit | 20 | 50 credits | 3 s | 60 speed, 20 dps, range 40 |
/// | `ranger` | unit | 16 | 70 credits | 4 s | 90 speed, 12 dps, range 120 |
/// | `tank` | unit | 40 | 250 credits, 20 energy | 12 s | 40 speed, 50 dps, range 60 |
pub const SAMPLE_CATALOG_JSON: &str = r#"{
    "items": [
        { "name": "command_center", "category": "command",
          "width": 120, "height": 120, "health": 2000 },
        { "name": "barracks", "category": "production",
          "width": 80, "height": 80, "cost": { "credits": 150 }, "build_time": 8,
          "health": 800,
          "produces": ["rifleman", "ranger", "factory", "power_plant", "refinery", "wall"] },
        { "name": "factory", "category": "production",
          "width": 100, "height": 100, "cost": { "credits": 200 }, "build_time": 10,
          "health": 1200, "produces": ["tank"] },
        { "name": "power_plant", "category": "economic",
          "width": 60, "height": 60, "cost": { "credits": 100 }, "build_time": 5,
          "health": 500, "generator": { "resource_type": "energy", "generation_rate": 2 } },
        { "name": "refinery", "category": "economic",
          "width": 60, "height": 60, "cost": { "credits": 120 }, "build_time": 6,
          "health": 500, "generator": { "resource_type": "credits", "generation_rate": 5 } },
        { "name": "wall", "category": "other",
          "width": 40, "height": 40, "cost": { "credits": 10 }, "build_time": 1,
          "health": 600 },
        { "name": "rifleman", "category": "unit",
          "width": 20, "height": 20, "cost": { "credits": 50 }, "build_time": 3,
          "health": 100,
          "unit": { "speed": 60, "damage": 20, "attack_range": 40, "autochase_range": 200 } },
        { "name": "ranger", "category": "unit",
          "width": 16, "height": 16, "cost": { "credits": 70 }, "build_time": 4,
          "health": 80,
          "unit": { "speed": 90, "damage": 12, "attack_range": 120, "autochase_range": 250 } },
        { "name": "tank", "category": "unit",
          "width": 40, "height": 40, "cost": { "credits": 250, "energy": 20 }, "build_time": 12,
          "health": 400,
          "unit": { "speed": 40, "damage": 50, "attack_range": 60, "autochase_range": 240 } }
    ]
}"#;

/// Parse the fixture catalog.
///
/// # Panics
///
/// Panics if the fixture text is malformed, which is a bug in this crate.
#[must_use]
pub fn sample_catalog() -> ItemCatalog {
    ItemCatalog::from_json_str(SAMPLE_CATALOG_JSON).expect("fixture catalog must parse")
}

/// Empty simulation over the fixture catalog with default settings.
#[must_use]
pub fn sample_simulation(resources: ResourcePool) -> Simulation {
    Simulation::new(sample_catalog(), SimConfig::default(), resources)
}

/// Empty simulation with `credits` and nothing else in the pool.
#[must_use]
pub fn simulation_with_credits(credits: u32) -> Simulation {
    sample_simulation(ResourcePool::new().with("credits", credits))
}

/// Tick `sim` `ticks` times, collecting every tick's events.
pub fn run_ticks(sim: &mut Simulation, ticks: usize, sink: &mut dyn UiSink) -> Vec<TickEvents> {
    (0..ticks).map(|_| sim.tick(sink)).collect()
}

/// [`UiSink`] that remembers every notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingSink {
    /// Status lines, oldest first.
    pub statuses: Vec<String>,
    /// `(building, item)` production-ready notifications.
    pub ready: Vec<(EntityId, String)>,
    /// `(resource, balance)` updates.
    pub resources: Vec<(String, u32)>,
}

impl RecordingSink {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent status line.
    #[must_use]
    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }

    /// Most recent balance reported for `resource`.
    #[must_use]
    pub fn last_balance(&self, resource: &str) -> Option<u32> {
        self.resources
            .iter()
            .rev()
            .find(|(name, _)| name == resource)
            .map(|(_, amount)| *amount)
    }
}

impl UiSink for RecordingSink {
    fn set_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn on_production_ready(&mut self, building: EntityId, item: &str) {
        self.ready.push((building, item.to_string()));
    }

    fn update_resource_count(&mut self, resource: &str, amount: u32) {
        self.resources.push((resource.to_string(), amount));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::components::Team;
    use skirmish_core::data::ItemCategory;

    #[test]
    fn test_sample_catalog_is_consistent() {
        let catalog = sample_catalog();
        assert_eq!(catalog.len(), 9);
        assert!(catalog.validate().is_empty());
        assert_eq!(
            catalog.get("factory").map(|item| item.category),
            Some(ItemCategory::Production)
        );
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.set_status("hello");
        sink.update_resource_count("credits", 10);
        sink.update_resource_count("energy", 3);
        sink.update_resource_count("credits", 7);

        assert_eq!(sink.last_status(), Some("hello"));
        assert_eq!(sink.last_balance("credits"), Some(7));
        assert_eq!(sink.last_balance("metal"), None);
    }

    #[test]
    fn test_run_ticks() {
        let mut sim = simulation_with_credits(0);
        sim.spawn_unit("rifleman", Team::Friend, vec2(0, 0)).unwrap();
        let events = run_ticks(&mut sim, 5, &mut RecordingSink::new());
        assert_eq!(events.len(), 5);
        assert_eq!(sim.get_tick(), 5);
    }
}
