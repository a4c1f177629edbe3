//! Scenario loading.
//!
//! A scenario is a RON file describing the starting state of a skirmish
//! and a script of player actions keyed by tick:
//!
//! ```ron
//! (
//!     name: "duel",
//!     resources: { "credits": 1000 },
//!     entities: [
//!         (item: "barracks", team: friend, position: (0, 0), label: Some("base")),
//!         (item: "rifleman", team: enemy, position: (400, 0)),
//!     ],
//!     orders: [
//!         (tick: 0, action: Select(building: "base")),
//!         (tick: 0, action: Train(item: "rifleman")),
//!     ],
//! )
//! ```
//!
//! Entities are referred to by label, since ids are only handed out
//! when the scenario is built.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skirmish_core::abilities::AbilityGrant;
use skirmish_core::components::{EntityId, Team};
use skirmish_core::config::SimConfig;
use skirmish_core::data::ItemCatalog;
use skirmish_core::economy::ResourcePool;
use skirmish_core::error::GameError;
use skirmish_core::math::Vec2Fixed;
use skirmish_core::simulation::Simulation;

use crate::error::{HeadlessError, Result};

/// Read a whole file, attaching the path to any error.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| HeadlessError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an item catalog, choosing the format by extension (`.ron` or JSON).
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<ItemCatalog> {
    let path = path.as_ref();
    let text = read_file(path)?;
    let catalog = if path.extension().is_some_and(|ext| ext == "ron") {
        ItemCatalog::from_ron_str(&text)?
    } else {
        ItemCatalog::from_json_str(&text)?
    };
    tracing::debug!("Loaded {} items from {}", catalog.len(), path.display());
    Ok(catalog)
}

/// Load simulation settings from a RON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimConfig> {
    let text = read_file(path.as_ref())?;
    Ok(SimConfig::from_ron_str(&text)?)
}

/// Integer world coordinates as written in scenario files.
pub type Point = (i32, i32);

pub(crate) fn point((x, y): Point) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Starting resource balances.
    #[serde(default)]
    pub resources: BTreeMap<String, u32>,
    /// Entities present at tick 0, spawned in order.
    #[serde(default)]
    pub entities: Vec<Placement>,
    /// Scripted player actions.
    #[serde(default)]
    pub orders: Vec<ScriptedOrder>,
    /// Default run length when the caller does not give one.
    #[serde(default)]
    pub ticks: Option<u64>,
}

/// An entity placed at scenario start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Catalog item name.
    pub item: String,
    /// Owning team.
    pub team: Team,
    /// Center position.
    pub position: Point,
    /// Name used by scripted orders.
    #[serde(default)]
    pub label: Option<String>,
    /// Rally point for production buildings.
    #[serde(default)]
    pub rally: Option<Point>,
}

/// A player action to perform when the simulation reaches `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedOrder {
    /// Tick count at which the action happens, before that tick runs.
    pub tick: u64,
    /// What to do.
    pub action: ScriptedAction,
}

/// Player actions a scenario can script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptedAction {
    /// Walk a unit to a point.
    Move {
        /// Unit label.
        unit: String,
        /// Destination.
        to: Point,
    },
    /// Send a unit after a target.
    Attack {
        /// Unit label.
        unit: String,
        /// Target label.
        target: String,
    },
    /// Send a unit home.
    ReturnToBase {
        /// Unit label.
        unit: String,
    },
    /// Halt a unit.
    Stop {
        /// Unit label.
        unit: String,
    },
    /// Select a production building.
    Select {
        /// Building label.
        building: String,
    },
    /// Queue an item at the selected building.
    Train {
        /// Catalog item name.
        item: String,
    },
    /// Place a finished building item.
    Collect {
        /// Producing building label.
        building: String,
        /// Where to put it.
        at: Point,
        /// Label for the new building.
        #[serde(default)]
        label: Option<String>,
    },
    /// Cancel a queued item.
    Cancel {
        /// Building label.
        building: String,
        /// Queue position; 0 is the item in progress.
        index: usize,
    },
    /// Move a rally point.
    Rally {
        /// Building label.
        building: String,
        /// New rally point.
        at: Point,
    },
    /// Grant an ability to a unit.
    Grant {
        /// Unit label.
        unit: String,
        /// Ability to grant.
        ability: AbilityGrant,
    },
}

/// Entity ids by scenario label.
pub type Labels = BTreeMap<String, EntityId>;

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_ron_str(&read_file(path.as_ref())?)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Starting resource pool.
    #[must_use]
    pub fn resource_pool(&self) -> ResourcePool {
        self.resources
            .iter()
            .fold(ResourcePool::new(), |pool, (name, amount)| {
                pool.with(name.clone(), *amount)
            })
    }

    /// Create the simulation described by this scenario.
    ///
    /// Returns the simulation and the ids of every labelled entity.
    pub fn build(&self, catalog: ItemCatalog, config: SimConfig) -> Result<(Simulation, Labels)> {
        let mut sim = Simulation::new(catalog, config, self.resource_pool());
        let mut labels = Labels::new();

        for placement in &self.entities {
            let position = point(placement.position);
            let is_unit = sim
                .catalog()
                .get(&placement.item)
                .map(|item| item.category.is_unit())
                .ok_or_else(|| GameError::UnknownItem(placement.item.clone()))?;
            let id = if is_unit {
                sim.spawn_unit(&placement.item, placement.team, position)?
            } else {
                sim.spawn_building(&placement.item, placement.team, position)?
            };
            if let Some(rally) = placement.rally {
                sim.set_rally_point(id, point(rally))?;
            }
            if let Some(label) = &placement.label {
                if labels.insert(label.clone(), id).is_some() {
                    return Err(HeadlessError::DuplicateLabel(label.clone()));
                }
            }
        }

        tracing::info!(
            "Built scenario '{}' with {} entities",
            self.name,
            sim.world().len()
        );
        Ok((sim, labels))
    }

    /// Orders sorted by tick; orders on the same tick keep file order.
    #[must_use]
    pub fn sorted_orders(&self) -> Vec<ScriptedOrder> {
        let mut orders = self.orders.clone();
        orders.sort_by_key(|order| order.tick);
        orders
    }
}
