//! Tunable simulation constants.
//!
//! Every field has a default, so a config file only needs to list the
//! values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};

/// Ticks per second at the default tick duration.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in milliseconds.
pub const TICK_DURATION_MS: u64 = 1000 / TICK_RATE as u64;

/// Simulation settings.
///
/// # Example RON
///
/// ```ron
/// (
///     tick_duration_ms: 50,
///     placement_padding: 10,
///     max_queue_size: 8,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated time per call to `Simulation::tick`.
    pub tick_duration_ms: u64,

    /// Extra clearance around existing entities when placing buildings.
    #[serde(with = "decimal_serde")]
    pub placement_padding: Fixed,

    /// Sample spacing along a planned straight-line path.
    #[serde(with = "decimal_serde")]
    pub ray_step: Fixed,

    /// Gap kept between a detour waypoint and the obstacle's edge.
    #[serde(with = "decimal_serde")]
    pub detour_clearance: Fixed,

    /// Gap between a production building and a freshly spawned unit.
    #[serde(with = "decimal_serde")]
    pub spawn_clearance: Fixed,

    /// Maximum queued items per production building.
    pub max_queue_size: usize,

    /// Length of one economic generation interval.
    pub generation_interval_ms: u64,

    /// Distance under which a mover counts as having reached a waypoint.
    #[serde(with = "decimal_serde")]
    pub arrival_epsilon: Fixed,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_duration_ms: TICK_DURATION_MS,
            placement_padding: Fixed::from_num(10),
            ray_step: Fixed::from_num(10),
            detour_clearance: Fixed::from_num(50),
            spawn_clearance: Fixed::from_num(10),
            max_queue_size: 5,
            generation_interval_ms: 1000,
            arrival_epsilon: Fixed::from_num(0.5),
        }
    }
}

impl SimConfig {
    /// Parse a config from RON, filling omitted fields with defaults.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::ConfigParse(e.to_string()))
    }
}
