//! Obstacle-aware movement using a single-detour heuristic.
//!
//! This is not general pathfinding. A straight line to the destination
//! is sampled at fixed spacing; if something solid is in the way, one
//! detour waypoint beside the first obstacle is inserted. Movers
//! re-validate every step and replan once when blocked, which covers
//! obstacles that appear after planning.
//!
//! All calculations use fixed-point math for deterministic results.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::config::SimConfig;
use crate::math::{Fixed, Vec2Fixed};
use crate::spatial::{first_blocker, is_location_clear};
use crate::world::World;

/// Ordered waypoints, consumed front to back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path {
    waypoints: VecDeque<Vec2Fixed>,
}

impl Path {
    /// Create a path through `waypoints`.
    #[must_use]
    pub fn new(waypoints: impl IntoIterator<Item = Vec2Fixed>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
        }
    }

    /// Single-waypoint path straight to `destination`.
    #[must_use]
    pub fn direct(destination: Vec2Fixed) -> Self {
        Self::new([destination])
    }

    /// Check if no waypoints remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Number of remaining waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Waypoint currently being approached.
    #[must_use]
    pub fn next(&self) -> Option<Vec2Fixed> {
        self.waypoints.front().copied()
    }

    /// Final waypoint.
    #[must_use]
    pub fn destination(&self) -> Option<Vec2Fixed> {
        self.waypoints.back().copied()
    }

    /// Iterate over the remaining waypoints.
    pub fn waypoints(&self) -> impl Iterator<Item = Vec2Fixed> + '_ {
        self.waypoints.iter().copied()
    }

    /// Drop the current waypoint.
    pub fn advance(&mut self) {
        self.waypoints.pop_front();
    }

    /// Drop every waypoint.
    pub fn clear(&mut self) {
        self.waypoints.clear();
    }
}

/// What happened during one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved (or held still at zero speed); waypoints remain.
    Moved,
    /// The final waypoint was reached, or there was nothing to follow.
    Arrived,
    /// Blocked even after replanning. The path has been cleared.
    Stuck,
}

/// Result of [`follow_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Position after the step.
    pub position: Vec2Fixed,
    /// Step outcome.
    pub outcome: StepOutcome,
    /// Whether the path was replanned during the step.
    pub replanned: bool,
}

fn skip_list(mover: EntityId, ignore: &[EntityId]) -> Vec<EntityId> {
    let mut skip = Vec::with_capacity(ignore.len() + 1);
    skip.push(mover);
    skip.extend_from_slice(ignore);
    skip
}

/// First solid entity met when sweeping a circle from `from` to `to`.
///
/// Samples every `step` units along the segment, excluding the start
/// and including the end.
#[must_use]
pub fn ray_blocker(
    world: &World,
    from: Vec2Fixed,
    to: Vec2Fixed,
    radius: Fixed,
    ignore: &[EntityId],
    step: Fixed,
) -> Option<EntityId> {
    let distance = from.distance(to);
    if distance == Fixed::ZERO {
        return first_blocker(world, to, radius, ignore);
    }
    let direction = (to - from).normalize();
    let step = if step > Fixed::ZERO { step } else { distance };

    let mut travelled = step.min(distance);
    loop {
        let point = if travelled >= distance {
            to
        } else {
            from + direction.scale(travelled)
        };
        if let Some(id) = first_blocker(world, point, radius, ignore) {
            return Some(id);
        }
        if travelled >= distance {
            return None;
        }
        travelled = (travelled + step).min(distance);
    }
}

/// Plan a path for `mover` (a circle of `radius` at `from`) to `dest`.
///
/// Entities in `ignore` (and the mover itself) never block. Returns an
/// empty path when already at the destination, a direct path when the
/// line is clear, and otherwise a detour beside the first obstacle. The
/// detour sits on the side of the line away from the obstacle's center
/// (left when the line runs through the center); the other side is
/// tried when the first is blocked. If the leg to the detour is itself
/// blocked, a sidestep waypoint is put in front of it.
#[must_use]
pub fn plan_path(
    world: &World,
    mover: EntityId,
    from: Vec2Fixed,
    radius: Fixed,
    dest: Vec2Fixed,
    ignore: &[EntityId],
    config: &SimConfig,
) -> Path {
    let epsilon = config.arrival_epsilon;
    if from.distance_squared(dest) <= epsilon.saturating_mul(epsilon) {
        return Path::default();
    }

    let skip = skip_list(mover, ignore);
    let Some(obstacle) = ray_blocker(world, from, dest, radius, &skip, config.ray_step)
        .and_then(|id| world.get(id))
    else {
        return Path::direct(dest);
    };

    let direction = (dest - from).normalize();
    let left = direction.perpendicular();
    let to_obstacle = obstacle.position - from;
    let cross = direction.x * to_obstacle.y - direction.y * to_obstacle.x;
    let preferred = if cross > Fixed::ZERO { -left } else { left };
    let offset = obstacle.footprint.half_extent() + radius + config.detour_clearance;

    for side in [preferred, -preferred] {
        let detour = obstacle.position + side.scale(offset);
        if !is_location_clear(world, detour, radius, &skip) {
            continue;
        }
        if ray_blocker(world, from, detour, radius, &skip, config.ray_step).is_none() {
            return Path::new([detour, dest]);
        }

        let sidestep = from + side.scale(radius + config.detour_clearance);
        if is_location_clear(world, sidestep, radius, &skip)
            && ray_blocker(world, from, sidestep, radius, &skip, config.ray_step).is_none()
            && ray_blocker(world, sidestep, detour, radius, &skip, config.ray_step).is_none()
        {
            return Path::new([sidestep, detour, dest]);
        }
    }

    tracing::debug!(
        "No clear detour around entity {} for mover {}",
        obstacle.id,
        mover
    );
    Path::new([obstacle.position + preferred.scale(offset), dest])
}

/// Candidate next position and whether it reaches the current waypoint.
fn next_position(
    position: Vec2Fixed,
    step: Fixed,
    path: &Path,
    epsilon: Fixed,
) -> Option<(Vec2Fixed, bool)> {
    let waypoint = path.next()?;
    let distance = position.distance(waypoint);
    if distance <= step.max(epsilon) {
        return Some((waypoint, true));
    }
    let direction = (waypoint - position).normalize();
    if direction.is_zero() {
        return Some((waypoint, true));
    }
    Some((position + direction.scale(step.max(Fixed::ZERO)), false))
}

/// Advance a mover one step of length `step` along `path`.
///
/// The next position is validated against the world before it is taken.
/// When blocked, the path is replanned from the current position to the
/// final destination and the step retried once; if that is blocked too,
/// the path is cleared and the outcome is [`StepOutcome::Stuck`].
pub fn follow_path(
    world: &World,
    mover: EntityId,
    position: Vec2Fixed,
    radius: Fixed,
    step: Fixed,
    path: &mut Path,
    ignore: &[EntityId],
    config: &SimConfig,
) -> StepResult {
    let epsilon = config.arrival_epsilon;
    let skip = skip_list(mover, ignore);

    let Some(mut candidate) = next_position(position, step, path, epsilon) else {
        return StepResult {
            position,
            outcome: StepOutcome::Arrived,
            replanned: false,
        };
    };

    let mut replanned = false;
    if !is_location_clear(world, candidate.0, radius, &skip) {
        let Some(dest) = path.destination() else {
            return StepResult {
                position,
                outcome: StepOutcome::Arrived,
                replanned: false,
            };
        };
        *path = plan_path(world, mover, position, radius, dest, ignore, config);
        replanned = true;
        tracing::debug!("Entity {} replanned path to {:?}", mover, dest);

        match next_position(position, step, path, epsilon) {
            Some(retry) if is_location_clear(world, retry.0, radius, &skip) => candidate = retry,
            Some(_) => {
                path.clear();
                return StepResult {
                    position,
                    outcome: StepOutcome::Stuck,
                    replanned,
                };
            }
            None => {
                return StepResult {
                    position,
                    outcome: StepOutcome::Arrived,
                    replanned,
                };
            }
        }
    }

    let (next, reached) = candidate;
    if reached {
        path.advance();
    }
    let outcome = if path.is_empty() {
        StepOutcome::Arrived
    } else {
        StepOutcome::Moved
    };
    StepResult {
        position: next,
        outcome,
        replanned,
    }
}
