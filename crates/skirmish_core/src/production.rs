//! Production queues and spawn-point resolution.
//!
//! A production building works through its queue front to back. The
//! item at the front of the queue is the one being built; it leaves the
//! queue only when it is delivered (a unit spawned, a building placed)
//! or cancelled. Countdowns are polled against the simulation clock.
//!
//! ```text
//! Idle ──train──► Counting ──elapsed──► ReadyForCollection ──collect──► Idle / Counting
//!                    │                  (building items)
//!                    └──elapsed──► spawn unit ──► Idle / Counting
//!                         │ exit blocked
//!                         └──► SpawnDeferred ──exit clear──► spawn unit
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::components::{Footprint, Rect};
use crate::economy::Cost;
use crate::error::ProductionError;
use crate::math::{Fixed, Vec2Fixed};

/// An entry in a production queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuedItem {
    /// Catalog name of the item.
    pub item: String,
    /// Opaque token the host uses to find its progress widget.
    pub ui_handle: Option<u64>,
    /// Amount charged when queued.
    pub cost: Cost,
}

/// Where the front item of a queue is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProductionPhase {
    /// Nothing in progress.
    #[default]
    Idle,
    /// The countdown is running.
    Counting {
        /// Item being built.
        item: String,
        /// When the countdown started.
        started_at_ms: u64,
        /// When the countdown elapses.
        ends_at_ms: u64,
    },
    /// A finished unit is waiting for its exit to clear.
    SpawnDeferred {
        /// Finished unit.
        item: String,
    },
    /// A finished building is waiting for the player to place it.
    ReadyForCollection {
        /// Finished building.
        item: String,
    },
}

/// Production state of a production building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionState {
    /// Items not yet delivered, in order. The front one is in progress.
    pub queue: VecDeque<QueuedItem>,
    /// Where spawned units walk to.
    pub rally_point: Option<Vec2Fixed>,
    /// Lifecycle of the front item.
    pub phase: ProductionPhase,
    /// Items this building may produce; empty means anything.
    pub produces: Vec<String>,
    /// Maximum queue length.
    pub max_queue_size: usize,
}

impl ProductionState {
    /// Create an idle production state.
    #[must_use]
    pub fn new(produces: Vec<String>, max_queue_size: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            rally_point: None,
            phase: ProductionPhase::Idle,
            produces,
            max_queue_size,
        }
    }

    /// Builder: set the rally point.
    #[must_use]
    pub fn with_rally_point(mut self, point: Vec2Fixed) -> Self {
        self.rally_point = Some(point);
        self
    }

    /// Number of queued items, including the one in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.max_queue_size
    }

    /// Check whether this building may produce `item`.
    #[must_use]
    pub fn can_produce(&self, item: &str) -> bool {
        self.produces.is_empty() || self.produces.iter().any(|p| p == item)
    }

    /// Check if a countdown is running or a finished unit is held.
    #[must_use]
    pub fn is_locally_producing(&self) -> bool {
        matches!(
            self.phase,
            ProductionPhase::Counting { .. } | ProductionPhase::SpawnDeferred { .. }
        )
    }

    /// Check if a finished building awaits collection.
    #[must_use]
    pub fn is_ready_for_collection(&self) -> bool {
        matches!(self.phase, ProductionPhase::ReadyForCollection { .. })
    }

    /// Name of the item in progress or awaiting delivery.
    #[must_use]
    pub fn producing_item_name(&self) -> Option<&str> {
        match &self.phase {
            ProductionPhase::Idle => None,
            ProductionPhase::Counting { item, .. }
            | ProductionPhase::SpawnDeferred { item }
            | ProductionPhase::ReadyForCollection { item } => Some(item),
        }
    }

    /// Progress of the running countdown as a percentage (0-100).
    #[must_use]
    pub fn progress_percentage(&self, now_ms: u64) -> u32 {
        match &self.phase {
            ProductionPhase::Idle => 0,
            ProductionPhase::Counting {
                started_at_ms,
                ends_at_ms,
                ..
            } => {
                let total = ends_at_ms.saturating_sub(*started_at_ms);
                if total == 0 {
                    return 100;
                }
                let done = now_ms.saturating_sub(*started_at_ms).min(total);
                u32::try_from(done * 100 / total).unwrap_or(100)
            }
            ProductionPhase::SpawnDeferred { .. } | ProductionPhase::ReadyForCollection { .. } => {
                100
            }
        }
    }

    /// Append an item to the queue.
    pub fn enqueue(&mut self, item: QueuedItem) -> Result<(), ProductionError> {
        if self.is_full() {
            return Err(ProductionError::QueueFull);
        }
        self.queue.push_back(item);
        Ok(())
    }

    /// Start the countdown for the front item if idle.
    ///
    /// Returns the started item's name.
    pub fn start_next(&mut self, now_ms: u64, build_time_ms: u64) -> Option<&str> {
        if self.phase != ProductionPhase::Idle {
            return None;
        }
        let front = self.queue.front()?;
        self.phase = ProductionPhase::Counting {
            item: front.item.clone(),
            started_at_ms: now_ms,
            ends_at_ms: now_ms.saturating_add(build_time_ms),
        };
        Some(&front.item)
    }

    /// Name of the item whose countdown has elapsed at `now_ms`.
    #[must_use]
    pub fn elapsed_item(&self, now_ms: u64) -> Option<&str> {
        match &self.phase {
            ProductionPhase::Counting {
                item, ends_at_ms, ..
            } if now_ms >= *ends_at_ms => Some(item),
            _ => None,
        }
    }

    /// Hold the finished front item until the player collects it.
    pub fn mark_ready(&mut self) {
        if let Some(item) = self.finished_item() {
            self.phase = ProductionPhase::ReadyForCollection { item };
        }
    }

    /// Hold the finished front unit until its exit clears.
    pub fn defer_spawn(&mut self) {
        if let Some(item) = self.finished_item() {
            self.phase = ProductionPhase::SpawnDeferred { item };
        }
    }

    fn finished_item(&self) -> Option<String> {
        match &self.phase {
            ProductionPhase::Idle => None,
            ProductionPhase::Counting { item, .. }
            | ProductionPhase::SpawnDeferred { item }
            | ProductionPhase::ReadyForCollection { item } => Some(item.clone()),
        }
    }

    /// Deliver the front item: remove it from the queue and go idle.
    pub fn finish_current(&mut self) -> Option<QueuedItem> {
        self.phase = ProductionPhase::Idle;
        self.queue.pop_front()
    }

    /// Remove the item at `index` and compute its refund.
    ///
    /// Items that have not started refund in full. The item in progress
    /// refunds in proportion to its remaining countdown; a finished item
    /// refunds nothing. Cancelling the front item returns the queue to
    /// idle.
    pub fn cancel(&mut self, index: usize, now_ms: u64) -> Option<(QueuedItem, Cost)> {
        if index >= self.queue.len() {
            return None;
        }
        let in_progress = index == 0 && self.phase != ProductionPhase::Idle;
        let refund_fraction = if in_progress {
            match &self.phase {
                ProductionPhase::Counting {
                    started_at_ms,
                    ends_at_ms,
                    ..
                } => {
                    let total = ends_at_ms.saturating_sub(*started_at_ms);
                    let remaining = ends_at_ms.saturating_sub(now_ms);
                    (remaining, total)
                }
                _ => (0, 1),
            }
        } else {
            (1, 1)
        };

        let removed = self.queue.remove(index)?;
        if in_progress {
            self.phase = ProductionPhase::Idle;
        }
        let refund = removed.cost.prorate(refund_fraction.0, refund_fraction.1);
        Some((removed, refund))
    }
}

/// Resolve where a newly produced unit appears.
///
/// Projects `rally` onto the perimeter of `rect` and pushes the point
/// outward along the edge normal by half the unit's size plus
/// `clearance`. A rally point inside the rectangle exits through the
/// nearest edge; one at the exact center exits to the right.
#[must_use]
pub fn closest_point_on_perimeter(
    rect: &Rect,
    rally: Vec2Fixed,
    spawn_size: Footprint,
    clearance: Fixed,
) -> Vec2Fixed {
    let center = rect.center();
    let clamped = rect.clamp_point(rally);

    let (edge_point, normal) = if clamped != rally {
        // Outside: the clamped point is already on the perimeter.
        (clamped, (rally - clamped).normalize())
    } else if on_perimeter(rect, rally) {
        let outward = (rally - center).normalize();
        let outward = if outward.is_zero() {
            Vec2Fixed::RIGHT
        } else {
            outward
        };
        (rally, outward)
    } else {
        nearest_edge_exit(rect, rally)
    };

    let offset = spawn_size.half_extent() + clearance;
    edge_point + normal.scale(offset)
}

fn on_perimeter(rect: &Rect, point: Vec2Fixed) -> bool {
    point.x == rect.min.x || point.x == rect.max.x || point.y == rect.min.y || point.y == rect.max.y
}

/// Exit through the closest edge for a point strictly inside `rect`.
///
/// Ties resolve right, left, top, bottom.
fn nearest_edge_exit(rect: &Rect, point: Vec2Fixed) -> (Vec2Fixed, Vec2Fixed) {
    let candidates = [
        (
            rect.max.x - point.x,
            Vec2Fixed::new(rect.max.x, point.y),
            Vec2Fixed::RIGHT,
        ),
        (
            point.x - rect.min.x,
            Vec2Fixed::new(rect.min.x, point.y),
            Vec2Fixed::new(-Fixed::ONE, Fixed::ZERO),
        ),
        (
            rect.max.y - point.y,
            Vec2Fixed::new(point.x, rect.max.y),
            Vec2Fixed::new(Fixed::ZERO, Fixed::ONE),
        ),
        (
            point.y - rect.min.y,
            Vec2Fixed::new(point.x, rect.min.y),
            Vec2Fixed::new(Fixed::ZERO, -Fixed::ONE),
        ),
    ];

    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.0 < best.0 {
            best = *candidate;
        }
    }
    (best.1, best.2)
}
