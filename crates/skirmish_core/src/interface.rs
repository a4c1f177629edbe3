//! Narrow outbound interface to the presentation layer.
//!
//! The simulation never draws anything. It reports the few things a UI
//! needs to know through [`UiSink`], passed into each operation that
//! reports.

use crate::components::EntityId;

/// Receiver for player-facing notifications.
///
/// Every method has a no-op default so hosts implement only what they
/// display.
pub trait UiSink {
    /// Show a status line (rejections, confirmations).
    fn set_status(&mut self, _message: &str) {}

    /// A building item finished and awaits collection.
    fn on_production_ready(&mut self, _building: EntityId, _item: &str) {}

    /// A resource balance changed.
    fn update_resource_count(&mut self, _resource: &str, _amount: u32) {}
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl UiSink for NullSink {}
