//! UI sink that reports to the log.

use skirmish_core::components::EntityId;
use skirmish_core::interface::UiSink;

/// [`UiSink`] that forwards every notification to `tracing`.
///
/// Headless runs have no screen; status lines end up on stderr with
/// the rest of the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl UiSink for TracingSink {
    fn set_status(&mut self, message: &str) {
        tracing::info!(target: "skirmish::ui", "{}", message);
    }

    fn on_production_ready(&mut self, building: EntityId, item: &str) {
        tracing::info!(target: "skirmish::ui", "Building {} has {} ready", building, item);
    }

    fn update_resource_count(&mut self, resource: &str, amount: u32) {
        tracing::debug!(target: "skirmish::ui", "{}: {}", resource, amount);
    }
}
