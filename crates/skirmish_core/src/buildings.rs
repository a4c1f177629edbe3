//! Building specialization of an entity.
//!
//! Buildings differ only in the state their category needs, so the
//! category is a sum type and behavior dispatches on it with exhaustive
//! matches.

use serde::{Deserialize, Serialize};

use crate::data::{ItemCategory, ItemDefinition};
use crate::economy::Generator;
use crate::math::{Fixed, Vec2Fixed};
use crate::production::ProductionState;

/// Distance past a building's right edge where its default rally point sits.
pub const DEFAULT_RALLY_OFFSET: i32 = 40;

/// Category-specific building state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingKind {
    /// Trains units and buildings.
    Production(ProductionState),
    /// Headquarters.
    Command,
    /// Passive resource income.
    Economic(Generator),
    /// Walls, decorations and the like.
    Other,
}

/// Building specialization of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Building {
    /// Category and its state.
    pub kind: BuildingKind,
}

impl Building {
    /// Create building state for a catalog item placed at `position`.
    ///
    /// Production buildings get a rally point just right of their
    /// footprint. An economic item without generator settings becomes
    /// an inert building.
    #[must_use]
    pub fn from_definition(
        definition: &ItemDefinition,
        position: Vec2Fixed,
        now_ms: u64,
        max_queue_size: usize,
    ) -> Self {
        let kind = match definition.category {
            ItemCategory::Production => {
                let offset = definition.width / Fixed::from_num(2)
                    + Fixed::from_num(DEFAULT_RALLY_OFFSET);
                let rally = position + Vec2Fixed::RIGHT.scale(offset);
                BuildingKind::Production(
                    ProductionState::new(definition.produces.clone(), max_queue_size)
                        .with_rally_point(rally),
                )
            }
            ItemCategory::Command => BuildingKind::Command,
            ItemCategory::Economic => match &definition.generator {
                Some(profile) => BuildingKind::Economic(Generator::new(
                    profile.resource_type.clone(),
                    profile.generation_rate,
                    now_ms,
                )),
                None => {
                    tracing::warn!("Economic building {} has no generator", definition.name);
                    BuildingKind::Other
                }
            },
            ItemCategory::Other | ItemCategory::Unit => BuildingKind::Other,
        };
        Self { kind }
    }

    /// Production state, if this is a production building.
    #[must_use]
    pub fn production(&self) -> Option<&ProductionState> {
        match &self.kind {
            BuildingKind::Production(state) => Some(state),
            _ => None,
        }
    }

    /// Mutable production state, if this is a production building.
    pub fn production_mut(&mut self) -> Option<&mut ProductionState> {
        match &mut self.kind {
            BuildingKind::Production(state) => Some(state),
            _ => None,
        }
    }

    /// Mutable generator, if this is an economic building.
    pub fn generator_mut(&mut self) -> Option<&mut Generator> {
        match &mut self.kind {
            BuildingKind::Economic(generator) => Some(generator),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeneratorProfile;
    use crate::economy::Cost;

    fn definition(category: ItemCategory) -> ItemDefinition {
        ItemDefinition {
            name: "test".to_string(),
            category,
            width: Fixed::from_num(80),
            height: Fixed::from_num(60),
            cost: Cost::free(),
            build_time: Fixed::ZERO,
            health: Fixed::from_num(500),
            produces: vec!["rifleman".to_string()],
            unit: None,
            generator: None,
        }
    }

    #[test]
    fn test_production_building_gets_rally_point() {
        let building = Building::from_definition(
            &definition(ItemCategory::Production),
            Vec2Fixed::from_ints(100, 100),
            0,
            5,
        );
        let state = building.production().unwrap();
        assert_eq!(state.rally_point, Some(Vec2Fixed::from_ints(180, 100)));
        assert_eq!(state.max_queue_size, 5);
        assert!(state.can_produce("rifleman"));
        assert!(!state.can_produce("tank"));
    }

    #[test]
    fn test_economic_building() {
        let mut def = definition(ItemCategory::Economic);
        def.generator = Some(GeneratorProfile {
            resource_type: "energy".to_string(),
            generation_rate: 4,
        });
        let mut building = Building::from_definition(&def, Vec2Fixed::ZERO, 300, 5);
        let generator = building.generator_mut().unwrap();
        assert_eq!(generator.resource, "energy");
        assert_eq!(generator.last_produced_at_ms, 300);
        assert!(building.production().is_none());
    }

    #[test]
    fn test_economic_without_generator_is_inert() {
        let mut building = Building::from_definition(
            &definition(ItemCategory::Economic),
            Vec2Fixed::ZERO,
            0,
            5,
        );
        assert_eq!(building.kind, BuildingKind::Other);
        assert!(building.generator_mut().is_none());
    }

    #[test]
    fn test_command_building() {
        let building = Building::from_definition(
            &definition(ItemCategory::Command),
            Vec2Fixed::ZERO,
            0,
            5,
        );
        assert_eq!(building.kind, BuildingKind::Command);
    }
}
