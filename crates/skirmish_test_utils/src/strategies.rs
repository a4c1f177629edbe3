//! Proptest strategies for simulation inputs.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing against the fixture catalog.

use proptest::prelude::*;
use skirmish_core::abilities::AbilityGrant;
use skirmish_core::economy::{Cost, ResourcePool};
use skirmish_core::math::{Fixed, Vec2Fixed};
use skirmish_core::simulation::Command;

/// Unit items in the fixture catalog.
pub const UNIT_ITEMS: [&str; 3] = ["rifleman", "ranger", "tank"];

/// Building items the fixture barracks can produce.
pub const BARRACKS_PRODUCTS: [&str; 6] = [
    "rifleman",
    "ranger",
    "factory",
    "power_plant",
    "refinery",
    "wall",
];

/// Generate a fixed-point coordinate inside a typical skirmish map.
///
/// Range: -1000 to 1000
pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
    (-1000i32..1000i32).prop_map(Fixed::from_num)
}

/// Generate a random position.
pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
    (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Generate a stat multiplier.
///
/// Mixes exact quarter steps, decimals with no exact binary form
/// (thousandths from 0.001 to 10), and large factors up to a billion,
/// some of which push a stat out of range and are refused on grant.
pub fn arb_multiplier() -> impl Strategy<Value = Fixed> {
    prop_oneof![
        (1i32..=16).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4)),
        (1i32..=10_000)
            .prop_map(|thousandths| Fixed::from_num(thousandths) / Fixed::from_num(1000)),
        (1i32..1_000_000_000, 0i32..10).prop_map(|(whole, tenths)| {
            Fixed::from_num(whole) + Fixed::from_num(tenths) / Fixed::from_num(10)
        }),
    ]
}

/// Generate an ability lifetime in milliseconds. 0 is permanent.
pub fn arb_duration_ms() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), (1u64..10).prop_map(|s| s * 500)]
}

/// Generate any ability grant.
pub fn arb_ability_grant() -> impl Strategy<Value = AbilityGrant> {
    prop_oneof![
        (arb_multiplier(), arb_duration_ms())
            .prop_map(|(factor, duration_ms)| AbilityGrant::SpeedBoost { factor, duration_ms }),
        (arb_multiplier(), arb_duration_ms())
            .prop_map(|(factor, duration_ms)| AbilityGrant::DamageBoost { factor, duration_ms }),
        arb_duration_ms().prop_map(|duration_ms| AbilityGrant::Immunity { duration_ms }),
        (1i32..20, arb_duration_ms()).prop_map(|(rate, duration_ms)| AbilityGrant::Recovery {
            per_second: Fixed::from_num(rate),
            duration_ms,
        }),
        (1i32..4, arb_duration_ms()).prop_map(|(quarters, duration_ms)| AbilityGrant::Shield {
            absorb: Fixed::from_num(quarters) / Fixed::from_num(4),
            duration_ms,
        }),
        (1i32..10, 1u64..5, arb_duration_ms()).prop_map(|(damage, pulses, duration_ms)| {
            AbilityGrant::Poison {
                damage: Fixed::from_num(damage),
                interval_ms: pulses * 250,
                duration_ms,
            }
        }),
    ]
}

/// Generate a move command.
pub fn arb_move_command() -> impl Strategy<Value = Command> {
    arb_vec2_position().prop_map(Command::MoveTo)
}

/// Generate a command that does not need a target id.
pub fn arb_untargeted_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        4 => arb_move_command(),
        1 => Just(Command::ReturnToBase),
        1 => Just(Command::Stop),
    ]
}

/// Generate a sequence of untargeted commands.
pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(arb_untargeted_command(), 0..max_len)
}

/// Generate a credits-only cost.
pub fn arb_cost() -> impl Strategy<Value = Cost> {
    (0u32..500).prop_map(|credits| Cost::free().with("credits", credits))
}

/// Generate a resource pool holding credits and energy.
pub fn arb_pool() -> impl Strategy<Value = ResourcePool> {
    (0u32..1000, 0u32..100).prop_map(|(credits, energy)| {
        ResourcePool::new()
            .with("credits", credits)
            .with("energy", energy)
    })
}

/// Generate the name of an item the fixture barracks can produce.
pub fn arb_barracks_product() -> impl Strategy<Value = &'static str> {
    prop::sample::select(BARRACKS_PRODUCTS.to_vec())
}

/// Generate the name of a unit item.
pub fn arb_unit_item() -> impl Strategy<Value = &'static str> {
    prop::sample::select(UNIT_ITEMS.to_vec())
}
