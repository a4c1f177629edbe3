//! End-to-end scenarios driven through the public simulation API.
//!
//! Each test builds a small world from the shared fixture catalog and
//! checks exact positions, balances and tick counts.

use skirmish_core::abilities::{AbilityGrant, AbilityKind};
use skirmish_core::components::{EntityId, Team};
use skirmish_core::math::Fixed;
use skirmish_core::production::ProductionPhase;
use skirmish_core::simulation::{Command, Simulation};
use skirmish_core::spatial::{is_area_clear, is_location_clear};
use skirmish_core::unit::{Unit, UnitOrder};
use skirmish_core::world::Entity;
use skirmish_test_utils::fixtures::{
    fixed, run_ticks, simulation_with_credits, vec2, RecordingSink,
};

fn unit(sim: &Simulation, id: EntityId) -> &Unit {
    sim.world()
        .get(id)
        .and_then(Entity::as_unit)
        .expect("unit exists")
}

// =============================================================================
// Production
// =============================================================================

#[test]
fn test_train_building_item_until_ready() {
    let mut sim = simulation_with_credits(1000);
    let mut sink = RecordingSink::new();
    let barracks = sim
        .spawn_building("barracks", Team::Friend, vec2(0, 0))
        .unwrap();
    sim.select_building(barracks).unwrap();

    sim.train_item("factory", Some(7), &mut sink).unwrap();

    assert_eq!(sim.resources().balance("credits"), Some(800));
    assert_eq!(sink.last_balance("credits"), Some(800));
    assert_eq!(sim.production(barracks).unwrap().len(), 1);

    // 10 s at 50 ms per tick
    run_ticks(&mut sim, 199, &mut sink);
    let state = sim.production(barracks).unwrap();
    assert!(!state.is_ready_for_collection());
    assert_eq!(state.producing_item_name(), Some("factory"));

    sim.tick(&mut sink);
    let state = sim.production(barracks).unwrap();
    assert!(matches!(
        &state.phase,
        ProductionPhase::ReadyForCollection { item } if item == "factory"
    ));
    assert_eq!(state.producing_item_name(), Some("factory"));
    assert_eq!(sink.ready, vec![(barracks, "factory".to_string())]);
    assert_eq!(sim.now_ms(), 10_000);
}

#[test]
fn test_ready_building_is_collected_and_placed() {
    let mut sim = simulation_with_credits(1000);
    let mut sink = RecordingSink::new();
    let barracks = sim
        .spawn_building("barracks", Team::Friend, vec2(0, 0))
        .unwrap();
    sim.select_building(barracks).unwrap();
    sim.train_item("power_plant", None, &mut sink).unwrap();
    run_ticks(&mut sim, 100, &mut sink);

    assert!(sim.collect_building(barracks, vec2(40, 0), &mut sink).is_err());
    assert!(sim.production(barracks).unwrap().is_ready_for_collection());

    let plant = sim
        .collect_building(barracks, vec2(0, 300), &mut sink)
        .unwrap();
    let placed = sim.world().get(plant).unwrap();
    assert_eq!(placed.name, "power_plant");
    assert_eq!(placed.team, Team::Friend);
    assert!(sim.production(barracks).unwrap().is_empty());

    // The plant earns 2 energy per second from the moment it is placed.
    run_ticks(&mut sim, 20, &mut sink);
    assert_eq!(sim.resources().balance("energy"), Some(2));
}

#[test]
fn test_trained_units_walk_to_rally_point_in_order() {
    let mut sim = simulation_with_credits(1000);
    let mut sink = RecordingSink::new();
    let barracks = sim
        .spawn_building("barracks", Team::Friend, vec2(0, 0))
        .unwrap();
    sim.select_building(barracks).unwrap();
    sim.set_rally_point(barracks, vec2(0, 200)).unwrap();
    sim.train_item("rifleman", None, &mut sink).unwrap();
    sim.train_item("ranger", None, &mut sink).unwrap();
    assert_eq!(sim.resources().balance("credits"), Some(880));

    let mut spawned = Vec::new();
    for tick in 1..=400 {
        let events = sim.tick(&mut sink);
        for id in events.spawned {
            let rifleman = spawned.is_empty();
            spawned.push(id);
            assert_eq!(
                unit(&sim, id).order,
                UnitOrder::Move {
                    destination: vec2(0, 200)
                }
            );
            if rifleman {
                // 3 s build, exit on the rally side of the barracks
                assert_eq!(tick, 60);
                assert_eq!(sim.world().get(id).unwrap().position, vec2(0, 60));
                sim.issue_command(id, Command::MoveTo(vec2(200, 200)))
                    .unwrap();
            }
        }
    }

    assert_eq!(spawned.len(), 2);
    let names: Vec<&str> = spawned
        .iter()
        .map(|id| sim.world().get(*id).unwrap().name.as_str())
        .collect();
    assert_eq!(names, ["rifleman", "ranger"]);
    assert!(sim.production(barracks).unwrap().is_empty());

    assert_eq!(sim.world().get(spawned[0]).unwrap().position, vec2(200, 200));
    assert_eq!(sim.world().get(spawned[1]).unwrap().position, vec2(0, 200));
    for id in spawned {
        assert_eq!(unit(&sim, id).order, UnitOrder::Idle);
    }
}

// =============================================================================
// Placement
// =============================================================================

#[test]
fn test_area_between_close_buildings_is_blocked() {
    let mut sim = simulation_with_credits(0);
    sim.spawn_building("barracks", Team::Friend, vec2(0, 0))
        .unwrap();
    sim.spawn_building("barracks", Team::Friend, vec2(100, 0))
        .unwrap();

    let padding = sim.config().placement_padding;
    assert!(!is_area_clear(
        sim.world(),
        vec2(50, 0),
        fixed(80),
        fixed(80),
        padding
    ));
}

#[test]
fn test_area_between_distant_buildings_is_clear() {
    let mut sim = simulation_with_credits(0);
    sim.spawn_building("barracks", Team::Friend, vec2(0, 0))
        .unwrap();
    sim.spawn_building("barracks", Team::Friend, vec2(300, 0))
        .unwrap();

    let padding = sim.config().placement_padding;
    assert!(is_area_clear(
        sim.world(),
        vec2(150, 0),
        fixed(80),
        fixed(80),
        padding
    ));
}

// =============================================================================
// Abilities
// =============================================================================

#[test]
fn test_speed_boost_doubles_then_restores_speed() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let id = sim.spawn_unit("rifleman", Team::Friend, vec2(0, 0)).unwrap();
    let base = unit(&sim, id).stats.speed;

    sim.grant_ability(
        id,
        AbilityGrant::SpeedBoost {
            factor: fixed(2),
            duration_ms: 1000,
        },
    )
    .unwrap();

    sim.tick(&mut sink);
    assert_eq!(unit(&sim, id).stats.speed, base * fixed(2));

    run_ticks(&mut sim, 18, &mut sink);
    assert_eq!(unit(&sim, id).stats.speed, base * fixed(2));

    let events = sim.tick(&mut sink);
    assert_eq!(sim.now_ms(), 1000);
    assert_eq!(events.expired_abilities, vec![(id, AbilityKind::SpeedBoost)]);
    assert_eq!(unit(&sim, id).stats.speed, base);
    assert!(unit(&sim, id).abilities.is_empty());
}

#[test]
fn test_poison_stops_at_expiry() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let id = sim.spawn_unit("rifleman", Team::Friend, vec2(0, 0)).unwrap();

    sim.grant_ability(
        id,
        AbilityGrant::Poison {
            damage: fixed(5),
            interval_ms: 250,
            duration_ms: 1000,
        },
    )
    .unwrap();
    run_ticks(&mut sim, 60, &mut sink);

    // Pulses at 250, 500, 750 and 1000 ms
    let health = sim.world().get(id).unwrap().health;
    assert_eq!(health.current, fixed(80));
}

// =============================================================================
// Movement
// =============================================================================

#[test]
fn test_move_detours_around_structure_without_collision() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let factory = sim
        .spawn_building("factory", Team::Friend, vec2(0, 0))
        .unwrap();
    let id = sim
        .spawn_unit("rifleman", Team::Friend, vec2(-200, 0))
        .unwrap();
    let radius = sim.world().get(id).unwrap().radius();

    sim.issue_command(id, Command::MoveTo(vec2(200, 0))).unwrap();

    let path = &unit(&sim, id).path;
    assert!(path.len() >= 2, "expected a detour, got {:?}", path);
    let detour = path.next().unwrap();
    assert_ne!(detour.y, Fixed::ZERO);

    for _ in 0..400 {
        sim.tick(&mut sink);
        let position = sim.world().get(id).unwrap().position;
        assert!(
            is_location_clear(sim.world(), position, radius, &[id]),
            "unit overlapped the factory at {:?}",
            position
        );
        if unit(&sim, id).order == UnitOrder::Idle {
            break;
        }
    }

    assert_eq!(sim.world().get(id).unwrap().position, vec2(200, 0));
    assert!(sim.world().contains(factory));
}

#[test]
fn test_return_to_base_stops_beside_headquarters() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let hq = sim
        .spawn_building("command_center", Team::Friend, vec2(0, 0))
        .unwrap();
    let id = sim.spawn_unit("ranger", Team::Friend, vec2(400, 0)).unwrap();

    sim.issue_command(id, Command::ReturnToBase).unwrap();
    assert_eq!(unit(&sim, id).order, UnitOrder::ReturnToBase { hq });

    run_ticks(&mut sim, 200, &mut sink);

    // Edge at 60, half the ranger at 8, clearance 10
    assert_eq!(sim.world().get(id).unwrap().position, vec2(78, 0));
    assert_eq!(unit(&sim, id).order, UnitOrder::Idle);
}

// =============================================================================
// Combat
// =============================================================================

#[test]
fn test_opposing_units_close_in_and_fight_to_the_death() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let friend = sim
        .spawn_unit("rifleman", Team::Friend, vec2(0, 0))
        .unwrap();
    let enemy = sim
        .spawn_unit("rifleman", Team::Enemy, vec2(150, 0))
        .unwrap();
    let attack_range = unit(&sim, friend).stats.attack_range;
    let per_tick = fixed(1);

    sim.tick(&mut sink);
    assert_eq!(unit(&sim, friend).attack_target, Some(enemy));
    assert_eq!(unit(&sim, enemy).attack_target, Some(friend));
    assert_eq!(unit(&sim, friend).order, UnitOrder::Engage);
    assert_eq!(unit(&sim, enemy).order, UnitOrder::Engage);

    let gap = |sim: &Simulation| {
        let a = sim.world().get(friend).unwrap().position;
        let b = sim.world().get(enemy).unwrap().position;
        a.distance(b)
    };

    let mut previous = gap(&sim);
    assert_eq!(previous, fixed(144));
    while previous > attack_range {
        let events = sim.tick(&mut sink);
        let now = gap(&sim);
        assert!(now < previous);
        assert!(now >= attack_range);
        for hit in events.damage_events {
            assert_eq!(hit.amount, per_tick);
        }
        previous = now;
    }

    let mut deaths = Vec::new();
    for _ in 0..300 {
        let events = sim.tick(&mut sink);
        for hit in &events.damage_events {
            assert_eq!(hit.amount, per_tick);
        }
        if !events.deaths.is_empty() {
            deaths = events.deaths;
            break;
        }
    }

    assert_eq!(deaths.len(), 1);
    let (dead, survivor) = if deaths[0] == friend {
        (friend, enemy)
    } else {
        (enemy, friend)
    };
    assert!(!sim.world().contains(dead));
    assert!(sim.world().is_alive(survivor));

    sim.tick(&mut sink);
    assert_eq!(unit(&sim, survivor).order, UnitOrder::Idle);
    assert_eq!(unit(&sim, survivor).attack_target, None);
}

#[test]
fn test_immune_unit_takes_no_damage() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let friend = sim
        .spawn_unit("rifleman", Team::Friend, vec2(0, 0))
        .unwrap();
    let enemy = sim
        .spawn_unit("rifleman", Team::Enemy, vec2(30, 0))
        .unwrap();
    sim.grant_ability(friend, AbilityGrant::Immunity { duration_ms: 0 })
        .unwrap();

    run_ticks(&mut sim, 40, &mut sink);

    let friend_health = sim.world().get(friend).unwrap().health;
    let enemy_health = sim.world().get(enemy).unwrap().health;
    assert!(friend_health.is_full());
    assert_eq!(enemy_health.current, fixed(60));
}

#[test]
fn test_attack_order_chases_outside_autochase_range() {
    let mut sim = simulation_with_credits(0);
    let mut sink = RecordingSink::new();
    let friend = sim
        .spawn_unit("rifleman", Team::Friend, vec2(0, 0))
        .unwrap();
    let enemy = sim
        .spawn_building("wall", Team::Enemy, vec2(600, 0))
        .unwrap();

    sim.issue_command(friend, Command::Attack(enemy)).unwrap();
    run_ticks(&mut sim, 300, &mut sink);

    // Wall edge at 580, attack range 40
    assert_eq!(sim.world().get(friend).unwrap().position, vec2(540, 0));
    let wall = sim.world().get(enemy).unwrap();
    assert!(wall.health.current < fixed(600));
}
