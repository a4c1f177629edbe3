//! Loading scenarios, catalogs and configs from disk.

use std::fs;
use std::path::PathBuf;

use skirmish_core::components::Team;
use skirmish_core::config::SimConfig;
use skirmish_core::math::Fixed;
use skirmish_headless::{
    load_catalog, load_config, HeadlessError, RunSummary, Scenario, ScenarioRunner, TracingSink,
};
use skirmish_test_utils::fixtures::SAMPLE_CATALOG_JSON;

fn repo_data(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../data")
        .join(relative)
}

const SIEGE: &str = r#"(
    name: "siege",
    resources: { "credits": 400 },
    entities: [
        (item: "command_center", team: friend, position: (0, 0), label: Some("hq")),
        (item: "tank", team: friend, position: (150, 0), label: Some("tank")),
        (item: "wall", team: enemy, position: (500, 0), label: Some("gate")),
    ],
    orders: [
        (tick: 0, action: Attack(unit: "tank", target: "gate")),
    ],
    ticks: Some(400),
)"#;

fn run_siege(dir: &tempfile::TempDir) -> RunSummary {
    let catalog_path = dir.path().join("catalog.json");
    let scenario_path = dir.path().join("siege.ron");
    fs::write(&catalog_path, SAMPLE_CATALOG_JSON).unwrap();
    fs::write(&scenario_path, SIEGE).unwrap();

    let catalog = load_catalog(&catalog_path).unwrap();
    let scenario = Scenario::load(&scenario_path).unwrap();
    let mut runner =
        ScenarioRunner::new(&scenario, catalog, SimConfig::default(), TracingSink).unwrap();
    runner.run(scenario.ticks.unwrap())
}

#[test]
fn test_run_scenario_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_siege(&dir);

    assert_eq!(summary.scenario, "siege");
    assert_eq!(summary.ticks, 400);
    assert_eq!(summary.elapsed_ms, 20_000);
    assert_eq!(summary.orders_applied, 1);
    // 600 health at 50 per second falls in 12 s of shooting.
    assert_eq!(summary.deaths.len(), 1);
    assert_eq!(summary.survivors.get(&Team::Enemy), None);
    assert_eq!(summary.survivors[&Team::Friend], 2);
    assert_eq!(summary.resources["credits"], 400);
}

#[test]
fn test_runs_from_files_are_reproducible() {
    let first = run_siege(&tempfile::tempdir().unwrap());
    let second = run_siege(&tempfile::tempdir().unwrap());
    assert_eq!(first, second);
}

#[test]
fn test_summary_is_json() {
    let summary = run_siege(&tempfile::tempdir().unwrap());
    let json = serde_json::to_string(&summary).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["ticks"], 400);
    assert_eq!(value["survivors"]["friend"], 2);

    let back: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
}

#[test]
fn test_ron_catalog_and_partial_config() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.ron");
    let config_path = dir.path().join("config.ron");
    fs::write(
        &catalog_path,
        r#"(items: [
            (name: "post", category: other, width: 30.0, height: 30.0, health: 50.0),
        ])"#,
    )
    .unwrap();
    fs::write(&config_path, "(max_queue_size: 2, spawn_clearance: 4.0)").unwrap();

    let catalog = load_catalog(&catalog_path).unwrap();
    assert!(catalog.contains("post"));

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.max_queue_size, 2);
    assert_eq!(config.spawn_clearance, Fixed::from_num(4));
    assert_eq!(config.tick_duration_ms, 50);
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nowhere.json");
    let err = load_catalog(&missing).unwrap_err();
    assert!(matches!(&err, HeadlessError::Read { path, .. } if *path == missing));
    assert!(err.to_string().contains("nowhere.json"));
}

#[test]
fn test_bad_catalog_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, r#"{ "items": [ { "name": "x" } ] }"#).unwrap();
    assert!(matches!(load_catalog(&path), Err(HeadlessError::Game(_))));
}

#[test]
fn test_bundled_data_is_valid() {
    let catalog = load_catalog(repo_data("catalog.json")).unwrap();
    assert!(catalog.validate().is_empty());
    assert_eq!(load_config(repo_data("config.ron")).unwrap(), SimConfig::default());

    let scenario = Scenario::load(repo_data("scenarios/duel.ron")).unwrap();
    let mut runner =
        ScenarioRunner::new(&scenario, catalog, SimConfig::default(), TracingSink).unwrap();
    let summary = runner.run(scenario.ticks.unwrap());
    assert_eq!(summary.ticks, 600);
    assert_eq!(summary.orders_applied + summary.orders_rejected, 9);
    assert!(summary.spawned.len() >= 2);
}
