//! Scenario runner.
//!
//! Drives a [`Simulation`] built from a [`Scenario`] for a fixed number
//! of ticks, performing scripted orders when their tick comes up, and
//! condenses the run into a [`RunSummary`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skirmish_core::components::{EntityId, Team};
use skirmish_core::config::SimConfig;
use skirmish_core::data::ItemCatalog;
use skirmish_core::interface::UiSink;
use skirmish_core::simulation::{Command, ProductionReady, Simulation};

use crate::error::{HeadlessError, Result};
use crate::scenario::{point, Labels, Scenario, ScriptedAction, ScriptedOrder};

/// Result of a headless run, printed as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated time in milliseconds.
    pub elapsed_ms: u64,
    /// Living entities per team.
    pub survivors: BTreeMap<Team, usize>,
    /// Final resource balances.
    pub resources: BTreeMap<String, u32>,
    /// Entities pruned during the run, in order.
    pub deaths: Vec<EntityId>,
    /// Units spawned by production, in order.
    pub spawned: Vec<EntityId>,
    /// Building items that finished.
    pub production_ready: Vec<ProductionReady>,
    /// Scripted orders performed.
    pub orders_applied: usize,
    /// Scripted orders refused by the simulation.
    pub orders_rejected: usize,
    /// Final state hash.
    pub state_hash: u64,
}

/// Headless driver for one scenario.
pub struct ScenarioRunner<S: UiSink> {
    scenario_name: String,
    sim: Simulation,
    labels: Labels,
    orders: Vec<ScriptedOrder>,
    next_order: usize,
    sink: S,
    summary: RunSummary,
}

impl<S: UiSink> ScenarioRunner<S> {
    /// Build the scenario's simulation and prepare its script.
    pub fn new(
        scenario: &Scenario,
        catalog: ItemCatalog,
        config: SimConfig,
        sink: S,
    ) -> Result<Self> {
        let (sim, labels) = scenario.build(catalog, config)?;
        Ok(Self {
            scenario_name: scenario.name.clone(),
            sim,
            labels,
            orders: scenario.sorted_orders(),
            next_order: 0,
            sink,
            summary: RunSummary {
                scenario: scenario.name.clone(),
                ticks: 0,
                elapsed_ms: 0,
                survivors: BTreeMap::new(),
                resources: BTreeMap::new(),
                deaths: Vec::new(),
                spawned: Vec::new(),
                production_ready: Vec::new(),
                orders_applied: 0,
                orders_rejected: 0,
                state_hash: 0,
            },
        })
    }

    /// The simulation being driven.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Entity ids by label, including buildings placed by `Collect`.
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Perform due orders and advance one tick.
    pub fn step(&mut self) {
        self.apply_due_orders();
        let events = self.sim.tick(&mut self.sink);
        self.summary.deaths.extend(events.deaths);
        self.summary.spawned.extend(events.spawned);
        self.summary
            .production_ready
            .extend(events.production_ready);
    }

    /// Run `ticks` ticks and return the summary so far.
    pub fn run(&mut self, ticks: u64) -> RunSummary {
        tracing::info!("Running '{}' for {} ticks", self.scenario_name, ticks);
        for _ in 0..ticks {
            self.step();
        }
        self.summary()
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut survivors = BTreeMap::new();
        for entity in self.sim.world().iter() {
            *survivors.entry(entity.team).or_insert(0) += 1;
        }
        RunSummary {
            ticks: self.sim.get_tick(),
            elapsed_ms: self.sim.now_ms(),
            survivors,
            resources: self
                .sim
                .resources()
                .iter()
                .map(|(name, amount)| (name.to_string(), amount))
                .collect(),
            state_hash: self.sim.state_hash(),
            ..self.summary.clone()
        }
    }

    fn apply_due_orders(&mut self) {
        let tick = self.sim.get_tick();
        while let Some(order) = self.orders.get(self.next_order) {
            if order.tick > tick {
                break;
            }
            let action = order.action.clone();
            let due = order.tick;
            self.next_order += 1;

            match self.apply(&action) {
                Ok(()) => self.summary.orders_applied += 1,
                Err(e) => {
                    tracing::warn!("Order for tick {} refused: {}", due, e);
                    self.summary.orders_rejected += 1;
                }
            }
        }
    }

    fn lookup(&self, label: &str) -> Result<EntityId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| HeadlessError::UnknownLabel(label.to_string()))
    }

    fn apply(&mut self, action: &ScriptedAction) -> std::result::Result<(), String> {
        let command = |runner: &mut Self, unit: &str, command: Command| {
            let id = runner.lookup(unit).map_err(|e| e.to_string())?;
            runner
                .sim
                .issue_command(id, command)
                .map_err(|e| e.to_string())
        };

        match action {
            ScriptedAction::Move { unit, to } => command(self, unit, Command::MoveTo(point(*to))),
            ScriptedAction::Attack { unit, target } => {
                let target = self.lookup(target).map_err(|e| e.to_string())?;
                command(self, unit, Command::Attack(target))
            }
            ScriptedAction::ReturnToBase { unit } => command(self, unit, Command::ReturnToBase),
            ScriptedAction::Stop { unit } => command(self, unit, Command::Stop),
            ScriptedAction::Select { building } => {
                let id = self.lookup(building).map_err(|e| e.to_string())?;
                self.sim.select_building(id).map_err(|e| e.to_string())
            }
            ScriptedAction::Train { item } => self
                .sim
                .train_item(item, None, &mut self.sink)
                .map_err(|e| e.to_string()),
            ScriptedAction::Collect {
                building,
                at,
                label,
            } => {
                let id = self.lookup(building).map_err(|e| e.to_string())?;
                let placed = self
                    .sim
                    .collect_building(id, point(*at), &mut self.sink)
                    .map_err(|e| e.to_string())?;
                if let Some(label) = label {
                    self.labels.insert(label.clone(), placed);
                }
                Ok(())
            }
            ScriptedAction::Cancel { building, index } => {
                let id = self.lookup(building).map_err(|e| e.to_string())?;
                self.sim
                    .cancel_production(id, *index, &mut self.sink)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            ScriptedAction::Rally { building, at } => {
                let id = self.lookup(building).map_err(|e| e.to_string())?;
                self.sim
                    .set_rally_point(id, point(*at))
                    .map_err(|e| e.to_string())
            }
            ScriptedAction::Grant { unit, ability } => {
                let id = self.lookup(unit).map_err(|e| e.to_string())?;
                self.sim
                    .grant_ability(id, *ability)
                    .map_err(|e| e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::production::ProductionPhase;
    use skirmish_test_utils::fixtures::{sample_catalog, RecordingSink};

    fn runner(ron: &str) -> ScenarioRunner<RecordingSink> {
        let scenario = Scenario::from_ron_str(ron).unwrap();
        ScenarioRunner::new(
            &scenario,
            sample_catalog(),
            SimConfig::default(),
            RecordingSink::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_orders_fire_at_their_tick() {
        let mut runner = runner(
            r#"(
                name: "walk",
                entities: [(item: "rifleman", team: friend, position: (0, 0), label: Some("r"))],
                orders: [(tick: 10, action: Move(unit: "r", to: (300, 0)))],
            )"#,
        );

        let summary = runner.run(10);
        let id = runner.labels()["r"];
        assert_eq!(summary.orders_applied, 0);
        assert_eq!(
            runner.simulation().world().get(id).unwrap().position,
            point((0, 0))
        );

        let summary = runner.run(10);
        assert_eq!(summary.orders_applied, 1);
        assert_eq!(summary.ticks, 20);
        assert_eq!(summary.elapsed_ms, 1000);
        assert_eq!(
            runner.simulation().world().get(id).unwrap().position,
            point((30, 0))
        );
    }

    #[test]
    fn test_production_script_collects_and_labels() {
        let mut runner = runner(
            r#"(
                name: "expand",
                resources: { "credits": 300 },
                entities: [(item: "barracks", team: friend, position: (0, 0), label: Some("base"))],
                orders: [
                    (tick: 0, action: Select(building: "base")),
                    (tick: 0, action: Train(item: "power_plant")),
                    (tick: 100, action: Collect(building: "base", at: (0, 200), label: Some("plant"))),
                ],
            )"#,
        );

        runner.run(100);
        let base = runner.labels()["base"];
        assert!(matches!(
            runner.simulation().production(base).unwrap().phase,
            ProductionPhase::ReadyForCollection { .. }
        ));

        let summary = runner.run(1);
        assert_eq!(summary.orders_applied, 3);
        assert_eq!(summary.production_ready.len(), 1);
        assert_eq!(summary.resources["credits"], 200);
        assert_eq!(summary.survivors[&Team::Friend], 2);
        let plant = runner.labels()["plant"];
        assert_eq!(runner.simulation().world().get(plant).unwrap().name, "power_plant");
    }

    #[test]
    fn test_refused_orders_are_counted() {
        let mut runner = runner(
            r#"(
                name: "broke",
                resources: { "credits": 10 },
                entities: [(item: "barracks", team: friend, position: (0, 0), label: Some("base"))],
                orders: [
                    (tick: 0, action: Train(item: "rifleman")),
                    (tick: 0, action: Select(building: "base")),
                    (tick: 0, action: Train(item: "rifleman")),
                    (tick: 1, action: Stop(unit: "ghost")),
                ],
            )"#,
        );

        let summary = runner.run(5);
        assert_eq!(summary.orders_applied, 1);
        assert_eq!(summary.orders_rejected, 3);
        assert_eq!(runner.sink.statuses.len(), 2);
    }

    #[test]
    fn test_combat_summary() {
        let mut runner = runner(
            r#"(
                name: "duel",
                entities: [
                    (item: "tank", team: friend, position: (0, 0)),
                    (item: "rifleman", team: enemy, position: (100, 0)),
                ],
            )"#,
        );

        let summary = runner.run(200);
        assert_eq!(summary.deaths.len(), 1);
        assert_eq!(summary.survivors.get(&Team::Friend), Some(&1));
        assert_eq!(summary.survivors.get(&Team::Enemy), None);
    }
}
