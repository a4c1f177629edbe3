//! Headless scenario runner for scripted skirmishes and CI verification.
//!
//! This crate drives the simulation core without any presentation layer:
//!
//! - **Scenarios**: RON files with starting entities and scripted orders
//! - **Catalogs**: JSON or RON item catalogs, validated before use
//! - **Summaries**: a JSON [`RunSummary`] on stdout, logs on stderr
//!
//! # Example
//!
//! ```bash
//! cargo run -p skirmish_headless -- run \
//!     --catalog data/catalog.json --scenario data/scenarios/duel.ron --ticks 600
//!
//! cargo run -p skirmish_headless -- validate --catalog data/catalog.json
//! ```

pub mod error;
pub mod runner;
pub mod scenario;
pub mod sink;

pub use error::{HeadlessError, Result};
pub use runner::{RunSummary, ScenarioRunner};
pub use scenario::{load_catalog, load_config, Scenario, ScriptedAction, ScriptedOrder};
pub use sink::TracingSink;
