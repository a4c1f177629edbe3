//! Error type for loading and running headless scenarios.

use std::path::PathBuf;

use skirmish_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Errors raised while preparing or running a scenario.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Failed to read an input file.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a scenario.
    #[error("Failed to parse scenario: {0}")]
    ScenarioParse(#[from] ron::error::SpannedError),

    /// The simulation rejected the setup (unknown items, bad catalog).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A scenario refers to a label no entity carries.
    #[error("Unknown entity label: {0}")]
    UnknownLabel(String),

    /// Two entities in a scenario share a label.
    #[error("Duplicate entity label: {0}")]
    DuplicateLabel(String),

    /// Failed to encode output.
    #[error("Failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}
