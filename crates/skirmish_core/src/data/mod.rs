//! Data structures for the item catalog.
//!
//! Pure data types describing every unit and building the game knows
//! about. Parsing works on strings only; reading files is left to the
//! host (see `skirmish_headless`).

mod catalog;
mod item_data;

pub use catalog::{CatalogIssue, ItemCatalog};
pub use item_data::{GeneratorProfile, ItemCategory, ItemDefinition, UnitProfile};
