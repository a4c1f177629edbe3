//! Read-only lookup table of item definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::item_data::{ItemCategory, ItemDefinition};
use crate::error::{GameError, Result};
use crate::math::Fixed;

/// On-disk shape of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    items: Vec<ItemDefinition>,
}

/// Problems found by [`ItemCatalog::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogIssue {
    /// A unit item has no `unit` stats block.
    #[error("unit '{0}' has no unit profile")]
    MissingUnitProfile(String),

    /// An economic building has no `generator` block.
    #[error("economic building '{0}' has no generator")]
    MissingGenerator(String),

    /// Width or height is zero or negative.
    #[error("item '{0}' has a non-positive size")]
    NonPositiveSize(String),

    /// Health is zero or negative.
    #[error("item '{0}' has non-positive health")]
    NonPositiveHealth(String),

    /// A `produces` entry names an item that does not exist.
    #[error("building '{building}' produces unknown item '{item}'")]
    UnknownProduct {
        /// The producing building.
        building: String,
        /// The missing item.
        item: String,
    },

    /// Build time too long to count down in milliseconds.
    #[error("item '{0}' has a build time out of range")]
    BuildTimeOutOfRange(String),

    /// A non-production item lists products.
    #[error("item '{0}' lists products but is not a production building")]
    UnexpectedProducts(String),
}

/// Registry of all unit and building definitions, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCatalog {
    items: BTreeMap<String, ItemDefinition>,
}

impl ItemCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON (`{ "items": [ ... ] }`).
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(text).map_err(|e| GameError::CatalogParse(e.to_string()))?;
        Ok(Self::from_items(file.items))
    }

    /// Parse a catalog from RON (`(items: [ ... ])`).
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let file: CatalogFile =
            ron::from_str(text).map_err(|e| GameError::CatalogParse(e.to_string()))?;
        Ok(Self::from_items(file.items))
    }

    /// Build a catalog from definitions; later duplicates win.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = ItemDefinition>) -> Self {
        let mut catalog = Self::new();
        for item in items {
            catalog.register(item);
        }
        catalog
    }

    /// Register (or replace) a definition.
    pub fn register(&mut self, item: ItemDefinition) {
        self.items.insert(item.name.clone(), item);
    }

    /// Look up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ItemDefinition> {
        self.items.get(name)
    }

    /// Check whether a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    /// Report every inconsistency in the catalog.
    #[must_use]
    pub fn validate(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        for item in self.items.values() {
            if item.width <= Fixed::ZERO || item.height <= Fixed::ZERO {
                issues.push(CatalogIssue::NonPositiveSize(item.name.clone()));
            }
            if item.health <= Fixed::ZERO {
                issues.push(CatalogIssue::NonPositiveHealth(item.name.clone()));
            }
            if !item.build_time_in_range() {
                issues.push(CatalogIssue::BuildTimeOutOfRange(item.name.clone()));
            }

            match item.category {
                ItemCategory::Unit if item.unit.is_none() => {
                    issues.push(CatalogIssue::MissingUnitProfile(item.name.clone()));
                }
                ItemCategory::Economic if item.generator.is_none() => {
                    issues.push(CatalogIssue::MissingGenerator(item.name.clone()));
                }
                _ => {}
            }

            if item.category != ItemCategory::Production && !item.produces.is_empty() {
                issues.push(CatalogIssue::UnexpectedProducts(item.name.clone()));
            }

            for product in &item.produces {
                if !self.contains(product) {
                    issues.push(CatalogIssue::UnknownProduct {
                        building: item.name.clone(),
                        item: product.clone(),
                    });
                }
            }
        }

        issues
    }
}
