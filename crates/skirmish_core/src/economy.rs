//! Resource pool and passive resource generation.
//!
//! The pool is the single owner of the player's balances. Every change
//! goes through [`ResourcePool::deduct`] or [`ResourcePool::earn`]; the
//! simulation mirrors each change to the UI via
//! [`UiSink::update_resource_count`](crate::interface::UiSink::update_resource_count).
//!
//! All calculations use integer math for deterministic simulation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Price or payout expressed per resource (`"credits" -> 200`).
///
/// An empty cost is free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(pub BTreeMap<String, u32>);

impl Cost {
    /// Create an empty (free) cost.
    #[must_use]
    pub fn free() -> Self {
        Self::default()
    }

    /// Builder: add an amount of one resource.
    #[must_use]
    pub fn with(mut self, resource: impl Into<String>, amount: u32) -> Self {
        self.0.insert(resource.into(), amount);
        self
    }

    /// Iterate over `(resource, amount)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }

    /// Check if nothing is charged.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.0.values().all(|amount| *amount == 0)
    }

    /// Scale every amount by `numerator / denominator`, rounding down.
    #[must_use]
    pub fn prorate(&self, numerator: u64, denominator: u64) -> Self {
        if denominator == 0 {
            return self.clone();
        }
        let scaled = self
            .0
            .iter()
            .map(|(name, amount)| {
                let value = u64::from(*amount) * numerator.min(denominator) / denominator;
                (name.clone(), u32::try_from(value).unwrap_or(u32::MAX))
            })
            .collect();
        Self(scaled)
    }
}

/// The player's resource balances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    balances: BTreeMap<String, u32>,
}

impl ResourcePool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start with a balance of one resource.
    #[must_use]
    pub fn with(mut self, resource: impl Into<String>, amount: u32) -> Self {
        self.balances.insert(resource.into(), amount);
        self
    }

    /// Current balance, or `None` if the resource is unknown to the pool.
    #[must_use]
    pub fn balance(&self, resource: &str) -> Option<u32> {
        self.balances.get(resource).copied()
    }

    /// Iterate over every `(resource, balance)` pair in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.balances
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
    }

    /// Check if the pool can cover `cost`.
    ///
    /// Every listed resource must exist in the pool with a balance at
    /// least as large as the amount asked for.
    #[must_use]
    pub fn is_affordable(&self, cost: &Cost) -> bool {
        cost.iter().all(|(resource, amount)| {
            self.balances
                .get(resource)
                .is_some_and(|balance| *balance >= amount)
        })
    }

    /// Subtract `cost` from the pool.
    ///
    /// Does not re-check affordability; callers pair it with
    /// [`is_affordable`](Self::is_affordable). Balances saturate at zero.
    pub fn deduct(&mut self, cost: &Cost) {
        for (resource, amount) in cost.iter() {
            let balance = self.balances.entry(resource.to_string()).or_insert(0);
            *balance = balance.saturating_sub(amount);
        }
    }

    /// Add `income` to the pool, creating resources as needed.
    pub fn earn(&mut self, income: &Cost) {
        for (resource, amount) in income.iter() {
            let balance = self.balances.entry(resource.to_string()).or_insert(0);
            *balance = balance.saturating_add(amount);
        }
    }

    /// Check affordability and deduct in one step.
    ///
    /// Returns `true` if the transaction succeeded; the pool is untouched
    /// otherwise.
    pub fn try_spend(&mut self, cost: &Cost) -> bool {
        if self.is_affordable(cost) {
            self.deduct(cost);
            true
        } else {
            false
        }
    }
}

/// Passive income state of an economic building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Generator {
    /// Resource produced.
    pub resource: String,
    /// Amount produced per generation interval.
    pub rate: u32,
    /// Simulation time of the last payout.
    pub last_produced_at_ms: u64,
}

impl Generator {
    /// Create a generator whose first interval starts at `now_ms`.
    #[must_use]
    pub fn new(resource: impl Into<String>, rate: u32, now_ms: u64) -> Self {
        Self {
            resource: resource.into(),
            rate,
            last_produced_at_ms: now_ms,
        }
    }

    /// Collect income for every whole interval elapsed since the last payout.
    ///
    /// Returns `None` when no interval has completed yet. Partial
    /// intervals carry over to the next call.
    pub fn collect(&mut self, now_ms: u64, interval_ms: u64) -> Option<Cost> {
        if interval_ms == 0 || now_ms < self.last_produced_at_ms {
            return None;
        }
        let intervals = (now_ms - self.last_produced_at_ms) / interval_ms;
        if intervals == 0 {
            return None;
        }
        self.last_produced_at_ms += intervals * interval_ms;
        let amount = u64::from(self.rate).saturating_mul(intervals);
        Some(Cost::free().with(
            self.resource.clone(),
            u32::try_from(amount).unwrap_or(u32::MAX),
        ))
    }
}
