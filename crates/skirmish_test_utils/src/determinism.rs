//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and scripted scenarios depend on the simulation being fully
//! deterministic. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`skirmish_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entities live in a `BTreeMap` and are always visited in id order.
//!
//! - **Wall clock**: The simulation only knows the time it has been
//!   advanced by, never the host's clock.

use std::thread;

use skirmish_core::interface::NullSink;
use skirmish_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use skirmish_core::interface::NullSink;
/// use skirmish_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || setup_duel(),
///     |sim| { sim.tick(&mut NullSink); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(
            "{} runs of {} ticks disagree: hashes {:?}",
            runs,
            ticks,
            hashes
        );
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run `ticks` ticks of a fresh simulation and return its final hash.
pub fn run_and_hash(sim: &mut Simulation, ticks: u64) -> u64 {
    for _ in 0..ticks {
        sim.tick(&mut NullSink);
    }
    let hash = sim.state_hash();
    tracing::debug!("Hash after {} ticks: {:#018x}", sim.get_tick(), hash);
    hash
}

/// Simplified determinism verification for [`Simulation`].
///
/// Runs the simulation twice with identical setup and reports whether
/// the final state hashes match exactly.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        |sim| {
            sim.tick(&mut NullSink);
        },
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run N simulations on scoped threads and collect their final hashes.
///
/// Every run must agree regardless of which thread it ran on.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| s.spawn(|| run_and_hash(&mut setup_fn(), num_ticks)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// Useful for debugging non-determinism by finding exactly when
/// simulations start to differ.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        tracing::warn!("Simulations differ before the first tick");
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick(&mut NullSink);
        sim2.tick(&mut NullSink);

        let (hash1, hash2) = (sim1.state_hash(), sim2.state_hash());
        if hash1 != hash2 {
            tracing::warn!(
                "Simulations diverged at tick {}: {:#018x} vs {:#018x}",
                tick,
                hash1,
                hash2
            );
            return Some(tick);
        }
    }

    None
}

/// Check that a snapshot taken mid-run continues exactly like the original.
///
/// Runs `warmup` ticks, clones the simulation, then advances both copies
/// by `num_ticks` and compares hashes.
pub fn verify_snapshot_determinism<F>(setup_fn: F, warmup: u64, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut original = setup_fn();
    run_and_hash(&mut original, warmup);

    let mut snapshot = original.clone();
    run_and_hash(&mut original, num_ticks) == run_and_hash(&mut snapshot, num_ticks)
}
