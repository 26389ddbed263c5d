//! Contract between the differentiation core and a host simulation engine.

use crate::cell::{Cell, CellId, CellType};
use crate::clock::SimClock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Production/decay pair for a host-solved species or signal:
/// `rate = production − decay·x`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReactionRates {
    pub production: f64,
    pub decay: f64,
}

impl ReactionRates {
    pub const fn new(production: f64, decay: f64) -> Self {
        ReactionRates { production, decay }
    }

    pub fn rate(&self, level: f64) -> f64 {
        self.production - self.decay * level
    }

    /// Rate expression for an external kinetics solver. Reads
    /// `input[index]` and writes `rates[index]`.
    pub fn source(&self, input: &str, index: usize) -> String {
        format!(
            "const float k{i} = {k:?}f;\nconst float d{i} = {d:?}f;\nfloat x{i} = {input}[{i}];\nrates[{i}] = k{i} - d{i}*x{i};\n",
            i = index,
            k = self.production,
            d = self.decay,
            input = input,
        )
    }
}

/// Services a host exposes to the core during `configure`.
pub trait HostEngine {
    fn set_max_cells(&mut self, max_cells: usize);
    /// Neighbour growth-inhibition strength for the host biophysics.
    fn set_growth_inhibition(&mut self, gamma: f64);
    /// Checkpoint cadence in steps. Set once, never read back by the core.
    fn set_save_interval(&mut self, steps: u32);
    fn register_species_rates(&mut self, rates: ReactionRates);
    fn register_signal_rates(&mut self, rates: ReactionRates);
    /// Requests a new cell; the host calls `init_cell` on it before the
    /// first `update`.
    fn add_cell(&mut self, cell_type: CellType);
}

/// A state change observed during `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub id: CellId,
    pub from: CellType,
    pub to: CellType,
}

/// What happened during one `update` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    pub tick: u64,
    pub transitions: Vec<TransitionEvent>,
    /// Cells carrying `divide_flag` after the update.
    pub flagged: usize,
}

/// The four entry points a host drives.
pub trait Regulator: Sync {
    fn configure<H: HostEngine>(&self, host: &mut H);

    /// Populates every attribute of a freshly created cell.
    fn init_cell<R: Rng + ?Sized>(&self, cell: &mut Cell, rng: &mut R);

    /// Advances `clock` once, then updates every live cell.
    fn update(&self, clock: &mut SimClock, cells: &mut BTreeMap<CellId, Cell>) -> UpdateSummary;

    /// Fills two host-created daughters from `parent`.
    fn divide<R: Rng + ?Sized>(&self, parent: &Cell, d1: &mut Cell, d2: &mut Cell, rng: &mut R);
}

/// Records everything a regulator asks for during `configure`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSetup {
    pub max_cells: usize,
    pub growth_inhibition: f64,
    pub save_every_steps: u32,
    pub species_rates: ReactionRates,
    pub signal_rates: ReactionRates,
    pub seed_cells: Vec<CellType>,
}

impl HostEngine for HostSetup {
    fn set_max_cells(&mut self, max_cells: usize) {
        self.max_cells = max_cells;
    }

    fn set_growth_inhibition(&mut self, gamma: f64) {
        self.growth_inhibition = gamma;
    }

    fn set_save_interval(&mut self, steps: u32) {
        self.save_every_steps = steps;
    }

    fn register_species_rates(&mut self, rates: ReactionRates) {
        self.species_rates = rates;
    }

    fn register_signal_rates(&mut self, rates: ReactionRates) {
        self.signal_rates = rates;
    }

    fn add_cell(&mut self, cell_type: CellType) {
        self.seed_cells.push(cell_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn species_source_matches_rate() {
        let rates = ReactionRates::new(0.0, 0.3);
        let src = rates.source("species", 0);
        assert!(src.contains("const float k0 = 0.0f;"));
        assert!(src.contains("const float d0 = 0.3f;"));
        assert!(src.contains("float x0 = species[0];"));
        assert!(src.contains("rates[0] = k0 - d0*x0;"));
        assert!((rates.rate(2.0) + 0.6).abs() < 1e-12);
    }

    #[test]
    fn constant_signal_rate() {
        let rates = ReactionRates::new(1.0, 0.0);
        assert_eq!(rates.rate(123.0), 1.0);
        assert!(rates.source("signals", 1).contains("float x1 = signals[1];"));
    }
}
