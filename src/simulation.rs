use crate::cpu_state::CpuState;
use anyhow::Result;
use devcycle_common::{
    Cell, CellId, DevelopmentRegulator, HostSetup, ModelVariant, Regulator, SimClock, SimParams,
    SimulationConfig, Snapshot,
};
use log::{debug, info, warn};
use rand::prelude::*;
use rayon::prelude::*;

/// Reference host: trivial growth and species kinetics around the
/// developmental regulator.
pub struct CpuSimulation {
    /// The simulation configuration.
    pub config: SimulationConfig,
    /// Live cells and their host-side species.
    pub state: CpuState,
    /// Host-side RNG for cell initialisation and serial division.
    pub rng: StdRng,
    regulator: DevelopmentRegulator,
    /// What the regulator asked for during `configure`.
    setup: HostSetup,
    clock: SimClock,
    transitions_since_record: u32,
    divisions_since_record: u32,
    capacity_warned: bool,
    recorded_snapshots: Vec<Snapshot>,
}

impl CpuSimulation {
    /// Resolves the configured model and seeds the initial population.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let variant = config.resolve_model()?;
        Self::with_variant(config, variant)
    }

    pub fn with_variant(config: SimulationConfig, variant: ModelVariant) -> Result<Self> {
        let seed = config.initial_conditions.seed;
        let regulator = DevelopmentRegulator::new(variant, seed)?;

        let mut setup = HostSetup::default();
        regulator.configure(&mut setup);
        let params = config.get_sim_params(regulator.variant(), &setup);
        info!(
            "Host configured: max_cells={}, growth inhibition={}, save every {} steps",
            params.max_cells, setup.growth_inhibition, setup.save_every_steps
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let mut state = CpuState::new(params);

        // Cells the model asked for, topped up to the configured count.
        let requested = setup.seed_cells.len().max(config.initial_conditions.num_cells_initial as usize);
        let mut cell_types = setup.seed_cells.clone();
        cell_types.resize(requested, devcycle_common::CellType::Germinating);
        for cell_type in cell_types {
            let mut cell = Cell { volume: state.params.initial_volume, ..Cell::of_type(cell_type) };
            regulator.init_cell(&mut cell, &mut rng);
            state.spawn(cell, 0.0);
        }

        Ok(Self {
            config,
            state,
            rng,
            clock: regulator.clock(),
            regulator,
            setup,
            transitions_since_record: 0,
            divisions_since_record: 0,
            capacity_warned: false,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the simulation by one tick.
    pub fn step(&mut self) -> Result<()> {
        // --- 1. Grow (Parallel) ---
        let growth_per_tick = self.state.params.growth_per_tick;
        self.state
            .cells
            .par_iter_mut()
            .for_each(|(_, cell)| cell.volume *= 1.0 + cell.growth_rate * growth_per_tick);

        // --- 2. Species and signal ---
        self.integrate_species();

        // --- 3. Developmental update ---
        let summary = self.regulator.update(&mut self.clock, &mut self.state.cells);
        self.transitions_since_record += summary.transitions.len() as u32;
        if summary.flagged > 0 {
            debug!("Tick {}: {} cells flagged for division", summary.tick, summary.flagged);
        }

        // --- 4. Division (Serial) ---
        self.handle_division()?;
        Ok(())
    }

    fn integrate_species(&mut self) {
        let dt = self.state.params.dt_hours;
        let species_rates = self.setup.species_rates;
        self.state
            .species
            .par_iter_mut()
            .for_each(|(_, x)| *x += species_rates.rate(*x) * dt);
        self.state.signal += self.setup.signal_rates.rate(self.state.signal) * dt;
    }

    /// Divides flagged cells in id order while the population is below the cap.
    fn handle_division(&mut self) -> Result<()> {
        let parent_ids = self.state.flagged_ids();
        if parent_ids.is_empty() {
            return Ok(());
        }

        let mut divided = 0u32;
        for parent_id in parent_ids {
            if !self.state.has_capacity() {
                if !self.capacity_warned {
                    warn!(
                        "Population reached max_cells ({}); further divisions are suppressed.",
                        self.state.params.max_cells
                    );
                    self.capacity_warned = true;
                }
                break;
            }
            let Some((parent, species)) = self.state.remove(parent_id) else {
                continue;
            };
            let half = parent.volume / 2.0;
            let mut d1 = Cell { volume: half, ..Cell::default() };
            let mut d2 = Cell { volume: half, ..Cell::default() };
            self.regulator.divide(&parent, &mut d1, &mut d2, &mut self.rng);
            self.state.spawn(d1, species);
            self.state.spawn(d2, species);
            divided += 1;
        }

        self.divisions_since_record += divided;
        debug!("Divided {} cells, population now {}", divided, self.state.num_cells());
        Ok(())
    }

    pub fn current_cell_count(&self) -> usize {
        self.state.num_cells()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellId, &Cell)> + '_ {
        self.state.cells.iter()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn params(&self) -> &SimParams {
        &self.state.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn regulator(&self) -> &DevelopmentRegulator {
        &self.regulator
    }

    /// Summarises the population into a Snapshot. Called at record intervals.
    pub fn record_snapshot(&mut self) -> Result<()> {
        let mut snapshot = Snapshot::from_cells(
            self.clock.tick(),
            self.clock.hours(),
            &self.state.cells,
            self.config.output.record_cells_in_snapshot,
        );
        snapshot.transitions_since_last = self.transitions_since_record;
        snapshot.divisions_since_last = self.divisions_since_record;
        snapshot.signal_level = self.state.signal;
        self.transitions_since_record = 0;
        self.divisions_since_record = 0;

        debug!(
            "Recording snapshot at tick {} ({:.1} h): {:?}",
            snapshot.tick, snapshot.hours, snapshot.cell_type_counts
        );
        self.recorded_snapshots.push(snapshot);
        Ok(())
    }

    /// Provides access to the recorded snapshots.
    pub fn get_recorded_snapshots(&self) -> &Vec<Snapshot> {
        &self.recorded_snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devcycle_common::{CellType, VariantName};

    fn config(max_cells: Option<usize>) -> SimulationConfig {
        let text = format!(
            r#"
[timing]
total_steps = 600

[initial_conditions]
seed = 11

[model]
variant = "reporter"

[host]
growth_per_tick = 0.02
{}

[output]
base_filename = "test"
save_stats = false
save_cells = false
"#,
            max_cells.map(|m| format!("max_cells = {}", m)).unwrap_or_default()
        );
        SimulationConfig::from_toml_str(&text).unwrap()
    }

    #[test]
    fn starts_with_one_germinating_cell() {
        let sim = CpuSimulation::new(config(None)).unwrap();
        assert_eq!(sim.current_cell_count(), 1);
        let (_, cell) = sim.cells().next().unwrap();
        assert_eq!(cell.cell_type, CellType::Germinating);
        assert_eq!(cell.volume, 1.0);
        assert!((80.0..=120.0).contains(&cell.germination_time));
        assert_eq!(sim.params().record_interval_steps, 10);
        assert_eq!(sim.regulator().variant().name, VariantName::Reporter.as_str());
    }

    #[test]
    fn population_grows_and_respects_cap() {
        let mut sim = CpuSimulation::new(config(Some(6))).unwrap();
        for _ in 0..600 {
            sim.step().unwrap();
            assert!(sim.current_cell_count() <= 6);
        }
        assert_eq!(sim.clock().tick(), 600);
        assert_eq!(sim.current_cell_count(), 6);
        assert!(sim.cells().all(|(_, c)| c.cell_type != CellType::Germinating));
    }

    #[test]
    fn snapshots_reset_counters() {
        let mut sim = CpuSimulation::new(config(None)).unwrap();
        sim.record_snapshot().unwrap();
        for _ in 0..200 {
            sim.step().unwrap();
        }
        sim.record_snapshot().unwrap();
        sim.record_snapshot().unwrap();

        let snaps = sim.get_recorded_snapshots();
        assert_eq!(snaps.len(), 3);
        assert_eq!(snaps[0].tick, 0);
        assert_eq!(snaps[0].count(CellType::Germinating), 1);
        assert!(snaps[1].transitions_since_last >= 1);
        assert_eq!(snaps[2].transitions_since_last, 0);
        assert_eq!(snaps[2].divisions_since_last, 0);
        assert!((snaps[1].signal_level - 20.0).abs() < 1e-9);
    }
}
