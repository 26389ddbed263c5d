//! Per-cell tick logic: run the program of the cell's state, test its
//! transition, and cascade into the next state within the same tick.

use crate::cell::{Cell, CellType};
use crate::clock::SimClock;
use crate::gate::TransitionGate;
use crate::integrator::integrate;
use crate::kinetics::rate_table;
use crate::variant::{GrowthParams, GrowthSource, ModelVariant, StateProgram, Transition};
use anyhow::Result;
use log::{debug, trace};
use rand::distr::Uniform;
use rand::Rng;

/// Distributions shared by every cell, built once.
#[derive(Debug, Clone)]
pub struct Samplers {
    pub gate: TransitionGate,
    growth_redraw: Uniform<f64>,
    growth_baseline: f64,
}

impl Samplers {
    pub fn new(variant: &ModelVariant) -> Result<Self> {
        let gate = TransitionGate::new(variant.gate)?;
        let GrowthParams { baseline, jitter, .. } = variant.growth;
        let growth_redraw = Uniform::new_inclusive(-jitter, jitter)?;
        Ok(Samplers { gate, growth_redraw, growth_baseline: baseline })
    }

    /// Baseline growth plus uniform jitter.
    pub fn draw_growth<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.growth_baseline + rng.sample(self.growth_redraw)
    }
}

impl StateProgram {
    fn growth_factor(&self, cell: &Cell) -> f64 {
        match self.growth_source {
            GrowthSource::Live => cell.growth_rate,
            GrowthSource::Frozen => cell.parent_growth_rate,
        }
    }

    /// Rate lookup, integration, clearing, pins and colour.
    fn express(&self, cell: &mut Cell, clock: &SimClock) {
        // Conditions read the levels at the start of the program.
        let start = cell.protein;
        let growth_factor = self.growth_factor(cell);
        integrate(cell, &self.kinetics, rate_table(&self.kinetics, &start, clock), growth_factor);
        for &gene in &self.cleared_proteins {
            cell.protein[gene] = 0.0;
        }
        for pin in &self.pins {
            if clock.hours() < pin.before_hour {
                cell.protein[pin.gene] = pin.level;
            }
        }
        if let Some(rule) = &self.color {
            cell.color = rule.paint(&cell.protein);
        }
    }

    /// One tick of this state. Returns the state the cell moved to, if any.
    pub fn run<R: Rng + ?Sized>(
        &self,
        cell: &mut Cell,
        clock: &SimClock,
        samplers: &Samplers,
        rng: &mut R,
    ) -> Option<CellType> {
        if self.suppresses_division {
            cell.divide_flag = false;
        }
        self.express(cell, clock);
        if self.halts_growth {
            cell.growth_rate = 0.0;
        }

        let next = match self.transition? {
            Transition::Germination { to } => {
                if clock.elapsed() < cell.germination_time {
                    return None;
                }
                cell.growth_rate = samplers.draw_growth(rng);
                cell.parent_growth_rate = cell.growth_rate;
                to
            }
            Transition::Stochastic { to, commit_step } => {
                if !samplers.gate.trial(clock, cell.conversion_probability, rng) {
                    return None;
                }
                if commit_step {
                    self.express(cell, clock);
                }
                to
            }
            Transition::Threshold { gene, comparison, level, to } => {
                if !comparison.holds(cell.protein[gene], level) {
                    return None;
                }
                to
            }
        };
        cell.cell_type = next;
        Some(next)
    }
}

/// Full per-cell update for one tick. Returns `(from, to)` when the cell
/// ended the tick in a different state than it started.
pub fn advance_cell<R: Rng + ?Sized>(
    variant: &ModelVariant,
    samplers: &Samplers,
    cell: &mut Cell,
    clock: &SimClock,
    rng: &mut R,
) -> Option<(CellType, CellType)> {
    if clock.elapsed() >= cell.germination_time {
        cell.conversion_probability = samplers.gate.probability(clock, cell.growth_rate);
    }
    if cell.volume > cell.target_volume {
        cell.divide_flag = true;
    }

    let start = cell.cell_type;
    // Transitions only move forward, so the cascade is bounded by the number of states.
    for _ in 0..CellType::ALL.len() {
        let current = cell.cell_type;
        let Some(program) = variant.program(current) else {
            trace!("No program for {} in variant '{}'", current, variant.name);
            break;
        };
        match program.run(cell, clock, samplers, rng) {
            Some(next) if next > current => {
                debug!("Tick {}: {} -> {}", clock.tick(), current, next);
            }
            _ => break,
        }
    }

    (cell.cell_type != start).then_some((start, cell.cell_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::LogisticCurve;
    use crate::genes::Gene;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn replicating(variant: &ModelVariant) -> Cell {
        Cell {
            cell_type: CellType::ReplicatingPermissive,
            volume: 1.0,
            target_volume: variant.division.replicating_target_volume,
            growth_rate: 1.0,
            parent_growth_rate: 1.0,
            germination_time: 0.0,
            ..Cell::default()
        }
    }

    #[test]
    fn divide_flag_only_above_target() {
        let variant = ModelVariant::classic();
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let clock = SimClock::at(5, 10);

        let mut cell = replicating(&variant);
        cell.volume = 2.0;
        advance_cell(&variant, &samplers, &mut cell, &clock, &mut rng);
        assert!(!cell.divide_flag);

        cell.volume = 2.0001;
        advance_cell(&variant, &samplers, &mut cell, &clock, &mut rng);
        assert!(cell.divide_flag);
        assert!(cell.growth_rate > 0.0);
    }

    #[test]
    fn germinating_cells_never_request_division() {
        let variant = ModelVariant::reporter();
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut cell = Cell { volume: 50.0, target_volume: 2.0, germination_time: 1e9, ..Cell::default() };
        advance_cell(&variant, &samplers, &mut cell, &SimClock::at(10, 10), &mut rng);
        assert!(!cell.divide_flag);
        assert_eq!(cell.growth_rate, 0.0);
        assert_eq!(cell.cell_type, CellType::Germinating);
    }

    #[test]
    fn permissive_state_clears_late_proteins() {
        let variant = ModelVariant::reporter();
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let mut cell = replicating(&variant);
        cell.protein[Gene::HctA] = 3.0;
        cell.protein[Gene::Ectopic] = 1.0;
        advance_cell(&variant, &samplers, &mut cell, &SimClock::at(1, 10), &mut rng);
        assert_eq!(cell.protein[Gene::HctA], 0.0);
        assert_eq!(cell.protein[Gene::Ectopic], 0.0);
        assert!(cell.protein[Gene::Euo] > 0.0);
        assert!((cell.color[0] - 1.0 / cell.protein[Gene::Euo]).abs() < 1e-12);
    }

    #[test]
    fn successful_trial_runs_the_committing_step() {
        let mut variant = ModelVariant::classic();
        variant.gate = LogisticCurve { amplitude: 0.0, midpoint: 0.0, steepness: 0.0, floor: 100.0, scale_by_growth: true };
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let clock = SimClock::at(10, 10);

        let mut committed = replicating(&variant);
        advance_cell(&variant, &samplers, &mut committed, &clock, &mut rng);
        assert_eq!(committed.cell_type, CellType::ReplicatingCommitted);

        // Permissive kinetics twice, then the committed program once.
        let mut expected = replicating(&variant);
        let permissive = variant.program(CellType::ReplicatingPermissive).unwrap();
        for _ in 0..3 {
            permissive.express(&mut expected, &clock);
        }
        assert_eq!(committed.rna[Gene::Euo], expected.rna[Gene::Euo]);
        assert_eq!(committed.protein[Gene::Euo], expected.protein[Gene::Euo]);
    }

    #[test]
    fn threshold_crossing_cascades_into_next_program() {
        let variant = ModelVariant::classic();
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut cell = Cell {
            cell_type: CellType::IntermediateEarly,
            target_volume: 10.0,
            parent_growth_rate: 1.0,
            ..Cell::default()
        };
        cell.protein[Gene::HctA] = 10.0;
        let change = advance_cell(&variant, &samplers, &mut cell, &SimClock::at(7, 10), &mut rng);
        assert_eq!(change, Some((CellType::IntermediateEarly, CellType::IntermediateLate)));
        // IntermediateLate ran too: HctB RNA produced this tick.
        assert!(cell.rna[Gene::HctB] > 0.0);
    }

    #[test]
    fn infectious_is_terminal() {
        let variant = ModelVariant::classic();
        let samplers = Samplers::new(&variant).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let mut cell = Cell { cell_type: CellType::Infectious, parent_growth_rate: 1.0, ..Cell::default() };
        for tick in 1..=50 {
            assert!(advance_cell(&variant, &samplers, &mut cell, &SimClock::at(tick, 10), &mut rng).is_none());
        }
        assert_eq!(cell.color, [2.0, 0.0, 0.5]);
        assert!(cell.protein[Gene::HctB] > 0.0);
    }
}
