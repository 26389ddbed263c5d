use crate::cell::{Cell, CellId, CellType};
use crate::clock::SimClock;
use crate::division::Partitioner;
use crate::genes::GeneLevels;
use crate::host::{HostEngine, Regulator, TransitionEvent, UpdateSummary};
use crate::state_machine::{advance_cell, Samplers};
use crate::variant::ModelVariant;
use anyhow::Result;
use log::{debug, info};
use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Drives one [`ModelVariant`] through the host entry points.
#[derive(Debug, Clone)]
pub struct DevelopmentRegulator {
    variant: ModelVariant,
    samplers: Samplers,
    partitioner: Partitioner,
    germination_draw: Uniform<f64>,
    seed: u64,
}

impl DevelopmentRegulator {
    /// Validates the variant and builds every distribution it needs.
    pub fn new(variant: ModelVariant, seed: u64) -> Result<Self> {
        variant.validate()?;
        let samplers = Samplers::new(&variant)?;
        let partitioner = Partitioner::new(&variant.division, &variant.growth)?;
        let jitter = variant.germination.jitter;
        let germination_draw = Uniform::new_inclusive(-jitter, jitter)?;
        info!(
            "Regulator ready: variant '{}', {} states, {} ticks/hour",
            variant.name,
            variant.states.len(),
            variant.ticks_per_hour
        );
        Ok(DevelopmentRegulator { variant, samplers, partitioner, germination_draw, seed })
    }

    pub fn variant(&self) -> &ModelVariant {
        &self.variant
    }

    /// A clock matching this variant's hour length.
    pub fn clock(&self) -> SimClock {
        SimClock::new(self.variant.ticks_per_hour)
    }

    /// Independent stream per (cell, tick).
    fn cell_rng(&self, id: CellId, tick: u64) -> StdRng {
        StdRng::seed_from_u64(stream_seed(self.seed, id, tick))
    }

    /// Updates a single cell against an already advanced clock.
    pub fn update_cell<R: Rng + ?Sized>(
        &self,
        cell: &mut Cell,
        clock: &SimClock,
        rng: &mut R,
    ) -> Option<(CellType, CellType)> {
        advance_cell(&self.variant, &self.samplers, cell, clock, rng)
    }
}

/// SplitMix64 finaliser.
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Folds (seed, id, tick) non-linearly so no two pairs share a stream
/// through a linear offset.
fn stream_seed(seed: u64, id: CellId, tick: u64) -> u64 {
    const GOLDEN: u64 = 0x9E37_79B9_7F4A_7C15;
    let h = mix64(seed.wrapping_add(GOLDEN));
    let h = mix64(h ^ id.wrapping_add(GOLDEN));
    mix64(h ^ tick.wrapping_add(GOLDEN))
}

impl Regulator for DevelopmentRegulator {
    fn configure<H: HostEngine>(&self, host: &mut H) {
        let wiring = &self.variant.host;
        host.set_max_cells(wiring.max_cells);
        host.set_growth_inhibition(wiring.growth_inhibition);
        host.register_species_rates(wiring.species);
        host.register_signal_rates(wiring.signal);
        host.add_cell(CellType::Germinating);
        host.set_save_interval(wiring.save_every_steps);
        debug!("Configured host for variant '{}'", self.variant.name);
    }

    fn init_cell<R: Rng + ?Sized>(&self, cell: &mut Cell, rng: &mut R) {
        cell.target_volume = self.variant.initial_target_volume;
        cell.growth_rate = self.samplers.draw_growth(rng);
        cell.parent_growth_rate = 0.0;
        cell.color = self.variant.initial_color;
        cell.rna = GeneLevels::zero();
        cell.protein = GeneLevels::zero();
        cell.germination_time = self.variant.germination.base_time + rng.sample(self.germination_draw);
        cell.conversion_probability = 0.0;
        cell.divide_flag = false;
    }

    fn update(&self, clock: &mut SimClock, cells: &mut BTreeMap<CellId, Cell>) -> UpdateSummary {
        let tick = clock.advance();
        let now = *clock;

        let transitions: Vec<TransitionEvent> = cells
            .par_iter_mut()
            .filter_map(|(&id, cell)| {
                let mut rng = self.cell_rng(id, tick);
                self.update_cell(cell, &now, &mut rng)
                    .map(|(from, to)| TransitionEvent { id, from, to })
            })
            .collect();
        let flagged = cells.values().filter(|c| c.divide_flag).count();

        UpdateSummary { tick, transitions, flagged }
    }

    fn divide<R: Rng + ?Sized>(&self, parent: &Cell, d1: &mut Cell, d2: &mut Cell, rng: &mut R) {
        self.partitioner.partition(parent, d1, d2, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostSetup;
    use crate::variant::VariantName;

    #[test]
    fn configure_requests_one_germinating_cell() {
        let regulator = DevelopmentRegulator::new(ModelVariant::washout(), 1).unwrap();
        let mut host = HostSetup::default();
        regulator.configure(&mut host);
        assert_eq!(host.seed_cells, vec![CellType::Germinating]);
        assert_eq!(host.max_cells, 1 << 15);
        assert_eq!(host.growth_inhibition, 2000.0);
        assert_eq!(host.save_every_steps, 10);
        assert_eq!(host.species_rates.production, 20.0);
    }

    #[test]
    fn init_cell_fills_every_field() {
        let regulator = DevelopmentRegulator::new(ModelVariant::classic(), 1).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let mut cell = Cell { germination_time: -1.0, ..Cell::default() };
            regulator.init_cell(&mut cell, &mut rng);
            assert_eq!(cell.target_volume, 2.0);
            assert!((0.95..=1.05).contains(&cell.growth_rate));
            assert!((80.0..=160.0).contains(&cell.germination_time));
            assert_eq!(cell.color, [2.0, 0.5, 1.5]);
            assert_eq!(cell.parent_growth_rate, 0.0);
        }
    }

    #[test]
    fn stream_seeds_do_not_alias_along_offsets() {
        // 0x1F3A * 3247 == 0x58C7 * 1142: these collide under an additive mix.
        assert_ne!(stream_seed(42, 10, 2000), stream_seed(42, 10 + 3247, 2000 - 1142));
        assert_ne!(stream_seed(0, 1, 0), stream_seed(0, 0, 1));
        assert_eq!(stream_seed(7, 3, 9), stream_seed(7, 3, 9));

        let mut seen = std::collections::HashSet::new();
        for id in 0..200u64 {
            for tick in 0..200u64 {
                assert!(seen.insert(stream_seed(42, id, tick)), "id {} tick {}", id, tick);
            }
        }
    }

    #[test]
    fn update_is_deterministic_for_a_seed() {
        let regulator = DevelopmentRegulator::new(ModelVariant::preset(VariantName::Reporter), 42).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut cells = BTreeMap::new();
        for id in 0..8u64 {
            let mut cell = Cell::default();
            regulator.init_cell(&mut cell, &mut rng);
            cell.germination_time = 5.0;
            cells.insert(id, cell);
        }
        let mut twin = cells.clone();
        let (mut a, mut b) = (regulator.clock(), regulator.clock());
        for _ in 0..200 {
            regulator.update(&mut a, &mut cells);
        }
        for _ in 0..200 {
            regulator.update(&mut b, &mut twin);
        }
        assert_eq!(cells, twin);
        assert_eq!(a.tick(), 200);
    }
}
