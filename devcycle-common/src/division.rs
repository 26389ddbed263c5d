//! Splits a dividing parent into two daughters.

use crate::cell::{Cell, CellType};
use crate::genes::Gene;
use crate::variant::{DivisionParams, GrowthParams};
use anyhow::Result;
use log::trace;
use rand::Rng;
use rand_distr::Normal;

#[derive(Debug, Clone)]
pub struct Partitioner {
    params: DivisionParams,
    noise: Normal<f64>,
}

impl Partitioner {
    pub fn new(params: &DivisionParams, growth: &GrowthParams) -> Result<Self> {
        let noise = Normal::new(1.0, growth.division_sd)?;
        Ok(Partitioner { params: params.clone(), noise })
    }

    pub fn params(&self) -> &DivisionParams {
        &self.params
    }

    /// A replicating daughter of `parent`: fresh levels, redrawn growth.
    fn replicating_daughter<R: Rng + ?Sized>(&self, parent: &Cell, cell_type: CellType, rng: &mut R) -> Cell {
        Cell {
            cell_type,
            volume: 0.0,
            target_volume: self.params.replicating_target_volume,
            growth_rate: parent.parent_growth_rate * rng.sample(self.noise),
            parent_growth_rate: parent.parent_growth_rate,
            germination_time: parent.germination_time,
            conversion_probability: parent.conversion_probability,
            color: parent.color,
            ..Cell::default()
        }
    }

    /// Splits the inherited genes evenly; everything else stays as set.
    fn inherit(&self, parent: &Cell, daughter: &mut Cell) {
        for &gene in &self.params.inherited {
            daughter.rna[gene] = parent.rna[gene] / 2.0;
            daughter.protein[gene] = parent.protein[gene] / 2.0;
        }
    }

    /// Populates `d1` and `d2` from `parent`. Host-set volumes on the
    /// daughters are kept.
    pub fn partition<R: Rng + ?Sized>(&self, parent: &Cell, d1: &mut Cell, d2: &mut Cell, rng: &mut R) {
        let volumes = (d1.volume, d2.volume);
        match parent.cell_type {
            CellType::ReplicatingPermissive => {
                *d1 = self.replicating_daughter(parent, CellType::ReplicatingPermissive, rng);
                *d2 = self.replicating_daughter(parent, CellType::ReplicatingPermissive, rng);
            }
            CellType::ReplicatingCommitted => {
                *d1 = self.replicating_daughter(parent, CellType::ReplicatingCommitted, rng);
                *d2 = Cell {
                    cell_type: CellType::IntermediateEarly,
                    target_volume: self.params.intermediate_target_volume,
                    growth_rate: 0.0,
                    parent_growth_rate: parent.growth_rate,
                    germination_time: parent.germination_time,
                    conversion_probability: parent.conversion_probability,
                    color: parent.color,
                    ..Cell::default()
                };
            }
            _ => {
                *d1 = Cell { divide_flag: false, ..parent.clone() };
                *d2 = Cell { divide_flag: false, ..parent.clone() };
            }
        }
        d1.volume = volumes.0;
        d2.volume = volumes.1;
        self.inherit(parent, d1);
        self.inherit(parent, d2);
        trace!(
            "Divided {} into {} (g={:.4}) and {} (g={:.4})",
            parent.cell_type, d1.cell_type, d1.growth_rate, d2.cell_type, d2.growth_rate
        );
    }

    /// Whether `gene` is split at division.
    pub fn inherits(&self, gene: Gene) -> bool {
        self.params.inherited.contains(&gene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::ModelVariant;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn partitioner() -> Partitioner {
        let variant = ModelVariant::repression();
        Partitioner::new(&variant.division, &variant.growth).unwrap()
    }

    fn parent(cell_type: CellType) -> Cell {
        let mut cell = Cell {
            cell_type,
            volume: 2.4,
            target_volume: 2.0,
            growth_rate: 1.02,
            parent_growth_rate: 0.98,
            germination_time: 95.0,
            conversion_probability: 12.5,
            color: [0.4, 0.5, 1.5],
            divide_flag: true,
            ..Cell::default()
        };
        for gene in Gene::ALL {
            cell.rna[gene] = 1.0 + gene.index() as f64;
            cell.protein[gene] = 3.0 * (1.0 + gene.index() as f64);
        }
        cell
    }

    #[test]
    fn permissive_parent_gives_two_permissive_daughters() {
        let p = partitioner();
        let mut rng = StdRng::seed_from_u64(21);
        let parent = parent(CellType::ReplicatingPermissive);
        let (mut d1, mut d2) = (Cell { volume: 1.2, ..Cell::default() }, Cell { volume: 1.2, ..Cell::default() });
        p.partition(&parent, &mut d1, &mut d2, &mut rng);

        for d in [&d1, &d2] {
            assert_eq!(d.cell_type, CellType::ReplicatingPermissive);
            assert_eq!(d.target_volume, 2.0);
            assert_eq!(d.volume, 1.2);
            assert_eq!(d.parent_growth_rate, parent.parent_growth_rate);
            assert!((d.growth_rate / parent.parent_growth_rate - 1.0).abs() < 0.5);
            assert_eq!(d.protein[Gene::Euo], parent.protein[Gene::Euo] / 2.0);
            assert_eq!(d.rna[Gene::Ectopic], parent.rna[Gene::Ectopic] / 2.0);
            assert_eq!(d.protein[Gene::HctA], 0.0);
            assert_eq!(d.protein[Gene::CtcB], 0.0);
            assert!(!d.divide_flag);
            assert_eq!(d.germination_time, 95.0);
        }
        assert_ne!(d1.growth_rate, d2.growth_rate);
    }

    #[test]
    fn committed_parent_splits_asymmetrically() {
        let p = partitioner();
        let mut rng = StdRng::seed_from_u64(4);
        let parent = parent(CellType::ReplicatingCommitted);
        let (mut d1, mut d2) = (Cell::default(), Cell::default());
        p.partition(&parent, &mut d1, &mut d2, &mut rng);

        assert_eq!(d1.cell_type, CellType::ReplicatingCommitted);
        assert_eq!(d1.target_volume, 2.0);
        assert!(d1.growth_rate > 0.0);

        assert_eq!(d2.cell_type, CellType::IntermediateEarly);
        assert_eq!(d2.growth_rate, 0.0);
        assert_eq!(d2.parent_growth_rate, parent.growth_rate);
        assert_eq!(d2.target_volume, 10.0);
        assert_eq!(d2.protein[Gene::Euo], parent.protein[Gene::Euo] / 2.0);
    }

    #[test]
    fn other_parents_are_cloned_then_halved() {
        let p = partitioner();
        let mut rng = StdRng::seed_from_u64(4);
        let parent = parent(CellType::IntermediateLate);
        let (mut d1, mut d2) = (Cell { volume: 0.7, ..Cell::default() }, Cell::default());
        p.partition(&parent, &mut d1, &mut d2, &mut rng);

        assert_eq!(d1.cell_type, CellType::IntermediateLate);
        assert_eq!(d1.volume, 0.7);
        assert_eq!(d1.protein[Gene::HctB], parent.protein[Gene::HctB]);
        assert_eq!(d1.protein[Gene::Euo], parent.protein[Gene::Euo] / 2.0);
        assert!(!d2.divide_flag);
        assert!(p.inherits(Gene::Ectopic));
        assert!(!p.inherits(Gene::HctB));
    }

    #[test]
    fn zero_sd_keeps_parent_rate() {
        let mut variant = ModelVariant::classic();
        variant.growth.division_sd = 0.0;
        let p = Partitioner::new(&variant.division, &variant.growth).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let parent = parent(CellType::ReplicatingPermissive);
        let (mut d1, mut d2) = (Cell::default(), Cell::default());
        p.partition(&parent, &mut d1, &mut d2, &mut rng);
        assert_eq!(d1.growth_rate, parent.parent_growth_rate);
        assert_eq!(d2.growth_rate, parent.parent_growth_rate);
    }
}
