//! Explicit Euler update of RNA and protein levels, one tick per step.
//!
//! No clamping or stability correction is applied.

use crate::cell::Cell;
use crate::kinetics::{ExpressionLaw, KineticRates, KineticTerm, RnaDecay};

/// Advances one gene by one tick.
///
/// `rna ← rna + kr·g − dr·rna·h` then `protein ← protein + kp·g·rna − dp·g·protein`,
/// where `h` is `g` for growth-scaled decay and 1 otherwise. The protein
/// update reads the RNA value written in the same step.
pub fn step_gene(
    rna: &mut f64,
    protein: &mut f64,
    rates: &KineticRates,
    law: ExpressionLaw,
    rna_decay: RnaDecay,
    growth_factor: f64,
) {
    let decay_factor = match rna_decay {
        RnaDecay::GrowthScaled => growth_factor,
        RnaDecay::Constant => 1.0,
    };
    *rna = *rna + rates.rna_production * growth_factor - rates.rna_degradation * *rna * decay_factor;

    let loss = match law {
        ExpressionLaw::Turnover => rates.protein_degradation * growth_factor * *protein,
        ExpressionLaw::Accumulate => 0.0,
    };
    *protein = *protein + rates.protein_production * growth_factor * *rna - loss;
}

/// Applies each term with its looked-up rates, in program order.
pub fn integrate<I>(cell: &mut Cell, terms: &[KineticTerm], rates: I, growth_factor: f64)
where
    I: IntoIterator<Item = KineticRates>,
{
    for (term, rates) in terms.iter().zip(rates) {
        let gene = term.gene;
        let mut rna = cell.rna[gene];
        let mut protein = cell.protein[gene];
        step_gene(&mut rna, &mut protein, &rates, term.law, term.rna_decay, growth_factor);
        cell.rna[gene] = rna;
        cell.protein[gene] = protein;
    }
}
