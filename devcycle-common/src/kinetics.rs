//! Named rate records and the per-tick rate lookup.
//!
//! A [`KineticTerm`] binds one gene to its rate record inside one state
//! program. Rates may be conditional on elapsed time or on protein levels;
//! the lookup is pure and re-evaluated every tick.

use crate::clock::SimClock;
use crate::genes::{Gene, GeneLevels};
use serde::{Deserialize, Serialize};

/// Production and degradation constants for one gene.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KineticRates {
    pub rna_production: f64,
    pub rna_degradation: f64,
    pub protein_production: f64,
    pub protein_degradation: f64,
}

impl KineticRates {
    pub const ZERO: KineticRates = KineticRates {
        rna_production: 0.0,
        rna_degradation: 0.0,
        protein_production: 0.0,
        protein_degradation: 0.0,
    };

    pub const fn new(
        rna_production: f64,
        rna_degradation: f64,
        protein_production: f64,
        protein_degradation: f64,
    ) -> Self {
        KineticRates { rna_production, rna_degradation, protein_production, protein_degradation }
    }

    /// Pure decay: no transcription or translation.
    pub const fn decay(rna_degradation: f64, protein_degradation: f64) -> Self {
        KineticRates::new(0.0, rna_degradation, 0.0, protein_degradation)
    }

    pub fn is_zero(&self) -> bool {
        *self == KineticRates::ZERO
    }

    pub fn is_finite(&self) -> bool {
        self.rna_production.is_finite()
            && self.rna_degradation.is_finite()
            && self.protein_production.is_finite()
            && self.protein_degradation.is_finite()
    }
}

/// Gate under which a term's rates apply. When it fails, the rates are zero
/// for that tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateCondition {
    #[default]
    Always,
    /// Induced only once the clock reaches `tick`.
    ElapsedAtLeast { tick: u64 },
    /// Requires a companion protein at or above `level`.
    ProteinAtLeast { gene: Gene, level: f64 },
    /// Repressed once `gene` protein exceeds `level`.
    ProteinAtMost { gene: Gene, level: f64 },
}

impl RateCondition {
    pub fn holds(&self, protein: &GeneLevels, clock: &SimClock) -> bool {
        match *self {
            RateCondition::Always => true,
            RateCondition::ElapsedAtLeast { tick } => clock.tick() >= tick,
            RateCondition::ProteinAtLeast { gene, level } => protein[gene] >= level,
            RateCondition::ProteinAtMost { gene, level } => protein[gene] <= level,
        }
    }
}

/// Which update law a term integrates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionLaw {
    /// Production and first-order degradation for RNA and protein.
    #[default]
    Turnover,
    /// Protein only accumulates; its degradation constant is ignored.
    Accumulate,
}

/// Whether RNA decay is multiplied by the growth factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RnaDecay {
    #[default]
    GrowthScaled,
    Constant,
}

/// One gene's kinetics inside one state program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticTerm {
    pub gene: Gene,
    pub rates: KineticRates,
    #[serde(default)]
    pub law: ExpressionLaw,
    #[serde(default)]
    pub rna_decay: RnaDecay,
    #[serde(default)]
    pub condition: RateCondition,
}

impl KineticTerm {
    pub fn turnover(gene: Gene, rates: KineticRates) -> Self {
        KineticTerm {
            gene,
            rates,
            law: ExpressionLaw::Turnover,
            rna_decay: RnaDecay::GrowthScaled,
            condition: RateCondition::Always,
        }
    }

    pub fn accumulating(self) -> Self {
        KineticTerm { law: ExpressionLaw::Accumulate, ..self }
    }

    pub fn constant_rna_decay(self) -> Self {
        KineticTerm { rna_decay: RnaDecay::Constant, ..self }
    }

    pub fn when(self, condition: RateCondition) -> Self {
        KineticTerm { condition, ..self }
    }

    /// Rates in effect this tick.
    pub fn effective_rates(&self, protein: &GeneLevels, clock: &SimClock) -> KineticRates {
        if self.condition.holds(protein, clock) {
            self.rates
        } else {
            KineticRates::ZERO
        }
    }
}

/// Rate lookup for a whole program: every term's effective record, evaluated
/// lazily against the same start-of-tick levels and clock.
pub fn rate_table<'a>(
    terms: &'a [KineticTerm],
    protein: &'a GeneLevels,
    clock: &'a SimClock,
) -> impl Iterator<Item = KineticRates> + 'a {
    terms.iter().map(move |term| term.effective_rates(protein, clock))
}
