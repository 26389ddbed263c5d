use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Genes tracked per cell, in fixed slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gene {
    /// Ectopically expressed reporter (e.g. a HctA-promoter GFP fusion).
    Ectopic,
    /// Early repressor of the late program.
    Euo,
    /// Histone-like protein, commitment marker.
    HctA,
    /// Histone-like protein, terminal maturation marker.
    HctB,
    /// Two-component sensor driving the late regulon.
    CtcB,
}

impl Gene {
    pub const COUNT: usize = 5;
    pub const ALL: [Gene; Gene::COUNT] = [Gene::Ectopic, Gene::Euo, Gene::HctA, Gene::HctB, Gene::CtcB];

    pub fn index(self) -> usize {
        match self {
            Gene::Ectopic => 0,
            Gene::Euo => 1,
            Gene::HctA => 2,
            Gene::HctB => 3,
            Gene::CtcB => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gene::Ectopic => "ectopic",
            Gene::Euo => "euo",
            Gene::HctA => "hctA",
            Gene::HctB => "hctB",
            Gene::CtcB => "ctcB",
        }
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One concentration slot per [`Gene`].
///
/// Values are never clamped: negative or unbounded levels produced by the
/// kinetics are carried as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeneLevels([f64; Gene::COUNT]);

impl GeneLevels {
    pub fn zero() -> Self {
        GeneLevels([0.0; Gene::COUNT])
    }

    pub fn from_array(levels: [f64; Gene::COUNT]) -> Self {
        GeneLevels(levels)
    }

    pub fn get(&self, gene: Gene) -> f64 {
        self.0[gene.index()]
    }

    pub fn set(&mut self, gene: Gene, value: f64) {
        self.0[gene.index()] = value;
    }

    pub fn as_array(&self) -> &[f64; Gene::COUNT] {
        &self.0
    }

    /// Iterates `(gene, level)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Gene, f64)> + '_ {
        Gene::ALL.iter().map(move |&gene| (gene, self.get(gene)))
    }

    /// Element-wise sum, used for population means.
    pub fn accumulate(&mut self, other: &GeneLevels) {
        for (slot, value) in self.0.iter_mut().zip(other.0.iter()) {
            *slot += value;
        }
    }

    pub fn scaled(&self, factor: f64) -> GeneLevels {
        let mut out = *self;
        out.0.iter_mut().for_each(|v| *v *= factor);
        out
    }
}

impl Index<Gene> for GeneLevels {
    type Output = f64;
    fn index(&self, gene: Gene) -> &f64 {
        &self.0[gene.index()]
    }
}

impl IndexMut<Gene> for GeneLevels {
    fn index_mut(&mut self, gene: Gene) -> &mut f64 {
        &mut self.0[gene.index()]
    }
}
