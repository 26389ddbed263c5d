use crate::genes::{Gene, GeneLevels};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorTerm {
    pub gene: Gene,
    pub weight: f64,
}

/// One RGB channel as a function of protein levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Channel {
    Constant { value: f64 },
    Linear { terms: Vec<ColorTerm> },
    /// `1 / level`; a zero level gives an infinite channel.
    Reciprocal { gene: Gene },
}

impl Channel {
    pub fn constant(value: f64) -> Self {
        Channel::Constant { value }
    }

    pub fn of(gene: Gene, weight: f64) -> Self {
        Channel::Linear { terms: vec![ColorTerm { gene, weight }] }
    }

    pub fn sum(terms: &[(Gene, f64)]) -> Self {
        Channel::Linear {
            terms: terms.iter().map(|&(gene, weight)| ColorTerm { gene, weight }).collect(),
        }
    }

    fn eval(&self, protein: &GeneLevels) -> f64 {
        match self {
            Channel::Constant { value } => *value,
            Channel::Linear { terms } => terms.iter().map(|t| protein[t.gene] * t.weight).sum(),
            Channel::Reciprocal { gene } => 1.0 / protein[*gene],
        }
    }
}

/// Render colour for a state. Purely cosmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub channels: [Channel; 3],
}

impl ColorRule {
    pub fn fixed(rgb: [f64; 3]) -> Self {
        ColorRule { channels: rgb.map(Channel::constant) }
    }

    /// `[1/g, 1, 1/g]`: green fading to white as the repressor builds.
    pub fn inverse_of(gene: Gene) -> Self {
        ColorRule {
            channels: [Channel::Reciprocal { gene }, Channel::constant(1.0), Channel::Reciprocal { gene }],
        }
    }

    pub fn new(red: Channel, green: Channel, blue: Channel) -> Self {
        ColorRule { channels: [red, green, blue] }
    }

    pub fn paint(&self, protein: &GeneLevels) -> [f64; 3] {
        [
            self.channels[0].eval(protein),
            self.channels[1].eval(protein),
            self.channels[2].eval(protein),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_rule_tracks_repressor() {
        let mut protein = GeneLevels::zero();
        protein[Gene::Euo] = 4.0;
        assert_eq!(ColorRule::inverse_of(Gene::Euo).paint(&protein), [0.25, 1.0, 0.25]);
    }

    #[test]
    fn linear_channels_mix_genes() {
        let rule = ColorRule::new(
            Channel::of(Gene::HctB, 0.1),
            Channel::constant(0.0),
            Channel::sum(&[(Gene::HctB, 0.025), (Gene::HctA, 1.0 / 7.0)]),
        );
        let mut protein = GeneLevels::zero();
        protein[Gene::HctB] = 20.0;
        protein[Gene::HctA] = 7.0;
        let [r, g, b] = rule.paint(&protein);
        assert!((r - 2.0).abs() < 1e-12);
        assert_eq!(g, 0.0);
        assert!((b - 1.5).abs() < 1e-12);
    }

    #[test]
    fn reciprocal_of_zero_is_infinite() {
        let [r, _, _] = ColorRule::inverse_of(Gene::Euo).paint(&GeneLevels::zero());
        assert!(r.is_infinite());
    }
}
