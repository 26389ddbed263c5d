//! Declarative model tables: one [`ModelVariant`] per experimental script,
//! selected by name or loaded from TOML.

use crate::cell::CellType;
use crate::color::{Channel, ColorRule};
use crate::gate::LogisticCurve;
use crate::genes::Gene;
use crate::host::ReactionRates;
use crate::kinetics::{KineticRates, KineticTerm, RateCondition};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Growth factor fed to a state's kinetics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthSource {
    /// The cell's live `growth_rate`.
    #[default]
    Live,
    /// The frozen `parent_growth_rate`.
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtLeast,
    AtMost,
}

impl Comparison {
    pub fn holds(self, value: f64, level: f64) -> bool {
        match self {
            Comparison::AtLeast => value >= level,
            Comparison::AtMost => value <= level,
        }
    }
}

fn default_true() -> bool {
    true
}

/// How a state is left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Once elapsed time reaches the cell's germination time; growth is
    /// redrawn and frozen as the parent rate.
    Germination { to: CellType },
    /// Gate trial on hour-aligned ticks. With `commit_step`, the state's
    /// kinetics and colour run once more on success.
    Stochastic {
        to: CellType,
        #[serde(default = "default_true")]
        commit_step: bool,
    },
    /// Protein level crossing.
    Threshold { gene: Gene, comparison: Comparison, level: f64, to: CellType },
}

impl Transition {
    pub fn target(&self) -> CellType {
        match *self {
            Transition::Germination { to } => to,
            Transition::Stochastic { to, .. } => to,
            Transition::Threshold { to, .. } => to,
        }
    }
}

/// Holds a protein at `level` while coarse time is below `before_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelPin {
    pub gene: Gene,
    pub level: f64,
    pub before_hour: f64,
}

/// Everything one cell type does in a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateProgram {
    pub cell_type: CellType,
    #[serde(default)]
    pub growth_source: GrowthSource,
    #[serde(default)]
    pub kinetics: Vec<KineticTerm>,
    /// Proteins forced to zero after integrating.
    #[serde(default)]
    pub cleared_proteins: Vec<Gene>,
    #[serde(default)]
    pub pins: Vec<LevelPin>,
    #[serde(default)]
    pub halts_growth: bool,
    #[serde(default)]
    pub suppresses_division: bool,
    #[serde(default)]
    pub color: Option<ColorRule>,
    #[serde(default)]
    pub transition: Option<Transition>,
}

impl StateProgram {
    fn new(cell_type: CellType) -> Self {
        StateProgram {
            cell_type,
            growth_source: GrowthSource::Live,
            kinetics: Vec::new(),
            cleared_proteins: Vec::new(),
            pins: Vec::new(),
            halts_growth: false,
            suppresses_division: false,
            color: None,
            transition: None,
        }
    }

    fn genes(&self) -> impl Iterator<Item = Gene> + '_ {
        let transition_gene = match self.transition {
            Some(Transition::Threshold { gene, .. }) => Some(gene),
            _ => None,
        };
        self.kinetics
            .iter()
            .map(|t| t.gene)
            .chain(self.cleared_proteins.iter().copied())
            .chain(self.pins.iter().map(|p| p.gene))
            .chain(transition_gene)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GerminationParams {
    /// Mean germination delay in ticks.
    pub base_time: f64,
    /// Half-width of the uniform jitter.
    pub jitter: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    pub baseline: f64,
    /// Half-width of the uniform jitter at creation and germination.
    pub jitter: f64,
    /// Standard deviation of the daughter growth multiplier.
    pub division_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionParams {
    pub replicating_target_volume: f64,
    pub intermediate_target_volume: f64,
    /// Genes whose RNA and protein are split evenly between daughters.
    pub inherited: Vec<Gene>,
}

/// Constants handed to the host during `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostWiring {
    pub max_cells: usize,
    pub save_every_steps: u32,
    pub growth_inhibition: f64,
    pub species: ReactionRates,
    pub signal: ReactionRates,
}

/// Built-in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    /// RBr/RBi/IBr/IBe/EB model with HctA- and HctB-driven maturation.
    Classic,
    /// HctA-promoter reporter accumulating through the IB stage.
    #[default]
    Reporter,
    /// Euo washout: IB exit on Euo falling rather than HctA rising.
    Washout,
    /// Euo repression of HctA and CtcB in early IBs.
    Repression,
}

impl VariantName {
    pub const ALL: [VariantName; 4] =
        [VariantName::Classic, VariantName::Reporter, VariantName::Washout, VariantName::Repression];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantName::Classic => "classic",
            VariantName::Reporter => "reporter",
            VariantName::Washout => "washout",
            VariantName::Repression => "repression",
        }
    }
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        VariantName::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow::anyhow!("Unknown model variant '{}'", s))
    }
}

/// A complete, validated-on-use model table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariant {
    pub name: String,
    pub ticks_per_hour: u64,
    /// Genes this variant tracks; the remaining slots stay at zero.
    pub genes: Vec<Gene>,
    pub initial_color: [f64; 3],
    pub initial_target_volume: f64,
    pub germination: GerminationParams,
    pub growth: GrowthParams,
    pub division: DivisionParams,
    pub gate: LogisticCurve,
    pub host: HostWiring,
    pub states: Vec<StateProgram>,
}

// Shared rate records.
const EUO: KineticRates = KineticRates::new(0.02, 0.02, 0.5, 0.08);
const EUO_PROTEIN_DECAY: KineticRates = KineticRates::decay(0.0, 0.08);
const EUO_WASHOUT: KineticRates = KineticRates::decay(0.08, 0.08);
const HCTA_CLASSIC: KineticRates = KineticRates::new(0.02, 0.01, 0.5, 0.05);
const HCTA: KineticRates = KineticRates::new(0.04, 0.01, 1.0, 0.05);
const HCTA_PROTEIN_DECAY: KineticRates = KineticRates::decay(0.0, 0.05);
const HCTB: KineticRates = KineticRates::new(0.06, 0.024, 0.5, 0.01);
const HCTB_LATE_WASHOUT: KineticRates = KineticRates::new(0.08, 0.024, 0.5, 0.001);
const CTCB: KineticRates = KineticRates::new(0.04, 0.01, 1.0, 0.05);
const CTCB_PROTEIN_DECAY: KineticRates = KineticRates::decay(0.0, 0.05);

const EB_PINK: [f64; 3] = [2.0, 0.0, 0.5];

fn germinating() -> StateProgram {
    StateProgram {
        halts_growth: true,
        suppresses_division: true,
        transition: Some(Transition::Germination { to: CellType::ReplicatingPermissive }),
        ..StateProgram::new(CellType::Germinating)
    }
}

fn permissive(cleared: &[Gene]) -> StateProgram {
    StateProgram {
        kinetics: vec![KineticTerm::turnover(Gene::Euo, EUO)],
        cleared_proteins: cleared.to_vec(),
        color: Some(ColorRule::inverse_of(Gene::Euo)),
        transition: Some(Transition::Stochastic { to: CellType::ReplicatingCommitted, commit_step: true }),
        ..StateProgram::new(CellType::ReplicatingPermissive)
    }
}

fn committed(color: Option<ColorRule>) -> StateProgram {
    StateProgram {
        kinetics: vec![KineticTerm::turnover(Gene::Euo, EUO)],
        color,
        ..StateProgram::new(CellType::ReplicatingCommitted)
    }
}

fn non_growing(cell_type: CellType) -> StateProgram {
    StateProgram {
        growth_source: GrowthSource::Frozen,
        halts_growth: true,
        ..StateProgram::new(cell_type)
    }
}

fn threshold(gene: Gene, comparison: Comparison, level: f64, to: CellType) -> Option<Transition> {
    Some(Transition::Threshold { gene, comparison, level, to })
}

/// Late-gene turnover in non-growing states: RNA decay is not growth scaled.
fn late(gene: Gene, rates: KineticRates) -> KineticTerm {
    KineticTerm::turnover(gene, rates).constant_rna_decay()
}

impl ModelVariant {
    pub fn preset(name: VariantName) -> Self {
        match name {
            VariantName::Classic => ModelVariant::classic(),
            VariantName::Reporter => ModelVariant::reporter(),
            VariantName::Washout => ModelVariant::washout(),
            VariantName::Repression => ModelVariant::repression(),
        }
    }

    fn base(name: VariantName, germination: GerminationParams, host: HostWiring) -> Self {
        ModelVariant {
            name: name.to_string(),
            ticks_per_hour: 10,
            genes: vec![Gene::Ectopic, Gene::Euo, Gene::HctA, Gene::HctB],
            initial_color: [2.0, 0.5, 1.5],
            initial_target_volume: 2.0,
            germination,
            growth: GrowthParams { baseline: 1.0, jitter: 0.05, division_sd: 0.05 },
            division: DivisionParams {
                replicating_target_volume: 2.0,
                intermediate_target_volume: 10.0,
                inherited: vec![Gene::Ectopic, Gene::Euo],
            },
            gate: LogisticCurve::live_cell(),
            host,
            states: Vec::new(),
        }
    }

    pub fn classic() -> Self {
        let host = HostWiring {
            max_cells: 1500,
            save_every_steps: 10,
            growth_inhibition: 200_000.0,
            species: ReactionRates::new(0.0, 0.3),
            signal: ReactionRates::new(1.0, 0.0),
        };
        let mut variant =
            ModelVariant::base(VariantName::Classic, GerminationParams { base_time: 120.0, jitter: 40.0 }, host);
        variant.states = vec![
            germinating(),
            permissive(&[Gene::HctA, Gene::HctB]),
            committed(None),
            StateProgram {
                kinetics: vec![
                    KineticTerm::turnover(Gene::Euo, EUO_PROTEIN_DECAY),
                    late(Gene::HctA, HCTA_CLASSIC),
                ],
                color: Some(ColorRule::new(Channel::constant(0.0), Channel::constant(0.0), Channel::of(Gene::HctA, 0.01))),
                transition: threshold(Gene::HctA, Comparison::AtLeast, 4.0, CellType::IntermediateLate),
                ..non_growing(CellType::IntermediateEarly)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB)],
                color: Some(ColorRule::new(Channel::constant(0.0), Channel::constant(0.0), Channel::of(Gene::HctB, 0.01))),
                transition: threshold(Gene::HctB, Comparison::AtLeast, 15.0, CellType::Infectious),
                ..non_growing(CellType::IntermediateLate)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB)],
                color: Some(ColorRule::fixed(EB_PINK)),
                ..non_growing(CellType::Infectious)
            },
        ];
        variant
    }

    pub fn reporter() -> Self {
        let host = HostWiring {
            max_cells: 1 << 15,
            save_every_steps: 10,
            growth_inhibition: 200_000.0,
            species: ReactionRates::new(0.0, 0.3),
            signal: ReactionRates::new(1.0, 0.0),
        };
        let mut variant =
            ModelVariant::base(VariantName::Reporter, GerminationParams { base_time: 100.0, jitter: 20.0 }, host);
        variant.states = vec![
            germinating(),
            permissive(&[Gene::Ectopic, Gene::HctA, Gene::HctB]),
            committed(None),
            StateProgram {
                kinetics: vec![
                    KineticTerm::turnover(Gene::Euo, EUO_PROTEIN_DECAY),
                    late(Gene::HctA, HCTA),
                    // Reporter shares the HctA promoter; its protein is stable.
                    late(Gene::Ectopic, HCTA).accumulating(),
                ],
                color: Some(ColorRule::new(Channel::constant(0.0), Channel::constant(0.0), Channel::of(Gene::HctA, 5.0))),
                transition: threshold(Gene::HctA, Comparison::AtLeast, 3.5, CellType::IntermediateLate),
                ..non_growing(CellType::IntermediateEarly)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB)],
                color: Some(ColorRule::new(
                    Channel::of(Gene::HctB, 0.1),
                    Channel::constant(0.0),
                    Channel::sum(&[(Gene::HctB, 1.0 / 40.0), (Gene::HctA, 1.0 / 7.0)]),
                )),
                transition: threshold(Gene::HctB, Comparison::AtLeast, 20.0, CellType::Infectious),
                ..non_growing(CellType::IntermediateLate)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB)],
                color: Some(ColorRule::fixed(EB_PINK)),
                ..non_growing(CellType::Infectious)
            },
        ];
        variant
    }

    pub fn washout() -> Self {
        let host = HostWiring {
            max_cells: 1 << 15,
            save_every_steps: 10,
            growth_inhibition: 2000.0,
            species: ReactionRates::new(20.0, 0.0),
            signal: ReactionRates::new(1.0, 0.0),
        };
        let mut variant =
            ModelVariant::base(VariantName::Washout, GerminationParams { base_time: 100.0, jitter: 20.0 }, host);
        variant.states = vec![
            germinating(),
            permissive(&[Gene::Ectopic, Gene::HctA, Gene::HctB]),
            committed(Some(ColorRule::inverse_of(Gene::Euo))),
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::Euo, EUO_WASHOUT), late(Gene::HctA, HCTA)],
                pins: vec![LevelPin { gene: Gene::Euo, level: 1.5, before_hour: 1.0 }],
                color: Some(ColorRule::new(Channel::constant(0.0), Channel::of(Gene::Euo, 1.0), Channel::of(Gene::HctA, 1.0))),
                transition: threshold(Gene::Euo, Comparison::AtMost, 0.6, CellType::IntermediateLate),
                ..non_growing(CellType::IntermediateEarly)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB_LATE_WASHOUT)],
                color: Some(ColorRule::new(
                    Channel::of(Gene::HctB, 0.05),
                    Channel::of(Gene::Euo, 1.0),
                    Channel::of(Gene::HctA, 1.0),
                )),
                transition: threshold(Gene::HctB, Comparison::AtLeast, 70.0, CellType::Infectious),
                ..non_growing(CellType::IntermediateLate)
            },
            StateProgram {
                kinetics: vec![KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY), late(Gene::HctB, HCTB)],
                color: Some(ColorRule::new(Channel::of(Gene::HctB, 1.0), Channel::constant(0.0), Channel::of(Gene::HctA, 1.0))),
                ..non_growing(CellType::Infectious)
            },
        ];
        variant
    }

    pub fn repression() -> Self {
        let host = HostWiring {
            max_cells: 1 << 15,
            save_every_steps: 10,
            growth_inhibition: 200_000.0,
            species: ReactionRates::new(0.0, 0.3),
            signal: ReactionRates::new(1.0, 0.0),
        };
        let mut variant =
            ModelVariant::base(VariantName::Repression, GerminationParams { base_time: 100.0, jitter: 20.0 }, host);
        variant.genes = Gene::ALL.to_vec();

        let euo_repressed = RateCondition::ProteinAtMost { gene: Gene::Euo, level: 3.0 };
        let induction = RateCondition::ElapsedAtLeast { tick: 1500 };
        let reporter = late(Gene::Ectopic, HCTA).accumulating();

        variant.states = vec![
            germinating(),
            permissive(&[Gene::Ectopic, Gene::HctA, Gene::HctB, Gene::CtcB]),
            committed(Some(ColorRule::inverse_of(Gene::Euo))),
            StateProgram {
                kinetics: vec![
                    KineticTerm::turnover(Gene::Euo, EUO_WASHOUT),
                    late(Gene::HctA, HCTA).when(euo_repressed),
                    late(Gene::CtcB, CTCB).when(euo_repressed),
                    reporter.clone().when(RateCondition::ProteinAtLeast { gene: Gene::HctA, level: 1.0 }),
                ],
                color: Some(ColorRule::new(Channel::constant(0.0), Channel::of(Gene::Euo, 1.0), Channel::of(Gene::HctA, 1.0))),
                transition: threshold(Gene::HctA, Comparison::AtLeast, 20.0, CellType::IntermediateLate),
                ..non_growing(CellType::IntermediateEarly)
            },
            StateProgram {
                kinetics: vec![
                    KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY),
                    KineticTerm::turnover(Gene::CtcB, CTCB_PROTEIN_DECAY),
                    late(Gene::HctB, HCTB),
                    reporter.clone().when(induction),
                ],
                color: Some(ColorRule::new(
                    Channel::of(Gene::HctB, 0.05),
                    Channel::of(Gene::Euo, 1.0),
                    Channel::of(Gene::HctA, 1.0),
                )),
                transition: threshold(Gene::HctB, Comparison::AtLeast, 20.0, CellType::Infectious),
                ..non_growing(CellType::IntermediateLate)
            },
            StateProgram {
                kinetics: vec![
                    KineticTerm::turnover(Gene::HctA, HCTA_PROTEIN_DECAY),
                    late(Gene::HctB, HCTB),
                    reporter.when(induction),
                ],
                color: Some(ColorRule::fixed(EB_PINK)),
                ..non_growing(CellType::Infectious)
            },
        ];
        variant
    }

    /// Reads a custom variant from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read model file '{}'", path_ref.display()))?;
        let variant: ModelVariant = toml::from_str(&text)
            .with_context(|| format!("Failed to parse model TOML from '{}'", path_ref.display()))?;
        variant.validate()?;
        Ok(variant)
    }

    pub fn program(&self, cell_type: CellType) -> Option<&StateProgram> {
        self.states.iter().find(|p| p.cell_type == cell_type)
    }

    pub fn has_state(&self, cell_type: CellType) -> bool {
        self.program(cell_type).is_some()
    }

    /// Structural and numeric checks. Per-tick arithmetic never fails, so
    /// this is the only place a model can be rejected.
    pub fn validate(&self) -> Result<()> {
        if self.ticks_per_hour == 0 {
            anyhow::bail!("ticks_per_hour must be greater than 0.");
        }
        if !self.gate.is_finite() {
            anyhow::bail!("Transition gate constants must be finite.");
        }
        if !(self.germination.base_time.is_finite() && self.germination.jitter >= 0.0 && self.germination.jitter.is_finite()) {
            anyhow::bail!("Germination time must be finite with a non-negative jitter.");
        }
        if !(self.growth.baseline.is_finite() && self.growth.jitter >= 0.0 && self.growth.jitter.is_finite()) {
            anyhow::bail!("Growth baseline must be finite with a non-negative jitter.");
        }
        if !(self.growth.division_sd >= 0.0 && self.growth.division_sd.is_finite()) {
            anyhow::bail!("division_sd must be finite and non-negative.");
        }
        for volume in [
            self.initial_target_volume,
            self.division.replicating_target_volume,
            self.division.intermediate_target_volume,
        ] {
            if !(volume > 0.0 && volume.is_finite()) {
                anyhow::bail!("Target volumes must be positive, got {}.", volume);
            }
        }

        let tracked: HashSet<Gene> = self.genes.iter().copied().collect();
        for gene in &self.division.inherited {
            if !tracked.contains(gene) {
                anyhow::bail!("Inherited gene {} is not tracked by variant '{}'.", gene, self.name);
            }
        }

        let mut seen = HashSet::new();
        for program in &self.states {
            if !seen.insert(program.cell_type) {
                anyhow::bail!("State {} is defined more than once.", program.cell_type);
            }
            if let Some(gene) = program.genes().find(|g| !tracked.contains(g)) {
                anyhow::bail!("State {} references untracked gene {}.", program.cell_type, gene);
            }
            if let Some(term) = program.kinetics.iter().find(|t| !t.rates.is_finite()) {
                anyhow::bail!("State {} has non-finite rates for {}.", program.cell_type, term.gene);
            }
            if let Some(transition) = &program.transition {
                self.validate_transition(program.cell_type, transition)?;
            }
        }
        if !self.has_state(CellType::Germinating) {
            anyhow::bail!("Variant '{}' has no Germinating state.", self.name);
        }
        Ok(())
    }

    fn validate_transition(&self, from: CellType, transition: &Transition) -> Result<()> {
        let to = transition.target();
        if to <= from {
            anyhow::bail!("Transition {} -> {} does not move forward.", from, to);
        }
        if !self.has_state(to) {
            anyhow::bail!("Transition {} -> {} targets an undefined state.", from, to);
        }
        match *transition {
            Transition::Germination { .. } if from != CellType::Germinating => {
                anyhow::bail!("Only the Germinating state can germinate (found on {}).", from);
            }
            Transition::Threshold { level, .. } if !level.is_finite() => {
                anyhow::bail!("Threshold leaving {} must be finite.", from);
            }
            Transition::Stochastic { to: CellType::ReplicatingCommitted, .. }
                if !self.has_state(CellType::IntermediateEarly) =>
            {
                anyhow::bail!("Committed cells need an IntermediateEarly state for their daughters.");
            }
            _ => Ok(()),
        }
    }
}
