use crate::gate::GateFit;
use crate::host::HostSetup;
use crate::sim_params::SimParams;
use crate::variant::{ModelVariant, VariantName};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u32,
    // Falls back to the save interval the model sets during configure
    #[serde(default)]
    pub record_interval_steps: Option<u32>,
}

// Initial population, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditions {
    #[serde(default = "default_num_cells_initial")]
    pub num_cells_initial: u32,
    pub seed: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f64,
}

fn default_num_cells_initial() -> u32 {
    1
}

fn default_initial_volume() -> f64 {
    1.0
}

// Which developmental model to run
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ModelConfig {
    #[serde(default)]
    pub variant: VariantName,
    // A TOML model table; takes precedence over `variant`
    #[serde(default)]
    pub model_file: Option<String>,
    // Replaces the model's transition-gate constants
    #[serde(default)]
    pub gate_fit: Option<GateFit>,
}

// Stand-in host biophysics
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HostConfig {
    #[serde(default = "default_growth_per_tick")]
    pub growth_per_tick: f64,
    // Overrides the model's population cap
    #[serde(default)]
    pub max_cells: Option<usize>,
}

fn default_growth_per_tick() -> f64 {
    0.012
}

impl Default for HostConfig {
    fn default() -> Self {
        HostConfig { growth_per_tick: default_growth_per_tick(), max_cells: None }
    }
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    pub save_cells: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
    #[serde(default)]
    pub record_cells_in_snapshot: bool,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub timing: TimingConfig,
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub host: HostConfig,
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig =
            toml::from_str(config_str).map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timing.total_steps == 0 {
            anyhow::bail!("total_steps must be greater than 0.");
        }
        if self.timing.record_interval_steps == Some(0) {
            anyhow::bail!("record_interval_steps must be greater than 0.");
        }
        if self.initial_conditions.num_cells_initial == 0 {
            anyhow::bail!("num_cells_initial must be greater than 0.");
        }
        if !(self.initial_conditions.initial_volume > 0.0) {
            anyhow::bail!("initial_volume must be positive.");
        }
        if !self.host.growth_per_tick.is_finite() || self.host.growth_per_tick < 0.0 {
            anyhow::bail!("growth_per_tick must be finite and non-negative.");
        }
        if let Some(format) = &self.output.format {
            if !matches!(format.as_str(), "json" | "bincode" | "messagepack") {
                anyhow::bail!("Unsupported output format '{}'.", format);
            }
        }
        Ok(())
    }

    /// The model to run: the custom table if one is named, else the preset.
    pub fn resolve_model(&self) -> Result<ModelVariant> {
        let mut variant = match &self.model.model_file {
            Some(path) => ModelVariant::load(path)?,
            None => ModelVariant::preset(self.model.variant),
        };
        if let Some(fit) = self.model.gate_fit {
            variant.gate = fit.curve();
        }
        variant.validate()?;
        Ok(variant)
    }

    /// Converts the configuration into runtime parameters, filling gaps
    /// from what the model requested during `configure`.
    pub fn get_sim_params(&self, variant: &ModelVariant, setup: &HostSetup) -> SimParams {
        let ticks_per_hour = variant.ticks_per_hour.max(1);
        let record_interval_steps = self
            .timing
            .record_interval_steps
            .unwrap_or(setup.save_every_steps)
            .max(1);

        SimParams {
            total_steps: self.timing.total_steps,
            record_interval_steps,
            ticks_per_hour,
            dt_hours: 1.0 / ticks_per_hour as f64,
            growth_per_tick: self.host.growth_per_tick,
            initial_volume: self.initial_conditions.initial_volume,
            max_cells: self.host.max_cells.unwrap_or(setup.max_cells),
            seed: self.initial_conditions.seed,
        }
    }
}
