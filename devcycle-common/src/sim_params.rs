use serde::{Deserialize, Serialize};

/// Runtime parameters derived from the configuration and the model variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // Time
    pub total_steps: u32,
    pub record_interval_steps: u32,
    pub ticks_per_hour: u64,
    pub dt_hours: f64, // Species integration step

    // Host biophysics
    pub growth_per_tick: f64,
    pub initial_volume: f64,
    pub max_cells: usize,

    pub seed: u64,
}
