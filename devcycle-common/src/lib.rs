//! Developmental cell-state core: per-gene kinetics, the logistic
//! transition gate, the state machine over cell types and the division
//! rules, plus the configuration and snapshot types shared with the engine.

pub mod cell;
pub mod clock;
pub mod color;
pub mod config;
pub mod division;
pub mod gate;
pub mod genes;
pub mod host;
pub mod integrator;
pub mod kinetics;
pub mod regulator;
pub mod sim_params;
pub mod snapshot;
pub mod state_machine;
pub mod variant;

// Re-export key types for easier use by dependent crates
pub use cell::{Cell, CellId, CellType};
pub use clock::SimClock;
pub use config::{HostConfig, InitialConditions, ModelConfig, OutputConfig, SimulationConfig, TimingConfig};
pub use genes::{Gene, GeneLevels};
pub use host::{HostEngine, HostSetup, ReactionRates, Regulator, TransitionEvent, UpdateSummary};
pub use regulator::DevelopmentRegulator;
pub use sim_params::SimParams;
pub use snapshot::Snapshot;
pub use variant::{ModelVariant, VariantName};
