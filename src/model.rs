//! The model represents the static input data provided by the user.
use crate::scenario::ScenarioMap;
use crate::settlement::Settlement;
use crate::technology::TechnologyMap;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{
    DieselParameters, ExtensionLimits, GridLimit, HybridParameters, ModelParameters,
    NetworkParameters, Prioritization,
};

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Settlements, in the order given in the input file
    pub settlements: Vec<Settlement>,
    /// Parameters of the enabled technologies
    pub technologies: TechnologyMap,
    /// Scenarios to run
    pub scenarios: ScenarioMap,
}
