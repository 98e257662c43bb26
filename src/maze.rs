//! Scopes of the maze training run
//!
//! The model, loss and training loop live outside this crate; these structs
//! only declare the parameters those collaborators accept and read them
//! back from a bound [`Registry`].

use crate::binding::Value;
use crate::configurable::{Configurable, Params};
use crate::error::ConfigError;
use crate::registry::{Parameter, Registry};

/// `learning_rate_schedules.ConstantLearningRateSchedule`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantLearningRateSchedule {
    pub learning_rate: f64,
}

impl ConstantLearningRateSchedule {
    /// Learning rate at a given step (constant)
    pub fn learning_rate_at(&self, _step: u64) -> f64 {
        self.learning_rate
    }
}

impl Configurable for ConstantLearningRateSchedule {
    const SCOPE: &'static str = "learning_rate_schedules.ConstantLearningRateSchedule";

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::required("learning_rate")]
    }

    fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            learning_rate: params.get("learning_rate")?,
        })
    }
}

/// `simple_runner.training_loop`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingLoop {
    pub batch_size_per_device: usize,
    pub validation_example_count: usize,
    pub steps_per_save: u64,
    pub steps_per_validate: u64,
    pub steps_per_summary: u64,
    /// `None` trains until `max_seconds`
    pub max_iterations: Option<u64>,
    pub max_seconds: Option<u64>,
    pub learning_rate_schedule: ConstantLearningRateSchedule,
    /// Gradient clipping; `None` disables it
    pub max_global_norm: Option<f64>,
}

impl Configurable for TrainingLoop {
    const SCOPE: &'static str = "simple_runner.training_loop";

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::required("batch_size_per_device"),
            Parameter::optional("validation_example_count", Value::Int(0)),
            Parameter::optional("steps_per_save", Value::Int(1000)),
            Parameter::optional("steps_per_validate", Value::Int(100)),
            Parameter::optional("steps_per_summary", Value::Int(100)),
            Parameter::optional("max_iterations", Value::None),
            Parameter::optional("max_seconds", Value::None),
            Parameter::required("learning_rate_schedule"),
            Parameter::optional("max_global_norm", Value::None),
        ]
    }

    fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            batch_size_per_device: params.get("batch_size_per_device")?,
            validation_example_count: params.get("validation_example_count")?,
            steps_per_save: params.get("steps_per_save")?,
            steps_per_validate: params.get("steps_per_validate")?,
            steps_per_summary: params.get("steps_per_summary")?,
            max_iterations: params.get("max_iterations")?,
            max_seconds: params.get("max_seconds")?,
            learning_rate_schedule: params.construct("learning_rate_schedule")?,
            max_global_norm: params.get("max_global_norm")?,
        })
    }
}

/// `train_maze_lib.loss_fn`
#[derive(Debug, Clone, PartialEq)]
pub struct LossFn {
    pub num_goals: usize,
}

impl Configurable for LossFn {
    const SCOPE: &'static str = "train_maze_lib.loss_fn";

    fn parameters() -> Vec<Parameter> {
        vec![Parameter::required("num_goals")]
    }

    fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            num_goals: params.get("num_goals")?,
        })
    }
}

/// `automaton_layer.FiniteStateGraphAutomaton`
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteStateGraphAutomaton {
    pub num_intermediate_states: usize,
    pub initialization_noise_factor: f64,
    pub legacy_initialize: bool,
    pub logit_scaling: String,
    pub num_out_edges: usize,
}

impl Configurable for FiniteStateGraphAutomaton {
    const SCOPE: &'static str = "automaton_layer.FiniteStateGraphAutomaton";

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::required("num_intermediate_states"),
            Parameter::optional("initialization_noise_factor", Value::Float(0.01)),
            Parameter::optional("legacy_initialize", Value::Bool(false)),
            Parameter::optional("logit_scaling", Value::Str("learned".into())),
            Parameter::optional("num_out_edges", Value::Int(1)),
        ]
    }

    fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            num_intermediate_states: params.get("num_intermediate_states")?,
            initialization_noise_factor: params.get("initialization_noise_factor")?,
            legacy_initialize: params.get("legacy_initialize")?,
            logit_scaling: params.get("logit_scaling")?,
            num_out_edges: params.get("num_out_edges")?,
        })
    }
}

/// Register every scope of the maze training run
pub fn register_scopes(registry: &mut Registry) -> Result<(), ConfigError> {
    registry.register_configurable::<TrainingLoop>()?;
    registry.register_configurable::<LossFn>()?;
    registry.register_configurable::<FiniteStateGraphAutomaton>()?;
    registry.register_configurable::<ConstantLearningRateSchedule>()?;
    Ok(())
}

/// A fresh registry holding the maze scopes
pub fn registry() -> Result<Registry, ConfigError> {
    let mut registry = Registry::new();
    register_scopes(&mut registry)?;
    Ok(registry)
}

/// Everything the training entry point receives
#[derive(Debug, Clone, PartialEq)]
pub struct MazeTrainingRun {
    pub training_loop: TrainingLoop,
    pub loss_fn: LossFn,
    pub automaton: FiniteStateGraphAutomaton,
}

impl MazeTrainingRun {
    /// Read the run's settings from a registry after `bind_defaults`
    pub fn from_registry(registry: &Registry) -> Result<Self, ConfigError> {
        Ok(Self {
            training_loop: registry.construct()?,
            loss_fn: registry.construct()?,
            automaton: registry.construct()?,
        })
    }
}
