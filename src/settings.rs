//! Integrator and propagator configuration
//!
//! Plain serde structs with defaults and presets, so a scenario file can
//! carry them verbatim. Validation happens when an integrator is built.

use satkit::{Duration, Instant};
use serde::{Deserialize, Serialize};

use crate::equations::EquationsOfMotion;
use crate::error::Result;
use crate::integrator::{GaussJackson, Integrator, RegularizedRk4, Rk4};
use crate::state::StateVector;

/// Fixed-step RK4 settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rk4Config {
    /// Step in seconds; negative integrates backward, 0 selects the nominal step
    pub step_seconds: f64,
}

impl Default for Rk4Config {
    fn default() -> Self {
        Self {
            step_seconds: Rk4::NOMINAL_STEP_SECONDS,
        }
    }
}

impl Rk4Config {
    pub fn fast() -> Self {
        Self {
            step_seconds: 120.0,
        }
    }

    pub fn high_precision() -> Self {
        Self { step_seconds: 10.0 }
    }
}

/// Sundman-regularized RK4 settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegularizedConfig {
    /// Step in the regularized variable s; negative integrates backward
    pub increment: f64,

    /// Sundman exponent α in dt = r^α ds
    pub exponent: f64,
}

impl Default for RegularizedConfig {
    fn default() -> Self {
        Self {
            increment: 0.05,
            exponent: 1.0,
        }
    }
}

impl RegularizedConfig {
    pub fn fast() -> Self {
        Self {
            increment: 0.1,
            ..Default::default()
        }
    }

    /// α = 1.5 steps in the intermediate anomaly, between eccentric (α = 1) and true (α = 2)
    pub fn high_precision() -> Self {
        Self {
            increment: 0.01,
            exponent: 1.5,
        }
    }
}

/// Multistep predictor-corrector settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaussJacksonConfig {
    /// Initial step in seconds; negative integrates backward
    pub step_seconds: f64,

    /// Largest step magnitude step doubling may reach (seconds)
    pub max_step_seconds: f64,

    /// Smallest step magnitude step halving may reach (seconds)
    pub min_step_seconds: f64,

    /// Relative state change below which the corrector has converged
    pub corrector_tolerance: f64,

    /// Corrector passes allowed per step before nonconvergence is raised
    pub max_corrector_passes: usize,

    /// RK4 substeps per startup step
    pub startup_substeps: usize,

    /// Local error target; `None` keeps the step fixed
    pub step_tolerance: Option<f64>,
}

impl Default for GaussJacksonConfig {
    fn default() -> Self {
        Self {
            step_seconds: 60.0,
            max_step_seconds: 600.0,
            min_step_seconds: 1.0,
            corrector_tolerance: 1e-13,
            max_corrector_passes: 10,
            startup_substeps: 8,
            step_tolerance: None,
        }
    }
}

impl GaussJacksonConfig {
    pub fn fast() -> Self {
        Self {
            step_seconds: 120.0,
            corrector_tolerance: 1e-11,
            startup_substeps: 4,
            step_tolerance: Some(1e-10),
            ..Default::default()
        }
    }

    pub fn high_precision() -> Self {
        Self {
            step_seconds: 30.0,
            max_step_seconds: 300.0,
            min_step_seconds: 0.1,
            corrector_tolerance: 1e-14,
            max_corrector_passes: 20,
            startup_substeps: 16,
            step_tolerance: Some(1e-13),
        }
    }
}

/// Settings for the `Propagator` driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagatorConfig {
    /// Maximum number of integrator advances per `propagate_until` call
    pub max_steps: usize,

    /// Whether to record the state after every advance
    pub store_history: bool,
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            store_history: false,
        }
    }
}

impl PropagatorConfig {
    pub fn fast() -> Self {
        Self {
            max_steps: 100_000,
            ..Default::default()
        }
    }

    pub fn high_precision() -> Self {
        Self {
            max_steps: 10_000_000,
            ..Default::default()
        }
    }

    /// With history storage enabled
    pub fn with_history(mut self) -> Self {
        self.store_history = true;
        self
    }
}

/// Integrator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegratorType {
    /// Self-starting fixed-step RK4
    #[default]
    Rk4,
    /// RK4 in a Sundman-regularized independent variable
    Regularized,
    /// Order-8 multistep predictor-corrector with RK4 startup
    GaussJackson,
}

impl IntegratorType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rk4 => "RK4 (fixed step)",
            Self::Regularized => "RK4 (Sundman regularized)",
            Self::GaussJackson => "Gauss-Jackson (multistep)",
        }
    }

    pub fn all() -> &'static [IntegratorType] {
        &[
            IntegratorType::Rk4,
            IntegratorType::Regularized,
            IntegratorType::GaussJackson,
        ]
    }
}

/// Complete integrator configuration: the selection plus every variant's settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    pub integrator: IntegratorType,
    pub rk4: Rk4Config,
    pub regularized: RegularizedConfig,
    pub gauss_jackson: GaussJacksonConfig,
}

impl IntegratorSettings {
    /// Build the selected integrator around `eom` from an initial condition
    pub fn build(
        &self,
        eom: EquationsOfMotion,
        epoch: Instant,
        state: StateVector,
    ) -> Result<Box<dyn Integrator>> {
        Ok(match self.integrator {
            IntegratorType::Rk4 => Box::new(Rk4::new(
                eom,
                Duration::from_seconds(self.rk4.step_seconds),
                epoch,
                state,
            )?),
            IntegratorType::Regularized => Box::new(RegularizedRk4::sundman(
                eom,
                epoch,
                state,
                self.regularized.increment,
                self.regularized.exponent,
            )?),
            IntegratorType::GaussJackson => {
                Box::new(GaussJackson::new(eom, &self.gauss_jackson, epoch, state)?)
            }
        })
    }
}
